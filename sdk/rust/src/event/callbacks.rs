//! Observer lists with idempotent removal by id.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use shared::algebraic::ProductValue;
use shared::types::Identity;

use super::context::{EventContext, ReducerEvent};
use crate::connection::DbConnection;
use crate::protocol::ProcedureResult;

/// Handle returned when registering a callback; pass it back to remove it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CallbackId(u64);

static NEXT_CALLBACK_ID: AtomicU64 = AtomicU64::new(1);

impl CallbackId {
  fn next() -> Self {
    CallbackId(NEXT_CALLBACK_ID.fetch_add(1, Ordering::Relaxed))
  }
}

pub type RowCallback = dyn Fn(&EventContext, &ProductValue) + Send + Sync;
pub type UpdateCallback = dyn Fn(&EventContext, &ProductValue, &ProductValue) + Send + Sync;
pub type ReducerCallback = dyn Fn(&EventContext, &ReducerEvent) + Send + Sync;
pub type ConnectCallback = dyn Fn(&DbConnection, Identity, &str) + Send + Sync;
pub type DisconnectCallback = dyn Fn(&DbConnection, Option<&str>) + Send + Sync;
pub type ConnectErrorCallback = dyn Fn(&DbConnection, &str) + Send + Sync;
pub type SubscriptionCallback = dyn Fn(&EventContext) + Send + Sync;
pub type SubscriptionErrorCallback = dyn Fn(&EventContext, &str) + Send + Sync;
pub type ProcedureCallback = dyn Fn(&DbConnection, &ProcedureResult) + Send + Sync;

/// Registered listeners for one event category, in registration order.
///
/// Dispatch works on a snapshot, so a listener may add or remove listeners
/// (including itself) while running.
pub struct CallbackList<F: ?Sized> {
  entries: Mutex<Vec<(CallbackId, Arc<F>)>>,
}

impl<F: ?Sized> Default for CallbackList<F> {
  fn default() -> Self {
    Self {
      entries: Mutex::new(Vec::new()),
    }
  }
}

impl<F: ?Sized> std::fmt::Debug for CallbackList<F> {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("CallbackList").field("len", &self.len()).finish()
  }
}

impl<F: ?Sized> CallbackList<F> {
  pub fn new() -> Self {
    Self::default()
  }

  pub fn add(&self, callback: Arc<F>) -> CallbackId {
    let id = CallbackId::next();
    lock(&self.entries).push((id, callback));
    id
  }

  /// Remove a listener. Returns false when it was not registered here,
  /// which includes removing it twice.
  pub fn remove(&self, id: CallbackId) -> bool {
    let mut entries = lock(&self.entries);
    let before = entries.len();
    entries.retain(|(existing, _)| *existing != id);
    entries.len() != before
  }

  pub fn len(&self) -> usize {
    lock(&self.entries).len()
  }

  pub fn is_empty(&self) -> bool {
    self.len() == 0
  }

  /// Current listeners, cloned out so none of them runs under the lock.
  pub fn snapshot(&self) -> Vec<Arc<F>> {
    lock(&self.entries).iter().map(|(_, cb)| Arc::clone(cb)).collect()
  }
}

/// Lock a mutex, recovering the data if a callback panicked while holding it.
pub(crate) fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
  mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::AtomicUsize;

  type Counter = dyn Fn() + Send + Sync;

  #[test]
  fn removal_is_idempotent() {
    let list: CallbackList<Counter> = CallbackList::new();
    let id = list.add(Arc::new(|| {}));
    assert!(list.remove(id));
    assert!(!list.remove(id));
    assert!(list.is_empty());
  }

  #[test]
  fn ids_are_distinct_across_lists() {
    let a: CallbackList<Counter> = CallbackList::new();
    let b: CallbackList<Counter> = CallbackList::new();
    let id_a = a.add(Arc::new(|| {}));
    let id_b = b.add(Arc::new(|| {}));
    assert_ne!(id_a, id_b);
    assert!(!b.remove(id_a));
    assert_eq!(b.len(), 1);
  }

  #[test]
  fn snapshot_preserves_registration_order() {
    let hits = Arc::new(AtomicUsize::new(0));
    let list: CallbackList<dyn Fn(usize) + Send + Sync> = CallbackList::new();
    for expected in 0..3 {
      let hits = Arc::clone(&hits);
      list.add(Arc::new(move |_| {
        assert_eq!(hits.fetch_add(1, Ordering::SeqCst), expected);
      }));
    }
    for cb in list.snapshot() {
      cb(0);
    }
    assert_eq!(hits.load(Ordering::SeqCst), 3);
  }
}
