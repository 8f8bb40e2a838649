//! Correlation of subscribe requests with their server acknowledgements.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use shared::{Result, SyncError};

use crate::event::callbacks::lock;
use crate::event::{SubscriptionCallback, SubscriptionErrorCallback};
use crate::protocol::QueryId;

/// Query text matching every row of every table.
pub const ALL_TABLES_QUERY: &str = "SELECT * FROM *";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionMode {
  /// Explicit queries.
  Targeted,
  /// `SELECT * FROM *`.
  AllTables,
}

/// Shared state of one subscription.
///
/// Lifecycle: pending, then active on the matching applied message, then
/// ended on unsubscribe-applied or error. Pending may go straight to ended.
/// Active and ended are never both set, and an ended subscription stays
/// ended.
pub struct SubscriptionState {
  query_id: QueryId,
  queries: Vec<String>,
  mode: SubscriptionMode,
  active: AtomicBool,
  ended: AtomicBool,
  unsubscribe_called: AtomicBool,
  on_applied: Vec<Arc<SubscriptionCallback>>,
  on_error: Vec<Arc<SubscriptionErrorCallback>>,
  on_end: Mutex<Option<Arc<SubscriptionCallback>>>,
}

impl SubscriptionState {
  pub fn query_id(&self) -> QueryId {
    self.query_id
  }

  pub fn queries(&self) -> &[String] {
    &self.queries
  }

  pub fn mode(&self) -> SubscriptionMode {
    self.mode
  }

  pub fn is_active(&self) -> bool {
    self.active.load(Ordering::Acquire)
  }

  pub fn is_ended(&self) -> bool {
    self.ended.load(Ordering::Acquire)
  }

  /// Claim the single unsubscribe. Fails if the subscription already ended
  /// or unsubscribe was already requested.
  pub(crate) fn begin_unsubscribe(&self, on_end: Option<Arc<SubscriptionCallback>>) -> Result<()> {
    if self.is_ended() {
      return Err(SyncError::AlreadyEnded);
    }
    if self.unsubscribe_called.swap(true, Ordering::AcqRel) {
      return Err(SyncError::AlreadyUnsubscribed);
    }
    *lock(&self.on_end) = on_end;
    Ok(())
  }

  /// Applied message arrived. Returns the callbacks to fire, or nothing if
  /// the subscription already ended.
  pub(crate) fn mark_applied(&self) -> Vec<Arc<SubscriptionCallback>> {
    if self.is_ended() {
      return Vec::new();
    }
    self.active.store(true, Ordering::Release);
    self.on_applied.clone()
  }

  pub(crate) fn mark_ended(&self) -> Option<Arc<SubscriptionCallback>> {
    self.active.store(false, Ordering::Release);
    self.ended.store(true, Ordering::Release);
    lock(&self.on_end).take()
  }

  pub(crate) fn mark_error(&self) -> Vec<Arc<SubscriptionErrorCallback>> {
    self.active.store(false, Ordering::Release);
    self.ended.store(true, Ordering::Release);
    lock(&self.on_end).take();
    self.on_error.clone()
  }
}

impl std::fmt::Debug for SubscriptionState {
  fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
    f.debug_struct("SubscriptionState")
      .field("query_id", &self.query_id)
      .field("queries", &self.queries)
      .field("active", &self.is_active())
      .field("ended", &self.is_ended())
      .finish()
  }
}

/// Outstanding subscriptions of one connection, by query id.
#[derive(Debug, Default)]
pub struct SubscriptionManager {
  next_query_id: u32,
  subscriptions: HashMap<QueryId, Arc<SubscriptionState>>,
}

impl SubscriptionManager {
  pub fn new() -> Self {
    Self::default()
  }

  /// Record a new pending subscription and allocate its query id.
  pub fn register(
    &mut self,
    queries: Vec<String>,
    on_applied: Vec<Arc<SubscriptionCallback>>,
    on_error: Vec<Arc<SubscriptionErrorCallback>>,
  ) -> Result<Arc<SubscriptionState>> {
    if queries.is_empty() {
      return Err(SyncError::EmptyQuerySet);
    }
    let mode = if queries.iter().any(|q| q.trim() == ALL_TABLES_QUERY) {
      SubscriptionMode::AllTables
    } else {
      SubscriptionMode::Targeted
    };
    if self.subscriptions.values().any(|s| s.mode != mode) {
      return Err(SyncError::MixedSubscriptionModes);
    }

    let query_id = QueryId(self.next_query_id);
    self.next_query_id = self.next_query_id.wrapping_add(1);
    let state = Arc::new(SubscriptionState {
      query_id,
      queries,
      mode,
      active: AtomicBool::new(false),
      ended: AtomicBool::new(false),
      unsubscribe_called: AtomicBool::new(false),
      on_applied,
      on_error,
      on_end: Mutex::new(None),
    });
    self.subscriptions.insert(query_id, Arc::clone(&state));
    Ok(state)
  }

  pub fn get(&self, query_id: QueryId) -> Option<Arc<SubscriptionState>> {
    self.subscriptions.get(&query_id).cloned()
  }

  pub fn remove(&mut self, query_id: QueryId) -> Option<Arc<SubscriptionState>> {
    self.subscriptions.remove(&query_id)
  }

  /// Remove and return every subscription, ordered by query id.
  pub fn drain(&mut self) -> Vec<Arc<SubscriptionState>> {
    let mut all: Vec<_> = self.subscriptions.drain().map(|(_, s)| s).collect();
    all.sort_by_key(|s| s.query_id);
    all
  }

  pub fn len(&self) -> usize {
    self.subscriptions.len()
  }

  pub fn is_empty(&self) -> bool {
    self.subscriptions.is_empty()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn queries(q: &[&str]) -> Vec<String> {
    q.iter().map(|s| s.to_string()).collect()
  }

  #[test]
  fn query_ids_count_up_from_zero() {
    let mut manager = SubscriptionManager::new();
    let a = manager.register(queries(&["SELECT * FROM a"]), vec![], vec![]).unwrap();
    let b = manager.register(queries(&["SELECT * FROM b"]), vec![], vec![]).unwrap();
    assert_eq!(a.query_id(), QueryId(0));
    assert_eq!(b.query_id(), QueryId(1));
    assert_eq!(manager.len(), 2);
  }

  #[test]
  fn empty_query_set_is_rejected() {
    let mut manager = SubscriptionManager::new();
    assert!(matches!(manager.register(vec![], vec![], vec![]), Err(SyncError::EmptyQuerySet)));
  }

  #[test]
  fn modes_cannot_mix_while_live() {
    let mut manager = SubscriptionManager::new();
    let all = manager.register(queries(&[ALL_TABLES_QUERY]), vec![], vec![]).unwrap();
    assert!(matches!(
      manager.register(queries(&["SELECT * FROM a"]), vec![], vec![]),
      Err(SyncError::MixedSubscriptionModes)
    ));
    manager.remove(all.query_id());
    assert!(manager.register(queries(&["SELECT * FROM a"]), vec![], vec![]).is_ok());
  }

  #[test]
  fn lifecycle_flags() {
    let mut manager = SubscriptionManager::new();
    let state = manager.register(queries(&["SELECT * FROM a"]), vec![], vec![]).unwrap();
    assert!(!state.is_active() && !state.is_ended());

    state.mark_applied();
    assert!(state.is_active());

    state.begin_unsubscribe(None).unwrap();
    assert!(matches!(state.begin_unsubscribe(None), Err(SyncError::AlreadyUnsubscribed)));

    state.mark_ended();
    assert!(state.is_ended() && !state.is_active());
    assert!(matches!(state.begin_unsubscribe(None), Err(SyncError::AlreadyEnded)));

    // ended subscriptions never reactivate
    state.mark_applied();
    assert!(!state.is_active());
  }

  #[test]
  fn error_before_applied_ends_directly() {
    let mut manager = SubscriptionManager::new();
    let state = manager.register(queries(&["SELECT * FROM a"]), vec![], vec![]).unwrap();
    state.mark_error();
    assert!(state.is_ended());
    assert!(!state.is_active());
  }
}
