//! Event context and callback registration.

pub mod callbacks;
pub mod context;

pub use callbacks::{
  CallbackId, CallbackList, ConnectCallback, ConnectErrorCallback, DisconnectCallback, ProcedureCallback,
  ReducerCallback, RowCallback, SubscriptionCallback, SubscriptionErrorCallback, UpdateCallback,
};
pub use context::{Event, EventContext, ReducerEvent, ReducerStatus};
