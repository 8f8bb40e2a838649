//! Client-side mirror of subscribed table state.

pub mod client_cache;
mod index;
pub mod operation;
pub mod table;

pub use client_cache::ClientCache;
pub use operation::{CallbackKind, OperationKind, PendingCallback, RowChange, RowOperation, TableOperations};
pub use table::TableCache;
