//! Subscription lifecycle: builder, handle, and the per-connection manager.

pub mod builder;
pub mod handle;
pub mod manager;

pub use builder::SubscriptionBuilder;
pub use handle::SubscriptionHandle;
pub use manager::{SubscriptionManager, SubscriptionMode, SubscriptionState, ALL_TABLES_QUERY};
