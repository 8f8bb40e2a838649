//! End-to-end tests that drive a `DbConnection` through its in-memory
//! socket channels, playing the server's side by hand.

pub mod fixtures;
pub mod harness;

mod connection;
mod subscriptions;
mod transactions;
