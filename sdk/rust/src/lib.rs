//! # SpaceSync SDK
//!
//! Client for a real-time database: keeps a local cache of the rows the
//! client subscribed to, applies server updates in order, and reports
//! every change through callbacks.
//!
//! ## Quick Start
//!
//! ```ignore
//! use spacesync_sdk::{ConnectionConfig, DbConnection};
//!
//! let (conn, pump, transport) = DbConnection::connect(config, module)?;
//! tokio::spawn(pump.run());
//! // hand `transport` to a socket driver
//!
//! conn.table("user")?.on_insert(|_ctx, row| println!("new user {row:?}"));
//! conn.subscription_builder()
//!     .on_applied(|ctx| println!("{} users", ctx.table("user").unwrap().count()))
//!     .subscribe(["SELECT * FROM user"])?;
//! ```

pub mod cache;
pub mod connection;
pub mod event;
pub mod protocol;
pub mod row;
pub mod schema;
pub mod subscription;

// ─── Re-exports ───────────────────────────────────────────────────────────────

pub use shared::algebraic;
pub use shared::config::{Compression, ConnectionConfig};
pub use shared::types;
pub use shared::{Result, SyncError};

pub use cache::{ClientCache, RowChange, TableCache};
pub use connection::{connect_url, ConnectRequest, DbConnection, MessagePump, Outbound, SocketEvent, TableHandle, Transport};
pub use event::{CallbackId, Event, EventContext, ReducerEvent, ReducerStatus};
pub use protocol::{CallReducerFlags, Decompressor, GzipDecompressor, QueryId};
pub use row::{ReducerArgs, TableRow};
pub use schema::{IndexDef, ModuleDef, ProcedureDef, ReducerDef, TableDef};
pub use subscription::{SubscriptionBuilder, SubscriptionHandle};

// Derive macros
pub use spacesync_derive::{ReducerArgs, TableRow};
