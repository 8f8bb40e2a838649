//! Connection to a database: outbound calls, inbound message pump, and the
//! channel seam between them and a socket driver.

mod db_connection;
mod pump;
mod socket;
mod table_handle;
mod updates;
mod url;

pub use db_connection::DbConnection;
pub use pump::MessagePump;
pub use socket::{ConnectRequest, Outbound, SocketEvent, Transport};
pub use table_handle::TableHandle;
pub use url::connect_url;
