//! Typed views over dynamic rows and reducer arguments.
//!
//! Both traits map product fields positionally onto struct fields and are
//! normally derived:
//!
//! ```ignore
//! #[derive(TableRow)]
//! #[spacesync(table = "user")]
//! struct User {
//!     identity: Identity,
//!     name: Option<String>,
//!     online: bool,
//! }
//! ```

use shared::algebraic::ProductValue;
use shared::Result;

/// A struct mirroring one table's row type.
pub trait TableRow: Sized {
  const TABLE_NAME: &'static str;

  fn from_row(row: &ProductValue) -> Result<Self>;
}

/// A struct mirroring one reducer's parameter list.
pub trait ReducerArgs: Sized {
  const REDUCER_NAME: &'static str;

  fn to_args(&self) -> ProductValue;

  fn from_args(args: &ProductValue) -> Result<Self>;
}
