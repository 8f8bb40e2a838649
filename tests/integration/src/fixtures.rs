//! A small chat module and helpers to build its rows and server messages.

use shared::algebraic::codec::serialize_product_value;
use shared::algebraic::{AlgebraicType, AlgebraicValue, IntoValue, ProductType, ProductValue, Typespace};
use shared::types::{ConnectionId, Identity, TimeDuration, Timestamp, U256};
use spacesync_sdk::protocol::{
  BsatnRowList, CompressableQueryUpdate, DatabaseUpdate, QueryId, QueryUpdate, ReducerCallInfo, ServerMessage,
  TableUpdate, TransactionUpdate, UpdateStatus,
};
use spacesync_sdk::schema::{ModuleDef, ReducerDef, TableDef};
use spacesync_sdk::{ReducerArgs, TableRow};

/// `user`: keyed by identity.
pub fn user_type() -> ProductType {
  ProductType::new([
    ("identity", AlgebraicType::identity()),
    ("name", AlgebraicType::option(AlgebraicType::String)),
    ("online", AlgebraicType::Bool),
  ])
}

/// `message`: no primary key.
pub fn message_type() -> ProductType {
  ProductType::new([
    ("sender", AlgebraicType::identity()),
    ("sent", AlgebraicType::timestamp()),
    ("text", AlgebraicType::String),
  ])
}

pub fn chat_module() -> ModuleDef {
  let mut module = ModuleDef::new(Typespace::new());
  module
    .add_table(TableDef::new("user", user_type()).with_primary_key(0))
    .add_table(TableDef::new("message", message_type()))
    .add_reducer(ReducerDef::new(
      "set_name",
      ProductType::new([("name", AlgebraicType::String)]),
    ))
    .add_reducer(ReducerDef::new(
      "send_message",
      ProductType::new([("text", AlgebraicType::String)]),
    ));
  module
}

#[derive(Debug, Clone, PartialEq, TableRow)]
#[spacesync(table = "user")]
pub struct User {
  pub identity: Identity,
  pub name: Option<String>,
  pub online: bool,
}

#[derive(Debug, Clone, PartialEq, ReducerArgs)]
#[spacesync(reducer = "set_name")]
pub struct SetName {
  pub name: String,
}

pub fn identity(n: u128) -> Identity {
  Identity::new(U256::from(n))
}

pub fn user_value(id: u128, name: Option<&str>, online: bool) -> ProductValue {
  ProductValue::new([
    identity(id).into_value(),
    name.map(str::to_string).into_value(),
    AlgebraicValue::Bool(online),
  ])
}

/// Encoded `user` row.
pub fn user(id: u128, name: Option<&str>, online: bool) -> Vec<u8> {
  encode(&user_type(), &user_value(id, name, online))
}

/// Encoded `message` row.
pub fn message(sender: u128, sent_micros: i64, text: &str) -> Vec<u8> {
  let row = ProductValue::new([
    identity(sender).into_value(),
    Timestamp::from_micros(sent_micros).into_value(),
    AlgebraicValue::String(text.to_string()),
  ]);
  encode(&message_type(), &row)
}

fn encode(ty: &ProductType, row: &ProductValue) -> Vec<u8> {
  serialize_product_value(ty, row, &Typespace::new()).expect("fixture rows match their types")
}

pub fn query_update(inserts: &[Vec<u8>], deletes: &[Vec<u8>]) -> QueryUpdate {
  QueryUpdate {
    deletes: BsatnRowList::from_rows(deletes.iter().map(Vec::as_slice)),
    inserts: BsatnRowList::from_rows(inserts.iter().map(Vec::as_slice)),
  }
}

pub fn table_update(table: &str, inserts: &[Vec<u8>], deletes: &[Vec<u8>]) -> TableUpdate {
  TableUpdate {
    table_id: 0,
    table_name: table.to_string(),
    num_rows: (inserts.len() + deletes.len()) as u64,
    updates: vec![CompressableQueryUpdate::Uncompressed(query_update(inserts, deletes))],
  }
}

pub fn database_update(tables: Vec<TableUpdate>) -> DatabaseUpdate {
  DatabaseUpdate { tables }
}

pub fn subscribe_applied(query_id: u32, update: DatabaseUpdate) -> ServerMessage {
  ServerMessage::SubscribeMultiApplied {
    request_id: 0,
    total_host_execution_duration_micros: 100,
    query_id: QueryId(query_id),
    update,
  }
}

pub fn unsubscribe_applied(query_id: u32, update: DatabaseUpdate) -> ServerMessage {
  ServerMessage::UnsubscribeMultiApplied {
    request_id: 0,
    total_host_execution_duration_micros: 100,
    query_id: QueryId(query_id),
    update,
  }
}

pub fn subscription_error(query_id: Option<u32>, error: &str) -> ServerMessage {
  ServerMessage::SubscriptionError {
    total_host_execution_duration_micros: 0,
    request_id: None,
    query_id,
    table_id: None,
    error: error.to_string(),
  }
}

pub fn identity_token(id: u128, token: &str, connection_id: u128) -> ServerMessage {
  ServerMessage::IdentityToken {
    identity: identity(id),
    token: token.to_string(),
    connection_id: ConnectionId::new(connection_id),
  }
}

pub fn transaction(reducer: &str, args: Vec<u8>, status: UpdateStatus) -> ServerMessage {
  ServerMessage::TransactionUpdate(TransactionUpdate {
    status,
    timestamp: Timestamp::from_micros(1_700_000_000_000_000),
    caller_identity: identity(1),
    caller_connection_id: ConnectionId::new(77),
    reducer_call: ReducerCallInfo {
      reducer_name: reducer.to_string(),
      reducer_id: 0,
      args,
      request_id: 0,
    },
    energy_quanta_used: 1_000,
    total_host_execution_duration: TimeDuration::from_micros(250),
  })
}

/// Encoded `set_name` arguments.
pub fn set_name_args(name: &str) -> Vec<u8> {
  let params = ProductType::new([("name", AlgebraicType::String)]);
  encode(&params, &SetName { name: name.to_string() }.to_args())
}
