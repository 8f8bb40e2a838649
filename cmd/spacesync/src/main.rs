use std::path::{Path, PathBuf};

use anyhow::Context;
use clap::{Parser, Subcommand};
use shared::serialize::Decode;
use shared::types::ConnectionId;
use spacesync_sdk::protocol::{unwrap_frame, DatabaseUpdate, GzipDecompressor, ServerMessage, UpdateStatus};
use spacesync_sdk::connect_url;
use tracing::{debug, info};

#[derive(Parser)]
#[command(name = "spacesync", about = "Inspect captured frames and connection settings")]
struct Cli {
  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Decode captured server frames and print one line per message.
  Decode {
    file: PathBuf,
    /// The file holds several frames, each prefixed with its u32 LE length.
    #[arg(long)]
    framed: bool,
  },
  /// Print the connect URL for the loaded configuration.
  Url {
    #[arg(long, default_value = "config")]
    config_dir: PathBuf,
  },
}

fn main() -> anyhow::Result<()> {
  let cli = Cli::parse();
  match cli.command {
    Command::Decode { file, framed } => {
      shared::logging::init_logging("info");
      let rt = tokio::runtime::Builder::new_current_thread().build()?;
      rt.block_on(decode(&file, framed))
    }
    Command::Url { config_dir } => print_url(&config_dir),
  }
}

async fn decode(file: &Path, framed: bool) -> anyhow::Result<()> {
  let data = std::fs::read(file).with_context(|| format!("reading {}", file.display()))?;
  let frames = if framed { split_frames(&data)? } else { vec![data.as_slice()] };
  info!(file = %file.display(), frames = frames.len(), "decoding frames");

  for (i, frame) in frames.into_iter().enumerate() {
    let payload = unwrap_frame(frame, &GzipDecompressor)
      .await
      .with_context(|| format!("frame {i}: unwrapping"))?;
    debug!(frame = i, bytes = payload.len(), "frame unwrapped");
    let message = ServerMessage::from_bytes(&payload).with_context(|| format!("frame {i}: decoding"))?;
    println!("{i:>4}  {}", summarize(&message));
  }
  Ok(())
}

fn split_frames(mut data: &[u8]) -> anyhow::Result<Vec<&[u8]>> {
  let mut frames = Vec::new();
  while !data.is_empty() {
    anyhow::ensure!(data.len() >= 4, "truncated frame length at end of file");
    let (len, rest) = data.split_at(4);
    let len = u32::from_le_bytes([len[0], len[1], len[2], len[3]]) as usize;
    anyhow::ensure!(rest.len() >= len, "frame of {len} bytes runs past end of file");
    let (frame, rest) = rest.split_at(len);
    frames.push(frame);
    data = rest;
  }
  Ok(frames)
}

fn summarize(message: &ServerMessage) -> String {
  match message {
    ServerMessage::IdentityToken {
      identity, connection_id, ..
    } => format!("IdentityToken identity={} connection_id={connection_id}", identity.short_hex()),
    ServerMessage::InitialSubscription { database_update, .. } => {
      format!("InitialSubscription {}", tables(database_update))
    }
    ServerMessage::TransactionUpdate(update) => {
      let status = match &update.status {
        UpdateStatus::Committed(db) => format!("committed {}", tables(db)),
        UpdateStatus::Failed(message) => format!("failed: {message}"),
        UpdateStatus::OutOfEnergy => "out of energy".to_string(),
      };
      format!(
        "TransactionUpdate reducer={} caller={} {status}",
        update.reducer_call.reducer_name,
        update.caller_identity.short_hex()
      )
    }
    ServerMessage::TransactionUpdateLight { update, .. } => format!("TransactionUpdateLight {}", tables(update)),
    ServerMessage::SubscribeApplied { query_id, rows, .. } => {
      format!("SubscribeApplied query_id={query_id} table={}", rows.table_name)
    }
    ServerMessage::UnsubscribeApplied { query_id, rows, .. } => {
      format!("UnsubscribeApplied query_id={query_id} table={}", rows.table_name)
    }
    ServerMessage::SubscribeMultiApplied { query_id, update, .. } => {
      format!("SubscribeMultiApplied query_id={query_id} {}", tables(update))
    }
    ServerMessage::UnsubscribeMultiApplied { query_id, update, .. } => {
      format!("UnsubscribeMultiApplied query_id={query_id} {}", tables(update))
    }
    ServerMessage::SubscriptionError { query_id, error, .. } => match query_id {
      Some(id) => format!("SubscriptionError query_id={id}: {error}"),
      None => format!("SubscriptionError (all queries): {error}"),
    },
    ServerMessage::OneOffQueryResponse { error, tables, .. } => match error {
      Some(error) => format!("OneOffQueryResponse error: {error}"),
      None => format!("OneOffQueryResponse tables={}", tables.len()),
    },
    ServerMessage::ProcedureResult(result) => format!("ProcedureResult request_id={}", result.request_id),
  }
}

fn tables(update: &DatabaseUpdate) -> String {
  let names: Vec<String> = update
    .tables
    .iter()
    .map(|t| format!("{}({})", t.table_name, t.num_rows))
    .collect();
  format!("tables=[{}]", names.join(", "))
}

fn print_url(config_dir: &Path) -> anyhow::Result<()> {
  let env = std::env::var("SPACESYNC_ENV").unwrap_or_else(|_| "development".to_string());
  let cfg = shared::config::load_config(config_dir, &env)?;
  shared::logging::init_logging(&cfg.logging.level);
  info!(env = %env, "configuration loaded");

  let connection_id = cfg.connection.connection_id.unwrap_or_else(ConnectionId::random);
  println!("{}", connect_url(&cfg.connection, connection_id)?);
  Ok(())
}

#[cfg(test)]
mod tests {
  use super::*;
  use spacesync_sdk::protocol::QueryId;

  #[test]
  fn splits_length_prefixed_frames() {
    let data = [2, 0, 0, 0, 0xaa, 0xbb, 1, 0, 0, 0, 0xcc];
    let frames = split_frames(&data).unwrap();
    assert_eq!(frames, vec![&[0xaa, 0xbb][..], &[0xcc][..]]);
    assert!(split_frames(&[5, 0, 0, 0, 1]).is_err());
    assert!(split_frames(&[1, 0]).is_err());
  }

  #[test]
  fn summary_names_the_failed_query() {
    let message = ServerMessage::SubscriptionError {
      total_host_execution_duration_micros: 0,
      request_id: None,
      query_id: Some(3),
      table_id: None,
      error: "no such table".into(),
    };
    assert_eq!(summarize(&message), "SubscriptionError query_id=3: no such table");

    let applied = ServerMessage::SubscribeMultiApplied {
      request_id: 0,
      total_host_execution_duration_micros: 0,
      query_id: QueryId(1),
      update: DatabaseUpdate::default(),
    };
    assert_eq!(summarize(&applied), "SubscribeMultiApplied query_id=1 tables=[]");
  }
}
