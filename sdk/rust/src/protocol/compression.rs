//! Frame-level and per-query decompression.

use std::io::Read;

use async_trait::async_trait;
use flate2::read::GzDecoder;
use shared::{Result, SyncError};

/// First byte of every inbound frame.
pub const TAG_NONE: u8 = 0;
pub const TAG_BROTLI: u8 = 1;
pub const TAG_GZIP: u8 = 2;

/// Compression algorithms the server may apply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Algorithm {
  Brotli,
  Gzip,
}

impl Algorithm {
  pub fn name(&self) -> &'static str {
    match self {
      Algorithm::Brotli => "brotli",
      Algorithm::Gzip => "gzip",
    }
  }
}

/// Pluggable decompression step.
///
/// The pump awaits it before touching any state, so a slow implementation
/// delays later frames instead of being overtaken by them.
#[async_trait]
pub trait Decompressor: Send + Sync {
  async fn decompress(&self, algorithm: Algorithm, data: &[u8]) -> Result<Vec<u8>>;
}

/// Gzip via `flate2`; Brotli is rejected.
#[derive(Debug, Default, Clone, Copy)]
pub struct GzipDecompressor;

#[async_trait]
impl Decompressor for GzipDecompressor {
  async fn decompress(&self, algorithm: Algorithm, data: &[u8]) -> Result<Vec<u8>> {
    match algorithm {
      Algorithm::Gzip => {
        let mut out = Vec::with_capacity(data.len() * 4);
        GzDecoder::new(data)
          .read_to_end(&mut out)
          .map_err(SyncError::DecompressFailed)?;
        Ok(out)
      }
      Algorithm::Brotli => Err(SyncError::UnsupportedCompression(algorithm.name().into())),
    }
  }
}

/// Strip the compression tag from an inbound frame and return the encoded
/// server message.
pub async fn unwrap_frame(frame: &[u8], decompressor: &dyn Decompressor) -> Result<Vec<u8>> {
  let (&tag, payload) = frame.split_first().ok_or(SyncError::BufferTooShort {
    offset: 0,
    requested: 1,
    remaining: 0,
  })?;
  match tag {
    TAG_NONE => Ok(payload.to_vec()),
    TAG_BROTLI => Err(SyncError::UnsupportedCompression(Algorithm::Brotli.name().into())),
    TAG_GZIP => decompressor.decompress(Algorithm::Gzip, payload).await,
    other => Err(SyncError::UnexpectedCompressionTag(other)),
  }
}
