//! Idempotent asset downloads.
//!
//! The fetcher skips any destination that already exists on disk and
//! otherwise streams the body into a uniquely named `.part` sibling that is renamed into
//! place only after the whole transfer succeeded. A crash mid-download can
//! therefore never leave a truncated file at the final path.

mod asset_fetcher;
mod http_source;

pub use asset_fetcher::{AssetFetcher, FetchOutcome, PARTIAL_SUFFIX};
pub use http_source::HttpAssetSource;

use std::path::PathBuf;

use async_trait::async_trait;
use futures::stream::BoxStream;
use thiserror::Error;

/// Errors that can occur while fetching a single asset.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Server answered with a non-success status.
    #[error("HTTP status {0}")]
    HttpStatus(u16),

    /// Connection, DNS, timeout or mid-stream failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// Local filesystem failure.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl FetchError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

/// Body of a successful response, delivered in chunks.
pub type AssetStream = BoxStream<'static, Result<Vec<u8>, FetchError>>;

/// Something that can open a streamed GET for an asset URL.
#[async_trait]
pub trait AssetSource: Send + Sync {
    /// Start the request; non-success statuses must map to `FetchError::HttpStatus`.
    async fn open(&self, url: &str) -> Result<AssetStream, FetchError>;
}
