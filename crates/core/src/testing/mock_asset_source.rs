//! Mock asset source for testing.

use async_trait::async_trait;
use futures::StreamExt;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::external_catalog::ItemDetail;
use crate::fetcher::{AssetSource, AssetStream, FetchError};

/// Bodies are handed out in chunks of this size to exercise streaming.
const CHUNK_SIZE: usize = 4;

/// Configured answer for one asset URL.
#[derive(Debug, Clone)]
pub enum MockAssetResponse {
    /// Successful response with this body.
    Body(Vec<u8>),
    /// Non-success status.
    Status(u16),
    /// Failure before any byte arrives.
    TransportError(String),
    /// Sends `sent`, then fails mid-stream with `error`.
    Truncated { sent: Vec<u8>, error: String },
}

/// Mock implementation of the `AssetSource` trait.
///
/// Unknown URLs answer 404. Every `open` is recorded, whatever its outcome.
#[derive(Debug, Default)]
pub struct MockAssetSource {
    responses: Arc<RwLock<HashMap<String, MockAssetResponse>>>,
    requests: Arc<RwLock<Vec<String>>>,
}

impl MockAssetSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` at `url`.
    pub async fn set_asset(&self, url: &str, body: Vec<u8>) {
        self.set_response(url, MockAssetResponse::Body(body)).await;
    }

    pub async fn set_response(&self, url: &str, response: MockAssetResponse) {
        self.responses
            .write()
            .await
            .insert(url.to_string(), response);
    }

    /// Serve every preview and download of `detail`, with its URL as the body.
    pub async fn serve_detail(&self, detail: &ItemDetail) {
        let mut responses = self.responses.write().await;
        let urls = detail
            .previews
            .iter()
            .map(|p| p.url())
            .chain(detail.downloads.iter().map(|d| d.url.clone()));
        for url in urls {
            let body = url.clone().into_bytes();
            responses.insert(url, MockAssetResponse::Body(body));
        }
    }

    /// Number of times `url` was opened.
    pub async fn request_count(&self, url: &str) -> usize {
        self.requests
            .read()
            .await
            .iter()
            .filter(|requested| *requested == url)
            .count()
    }

    /// Total number of opens across all URLs.
    pub async fn total_requests(&self) -> usize {
        self.requests.read().await.len()
    }

    pub async fn clear_recorded(&self) {
        self.requests.write().await.clear();
    }
}

fn chunked(body: &[u8]) -> Vec<Result<Vec<u8>, FetchError>> {
    body.chunks(CHUNK_SIZE).map(|c| Ok(c.to_vec())).collect()
}

#[async_trait]
impl AssetSource for MockAssetSource {
    async fn open(&self, url: &str) -> Result<AssetStream, FetchError> {
        self.requests.write().await.push(url.to_string());

        let response = self
            .responses
            .read()
            .await
            .get(url)
            .cloned()
            .unwrap_or(MockAssetResponse::Status(404));

        match response {
            MockAssetResponse::Body(body) => Ok(futures::stream::iter(chunked(&body)).boxed()),
            MockAssetResponse::Status(status) => Err(FetchError::HttpStatus(status)),
            MockAssetResponse::TransportError(message) => Err(FetchError::Transport(message)),
            MockAssetResponse::Truncated { sent, error } => {
                let mut chunks = chunked(&sent);
                chunks.push(Err(FetchError::Transport(error)));
                Ok(futures::stream::iter(chunks).boxed())
            }
        }
    }
}
