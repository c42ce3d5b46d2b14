//! reqwest-backed asset source.

use async_trait::async_trait;
use futures::{StreamExt, TryStreamExt};
use reqwest::Client;
use tracing::debug;

use super::{AssetSource, AssetStream, FetchError};

/// Streams assets over HTTP.
#[derive(Debug, Clone)]
pub struct HttpAssetSource {
    client: Client,
}

impl HttpAssetSource {
    /// Wrap an existing client (e.g. the catalog client's, to share its User-Agent).
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl AssetSource for HttpAssetSource {
    async fn open(&self, url: &str) -> Result<AssetStream, FetchError> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| FetchError::Transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        debug!(url, content_length = ?response.content_length(), "Asset response opened");

        Ok(response
            .bytes_stream()
            .map_ok(|chunk| chunk.to_vec())
            .map_err(|e| FetchError::Transport(e.to_string()))
            .boxed())
    }
}
