//! Download of a single asset to a local path.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use futures::StreamExt;
use tokio::fs::{self, OpenOptions};
use tokio::io::{AsyncWriteExt, BufWriter};
use tracing::debug;
use uuid::Uuid;

use crate::metrics;

use super::{AssetSource, AssetStream, FetchError};

const WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Suffix of in-progress downloads.
pub const PARTIAL_SUFFIX: &str = ".part";

/// Result of a successful `fetch`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchOutcome {
    /// The body was transferred and moved into place.
    Downloaded { bytes: u64 },
    /// The destination already existed; no request was made.
    AlreadyPresent,
}

/// Temporary path a download streams into before the final rename.
///
/// Every call returns a fresh name, so two tasks fetching the same
/// destination never share a partial file.
fn partial_path(destination: &Path) -> PathBuf {
    let mut name = destination
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_default();
    name.push(format!(".{}{}", Uuid::new_v4().simple(), PARTIAL_SUFFIX));
    destination.with_file_name(name)
}

/// Idempotent asset downloader.
#[derive(Clone)]
pub struct AssetFetcher {
    source: Arc<dyn AssetSource>,
}

impl AssetFetcher {
    pub fn new(source: Arc<dyn AssetSource>) -> Self {
        Self { source }
    }

    /// Download `url` to `destination` unless the destination already exists.
    ///
    /// Single attempt, no retries.
    pub async fn fetch(&self, url: &str, destination: &Path) -> Result<FetchOutcome, FetchError> {
        let exists = fs::try_exists(destination)
            .await
            .map_err(|e| FetchError::io(destination, e))?;
        if exists {
            debug!(path = %destination.display(), "Asset already present, skipping");
            metrics::ASSETS_TOTAL.with_label_values(&["present"]).inc();
            return Ok(FetchOutcome::AlreadyPresent);
        }

        let result = self.download(url, destination).await;
        match &result {
            Ok(FetchOutcome::Downloaded { bytes }) => {
                metrics::ASSETS_TOTAL.with_label_values(&["downloaded"]).inc();
                metrics::ASSET_BYTES.inc_by(*bytes);
            }
            Ok(FetchOutcome::AlreadyPresent) => {}
            Err(_) => metrics::ASSETS_TOTAL.with_label_values(&["failed"]).inc(),
        }
        result
    }

    async fn download(&self, url: &str, destination: &Path) -> Result<FetchOutcome, FetchError> {
        let part = partial_path(destination);
        let stream = self.source.open(url).await?;

        let written = match write_stream(stream, &part).await {
            Ok(bytes) => fs::rename(&part, destination)
                .await
                .map(|_| bytes)
                .map_err(|e| FetchError::io(destination, e)),
            Err(e) => Err(e),
        };

        match written {
            Ok(bytes) => {
                debug!(url, path = %destination.display(), bytes, "Asset downloaded");
                Ok(FetchOutcome::Downloaded { bytes })
            }
            Err(e) => {
                if let Err(cleanup) = fs::remove_file(&part).await {
                    if cleanup.kind() != std::io::ErrorKind::NotFound {
                        debug!(path = %part.display(), "Failed to remove partial file: {}", cleanup);
                    }
                }
                Err(e)
            }
        }
    }
}

/// Stream the body into the new file `path` and sync it.
async fn write_stream(mut stream: AssetStream, path: &Path) -> Result<u64, FetchError> {
    let file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| FetchError::io(path, e))?;
    let mut writer = BufWriter::with_capacity(WRITE_BUFFER_SIZE, file);
    let mut total_bytes = 0u64;

    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        writer
            .write_all(&chunk)
            .await
            .map_err(|e| FetchError::io(path, e))?;
        total_bytes += chunk.len() as u64;
    }

    writer.flush().await.map_err(|e| FetchError::io(path, e))?;
    writer
        .into_inner()
        .sync_all()
        .await
        .map_err(|e| FetchError::io(path, e))?;

    Ok(total_bytes)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockAssetResponse, MockAssetSource};
    use tempfile::TempDir;

    const URL: &str = "https://files.example.com/mod.zip";

    fn fetcher_with(source: &Arc<MockAssetSource>) -> AssetFetcher {
        AssetFetcher::new(Arc::clone(source) as Arc<dyn AssetSource>)
    }

    fn partial_files(dir: &Path) -> Vec<PathBuf> {
        std::fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().path())
            .filter(|p| p.to_string_lossy().ends_with(PARTIAL_SUFFIX))
            .collect()
    }

    #[test]
    fn test_partial_path_is_unique_sibling() {
        let dest = Path::new("/a/b/mod.zip");
        let first = partial_path(dest);
        let second = partial_path(dest);

        assert_ne!(first, second);
        assert_eq!(first.parent(), Some(Path::new("/a/b")));
        let name = first.file_name().unwrap().to_string_lossy().into_owned();
        assert!(name.starts_with("mod.zip."));
        assert!(name.ends_with(PARTIAL_SUFFIX));
    }

    #[tokio::test]
    async fn test_fetch_downloads_and_renames() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(MockAssetSource::new());
        source.set_asset(URL, b"hello world".to_vec()).await;
        let fetcher = fetcher_with(&source);

        let dest = temp_dir.path().join("mod.zip");
        let outcome = fetcher.fetch(URL, &dest).await.unwrap();

        assert_eq!(outcome, FetchOutcome::Downloaded { bytes: 11 });
        assert_eq!(std::fs::read(&dest).unwrap(), b"hello world");
        assert!(partial_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_second_fetch_makes_no_request() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(MockAssetSource::new());
        source.set_asset(URL, b"data".to_vec()).await;
        let fetcher = fetcher_with(&source);
        let dest = temp_dir.path().join("mod.zip");

        fetcher.fetch(URL, &dest).await.unwrap();
        let second = fetcher.fetch(URL, &dest).await.unwrap();

        assert_eq!(second, FetchOutcome::AlreadyPresent);
        assert_eq!(source.request_count(URL).await, 1);
    }

    #[tokio::test]
    async fn test_status_error_leaves_nothing_on_disk() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(MockAssetSource::new());
        source.set_response(URL, MockAssetResponse::Status(404)).await;
        let fetcher = fetcher_with(&source);
        let dest = temp_dir.path().join("mod.zip");

        let err = fetcher.fetch(URL, &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::HttpStatus(404)));
        assert!(!dest.exists());
        assert!(partial_files(temp_dir.path()).is_empty());
    }

    #[tokio::test]
    async fn test_mid_stream_failure_removes_partial_file() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(MockAssetSource::new());
        source
            .set_response(
                URL,
                MockAssetResponse::Truncated {
                    sent: b"first half".to_vec(),
                    error: "connection reset".to_string(),
                },
            )
            .await;
        let fetcher = fetcher_with(&source);
        let dest = temp_dir.path().join("mod.zip");

        let err = fetcher.fetch(URL, &dest).await.unwrap_err();

        assert!(matches!(err, FetchError::Transport(ref msg) if msg.contains("reset")));
        assert!(!dest.exists());
        assert!(partial_files(temp_dir.path()).is_empty());

        // The next attempt starts from scratch and succeeds.
        source.set_asset(URL, b"complete".to_vec()).await;
        let outcome = fetcher.fetch(URL, &dest).await.unwrap();
        assert_eq!(outcome, FetchOutcome::Downloaded { bytes: 8 });
        assert_eq!(source.request_count(URL).await, 2);
    }

    #[tokio::test]
    async fn test_stale_partial_file_does_not_block_download() {
        let temp_dir = TempDir::new().unwrap();
        let dest = temp_dir.path().join("mod.zip");
        let stale = temp_dir.path().join("mod.zip.part");
        std::fs::write(&stale, b"stale bytes from a crashed run").unwrap();

        let source = Arc::new(MockAssetSource::new());
        source.set_asset(URL, b"fresh".to_vec()).await;
        let fetcher = fetcher_with(&source);

        fetcher.fetch(URL, &dest).await.unwrap();

        assert_eq!(std::fs::read(&dest).unwrap(), b"fresh");
        assert_eq!(partial_files(temp_dir.path()), vec![stale]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_fetches_of_same_destination_both_succeed() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(MockAssetSource::new());
        source.set_asset(URL, vec![9u8; 4096]).await;
        let dest = temp_dir.path().join("a.zip");

        for _ in 0..5 {
            let _ = std::fs::remove_file(&dest);
            let first = {
                let fetcher = fetcher_with(&source);
                let dest = dest.clone();
                tokio::spawn(async move { fetcher.fetch(URL, &dest).await })
            };
            let second = {
                let fetcher = fetcher_with(&source);
                let dest = dest.clone();
                tokio::spawn(async move { fetcher.fetch(URL, &dest).await })
            };

            assert!(first.await.unwrap().is_ok());
            assert!(second.await.unwrap().is_ok());
            assert_eq!(std::fs::read(&dest).unwrap(), vec![9u8; 4096]);
            assert!(partial_files(temp_dir.path()).is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_parent_directory_is_io_error() {
        let temp_dir = TempDir::new().unwrap();
        let source = Arc::new(MockAssetSource::new());
        source.set_asset(URL, b"x".to_vec()).await;
        let fetcher = fetcher_with(&source);

        let dest = temp_dir.path().join("missing").join("mod.zip");
        let err = fetcher.fetch(URL, &dest).await.unwrap_err();
        assert!(matches!(err, FetchError::Io { .. }));
    }
}
