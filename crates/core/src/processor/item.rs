//! Item processor implementation.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, warn};

use crate::external_catalog::{CatalogApi, CatalogError, CatalogItem};
use crate::fetcher::AssetFetcher;

use super::report::{AssetKind, AssetReport, AssetResult, AssetStatus};
use super::summary::write_summary;

/// Error type for item processing. Either variant means no ledger commit.
#[derive(Debug, Error)]
pub enum ItemError {
    /// The item directory could not be created.
    #[error("failed to create item directory {path}: {source}")]
    Directory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The detail record could not be retrieved.
    #[error("failed to fetch item detail: {0}")]
    Detail(#[from] CatalogError),
}

/// Processes one catalog item: detail, summary, then every asset.
#[derive(Clone)]
pub struct ItemProcessor {
    catalog: Arc<dyn CatalogApi>,
    fetcher: AssetFetcher,
}

impl ItemProcessor {
    pub fn new(catalog: Arc<dyn CatalogApi>, fetcher: AssetFetcher) -> Self {
        Self { catalog, fetcher }
    }

    /// Process `item` inside `collection_dir`.
    ///
    /// Asset failures are recorded in the report and never abort the item.
    pub async fn process(
        &self,
        item: &CatalogItem,
        collection_dir: &Path,
    ) -> Result<AssetReport, ItemError> {
        let item_dir = item.directory_in(collection_dir);
        tokio::fs::create_dir_all(&item_dir)
            .await
            .map_err(|source| ItemError::Directory {
                path: item_dir.clone(),
                source,
            })?;

        let detail = self.catalog.get_detail(&item.id).await?;
        debug!(
            item_id = %item.id,
            previews = detail.previews.len(),
            downloads = detail.downloads.len(),
            "Fetched item detail"
        );

        match write_summary(&item_dir, item, &detail).await {
            Ok(true) => debug!(item_id = %item.id, "Wrote item summary"),
            Ok(false) => {}
            Err(e) => warn!(item_id = %item.id, error = %e, "Failed to write item summary"),
        }

        let mut report = AssetReport::new(item.id.clone());

        for (index, preview) in detail.previews.iter().enumerate() {
            let file_name = preview.local_name(index);
            let url = preview.url();
            let status = self.fetch_asset(item, &url, &item_dir.join(&file_name)).await;
            report.push(AssetResult {
                kind: AssetKind::Preview,
                file_name,
                url,
                status,
            });
        }

        for download in &detail.downloads {
            let file_name = download.local_name();
            let status = self
                .fetch_asset(item, &download.url, &item_dir.join(&file_name))
                .await;
            report.push(AssetResult {
                kind: AssetKind::Download,
                file_name,
                url: download.url.clone(),
                status,
            });
        }

        Ok(report)
    }

    async fn fetch_asset(&self, item: &CatalogItem, url: &str, destination: &Path) -> AssetStatus {
        let status = AssetStatus::from(self.fetcher.fetch(url, destination).await);
        if let AssetStatus::Failed(e) = &status {
            warn!(
                item_id = %item.id,
                url,
                path = %destination.display(),
                error = %e,
                "Asset download failed"
            );
        }
        status
    }
}
