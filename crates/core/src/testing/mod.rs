//! Testing utilities and mock implementations.
//!
//! This module provides mock implementations of the remote seams (catalog
//! API and asset source), allowing complete harvest runs against a temporary
//! directory without any network.
//!
//! # Example
//!
//! ```rust,ignore
//! use harvester_core::testing::{fixtures, MockAssetSource, MockCatalog};
//!
//! let catalog = MockCatalog::new();
//! let assets = MockAssetSource::new();
//!
//! let detail = fixtures::item_detail_with_assets(1, "Mod 1", 1, 2);
//! catalog.set_pages(vec![vec![fixtures::catalog_item(1, "Mod 1")]]).await;
//! assets.serve_detail(&detail).await;
//! catalog.add_detail(detail).await;
//! ```

mod mock_asset_source;
mod mock_catalog;

pub use mock_asset_source::{MockAssetResponse, MockAssetSource};
pub use mock_catalog::{MockCatalog, RecordedCatalogQuery};

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::ops::RangeInclusive;

    use chrono::{TimeZone, Utc};

    use crate::external_catalog::{CatalogItem, DownloadAsset, ItemDetail, ItemId, PreviewAsset};

    /// Base URL preview fixtures are served from.
    pub const PREVIEW_BASE_URL: &str = "https://images.example.com/ss/mods";

    /// Create a listing entry.
    pub fn catalog_item(id: u64, title: &str) -> CatalogItem {
        CatalogItem::new(id, title)
    }

    /// Listing entries titled `Mod <id>` for each id in `ids`.
    pub fn catalog_items(ids: RangeInclusive<u64>) -> Vec<CatalogItem> {
        ids.map(|id| catalog_item(id, &format!("Mod {}", id))).collect()
    }

    /// Create a detail record without assets.
    pub fn item_detail(id: u64, title: &str) -> ItemDetail {
        ItemDetail {
            id: ItemId::from(id),
            title: Some(title.to_string()),
            submitter: Some("tester".to_string()),
            description: Some(format!("<p>About {}</p><br>Enjoy!", title)),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).single(),
            like_count: 42,
            profile_url: Some(format!("https://gamebanana.com/mods/{}", id)),
            previews: Vec::new(),
            downloads: Vec::new(),
        }
    }

    /// Create a detail record with `previews` preview images and `downloads` files.
    pub fn item_detail_with_assets(
        id: u64,
        title: &str,
        previews: usize,
        downloads: usize,
    ) -> ItemDetail {
        let mut detail = item_detail(id, title);
        detail.previews = (0..previews)
            .map(|i| preview_asset(&format!("{}_{}.png", id, i)))
            .collect();
        detail.downloads = (0..downloads)
            .map(|i| download_asset(&format!("{}-{}", id, i), &format!("mod_{}_{}.zip", id, i)))
            .collect();
        detail
    }

    pub fn preview_asset(file: &str) -> PreviewAsset {
        PreviewAsset {
            base_url: PREVIEW_BASE_URL.to_string(),
            file: file.to_string(),
        }
    }

    /// A download served at `https://files.example.com/dl/<key>`.
    pub fn download_asset(key: &str, file: &str) -> DownloadAsset {
        DownloadAsset {
            url: format!("https://files.example.com/dl/{}", key),
            file: file.to_string(),
        }
    }
}
