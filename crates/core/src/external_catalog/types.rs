//! Domain types produced by catalog clients.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::sanitize::sanitize_filename;

/// Opaque catalog item identifier, stable across requests.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl From<String> for ItemId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for ItemId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// An entry read from a listing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogItem {
    pub id: ItemId,
    /// Display title (also used to name the item directory).
    pub title: String,
}

impl CatalogItem {
    pub fn new(id: impl Into<ItemId>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
        }
    }

    /// Directory holding this item's summary and assets.
    pub fn directory_in(&self, collection_dir: &Path) -> PathBuf {
        collection_dir.join(sanitize_filename(&self.title))
    }
}

/// How a collection's items are enumerated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ListingQuery {
    /// Category index; accepts an explicit page size.
    Category { category_id: u64 },
    /// Name search over the game subfeed; the server picks the page size.
    Search { name: String },
}

impl fmt::Display for ListingQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Category { category_id } => write!(f, "category {}", category_id),
            Self::Search { name } => write!(f, "search \"{}\"", name),
        }
    }
}

/// A named collection being harvested: one ledger, one directory tree.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Collection {
    /// Folder name under the storage root (already sanitized).
    pub folder: String,
    pub query: ListingQuery,
}

impl Collection {
    pub fn new(folder: &str, query: ListingQuery) -> Self {
        Self {
            folder: sanitize_filename(folder),
            query,
        }
    }

    pub fn directory_in(&self, root: &Path) -> PathBuf {
        root.join(&self.folder)
    }
}

/// One page of listing results.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingPage {
    /// 1-based page index.
    pub page: u32,
    pub items: Vec<CatalogItem>,
    /// Records the server returned, including ones dropped for lacking an id.
    pub record_count: usize,
    /// Server-provided end-of-results flag, when the endpoint sends one.
    pub is_complete: Option<bool>,
    /// Page size requested from the server; `None` when the endpoint has no size parameter.
    pub requested_size: Option<u32>,
}

/// A preview image attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreviewAsset {
    pub base_url: String,
    pub file: String,
}

impl PreviewAsset {
    pub fn url(&self) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), self.file)
    }

    /// Extension of the remote file name including the dot, defaulting to `.jpg`.
    pub fn extension(&self) -> String {
        Path::new(&self.file)
            .extension()
            .and_then(|e| e.to_str())
            .filter(|e| !e.is_empty())
            .map(|e| format!(".{}", e))
            .unwrap_or_else(|| ".jpg".to_string())
    }

    /// Local file name for the preview at position `index`.
    pub fn local_name(&self, index: usize) -> String {
        format!("preview_{}{}", index, self.extension())
    }
}

/// A downloadable file attached to an item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DownloadAsset {
    pub url: String,
    pub file: String,
}

impl DownloadAsset {
    pub fn local_name(&self) -> String {
        sanitize_filename(&self.file)
    }
}

/// Full detail record for one item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDetail {
    pub id: ItemId,
    pub title: Option<String>,
    pub submitter: Option<String>,
    /// Raw description; may carry HTML markup.
    pub description: Option<String>,
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub like_count: u64,
    pub profile_url: Option<String>,
    #[serde(default)]
    pub previews: Vec<PreviewAsset>,
    #[serde(default)]
    pub downloads: Vec<DownloadAsset>,
}

impl ItemDetail {
    pub fn asset_count(&self) -> usize {
        self.previews.len() + self.downloads.len()
    }
}
