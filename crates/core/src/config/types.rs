use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub catalog: CatalogConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub metrics: MetricsConfig,
}

/// Remote catalog API configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CatalogConfig {
    /// API base URL (e.g., "https://gamebanana.com/apiv11")
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,
    /// Game the listings are scoped to
    #[serde(default = "default_game_id")]
    pub game_id: u64,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            user_agent: default_user_agent(),
            timeout_secs: default_timeout(),
            game_id: default_game_id(),
        }
    }
}

fn default_base_url() -> String {
    "https://gamebanana.com/apiv11".to_string()
}

fn default_user_agent() -> String {
    format!(
        "Mozilla/5.0 (compatible; catalog-harvester/{})",
        env!("CARGO_PKG_VERSION")
    )
}

fn default_timeout() -> u64 {
    30
}

fn default_game_id() -> u64 {
    20357
}

/// Local storage configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory holding one sub-directory per collection
    #[serde(default = "default_root")]
    pub root: PathBuf,
    /// Name of the per-collection completion ledger
    #[serde(default = "default_ledger_file")]
    pub ledger_file: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: default_root(),
            ledger_file: default_ledger_file(),
        }
    }
}

fn default_root() -> PathBuf {
    PathBuf::from("GameBanana_Downloads")
}

fn default_ledger_file() -> String {
    "history.txt".to_string()
}

/// What to do with an item whose detail was fetched but some assets failed.
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PartialAssetPolicy {
    /// Record the item as complete anyway.
    #[default]
    Commit,
    /// Leave the item out of the ledger so the next run retries it.
    Retry,
}

/// Harvest scheduling configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct HarvestConfig {
    /// Maximum items processed concurrently within a page
    #[serde(default = "default_max_concurrent_items")]
    pub max_concurrent_items: usize,
    /// Page size requested from listing endpoints that accept one
    #[serde(default = "default_page_size")]
    pub page_size: u32,
    /// Pause between listing pages (milliseconds)
    #[serde(default = "default_page_delay")]
    pub page_delay_ms: u64,
    /// Commit policy for items with failed assets
    #[serde(default)]
    pub partial_asset_policy: PartialAssetPolicy,
    /// Stop after this many pages (unlimited when unset)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_pages: Option<u32>,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            max_concurrent_items: default_max_concurrent_items(),
            page_size: default_page_size(),
            page_delay_ms: default_page_delay(),
            partial_asset_policy: PartialAssetPolicy::default(),
            max_pages: None,
        }
    }
}

fn default_max_concurrent_items() -> usize {
    4
}

fn default_page_size() -> u32 {
    50
}

fn default_page_delay() -> u64 {
    1000
}

/// Metrics output configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct MetricsConfig {
    /// Write the Prometheus text exposition here when a run ends
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textfile: Option<PathBuf>,
}
