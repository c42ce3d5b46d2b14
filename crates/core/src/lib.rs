pub mod config;
pub mod external_catalog;
pub mod fetcher;
pub mod ledger;
pub mod metrics;
pub mod orchestrator;
pub mod processor;
pub mod sanitize;
pub mod shutdown;
pub mod testing;
pub mod walker;

pub use config::{
    load_config, load_config_from_str, load_default_config, validate_config, CatalogConfig,
    Config, ConfigError, HarvestConfig, MetricsConfig, PartialAssetPolicy, StorageConfig,
};
pub use external_catalog::{
    CatalogApi, CatalogError, CatalogItem, Collection, GameBananaClient, ItemDetail, ItemId,
    ListingPage, ListingQuery,
};
pub use fetcher::{AssetFetcher, AssetSource, FetchError, FetchOutcome, HttpAssetSource};
pub use ledger::{Ledger, LedgerError};
pub use orchestrator::{HarvestOrchestrator, HarvestSummary, HarvestTarget, OrchestratorError};
pub use processor::{AssetReport, ItemError, ItemProcessor};
pub use shutdown::ShutdownSignal;
pub use walker::{PageWalker, StopReason, WalkSummary};
