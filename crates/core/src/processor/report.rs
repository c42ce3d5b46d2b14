//! Per-item aggregation of asset outcomes.

use crate::config::PartialAssetPolicy;
use crate::external_catalog::ItemId;
use crate::fetcher::{FetchError, FetchOutcome};

/// Which list of the detail record an asset came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Preview,
    Download,
}

/// Outcome of one asset.
#[derive(Debug)]
pub enum AssetStatus {
    Downloaded { bytes: u64 },
    AlreadyPresent,
    Failed(FetchError),
}

impl From<Result<FetchOutcome, FetchError>> for AssetStatus {
    fn from(result: Result<FetchOutcome, FetchError>) -> Self {
        match result {
            Ok(FetchOutcome::Downloaded { bytes }) => Self::Downloaded { bytes },
            Ok(FetchOutcome::AlreadyPresent) => Self::AlreadyPresent,
            Err(e) => Self::Failed(e),
        }
    }
}

#[derive(Debug)]
pub struct AssetResult {
    pub kind: AssetKind,
    /// Local file name inside the item directory.
    pub file_name: String,
    pub url: String,
    pub status: AssetStatus,
}

/// Everything that happened to one item's assets.
#[derive(Debug)]
pub struct AssetReport {
    pub item_id: ItemId,
    pub assets: Vec<AssetResult>,
}

impl AssetReport {
    pub fn new(item_id: ItemId) -> Self {
        Self {
            item_id,
            assets: Vec::new(),
        }
    }

    pub fn push(&mut self, result: AssetResult) {
        self.assets.push(result);
    }

    pub fn downloaded(&self) -> usize {
        self.count(|s| matches!(s, AssetStatus::Downloaded { .. }))
    }

    pub fn present(&self) -> usize {
        self.count(|s| matches!(s, AssetStatus::AlreadyPresent))
    }

    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, AssetStatus::Failed(_)))
    }

    pub fn bytes_downloaded(&self) -> u64 {
        self.assets
            .iter()
            .map(|a| match a.status {
                AssetStatus::Downloaded { bytes } => bytes,
                _ => 0,
            })
            .sum()
    }

    /// True when no asset failed (including when there were none).
    pub fn is_complete(&self) -> bool {
        self.failed() == 0
    }

    /// Whether the item may be recorded in the ledger under `policy`.
    pub fn should_commit(&self, policy: PartialAssetPolicy) -> bool {
        match policy {
            PartialAssetPolicy::Commit => true,
            PartialAssetPolicy::Retry => self.is_complete(),
        }
    }

    fn count(&self, pred: impl Fn(&AssetStatus) -> bool) -> usize {
        self.assets.iter().filter(|a| pred(&a.status)).count()
    }
}
