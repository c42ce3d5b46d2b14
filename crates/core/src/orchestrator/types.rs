//! Types for the harvest orchestrator.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

use crate::external_catalog::Collection;
use crate::walker::{StopReason, WalkSummary};

/// Errors that abort a run before or around the walk.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// The collection directory could not be created.
    #[error("I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The ledger could not be read.
    #[error("ledger error: {0}")]
    Ledger(#[from] crate::ledger::LedgerError),
}

/// What the operator asked to harvest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HarvestTarget {
    /// A category, optionally stored under an explicit folder name.
    Category {
        category_id: u64,
        folder: Option<String>,
    },
    /// Items matching a name search.
    Search { name: String },
}

/// Result of one `run`.
#[derive(Debug, Clone, Serialize)]
pub struct HarvestSummary {
    pub run_id: Uuid,
    pub collection: Collection,
    pub collection_dir: PathBuf,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    /// Ledger size when the run ended.
    pub ledger_entries: usize,
    #[serde(flatten)]
    pub walk: WalkSummary,
}

impl HarvestSummary {
    pub fn stop_reason(&self) -> Option<StopReason> {
        self.walk.stop_reason
    }

    /// Whether the run ended because a stop was requested.
    pub fn was_interrupted(&self) -> bool {
        self.walk.stop_reason == Some(StopReason::Cancelled)
    }
}
