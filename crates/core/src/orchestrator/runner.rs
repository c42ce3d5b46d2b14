//! Harvest orchestrator implementation.
//!
//! Wires configuration and the two remote seams into a `PageWalker` for one
//! collection at a time:
//! - Resolve the collection (folder name) for a target
//! - Create the collection directory and load its ledger
//! - Walk under a per-run tracing span

use std::sync::Arc;

use chrono::Utc;
use tracing::{info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::Config;
use crate::external_catalog::{CatalogApi, Collection, ListingQuery};
use crate::fetcher::{AssetFetcher, AssetSource};
use crate::ledger::Ledger;
use crate::processor::ItemProcessor;
use crate::shutdown::ShutdownSignal;
use crate::walker::PageWalker;

use super::types::{HarvestSummary, HarvestTarget, OrchestratorError};

/// The harvest orchestrator - owns the run lifecycle.
pub struct HarvestOrchestrator {
    config: Config,
    catalog: Arc<dyn CatalogApi>,
    fetcher: AssetFetcher,
    shutdown: ShutdownSignal,
}

impl HarvestOrchestrator {
    /// Create a new orchestrator.
    pub fn new(
        config: Config,
        catalog: Arc<dyn CatalogApi>,
        asset_source: Arc<dyn AssetSource>,
    ) -> Self {
        Self {
            config,
            catalog,
            fetcher: AssetFetcher::new(asset_source),
            shutdown: ShutdownSignal::new(),
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Handle used to request a graceful stop from elsewhere (e.g. a signal handler).
    pub fn shutdown_handle(&self) -> ShutdownSignal {
        self.shutdown.clone()
    }

    /// Request a graceful stop: in-flight items finish, nothing new starts.
    pub fn stop(&self) {
        info!("Stop requested, waiting for in-flight items");
        self.shutdown.trigger();
    }

    /// Remote display name of a category. Lookup errors are logged and yield `None`.
    pub async fn lookup_category_name(&self, category_id: u64) -> Option<String> {
        match self.catalog.category_name(category_id).await {
            Ok(Some(name)) if !name.trim().is_empty() => {
                info!(category_id, name = %name, "Resolved category name");
                Some(name)
            }
            Ok(_) => {
                warn!(category_id, "Category has no name");
                None
            }
            Err(e) => {
                warn!(category_id, error = %e, "Failed to look up category name");
                None
            }
        }
    }

    /// Turn an operator target into a collection.
    ///
    /// Categories use the explicit folder, else the remote name, else the
    /// numeric id. Searches are stored under the search name.
    pub async fn resolve_collection(&self, target: HarvestTarget) -> Collection {
        match target {
            HarvestTarget::Category {
                category_id,
                folder,
            } => {
                let folder = match folder.filter(|f| !f.trim().is_empty()) {
                    Some(folder) => folder,
                    None => self
                        .lookup_category_name(category_id)
                        .await
                        .unwrap_or_else(|| category_id.to_string()),
                };
                Collection::new(&folder, ListingQuery::Category { category_id })
            }
            HarvestTarget::Search { name } => {
                Collection::new(&name, ListingQuery::Search { name: name.clone() })
            }
        }
    }

    /// Harvest `collection` until the listing is exhausted or a stop is requested.
    pub async fn run(&self, collection: &Collection) -> Result<HarvestSummary, OrchestratorError> {
        let run_id = Uuid::new_v4();
        let span = info_span!("harvest", %run_id, collection = %collection.folder);
        self.run_inner(run_id, collection).instrument(span).await
    }

    async fn run_inner(
        &self,
        run_id: Uuid,
        collection: &Collection,
    ) -> Result<HarvestSummary, OrchestratorError> {
        let started_at = Utc::now();
        let collection_dir = collection.directory_in(&self.config.storage.root);

        tokio::fs::create_dir_all(&collection_dir)
            .await
            .map_err(|source| OrchestratorError::Io {
                path: collection_dir.clone(),
                source,
            })?;

        let ledger = Arc::new(Ledger::load(&collection_dir, &self.config.storage.ledger_file).await?);
        info!(
            query = %collection.query,
            path = %collection_dir.display(),
            committed = ledger.len().await,
            "Starting harvest"
        );

        let processor = ItemProcessor::new(Arc::clone(&self.catalog), self.fetcher.clone());
        let walker = PageWalker::new(
            Arc::clone(&self.catalog),
            processor,
            Arc::clone(&ledger),
            self.config.harvest.clone(),
            self.shutdown.clone(),
        );

        let walk = walker.walk(collection, &collection_dir).await;
        let ledger_entries = ledger.len().await;

        info!(
            committed = walk.items_committed,
            failed = walk.items_failed,
            withheld = walk.items_withheld,
            ledger_entries,
            "Harvest finished"
        );

        Ok(HarvestSummary {
            run_id,
            collection: collection.clone(),
            collection_dir,
            started_at,
            finished_at: Utc::now(),
            ledger_entries,
            walk,
        })
    }
}
