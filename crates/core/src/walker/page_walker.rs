//! Page walker implementation.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

use crate::config::{HarvestConfig, PartialAssetPolicy};
use crate::external_catalog::{CatalogApi, CatalogItem, Collection, ListingPage};
use crate::ledger::Ledger;
use crate::metrics;
use crate::processor::{AssetReport, ItemProcessor};
use crate::shutdown::ShutdownSignal;

use super::types::{termination, StopReason, WalkSummary};

/// What happened to one dispatched item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ItemOutcome {
    Committed,
    Withheld,
    Failed,
    Cancelled,
}

impl ItemOutcome {
    fn label(&self) -> &'static str {
        match self {
            Self::Committed => "committed",
            Self::Withheld => "withheld",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        }
    }
}

struct ItemTaskResult {
    outcome: ItemOutcome,
    report: Option<AssetReport>,
}

impl ItemTaskResult {
    fn without_report(outcome: ItemOutcome) -> Self {
        Self {
            outcome,
            report: None,
        }
    }
}

/// Everything a spawned item task needs, cheap to clone.
#[derive(Clone)]
struct ItemTaskContext {
    processor: ItemProcessor,
    ledger: Arc<Ledger>,
    semaphore: Arc<Semaphore>,
    shutdown: ShutdownSignal,
    collection_dir: PathBuf,
    policy: PartialAssetPolicy,
}

/// Walks a collection's listing page by page.
pub struct PageWalker {
    catalog: Arc<dyn CatalogApi>,
    processor: ItemProcessor,
    ledger: Arc<Ledger>,
    config: HarvestConfig,
    shutdown: ShutdownSignal,
}

impl PageWalker {
    pub fn new(
        catalog: Arc<dyn CatalogApi>,
        processor: ItemProcessor,
        ledger: Arc<Ledger>,
        config: HarvestConfig,
        shutdown: ShutdownSignal,
    ) -> Self {
        Self {
            catalog,
            processor,
            ledger,
            config,
            shutdown,
        }
    }

    /// Walk `collection` until a stop condition, storing items under `collection_dir`.
    ///
    /// Listing failures end the walk and are reported through the summary's
    /// stop reason, never as an error.
    pub async fn walk(&self, collection: &Collection, collection_dir: &Path) -> WalkSummary {
        let mut summary = WalkSummary::default();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrent_items.max(1)));
        let mut page = 1u32;

        let stop_reason = loop {
            if self.shutdown.is_triggered() {
                break StopReason::Cancelled;
            }
            if self.config.max_pages.is_some_and(|max| page > max) {
                break StopReason::PageLimit;
            }

            let listing = match self
                .catalog
                .list_page(&collection.query, page, self.config.page_size)
                .await
            {
                Ok(listing) => listing,
                Err(e) => {
                    warn!(
                        page,
                        status = ?e.status(),
                        error = %e,
                        "Listing request failed, treating as end of data"
                    );
                    break StopReason::ListingFailed;
                }
            };

            metrics::PAGES_SCANNED.inc();
            summary.pages_scanned += 1;

            if listing.record_count == 0 {
                info!(page, "Listing page is empty");
                break StopReason::EmptyPage;
            }

            self.dispatch_page(&listing, &semaphore, collection_dir, &mut summary)
                .await;

            if let Some(reason) = termination(&listing) {
                debug!(page, %reason, "Listing exhausted");
                break reason;
            }
            if self.config.max_pages.is_some_and(|max| page >= max) {
                break StopReason::PageLimit;
            }

            page += 1;

            if self.config.page_delay_ms > 0 {
                tokio::select! {
                    _ = self.shutdown.triggered() => break StopReason::Cancelled,
                    _ = tokio::time::sleep(Duration::from_millis(self.config.page_delay_ms)) => {}
                }
            }
        };

        info!(
            %stop_reason,
            pages = summary.pages_scanned,
            committed = summary.items_committed,
            failed = summary.items_failed,
            skipped = summary.items_skipped,
            "Walk finished"
        );
        summary.stop_reason = Some(stop_reason);
        summary
    }

    /// Dispatch every new item of `listing` and wait for all of them.
    async fn dispatch_page(
        &self,
        listing: &ListingPage,
        semaphore: &Arc<Semaphore>,
        collection_dir: &Path,
        summary: &mut WalkSummary,
    ) {
        summary.items_listed += listing.items.len();

        let mut seen_in_page = HashSet::new();
        let mut pending: Vec<CatalogItem> = Vec::new();
        for item in &listing.items {
            if !seen_in_page.insert(item.id.clone()) {
                debug!(item_id = %item.id, "Duplicate id within page");
                summary.items_duplicate += 1;
                continue;
            }
            if self.ledger.contains(&item.id).await {
                summary.items_skipped += 1;
                metrics::ITEMS_TOTAL.with_label_values(&["skipped"]).inc();
                continue;
            }
            pending.push(item.clone());
        }

        info!(
            page = listing.page,
            listed = listing.items.len(),
            pending = pending.len(),
            "Scanning page"
        );

        let ctx = ItemTaskContext {
            processor: self.processor.clone(),
            ledger: Arc::clone(&self.ledger),
            semaphore: Arc::clone(semaphore),
            shutdown: self.shutdown.clone(),
            collection_dir: collection_dir.to_path_buf(),
            policy: self.config.partial_asset_policy,
        };

        let mut tasks = JoinSet::new();
        for item in pending {
            tasks.spawn(run_item(ctx.clone(), item));
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(result) => tally(summary, result),
                Err(e) => {
                    error!("Item task panicked: {}", e);
                    summary.items_failed += 1;
                    metrics::ITEMS_TOTAL.with_label_values(&["failed"]).inc();
                }
            }
        }
    }
}

async fn run_item(ctx: ItemTaskContext, item: CatalogItem) -> ItemTaskResult {
    let Ok(_permit) = ctx.semaphore.acquire_owned().await else {
        return ItemTaskResult::without_report(ItemOutcome::Cancelled);
    };
    if ctx.shutdown.is_triggered() {
        debug!(item_id = %item.id, "Stop requested, not starting item");
        return ItemTaskResult::without_report(ItemOutcome::Cancelled);
    }

    let started = Instant::now();
    info!(item_id = %item.id, title = %item.title, "Processing item");

    let result = match ctx.processor.process(&item, &ctx.collection_dir).await {
        Err(e) => {
            warn!(item_id = %item.id, error = %e, "Item failed");
            ItemTaskResult::without_report(ItemOutcome::Failed)
        }
        Ok(report) if !report.should_commit(ctx.policy) => {
            info!(
                item_id = %item.id,
                failed_assets = report.failed(),
                "Item withheld from ledger, will retry next run"
            );
            ItemTaskResult {
                outcome: ItemOutcome::Withheld,
                report: Some(report),
            }
        }
        Ok(report) => {
            let outcome = match ctx.ledger.append(&item.id).await {
                Ok(_) => {
                    info!(
                        item_id = %item.id,
                        downloaded = report.downloaded(),
                        present = report.present(),
                        failed = report.failed(),
                        "Item committed"
                    );
                    ItemOutcome::Committed
                }
                Err(e) => {
                    error!(item_id = %item.id, error = %e, "Failed to record item in ledger");
                    ItemOutcome::Failed
                }
            };
            ItemTaskResult {
                outcome,
                report: Some(report),
            }
        }
    };

    metrics::ITEM_DURATION
        .with_label_values(&[result.outcome.label()])
        .observe(started.elapsed().as_secs_f64());
    result
}

fn tally(summary: &mut WalkSummary, result: ItemTaskResult) {
    metrics::ITEMS_TOTAL
        .with_label_values(&[result.outcome.label()])
        .inc();

    match result.outcome {
        ItemOutcome::Committed => summary.items_committed += 1,
        ItemOutcome::Withheld => summary.items_withheld += 1,
        ItemOutcome::Failed => summary.items_failed += 1,
        ItemOutcome::Cancelled => summary.items_cancelled += 1,
    }

    if let Some(report) = result.report {
        summary.assets_downloaded += report.downloaded();
        summary.assets_present += report.present();
        summary.assets_failed += report.failed();
        summary.bytes_downloaded += report.bytes_downloaded();
    }
}
