mod args;
mod prompt;

use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use harvester_core::{
    load_config, load_default_config, metrics, validate_config, Config, GameBananaClient,
    HarvestOrchestrator, HarvestSummary, HarvestTarget, HttpAssetSource, ShutdownSignal,
};

use args::{Args, DEFAULT_CONFIG_FILE};
use prompt::TargetAnswer;

/// Exit status after a second Ctrl+C (128 + SIGINT).
const EXIT_INTERRUPTED: i32 = 130;

#[tokio::main]
async fn main() {
    if let Err(e) = run().await {
        error!("Fatal error: {:#}", e);
        std::process::exit(1);
    }
}

async fn run() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_json);

    let mut config = load_configuration(&args)?;
    args.apply_overrides(&mut config);
    validate_config(&config).context("Configuration validation failed")?;

    info!(
        root = %config.storage.root.display(),
        concurrency = config.harvest.max_concurrent_items,
        policy = ?config.harvest.partial_asset_policy,
        "Configuration loaded"
    );

    let catalog =
        GameBananaClient::new(&config.catalog).context("Failed to create catalog client")?;
    let asset_source = HttpAssetSource::new(catalog.http_client());
    let textfile = config.metrics.textfile.clone();

    let orchestrator = HarvestOrchestrator::new(config, Arc::new(catalog), Arc::new(asset_source));

    let target = match args.target() {
        Some(target) => target,
        None => prompt_target(&orchestrator).await?,
    };
    let collection = orchestrator.resolve_collection(target).await;

    spawn_interrupt_handler(orchestrator.shutdown_handle());

    let result = orchestrator.run(&collection).await;

    if let Some(path) = &textfile {
        write_metrics(path).await;
    }

    let summary = result.context("Harvest failed")?;
    log_summary(&summary);
    Ok(())
}

fn init_logging(json: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,reqwest=warn".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry.with(tracing_subscriber::fmt::layer().json()).init();
    } else {
        registry.with(tracing_subscriber::fmt::layer()).init();
    }
}

/// Explicit `--config`, else `harvester.toml` when present, else defaults and environment.
fn load_configuration(args: &Args) -> Result<Config> {
    let path = match &args.config {
        Some(path) => Some(path.as_path()),
        None => Some(Path::new(DEFAULT_CONFIG_FILE)).filter(|p| p.exists()),
    };

    match path {
        Some(path) => {
            info!("Loading configuration from {:?}", path);
            load_config(path).with_context(|| format!("Failed to load config from {:?}", path))
        }
        None => load_default_config().context("Failed to load default configuration"),
    }
}

async fn prompt_target(orchestrator: &HarvestOrchestrator) -> Result<HarvestTarget> {
    let category_id = match prompt::target().await? {
        TargetAnswer::Search(name) => return Ok(HarvestTarget::Search { name }),
        TargetAnswer::Category(id) => id,
    };
    let folder = match orchestrator.lookup_category_name(category_id).await {
        Some(name) => name,
        None => prompt::folder_name(category_id).await?,
    };
    Ok(HarvestTarget::Category {
        category_id,
        folder: Some(folder),
    })
}

/// First Ctrl+C asks for a graceful stop; the second exits immediately.
fn spawn_interrupt_handler(shutdown: ShutdownSignal) {
    tokio::spawn(async move {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
            return;
        }
        warn!("Interrupt received, finishing items in flight (Ctrl+C again to exit now)");
        shutdown.trigger();

        if signal::ctrl_c().await.is_ok() {
            error!("Second interrupt, exiting immediately");
            std::process::exit(EXIT_INTERRUPTED);
        }
    });
}

async fn write_metrics(path: &Path) {
    match metrics::write_textfile(path).await {
        Ok(()) => info!("Metrics written to {:?}", path),
        Err(e) => warn!("Failed to write metrics to {:?}: {}", path, e),
    }
}

fn log_summary(summary: &HarvestSummary) {
    let walk = &summary.walk;
    let elapsed = summary.finished_at - summary.started_at;
    info!(
        run_id = %summary.run_id,
        collection = %summary.collection.folder,
        stop_reason = ?walk.stop_reason,
        pages = walk.pages_scanned,
        listed = walk.items_listed,
        skipped = walk.items_skipped,
        committed = walk.items_committed,
        failed = walk.items_failed,
        withheld = walk.items_withheld,
        not_started = walk.items_cancelled,
        assets_downloaded = walk.assets_downloaded,
        assets_present = walk.assets_present,
        assets_failed = walk.assets_failed,
        bytes = walk.bytes_downloaded,
        elapsed_secs = elapsed.num_seconds(),
        "Run complete"
    );

    if summary.was_interrupted() {
        info!("Run was interrupted; the next run resumes from the ledger");
    } else if walk.stop_reason.is_some_and(|reason| !reason.is_exhausted()) {
        warn!("Listing was not read to the end; the next run continues from the ledger");
    }
}
