use std::path::PathBuf;

use clap::Parser;

use harvester_core::{Config, HarvestTarget};

/// Config file picked up from the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "harvester.toml";

#[derive(Debug, Parser)]
#[command(name = "harvester")]
#[command(version)]
#[command(about = "Incrementally harvest a GameBanana mod catalog into a local directory")]
#[command(long_about = "\
Incrementally harvest a GameBanana mod catalog into a local directory

Every collection (a category or a name search) gets its own folder with a
history.txt ledger of finished items. Re-running the same command resumes
where the last run stopped and skips files that already exist.

Press Ctrl+C once to stop after the items in flight, twice to exit at once.")]
pub struct Args {
    /// Configuration file (TOML)
    #[arg(long, env = "HARVESTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Category id to harvest (a category id or search name is prompted for when no target is given)
    #[arg(long, conflicts_with = "search")]
    pub category: Option<u64>,

    /// Harvest items matching this name instead of a category
    #[arg(long)]
    pub search: Option<String>,

    /// Folder name for the category instead of its remote name
    #[arg(long, requires = "category")]
    pub folder: Option<String>,

    /// Storage root (overrides storage.root)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Items processed at once (overrides harvest.max_concurrent_items)
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Write Prometheus metrics here on exit (overrides metrics.textfile)
    #[arg(long)]
    pub metrics_file: Option<PathBuf>,

    /// Emit logs as JSON lines
    #[arg(long)]
    pub log_json: bool,
}

impl Args {
    /// Apply command-line overrides on top of file and environment values.
    pub fn apply_overrides(&self, config: &mut Config) {
        if let Some(root) = &self.root {
            config.storage.root = root.clone();
        }
        if let Some(concurrency) = self.concurrency {
            config.harvest.max_concurrent_items = concurrency;
        }
        if let Some(path) = &self.metrics_file {
            config.metrics.textfile = Some(path.clone());
        }
    }

    /// Target given on the command line, if any.
    pub fn target(&self) -> Option<HarvestTarget> {
        if let Some(name) = &self.search {
            return Some(HarvestTarget::Search { name: name.clone() });
        }
        self.category.map(|category_id| HarvestTarget::Category {
            category_id,
            folder: self.folder.clone(),
        })
    }
}
