//! Item processing.
//!
//! This module provides the `ItemProcessor` which, for one catalog item:
//! - Ensures the item directory exists
//! - Retrieves the detail record (the only step that can fail the item)
//! - Writes the one-time `info.txt` summary
//! - Downloads previews and files through the `AssetFetcher`
//!
//! The outcome is an `AssetReport`; whether it is committed to the ledger is
//! decided by the caller with `AssetReport::should_commit`.

mod item;
mod report;
mod summary;

pub use item::{ItemError, ItemProcessor};
pub use report::{AssetKind, AssetReport, AssetResult, AssetStatus};
pub use summary::{render_summary, write_summary, SUMMARY_FILE};
