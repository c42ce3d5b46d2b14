//! Harvest orchestrator.
//!
//! The orchestrator owns one run:
//! - **Resolve**: map a category or search target to a collection folder
//! - **Prepare**: create the collection directory and load its ledger
//! - **Walk**: drive the `PageWalker` until the listing ends or a stop is requested
//!
//! Cancellation is cooperative through the `ShutdownSignal` returned by
//! `shutdown_handle`.

mod runner;
mod types;

pub use runner::HarvestOrchestrator;
pub use types::{HarvestSummary, HarvestTarget, OrchestratorError};
