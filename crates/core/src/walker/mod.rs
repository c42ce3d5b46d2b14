//! Paginated listing walk.
//!
//! The walker fetches one listing page at a time, leaves out items already in
//! the ledger, and dispatches the rest to the `ItemProcessor` under a
//! semaphore bound. Every task of a page is joined before the next page is
//! requested, and committable items are appended to the ledger as soon as
//! they finish.

mod page_walker;
mod types;

pub use page_walker::PageWalker;
pub use types::{termination, StopReason, WalkSummary};
