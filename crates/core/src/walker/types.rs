//! Walker types.

use std::fmt;

use serde::Serialize;

use crate::external_catalog::ListingPage;

/// Why a walk ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    /// The listing returned no items.
    EmptyPage,
    /// The server flagged the page as the last one.
    CompleteFlag,
    /// Fewer items than the requested page size.
    ShortPage,
    /// The listing request failed; treated as end of data.
    ListingFailed,
    /// A stop was requested.
    Cancelled,
    /// `harvest.max_pages` was reached.
    PageLimit,
}

impl StopReason {
    /// Whether the walk reached the end of the listing.
    pub fn is_exhausted(&self) -> bool {
        matches!(self, Self::EmptyPage | Self::CompleteFlag | Self::ShortPage)
    }
}

impl fmt::Display for StopReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::EmptyPage => "empty_page",
            Self::CompleteFlag => "complete_flag",
            Self::ShortPage => "short_page",
            Self::ListingFailed => "listing_failed",
            Self::Cancelled => "cancelled",
            Self::PageLimit => "page_limit",
        };
        f.write_str(s)
    }
}

/// End-of-listing signals carried by a page that has already been dispatched.
///
/// Each signal is checked on its own: the completeness flag ends the walk
/// regardless of size, and a short page ends it only when the endpoint
/// accepted a page size. Page size is compared against the raw record count,
/// so records dropped for lacking an id do not shorten a full page.
pub fn termination(page: &ListingPage) -> Option<StopReason> {
    if page.is_complete == Some(true) {
        return Some(StopReason::CompleteFlag);
    }
    match page.requested_size {
        Some(size) if page.record_count < size as usize => Some(StopReason::ShortPage),
        _ => None,
    }
}

/// Counters for one walk.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct WalkSummary {
    pub pages_scanned: u32,
    pub items_listed: usize,
    /// Already in the ledger.
    pub items_skipped: usize,
    /// Repeated ids within a single page.
    pub items_duplicate: usize,
    pub items_committed: usize,
    pub items_failed: usize,
    /// Processed but held back by the partial-asset policy.
    pub items_withheld: usize,
    /// Never started because a stop was requested.
    pub items_cancelled: usize,
    pub assets_downloaded: usize,
    pub assets_present: usize,
    pub assets_failed: usize,
    pub bytes_downloaded: u64,
    pub stop_reason: Option<StopReason>,
}
