//! Remote catalog integration.
//!
//! This module defines the `CatalogApi` seam used by the harvest engine and
//! the GameBanana implementation of it.

mod gamebanana;
mod types;

pub use gamebanana::GameBananaClient;
pub use types::*;

use async_trait::async_trait;
use thiserror::Error;

/// Errors that can occur when interacting with the remote catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed before a response arrived (connect, DNS, timeout).
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// API answered with a non-success status.
    #[error("API error: {status} - {message}")]
    Status { status: u16, message: String },

    /// Failed to parse response.
    #[error("Failed to parse response: {0}")]
    Parse(String),
}

impl CatalogError {
    /// Status code for `Status` errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

/// Read-only access to a paginated remote catalog.
#[async_trait]
pub trait CatalogApi: Send + Sync {
    /// Fetch one listing page (1-based).
    async fn list_page(
        &self,
        query: &ListingQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, CatalogError>;

    /// Fetch the full detail record of an item.
    async fn get_detail(&self, id: &ItemId) -> Result<ItemDetail, CatalogError>;

    /// Look up the display name of a category, if it has one.
    async fn category_name(&self, category_id: u64) -> Result<Option<String>, CatalogError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_accessor() {
        let err = CatalogError::Status {
            status: 404,
            message: "not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert_eq!(err.to_string(), "API error: 404 - not found");

        let err = CatalogError::Parse("bad json".to_string());
        assert_eq!(err.status(), None);
    }
}
