//! Mock catalog API for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::external_catalog::{
    CatalogApi, CatalogError, CatalogItem, ItemDetail, ItemId, ListingPage, ListingQuery,
};

/// A recorded catalog request for test assertions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCatalogQuery {
    ListPage {
        query: ListingQuery,
        page: u32,
        page_size: u32,
    },
    GetDetail {
        id: ItemId,
    },
    CategoryName {
        category_id: u64,
    },
}

/// Mock implementation of the `CatalogApi` trait.
///
/// Provides controllable behavior for testing:
/// - Serve configured listing pages and detail records
/// - Simulate listing, detail and lookup failures
/// - Track requests and detail concurrency for assertions
///
/// # Example
///
/// ```rust,ignore
/// use harvester_core::testing::{MockCatalog, fixtures};
///
/// let catalog = MockCatalog::new();
/// catalog.set_pages(vec![fixtures::catalog_items(1..=3)]).await;
/// catalog.add_detail(fixtures::item_detail(1, "Mod 1")).await;
/// ```
#[derive(Debug)]
pub struct MockCatalog {
    /// Listing pages, index 0 is page 1. Pages past the end are empty.
    pages: Arc<RwLock<Vec<Vec<CatalogItem>>>>,
    /// Extra records without an id, by page.
    unusable_records: Arc<RwLock<HashMap<u32, usize>>>,
    /// Whether listing pages echo the requested page size.
    echo_page_size: Arc<RwLock<bool>>,
    /// Page whose response carries the completeness flag.
    complete_at: Arc<RwLock<Option<u32>>>,
    /// Page whose request fails, with the status to answer.
    failing_page: Arc<RwLock<Option<(u32, u16)>>>,
    /// Detail records by id.
    details: Arc<RwLock<HashMap<ItemId, ItemDetail>>>,
    /// Detail requests answered with an error status.
    failing_details: Arc<RwLock<HashMap<ItemId, u16>>>,
    /// Category names by id.
    category_names: Arc<RwLock<HashMap<u64, String>>>,
    /// If set, category lookups fail with this status.
    category_error: Arc<RwLock<Option<u16>>>,
    /// Artificial latency of each detail request.
    detail_delay: Arc<RwLock<Duration>>,
    in_flight: Arc<AtomicUsize>,
    max_in_flight: Arc<AtomicUsize>,
    /// Recorded requests.
    queries: Arc<RwLock<Vec<RecordedCatalogQuery>>>,
}

impl Default for MockCatalog {
    fn default() -> Self {
        Self::new()
    }
}

impl MockCatalog {
    /// Create a new empty mock catalog.
    pub fn new() -> Self {
        Self {
            pages: Arc::new(RwLock::new(Vec::new())),
            unusable_records: Arc::new(RwLock::new(HashMap::new())),
            echo_page_size: Arc::new(RwLock::new(true)),
            complete_at: Arc::new(RwLock::new(None)),
            failing_page: Arc::new(RwLock::new(None)),
            details: Arc::new(RwLock::new(HashMap::new())),
            failing_details: Arc::new(RwLock::new(HashMap::new())),
            category_names: Arc::new(RwLock::new(HashMap::new())),
            category_error: Arc::new(RwLock::new(None)),
            detail_delay: Arc::new(RwLock::new(Duration::ZERO)),
            in_flight: Arc::new(AtomicUsize::new(0)),
            max_in_flight: Arc::new(AtomicUsize::new(0)),
            queries: Arc::new(RwLock::new(Vec::new())),
        }
    }

    // =========================================================================
    // Listing Configuration
    // =========================================================================

    /// Replace the listing pages.
    pub async fn set_pages(&self, pages: Vec<Vec<CatalogItem>>) {
        *self.pages.write().await = pages;
    }

    /// Report `count` extra records on `page` that carry no usable id.
    pub async fn set_unusable_records(&self, page: u32, count: usize) {
        self.unusable_records.write().await.insert(page, count);
    }

    /// Behave like an endpoint without a page-size parameter.
    pub async fn set_echo_page_size(&self, echo: bool) {
        *self.echo_page_size.write().await = echo;
    }

    /// Mark `page` as the last one via the completeness flag.
    pub async fn set_complete_at(&self, page: u32) {
        *self.complete_at.write().await = Some(page);
    }

    /// Make the request for `page` fail with `status`.
    pub async fn fail_page(&self, page: u32, status: u16) {
        *self.failing_page.write().await = Some((page, status));
    }

    // =========================================================================
    // Detail Configuration
    // =========================================================================

    /// Add a detail record.
    pub async fn add_detail(&self, detail: ItemDetail) {
        self.details.write().await.insert(detail.id.clone(), detail);
    }

    /// Make detail requests for `id` fail with `status`.
    pub async fn fail_detail(&self, id: impl Into<ItemId>, status: u16) {
        self.failing_details.write().await.insert(id.into(), status);
    }

    /// Clear detail failures.
    pub async fn clear_detail_failures(&self) {
        self.failing_details.write().await.clear();
    }

    /// Delay every detail response by `delay`.
    pub async fn set_detail_delay(&self, delay: Duration) {
        *self.detail_delay.write().await = delay;
    }

    // =========================================================================
    // Category Configuration
    // =========================================================================

    pub async fn set_category_name(&self, category_id: u64, name: &str) {
        self.category_names
            .write()
            .await
            .insert(category_id, name.to_string());
    }

    /// Make category lookups fail with `status`.
    pub async fn fail_category_lookup(&self, status: u16) {
        *self.category_error.write().await = Some(status);
    }

    // =========================================================================
    // Query Recording
    // =========================================================================

    /// Get all recorded requests.
    pub async fn recorded_queries(&self) -> Vec<RecordedCatalogQuery> {
        self.queries.read().await.clone()
    }

    /// Page numbers requested from the listing endpoint, in order.
    pub async fn listing_requests(&self) -> Vec<u32> {
        self.queries
            .read()
            .await
            .iter()
            .filter_map(|q| match q {
                RecordedCatalogQuery::ListPage { page, .. } => Some(*page),
                _ => None,
            })
            .collect()
    }

    /// Ids whose detail was requested, in request order.
    pub async fn detail_requests(&self) -> Vec<ItemId> {
        self.queries
            .read()
            .await
            .iter()
            .filter_map(|q| match q {
                RecordedCatalogQuery::GetDetail { id } => Some(id.clone()),
                _ => None,
            })
            .collect()
    }

    /// Number of detail requests made for `id`.
    pub async fn detail_request_count(&self, id: impl Into<ItemId>) -> usize {
        let id = id.into();
        self.detail_requests()
            .await
            .iter()
            .filter(|requested| **requested == id)
            .count()
    }

    /// Clear recorded requests.
    pub async fn clear_recorded(&self) {
        self.queries.write().await.clear();
    }

    /// Highest number of detail requests observed in flight at once.
    pub fn max_concurrent_details(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Record a request.
    async fn record(&self, query: RecordedCatalogQuery) {
        self.queries.write().await.push(query);
    }
}

#[async_trait]
impl CatalogApi for MockCatalog {
    async fn list_page(
        &self,
        query: &ListingQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, CatalogError> {
        self.record(RecordedCatalogQuery::ListPage {
            query: query.clone(),
            page,
            page_size,
        })
        .await;

        if let Some((failing, status)) = *self.failing_page.read().await {
            if failing == page {
                return Err(CatalogError::Status {
                    status,
                    message: format!("listing page {} unavailable", page),
                });
            }
        }

        let items = self
            .pages
            .read()
            .await
            .get(page.saturating_sub(1) as usize)
            .cloned()
            .unwrap_or_default();
        let unusable = self
            .unusable_records
            .read()
            .await
            .get(&page)
            .copied()
            .unwrap_or(0);
        let is_complete = self.complete_at.read().await.map(|last| last == page);
        let requested_size = self.echo_page_size.read().await.then_some(page_size);

        Ok(ListingPage {
            page,
            record_count: items.len() + unusable,
            items,
            is_complete,
            requested_size,
        })
    }

    async fn get_detail(&self, id: &ItemId) -> Result<ItemDetail, CatalogError> {
        self.record(RecordedCatalogQuery::GetDetail { id: id.clone() })
            .await;

        let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(current, Ordering::SeqCst);

        let delay = *self.detail_delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let result = if let Some(status) = self.failing_details.read().await.get(id) {
            Err(CatalogError::Status {
                status: *status,
                message: format!("detail {} unavailable", id),
            })
        } else {
            self.details
                .read()
                .await
                .get(id)
                .cloned()
                .ok_or_else(|| CatalogError::Status {
                    status: 404,
                    message: format!("item {} not found", id),
                })
        };

        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }

    async fn category_name(&self, category_id: u64) -> Result<Option<String>, CatalogError> {
        self.record(RecordedCatalogQuery::CategoryName { category_id })
            .await;

        if let Some(status) = *self.category_error.read().await {
            return Err(CatalogError::Status {
                status,
                message: "category lookup failed".to_string(),
            });
        }

        Ok(self.category_names.read().await.get(&category_id).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn category() -> ListingQuery {
        ListingQuery::Category { category_id: 7 }
    }

    #[tokio::test]
    async fn test_pages_past_the_end_are_empty() {
        let catalog = MockCatalog::new();
        catalog
            .set_pages(vec![fixtures::catalog_items(1..=2)])
            .await;

        let first = catalog.list_page(&category(), 1, 50).await.unwrap();
        assert_eq!(first.items.len(), 2);
        assert_eq!(first.requested_size, Some(50));
        assert_eq!(first.is_complete, None);

        let second = catalog.list_page(&category(), 2, 50).await.unwrap();
        assert!(second.items.is_empty());
        assert_eq!(catalog.listing_requests().await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_complete_flag_and_page_size_echo() {
        let catalog = MockCatalog::new();
        catalog.set_complete_at(2).await;
        catalog.set_echo_page_size(false).await;

        let page = catalog.list_page(&category(), 1, 50).await.unwrap();
        assert_eq!(page.is_complete, Some(false));
        assert_eq!(page.requested_size, None);

        let page = catalog.list_page(&category(), 2, 50).await.unwrap();
        assert_eq!(page.is_complete, Some(true));
    }

    #[tokio::test]
    async fn test_failing_page() {
        let catalog = MockCatalog::new();
        catalog.fail_page(3, 503).await;

        let err = catalog.list_page(&category(), 3, 50).await.unwrap_err();
        assert_eq!(err.status(), Some(503));
    }

    #[tokio::test]
    async fn test_detail_lookup_and_failures() {
        let catalog = MockCatalog::new();
        catalog.add_detail(fixtures::item_detail(1, "One")).await;
        catalog.fail_detail(2u64, 500).await;

        let detail = catalog.get_detail(&ItemId::from(1u64)).await.unwrap();
        assert_eq!(detail.title.as_deref(), Some("One"));

        let err = catalog.get_detail(&ItemId::from(2u64)).await.unwrap_err();
        assert_eq!(err.status(), Some(500));

        let err = catalog.get_detail(&ItemId::from(3u64)).await.unwrap_err();
        assert_eq!(err.status(), Some(404));

        assert_eq!(catalog.detail_request_count(1u64).await, 1);
        assert_eq!(catalog.max_concurrent_details(), 1);
    }

    #[tokio::test]
    async fn test_category_lookup() {
        let catalog = MockCatalog::new();
        catalog.set_category_name(7, "Characters").await;

        assert_eq!(
            catalog.category_name(7).await.unwrap().as_deref(),
            Some("Characters")
        );
        assert_eq!(catalog.category_name(8).await.unwrap(), None);

        catalog.fail_category_lookup(500).await;
        assert!(catalog.category_name(7).await.is_err());
    }
}
