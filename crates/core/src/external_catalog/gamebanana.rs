//! GameBanana `apiv11` client.
//!
//! Listing endpoints:
//! - `Mod/Index` filtered by category, accepts `_nPerpage`
//! - `Game/{id}/Subfeed` filtered by name, server-chosen page size

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

use crate::config::CatalogConfig;

use super::types::{
    CatalogItem, DownloadAsset, ItemDetail, ItemId, ListingPage, ListingQuery, PreviewAsset,
};
use super::{CatalogApi, CatalogError};

/// Properties requested for item details.
const DETAIL_PROPERTIES: &str =
    "_aFiles,_aPreviewMedia,_sText,_sName,_nLikeCount,_tsDateAdded,_aSubmitter,_sProfileUrl";

/// Longest error body kept in `CatalogError::Status`.
const MAX_ERROR_BODY: usize = 512;

/// GameBanana API client.
#[derive(Debug, Clone)]
pub struct GameBananaClient {
    client: Client,
    base_url: String,
    game_id: u64,
}

impl GameBananaClient {
    /// Create a new client from catalog configuration.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            game_id: config.game_id,
        })
    }

    /// The underlying HTTP client (shares User-Agent and timeout settings).
    pub fn http_client(&self) -> Client {
        self.client.clone()
    }

    /// URL, query parameters and effective page size for a listing request.
    fn listing_request(
        &self,
        query: &ListingQuery,
        page: u32,
        page_size: u32,
    ) -> (String, Vec<(String, String)>, Option<u32>) {
        match query {
            ListingQuery::Category { category_id } => (
                format!("{}/Mod/Index", self.base_url),
                vec![
                    ("_idGameRow".to_string(), self.game_id.to_string()),
                    (
                        "_aFilters[Generic_Category]".to_string(),
                        category_id.to_string(),
                    ),
                    ("_nPage".to_string(), page.to_string()),
                    ("_nPerpage".to_string(), page_size.to_string()),
                ],
                Some(page_size),
            ),
            ListingQuery::Search { name } => (
                format!("{}/Game/{}/Subfeed", self.base_url, self.game_id),
                vec![
                    ("_nPage".to_string(), page.to_string()),
                    ("_sSort".to_string(), "new".to_string()),
                    ("_sName".to_string(), name.clone()),
                    ("_csvModelInclusions".to_string(), "Mod".to_string()),
                ],
                None,
            ),
        }
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        params: &[(String, String)],
    ) -> Result<T, CatalogError> {
        let response = self.client.get(url).query(params).send().await?;

        let status = response.status();
        if !status.is_success() {
            let mut body = response.text().await.unwrap_or_default();
            if body.len() > MAX_ERROR_BODY {
                let mut cut = MAX_ERROR_BODY;
                while !body.is_char_boundary(cut) {
                    cut -= 1;
                }
                body.truncate(cut);
            }
            return Err(CatalogError::Status {
                status: status.as_u16(),
                message: body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(format!("{}: {}", url, e)))
    }
}

#[async_trait]
impl CatalogApi for GameBananaClient {
    async fn list_page(
        &self,
        query: &ListingQuery,
        page: u32,
        page_size: u32,
    ) -> Result<ListingPage, CatalogError> {
        let (url, params, requested_size) = self.listing_request(query, page, page_size);
        debug!(%query, page, "GameBanana listing request");

        let response: GbListResponse = self.get_json(&url, &params).await?;
        Ok(response.into_page(page, requested_size))
    }

    async fn get_detail(&self, id: &ItemId) -> Result<ItemDetail, CatalogError> {
        let url = format!("{}/Mod/{}", self.base_url, id);
        let params = [("_csvProperties".to_string(), DETAIL_PROPERTIES.to_string())];
        debug!(item_id = %id, "GameBanana detail request");

        let detail: GbDetail = self.get_json(&url, &params).await?;
        Ok(detail.into_detail(id.clone()))
    }

    async fn category_name(&self, category_id: u64) -> Result<Option<String>, CatalogError> {
        let url = format!("{}/ModCategory/{}", self.base_url, category_id);
        let params = [("_csvProperties".to_string(), "_sName".to_string())];

        let category: GbCategory = self.get_json(&url, &params).await?;
        Ok(category.name.filter(|n| !n.trim().is_empty()))
    }
}

// ============================================================================
// GameBanana API Response Types (private)
// ============================================================================

#[derive(Debug, Deserialize)]
struct GbListResponse {
    #[serde(rename = "_aRecords", default)]
    records: Vec<GbRecord>,
    #[serde(rename = "_aMetadata", default)]
    metadata: Option<GbMetadata>,
}

#[derive(Debug, Deserialize)]
struct GbRecord {
    #[serde(rename = "_idRow", default)]
    id: Option<serde_json::Value>,
    #[serde(rename = "_sName", default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GbMetadata {
    #[serde(rename = "_bIsComplete", default)]
    is_complete: Option<bool>,
}

#[derive(Debug, Deserialize)]
struct GbCategory {
    #[serde(rename = "_sName", default)]
    name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GbDetail {
    #[serde(rename = "_sName", default)]
    name: Option<String>,
    #[serde(rename = "_aSubmitter", default)]
    submitter: Option<GbSubmitter>,
    #[serde(rename = "_sText", default)]
    text: Option<String>,
    #[serde(rename = "_nLikeCount", default)]
    like_count: Option<u64>,
    #[serde(rename = "_tsDateAdded", default)]
    date_added: Option<i64>,
    #[serde(rename = "_sProfileUrl", default)]
    profile_url: Option<String>,
    #[serde(rename = "_aPreviewMedia", default)]
    preview_media: Option<GbPreviewMedia>,
    #[serde(rename = "_aFiles", default)]
    files: Option<Vec<GbFile>>,
}

#[derive(Debug, Deserialize)]
struct GbSubmitter {
    #[serde(rename = "_sName", default)]
    name: Option<String>,
}

/// `_aPreviewMedia` is an object when media exists and an empty array otherwise.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum GbPreviewMedia {
    Media {
        #[serde(rename = "_aImages", default)]
        images: Vec<GbImage>,
    },
    Other(serde::de::IgnoredAny),
}

#[derive(Debug, Deserialize)]
struct GbImage {
    #[serde(rename = "_sBaseUrl", default)]
    base_url: Option<String>,
    #[serde(rename = "_sFile", default)]
    file: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GbFile {
    #[serde(rename = "_sFile", default)]
    file: Option<String>,
    #[serde(rename = "_sDownloadUrl", default)]
    download_url: Option<String>,
}

impl GbRecord {
    fn item_id(&self) -> Option<ItemId> {
        match self.id.as_ref()? {
            serde_json::Value::Number(n) => Some(ItemId::new(n.to_string())),
            serde_json::Value::String(s) if !s.trim().is_empty() => Some(ItemId::new(s.trim())),
            _ => None,
        }
    }
}

impl GbListResponse {
    fn into_page(self, page: u32, requested_size: Option<u32>) -> ListingPage {
        let record_count = self.records.len();
        let items = self
            .records
            .into_iter()
            .filter_map(|record| {
                let Some(id) = record.item_id() else {
                    debug!("Skipping listing record without _idRow");
                    return None;
                };
                let title = record
                    .name
                    .unwrap_or_else(|| "Unknown Mod".to_string());
                Some(CatalogItem { id, title })
            })
            .collect();

        ListingPage {
            page,
            items,
            record_count,
            is_complete: self.metadata.and_then(|m| m.is_complete),
            requested_size,
        }
    }
}

impl GbDetail {
    fn into_detail(self, id: ItemId) -> ItemDetail {
        let previews = match self.preview_media {
            Some(GbPreviewMedia::Media { images }) => images
                .into_iter()
                .filter_map(|img| match (img.base_url, img.file) {
                    (Some(base_url), Some(file)) if !base_url.is_empty() && !file.is_empty() => {
                        Some(PreviewAsset { base_url, file })
                    }
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        };

        let downloads = self
            .files
            .unwrap_or_default()
            .into_iter()
            .filter_map(|f| {
                let url = f.download_url.filter(|u| !u.is_empty())?;
                Some(DownloadAsset {
                    url,
                    file: f.file.unwrap_or_default(),
                })
            })
            .collect();

        ItemDetail {
            id,
            title: self.name,
            submitter: self.submitter.and_then(|s| s.name),
            description: self.text,
            created_at: self
                .date_added
                .and_then(|ts| DateTime::<Utc>::from_timestamp(ts, 0)),
            like_count: self.like_count.unwrap_or(0),
            profile_url: self.profile_url,
            previews,
            downloads,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GameBananaClient {
        let config = CatalogConfig {
            base_url: "https://gamebanana.test/apiv11/".to_string(),
            game_id: 20357,
            ..Default::default()
        };
        GameBananaClient::new(&config).unwrap()
    }

    fn param<'a>(params: &'a [(String, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_category_listing_request() {
        let (url, params, size) =
            client().listing_request(&ListingQuery::Category { category_id: 18959 }, 3, 50);
        assert_eq!(url, "https://gamebanana.test/apiv11/Mod/Index");
        assert_eq!(param(&params, "_idGameRow"), Some("20357"));
        assert_eq!(param(&params, "_aFilters[Generic_Category]"), Some("18959"));
        assert_eq!(param(&params, "_nPage"), Some("3"));
        assert_eq!(param(&params, "_nPerpage"), Some("50"));
        assert_eq!(size, Some(50));
    }

    #[test]
    fn test_search_listing_request_has_no_page_size() {
        let (url, params, size) = client().listing_request(
            &ListingQuery::Search {
                name: "Aino".to_string(),
            },
            1,
            50,
        );
        assert_eq!(url, "https://gamebanana.test/apiv11/Game/20357/Subfeed");
        assert_eq!(param(&params, "_sName"), Some("Aino"));
        assert_eq!(param(&params, "_sSort"), Some("new"));
        assert_eq!(param(&params, "_nPerpage"), None);
        assert_eq!(size, None);
    }

    #[test]
    fn test_parse_listing_page() {
        let json = r#"{
            "_aMetadata": { "_nRecordCount": 2, "_bIsComplete": true },
            "_aRecords": [
                { "_idRow": 501234, "_sName": "First Mod" },
                { "_idRow": "501235" },
                { "_sName": "No id" }
            ]
        }"#;
        let response: GbListResponse = serde_json::from_str(json).unwrap();
        let page = response.into_page(2, Some(50));

        assert_eq!(page.page, 2);
        assert_eq!(page.items.len(), 2);
        assert_eq!(page.items[0], CatalogItem::new("501234", "First Mod"));
        assert_eq!(page.items[1], CatalogItem::new("501235", "Unknown Mod"));
        assert_eq!(page.record_count, 3);
        assert_eq!(page.is_complete, Some(true));
        assert_eq!(page.requested_size, Some(50));
    }

    #[test]
    fn test_parse_listing_without_metadata() {
        let response: GbListResponse = serde_json::from_str(r#"{ "_aRecords": [] }"#).unwrap();
        let page = response.into_page(1, None);
        assert!(page.items.is_empty());
        assert_eq!(page.record_count, 0);
        assert_eq!(page.is_complete, None);
    }

    #[test]
    fn test_parse_detail() {
        let json = r#"{
            "_sName": "Aino Swimsuit",
            "_aSubmitter": { "_idRow": 1, "_sName": "modder" },
            "_sText": "<b>Nice</b> mod",
            "_nLikeCount": 42,
            "_tsDateAdded": 1700000000,
            "_sProfileUrl": "https://gamebanana.com/mods/501234",
            "_aPreviewMedia": {
                "_aImages": [
                    { "_sBaseUrl": "https://images.gamebanana.com/img/ss/mods", "_sFile": "a.png" },
                    { "_sBaseUrl": "https://images.gamebanana.com/img/ss/mods" }
                ]
            },
            "_aFiles": [
                { "_sFile": "aino.zip", "_sDownloadUrl": "https://gamebanana.com/dl/1" },
                { "_sFile": "broken.zip" }
            ]
        }"#;
        let raw: GbDetail = serde_json::from_str(json).unwrap();
        let detail = raw.into_detail(ItemId::from("501234"));

        assert_eq!(detail.title.as_deref(), Some("Aino Swimsuit"));
        assert_eq!(detail.submitter.as_deref(), Some("modder"));
        assert_eq!(detail.like_count, 42);
        assert_eq!(
            detail.created_at.map(|d| d.timestamp()),
            Some(1_700_000_000)
        );
        assert_eq!(detail.previews.len(), 1);
        assert_eq!(
            detail.previews[0].url(),
            "https://images.gamebanana.com/img/ss/mods/a.png"
        );
        assert_eq!(detail.downloads.len(), 1);
        assert_eq!(detail.downloads[0].file, "aino.zip");
        assert_eq!(detail.asset_count(), 2);
    }

    #[test]
    fn test_parse_detail_with_empty_preview_array() {
        let json = r#"{ "_sName": "Bare", "_aPreviewMedia": [], "_aFiles": [] }"#;
        let raw: GbDetail = serde_json::from_str(json).unwrap();
        let detail = raw.into_detail(ItemId::from("7"));
        assert!(detail.previews.is_empty());
        assert!(detail.downloads.is_empty());
        assert_eq!(detail.like_count, 0);
        assert!(detail.created_at.is_none());
    }
}
