//! One-time `info.txt` summary written next to an item's assets.

use std::path::Path;

use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use uuid::Uuid;

use crate::external_catalog::{CatalogItem, ItemDetail};
use crate::sanitize::strip_markup;

pub const SUMMARY_FILE: &str = "info.txt";

const UNKNOWN: &str = "Unknown";
const NONE: &str = "None";

/// Render the summary text for an item.
pub fn render_summary(item: &CatalogItem, detail: &ItemDetail) -> String {
    let title = detail.title.as_deref().unwrap_or(&item.title);
    let submitter = detail.submitter.as_deref().unwrap_or(UNKNOWN);
    let date = detail
        .created_at
        .map(|ts| ts.format("%Y-%m-%d").to_string())
        .unwrap_or_else(|| UNKNOWN.to_string());
    let link = detail.profile_url.as_deref().unwrap_or(NONE);

    format!(
        "Title: {}\nSubmitter: {}\nDate: {}\nLikes: {}\nLink: {}\n\n=== Description ===\n{}\n",
        title,
        submitter,
        date,
        detail.like_count,
        link,
        strip_markup(detail.description.as_deref()),
    )
}

/// Write the summary into `item_dir` unless one is already there.
///
/// The text goes to a uniquely named `.part` sibling first and is renamed
/// into place once synced, so a failed write never leaves a truncated
/// summary behind. Returns `Ok(false)` when the file existed.
pub async fn write_summary(
    item_dir: &Path,
    item: &CatalogItem,
    detail: &ItemDetail,
) -> std::io::Result<bool> {
    let path = item_dir.join(SUMMARY_FILE);
    if fs::try_exists(&path).await? {
        return Ok(false);
    }

    let part = item_dir.join(format!("{}.{}.part", SUMMARY_FILE, Uuid::new_v4().simple()));
    let written = async {
        let mut file = OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&part)
            .await?;
        file.write_all(render_summary(item, detail).as_bytes())
            .await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);
        fs::rename(&part, &path).await
    }
    .await;

    if let Err(e) = written {
        let _ = fs::remove_file(&part).await;
        return Err(e);
    }
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use tempfile::TempDir;

    #[test]
    fn test_render_summary() {
        let item = fixtures::catalog_item(9, "Listing Title");
        let detail = fixtures::item_detail(9, "Detail Title");

        let text = render_summary(&item, &detail);
        assert!(text.starts_with("Title: Detail Title\nSubmitter: tester\n"));
        assert!(text.contains("Date: 2023-11-14\n"));
        assert!(text.contains("Likes: 42\n"));
        assert!(text.contains("Link: https://gamebanana.com/mods/9\n"));
        assert!(text.ends_with("=== Description ===\nAbout Detail Title\nEnjoy!\n"));
    }

    #[test]
    fn test_render_summary_defaults() {
        let item = fixtures::catalog_item(9, "Listing Title");
        let mut detail = fixtures::item_detail(9, "x");
        detail.title = None;
        detail.submitter = None;
        detail.created_at = None;
        detail.profile_url = None;
        detail.description = None;

        let text = render_summary(&item, &detail);
        assert!(text.contains("Title: Listing Title\n"));
        assert!(text.contains("Submitter: Unknown\n"));
        assert!(text.contains("Date: Unknown\n"));
        assert!(text.contains("Link: None\n"));
        assert!(text.contains("No description"));
    }

    #[tokio::test]
    async fn test_existing_summary_is_not_overwritten() {
        let temp_dir = TempDir::new().unwrap();
        let item = fixtures::catalog_item(1, "Mod");
        let detail = fixtures::item_detail(1, "Mod");
        std::fs::write(temp_dir.path().join(SUMMARY_FILE), "hand edited").unwrap();

        let written = write_summary(temp_dir.path(), &item, &detail).await.unwrap();

        assert!(!written);
        assert_eq!(
            std::fs::read_to_string(temp_dir.path().join(SUMMARY_FILE)).unwrap(),
            "hand edited"
        );
    }

    #[tokio::test]
    async fn test_failed_write_leaves_no_summary() {
        let temp_dir = TempDir::new().unwrap();
        let item = fixtures::catalog_item(1, "Mod");
        let detail = fixtures::item_detail(1, "Mod");
        let missing = temp_dir.path().join("missing");

        assert!(write_summary(&missing, &item, &detail).await.is_err());
        assert!(!missing.join(SUMMARY_FILE).exists());

        std::fs::create_dir(&missing).unwrap();
        assert!(write_summary(&missing, &item, &detail).await.unwrap());
        let entries: Vec<_> = std::fs::read_dir(&missing)
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(entries, vec![std::ffi::OsString::from(SUMMARY_FILE)]);
        assert!(std::fs::read_to_string(missing.join(SUMMARY_FILE))
            .unwrap()
            .starts_with("Title: Mod\n"));
    }

    #[tokio::test]
    async fn test_summary_written_once() {
        let temp_dir = TempDir::new().unwrap();
        let item = fixtures::catalog_item(1, "Mod");
        let detail = fixtures::item_detail(1, "Mod");

        assert!(write_summary(temp_dir.path(), &item, &detail).await.unwrap());
        assert!(!write_summary(temp_dir.path(), &item, &detail).await.unwrap());
    }
}
