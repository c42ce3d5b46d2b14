//! Persistent, append-only record of completed items for one collection.
//!
//! The ledger is a newline-delimited text file. It is read in full when a
//! run starts and appended to (one whole line per id, flushed and synced)
//! as items complete. Entries are never removed or rewritten; the only
//! repair ever made is cutting off a torn final line left by an interrupted
//! append, before the next append.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::fs::{self, File, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::external_catalog::ItemId;

/// Default ledger file name inside a collection directory.
pub const DEFAULT_LEDGER_FILE: &str = "history.txt";

/// Errors that can occur while reading or appending to a ledger.
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("ledger I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl LedgerError {
    fn io(path: &Path, source: std::io::Error) -> Self {
        Self::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

struct LedgerState {
    seen: HashSet<ItemId>,
    /// Lazily opened append handle.
    file: Option<File>,
    /// Length of the file up to its last complete line, when a torn tail follows it.
    torn_tail_at: Option<u64>,
    /// Length of the file after the last synced line.
    committed_len: u64,
}

/// Completion ledger for a single collection.
pub struct Ledger {
    path: PathBuf,
    state: Mutex<LedgerState>,
}

impl Ledger {
    /// Load the ledger stored as `file_name` inside `collection_dir`.
    ///
    /// A missing file yields an empty ledger. Blank lines are skipped and a
    /// final line without a trailing newline (an interrupted append) is ignored.
    pub async fn load(collection_dir: &Path, file_name: &str) -> Result<Self, LedgerError> {
        let path = collection_dir.join(file_name);

        let content = match fs::read(&path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(LedgerError::io(&path, e)),
        };

        let (seen, torn_tail_at) = parse_ledger(&content);
        let committed_len = torn_tail_at.unwrap_or(content.len() as u64);
        if torn_tail_at.is_some() {
            warn!(path = %path.display(), "Ignoring unterminated final ledger line");
        }
        debug!(path = %path.display(), entries = seen.len(), "Ledger loaded");

        Ok(Self {
            path,
            state: Mutex::new(LedgerState {
                seen,
                file: None,
                torn_tail_at,
                committed_len,
            }),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub async fn contains(&self, id: &ItemId) -> bool {
        self.state.lock().await.seen.contains(id)
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.seen.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }

    /// Durably record `id` as complete.
    ///
    /// Returns `Ok(false)` without touching the file when `id` is already
    /// recorded. The in-memory set is only updated after the line is synced.
    pub async fn append(&self, id: &ItemId) -> Result<bool, LedgerError> {
        let mut state = self.state.lock().await;
        if state.seen.contains(id) {
            return Ok(false);
        }

        let line = format!("{}\n", id);

        if state.file.is_none() {
            let file = self.open_for_append().await?;
            if let Some(valid_len) = state.torn_tail_at {
                file.set_len(valid_len)
                    .await
                    .map_err(|e| LedgerError::io(&self.path, e))?;
                debug!(path = %self.path.display(), valid_len, "Cut torn ledger tail");
            }
            state.torn_tail_at = None;
            state.file = Some(file);
        }
        if let Some(file) = state.file.as_mut() {
            let written = async {
                file.write_all(line.as_bytes()).await?;
                file.flush().await?;
                file.sync_data().await
            }
            .await;

            if let Err(e) = written {
                // A partial line may have reached the file: reopen and cut back
                // to the last synced line before the next append.
                state.file = None;
                state.torn_tail_at = Some(state.committed_len);
                return Err(LedgerError::io(&self.path, e));
            }
        }

        state.committed_len += line.len() as u64;
        state.seen.insert(id.clone());
        Ok(true)
    }

    async fn open_for_append(&self) -> Result<File, LedgerError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .map_err(|e| LedgerError::io(parent, e))?;
        }
        OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await
            .map_err(|e| LedgerError::io(&self.path, e))
    }
}

/// Parse ledger content into the committed set.
///
/// When the content does not end in a newline, the trailing fragment is left
/// out and the length of the valid prefix is returned alongside.
fn parse_ledger(content: &[u8]) -> (HashSet<ItemId>, Option<u64>) {
    let valid_len = content
        .iter()
        .rposition(|&b| b == b'\n')
        .map_or(0, |pos| pos + 1);
    let torn_tail_at = (valid_len < content.len()).then_some(valid_len as u64);

    let seen = String::from_utf8_lossy(&content[..valid_len])
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(ItemId::from)
        .collect();

    (seen, torn_tail_at)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tempfile::TempDir;

    #[test]
    fn test_parse_ledger_skips_blank_lines() {
        let (seen, torn_tail_at) = parse_ledger(b"1\n\n  2  \r\n\n");
        assert_eq!(seen.len(), 2);
        assert!(seen.contains(&ItemId::from("2")));
        assert_eq!(torn_tail_at, None);
    }

    #[test]
    fn test_parse_ledger_ignores_unterminated_tail() {
        let (seen, torn_tail_at) = parse_ledger(b"1\n2\n31");
        assert_eq!(seen.len(), 2);
        assert!(!seen.contains(&ItemId::from("31")));
        assert_eq!(torn_tail_at, Some(4));

        let (seen, torn_tail_at) = parse_ledger(b"17");
        assert!(seen.is_empty());
        assert_eq!(torn_tail_at, Some(0));
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        assert!(ledger.is_empty().await);
        assert!(!ledger.path().exists());
    }

    #[tokio::test]
    async fn test_append_persists_and_reloads() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();

        assert!(ledger.append(&ItemId::from("100")).await.unwrap());
        assert!(ledger.append(&ItemId::from("200")).await.unwrap());
        assert!(ledger.contains(&ItemId::from("100")).await);

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content, "100\n200\n");

        let reloaded = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        assert_eq!(reloaded.len().await, 2);
        assert!(reloaded.contains(&ItemId::from("200")).await);
    }

    #[tokio::test]
    async fn test_duplicate_append_writes_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();

        assert!(ledger.append(&ItemId::from("7")).await.unwrap());
        assert!(!ledger.append(&ItemId::from("7")).await.unwrap());

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content, "7\n");
    }

    #[tokio::test]
    async fn test_append_after_torn_line_cuts_fragment() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(DEFAULT_LEDGER_FILE), "1\n2\n31").unwrap();

        let ledger = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        assert_eq!(ledger.len().await, 2);

        ledger.append(&ItemId::from("4")).await.unwrap();
        ledger.append(&ItemId::from("5")).await.unwrap();
        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content, "1\n2\n4\n5\n");

        let reloaded = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        assert_eq!(reloaded.len().await, 4);
        assert!(!reloaded.contains(&ItemId::from("31")).await);
    }

    #[tokio::test]
    async fn test_append_after_failed_write_cuts_fragment() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        ledger.append(&ItemId::from("1")).await.unwrap();
        ledger.append(&ItemId::from("2")).await.unwrap();

        // Leave the file as a write that failed after its first byte would.
        std::fs::OpenOptions::new()
            .append(true)
            .open(ledger.path())
            .and_then(|mut f| std::io::Write::write_all(&mut f, b"3"))
            .unwrap();
        {
            let mut state = ledger.state.lock().await;
            state.file = None;
            state.torn_tail_at = Some(state.committed_len);
        }

        ledger.append(&ItemId::from("4")).await.unwrap();

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        assert_eq!(content, "1\n2\n4\n");
        let reloaded = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        assert!(!reloaded.contains(&ItemId::from("34")).await);
        assert_eq!(reloaded.len().await, 3);
    }

    #[tokio::test]
    async fn test_committed_len_tracks_synced_lines() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(temp_dir.path().join(DEFAULT_LEDGER_FILE), "10\n2").unwrap();
        let ledger = Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
            .await
            .unwrap();
        assert_eq!(ledger.state.lock().await.committed_len, 3);

        ledger.append(&ItemId::from("300")).await.unwrap();
        assert_eq!(ledger.state.lock().await.committed_len, 7);
        assert_eq!(std::fs::metadata(ledger.path()).unwrap().len(), 7);
    }

    #[tokio::test]
    async fn test_append_creates_collection_directory() {
        let temp_dir = TempDir::new().unwrap();
        let collection_dir = temp_dir.path().join("Aino");
        let ledger = Ledger::load(&collection_dir, "done.txt").await.unwrap();

        ledger.append(&ItemId::from("1")).await.unwrap();
        assert!(collection_dir.join("done.txt").exists());
    }

    #[tokio::test]
    async fn test_concurrent_appends_produce_whole_lines() {
        let temp_dir = TempDir::new().unwrap();
        let ledger = Arc::new(
            Ledger::load(temp_dir.path(), DEFAULT_LEDGER_FILE)
                .await
                .unwrap(),
        );

        let mut handles = Vec::new();
        for i in 0..50u64 {
            let ledger = Arc::clone(&ledger);
            handles.push(tokio::spawn(async move {
                ledger.append(&ItemId::from(i)).await.unwrap();
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        let content = std::fs::read_to_string(ledger.path()).unwrap();
        let mut lines: Vec<u64> = content.lines().map(|l| l.parse().unwrap()).collect();
        lines.sort_unstable();
        assert_eq!(lines, (0..50).collect::<Vec<_>>());
    }
}
