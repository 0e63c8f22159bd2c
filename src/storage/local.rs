//! Local filesystem history store.
//!
//! Writes go to a temporary file next to the target which is then renamed
//! over it, so an interrupted run leaves the previous history intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::HistoryWindow;
use crate::storage::{HistoryFile, HistoryStorage};

/// JSON file history backend.
#[derive(Debug, Clone)]
pub struct LocalHistoryStore {
    path: PathBuf,
    capacity: usize,
}

impl LocalHistoryStore {
    /// Create a store for the file at `path` keeping `capacity` snapshots.
    pub fn new(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(&self) -> std::io::Result<()> {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => {
                tokio::fs::create_dir_all(parent).await
            }
            _ => Ok(()),
        }
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, bytes: &[u8]) -> std::io::Result<()> {
        self.ensure_dir().await?;

        let tmp = self.path.with_extension("json.tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        file.sync_all().await?;
        drop(file);

        if let Err(e) = tokio::fs::rename(&tmp, &self.path).await {
            let _ = tokio::fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }

    /// Read and decode the file, `Ok(None)` if it does not exist.
    async fn read_file(&self) -> Result<Option<HistoryFile>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl HistoryStorage for LocalHistoryStore {
    async fn load(&self) -> HistoryWindow {
        match self.read_file().await {
            Ok(Some(file)) => {
                let window = HistoryWindow::from_snapshots(file.history, self.capacity);
                log::info!(
                    "Loaded {} snapshot(s) from {}",
                    window.len(),
                    self.path.display()
                );
                window
            }
            Ok(None) => {
                log::info!(
                    "No history file at {}; starting fresh",
                    self.path.display()
                );
                HistoryWindow::empty(self.capacity)
            }
            Err(e) => {
                log::error!(
                    "Failed to read history from {}: {}; starting fresh",
                    self.path.display(),
                    e
                );
                HistoryWindow::empty(self.capacity)
            }
        }
    }

    async fn save(&self, window: &HistoryWindow) -> Result<()> {
        let location = self.path.display().to_string();
        let bytes = serde_json::to_vec_pretty(&HistoryFile::from(window))
            .map_err(|e| AppError::persistence(&location, e))?;

        self.write_bytes(&bytes)
            .await
            .map_err(|e| AppError::persistence(&location, e))?;

        log::info!("Saved {} snapshot(s) to {}", window.len(), location);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::DateTime;
    use tempfile::TempDir;

    use super::*;
    use crate::models::{RankedItem, Rating, Snapshot};

    fn snapshot(hour: u32, title: &str) -> Snapshot {
        let ts = DateTime::parse_from_rfc3339(&format!("2026-02-01T{hour:02}:00:00+09:00")).unwrap();
        let mut first = RankedItem::new(1, title);
        first.rating = Some(Rating {
            stars: 4.5,
            review_count: 100,
        });
        first.price = "¥500".to_string();
        first.url = "https://example.com/1".to_string();
        Snapshot::at(ts, vec![first, RankedItem::new(2, "テスト書籍2")])
    }

    #[tokio::test]
    async fn test_load_missing_file_is_empty() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("history.json"), 3);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_save_and_load_round_trip() {
        let tmp = TempDir::new().unwrap();
        let store = LocalHistoryStore::new(tmp.path().join("history.json"), 3);

        let window = HistoryWindow::empty(3)
            .append(snapshot(1, "テスト書籍1"))
            .append(snapshot(2, "新しい書籍"));
        store.save(&window).await.unwrap();

        assert_eq!(store.load().await, window);
    }

    #[tokio::test]
    async fn test_corrupt_file_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(&path, "{ not json").unwrap();

        let store = LocalHistoryStore::new(&path, 3);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_bad_timestamp_degrades_to_empty() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(
            &path,
            r#"{"history":[{"timestamp":"yesterday","rankings":[]}]}"#,
        )
        .unwrap();

        let store = LocalHistoryStore::new(&path, 3);
        assert!(store.load().await.is_empty());
    }

    #[tokio::test]
    async fn test_reads_legacy_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        std::fs::write(
            &path,
            r#"{"history":[{"timestamp":"2025-06-01T09:00:00.123456","rankings":[
                {"rank":1,"title":"本","rating":4.0,"review_count":10,"price":"¥1","url":"u"},
                {"rank":2,"title":"評価なしの本","rating":null,"review_count":null,"price":"¥2","url":"v"}
            ]}]}"#,
        )
        .unwrap();

        let window = LocalHistoryStore::new(&path, 3).load().await;
        assert_eq!(window.len(), 1);
        let items = window.previous().unwrap();
        assert_eq!(items[0].review_count(), Some(10));
        assert!(items[1].rating.is_none());
    }

    #[tokio::test]
    async fn test_oversized_file_is_truncated_on_load() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("history.json");
        let file = HistoryFile {
            history: (0..5).map(|h| snapshot(h, "X")).collect(),
        };
        std::fs::write(&path, serde_json::to_vec(&file).unwrap()).unwrap();

        let window = LocalHistoryStore::new(&path, 3).load().await;
        assert_eq!(window.len(), 3);
    }

    #[tokio::test]
    async fn test_save_creates_parent_dirs_and_leaves_no_temp_file() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("nested/dir/history.json");
        let store = LocalHistoryStore::new(&path, 3);

        store
            .save(&HistoryWindow::empty(3).append(snapshot(0, "A")))
            .await
            .unwrap();

        assert!(path.exists());
        assert!(!path.with_extension("json.tmp").exists());
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.contains("\"rankings\""));
        // Non-ASCII is written as-is.
        assert!(text.contains("テスト書籍2"));
    }

    #[tokio::test]
    async fn test_save_failure_is_persistence_error() {
        let tmp = TempDir::new().unwrap();
        // The parent "directory" is a regular file, so the write must fail.
        let blocker = tmp.path().join("blocker");
        std::fs::write(&blocker, "x").unwrap();
        let store = LocalHistoryStore::new(blocker.join("history.json"), 3);

        let result = store.save(&HistoryWindow::empty(3)).await;
        assert!(matches!(result, Err(AppError::Persistence { .. })));
    }
}
