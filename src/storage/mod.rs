//! Storage abstractions for ranking history.
//!
//! The history is one JSON document holding the most recent snapshots,
//! newest first:
//!
//! ```text
//! {
//!   "history": [
//!     { "timestamp": "2026-01-10T09:00:00+09:00", "rankings": [ {...}, ... ] },
//!     ...
//!   ]
//! }
//! ```

pub mod local;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::models::{HistoryWindow, Snapshot};

// Re-export for convenience
pub use local::LocalHistoryStore;

/// On-disk shape of the history file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HistoryFile {
    #[serde(default)]
    pub history: Vec<Snapshot>,
}

impl From<&HistoryWindow> for HistoryFile {
    fn from(window: &HistoryWindow) -> Self {
        Self {
            history: window.snapshots().to_vec(),
        }
    }
}

/// Trait for history storage backends.
#[async_trait]
pub trait HistoryStorage: Send + Sync {
    /// Load the stored window.
    ///
    /// Never fails: missing or unreadable history degrades to an empty
    /// window, because history is best effort.
    async fn load(&self) -> HistoryWindow;

    /// Replace the stored window. Readers never observe a partial write.
    async fn save(&self, window: &HistoryWindow) -> Result<()>;
}
