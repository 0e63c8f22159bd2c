//! Ranking snapshots and the bounded history window.

use chrono::{DateTime, FixedOffset, Local};
use serde::{Deserialize, Serialize};

use super::item::{ItemRecord, RankedItem};

/// Number of snapshots retained by default.
pub const DEFAULT_HISTORY_CAPACITY: usize = 3;

/// One complete captured ranking.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    /// Capture time
    #[serde(with = "timestamp")]
    pub timestamp: DateTime<FixedOffset>,

    /// Items ordered by ascending rank
    #[serde(rename = "rankings")]
    pub items: Vec<RankedItem>,
}

impl Snapshot {
    /// Capture a snapshot of `items` stamped with the current local time.
    pub fn capture(items: Vec<RankedItem>) -> Self {
        Self::at(Local::now().fixed_offset(), items)
    }

    /// Create a snapshot with an explicit timestamp.
    ///
    /// Items are ordered by rank regardless of input order.
    pub fn at(timestamp: DateTime<FixedOffset>, mut items: Vec<RankedItem>) -> Self {
        items.sort_by_key(|item| item.rank);
        Self { timestamp, items }
    }

    /// Plaintext rendering: one four-line block per item, blank line between.
    pub fn render(&self) -> String {
        render_items(&self.items)
    }

    /// Structured records for machine-readable consumers.
    pub fn records(&self) -> Vec<ItemRecord> {
        self.items.iter().map(ItemRecord::from).collect()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

/// Render a list of items the same way [`Snapshot::render`] does.
pub fn render_items(items: &[RankedItem]) -> String {
    items
        .iter()
        .map(RankedItem::to_message_block)
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Most-recent-first sequence of snapshots with a hard size cap.
#[derive(Debug, Clone, PartialEq)]
pub struct HistoryWindow {
    snapshots: Vec<Snapshot>,
    capacity: usize,
}

impl Default for HistoryWindow {
    fn default() -> Self {
        Self::empty(DEFAULT_HISTORY_CAPACITY)
    }
}

impl HistoryWindow {
    /// An empty window holding at most `capacity` snapshots.
    pub fn empty(capacity: usize) -> Self {
        Self {
            snapshots: Vec::new(),
            capacity: capacity.max(1),
        }
    }

    /// Build a window from most-recent-first snapshots, dropping the oldest
    /// entries beyond `capacity`.
    pub fn from_snapshots(mut snapshots: Vec<Snapshot>, capacity: usize) -> Self {
        let capacity = capacity.max(1);
        snapshots.truncate(capacity);
        Self {
            snapshots,
            capacity,
        }
    }

    /// Prepend `snapshot` and drop whatever falls off the tail.
    pub fn append(mut self, snapshot: Snapshot) -> Self {
        self.snapshots.insert(0, snapshot);
        self.snapshots.truncate(self.capacity);
        self
    }

    /// Items to compare the newest snapshot against.
    ///
    /// With two or more entries this is the entry right after the newest.
    /// With exactly one entry there is nothing older, so that entry itself
    /// is returned. An empty window has no previous ranking.
    pub fn previous(&self) -> Option<&[RankedItem]> {
        match self.snapshots.len() {
            0 => None,
            1 => Some(&self.snapshots[0].items),
            _ => Some(&self.snapshots[1].items),
        }
    }

    /// Newest snapshot.
    pub fn latest(&self) -> Option<&Snapshot> {
        self.snapshots.first()
    }

    pub fn snapshots(&self) -> &[Snapshot] {
        &self.snapshots
    }

    pub fn into_snapshots(self) -> Vec<Snapshot> {
        self.snapshots
    }

    pub fn iter(&self) -> impl Iterator<Item = &Snapshot> {
        self.snapshots.iter()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.snapshots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.snapshots.is_empty()
    }
}

/// RFC 3339 timestamps, with a fallback for offset-less ISO timestamps
/// (read as local time).
mod timestamp {
    use chrono::{DateTime, FixedOffset, Local, NaiveDateTime, TimeZone};
    use serde::{Deserialize, Deserializer, Serializer, de::Error};

    pub fn serialize<S>(value: &DateTime<FixedOffset>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&value.to_rfc3339())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<FixedOffset>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        parse(&raw).ok_or_else(|| D::Error::custom(format!("invalid timestamp '{raw}'")))
    }

    pub(super) fn parse(raw: &str) -> Option<DateTime<FixedOffset>> {
        if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
            return Some(dt);
        }
        let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|dt| dt.fixed_offset())
    }
}
