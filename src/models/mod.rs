// src/models/mod.rs

//! Domain models for the ranking watcher.
//!
//! This module contains the data structures shared by the fetcher,
//! extractor, history store and change analyzer.

mod config;
mod item;
mod selectors;
mod snapshot;

// Re-export all public types
pub use config::{
    Config, ExtractConfig, FetchConfig, HistoryConfig, LoggingConfig, NotifyConfig,
    SummaryConfig,
};
pub use item::{ItemRecord, NO_RATING, NO_URL, PRICE_UNKNOWN, RankedItem, Rating, TITLE_UNKNOWN};
pub use selectors::RankingSelectors;
pub use snapshot::{DEFAULT_HISTORY_CAPACITY, HistoryWindow, Snapshot, render_items};
