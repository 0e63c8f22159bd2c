//! Pipeline entry points.
//!
//! - `analyze`: Compare two rankings by title
//! - `RankingPipeline`: Fetch, extract, record and report one ranking run

pub mod diff;
pub mod run;

pub use diff::{ChangeAnalysis, DroppedOut, NewEntry, RankChange, analyze};
pub use run::{RankingPipeline, RunOptions, RunReport};
