// src/error.rs

//! Unified error handling for the ranking watcher.

use std::fmt;

use thiserror::Error;

/// Result type alias for ranking watcher operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Unified application error type.
#[derive(Error, Debug)]
pub enum AppError {
    /// The ranking page could not be retrieved within the retry budget
    #[error("Acquisition failed after {attempts} attempt(s): {message}")]
    Acquisition { attempts: u32, message: String },

    /// No item blocks matched; the page layout has probably changed
    #[error("Structural mismatch: {0}")]
    StructuralMismatch(String),

    /// Item blocks were found but none of them could be parsed
    #[error("Empty result: none of the {candidates} item block(s) could be parsed")]
    EmptyResult { candidates: usize },

    /// History could not be written
    #[error("Persistence error for {path}: {message}")]
    Persistence { path: String, message: String },

    /// Notification dispatch failed
    #[error("Notify error: {0}")]
    Notify(String),

    /// Summary generation failed
    #[error("Summary error: {0}")]
    Summary(String),

    /// I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON serialization/deserialization failed
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parsing failed
    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    Url(#[from] url::ParseError),

    /// CSS selector parsing failed
    #[error("Invalid selector '{selector}': {message}")]
    Selector { selector: String, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Data validation error
    #[error("Validation error: {0}")]
    Validation(String),
}

impl AppError {
    /// Create an acquisition error.
    pub fn acquisition(attempts: u32, message: impl fmt::Display) -> Self {
        Self::Acquisition {
            attempts,
            message: message.to_string(),
        }
    }

    /// Create a structural mismatch error.
    pub fn structural_mismatch(message: impl Into<String>) -> Self {
        Self::StructuralMismatch(message.into())
    }

    /// Create a persistence error for a storage location.
    pub fn persistence(path: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Persistence {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Create a notification error.
    pub fn notify(message: impl fmt::Display) -> Self {
        Self::Notify(message.to_string())
    }

    /// Create a summary error.
    pub fn summary(message: impl fmt::Display) -> Self {
        Self::Summary(message.to_string())
    }

    /// Create a selector parsing error.
    pub fn selector(selector: impl Into<String>, message: impl fmt::Display) -> Self {
        Self::Selector {
            selector: selector.into(),
            message: message.to_string(),
        }
    }

    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Process exit code for this error.
    ///
    /// The fatal run outcomes get their own codes so a scheduler can tell
    /// "could not get data" apart from "got data but could not save history".
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Acquisition { .. } => 10,
            Self::StructuralMismatch(_) => 11,
            Self::EmptyResult { .. } => 12,
            Self::Persistence { .. } => 13,
            Self::Notify(_) => 14,
            _ => 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fatal_kinds_have_distinct_exit_codes() {
        let codes = [
            AppError::acquisition(3, "timeout").exit_code(),
            AppError::structural_mismatch("no blocks").exit_code(),
            AppError::EmptyResult { candidates: 2 }.exit_code(),
            AppError::persistence("history.json", "disk full").exit_code(),
            AppError::notify("status 500").exit_code(),
        ];
        let mut sorted = codes.to_vec();
        sorted.sort_unstable();
        sorted.dedup();
        assert_eq!(sorted.len(), codes.len());
        assert!(codes.iter().all(|c| *c != 0 && *c != 1));
    }

    #[test]
    fn test_acquisition_message_carries_attempts() {
        let err = AppError::acquisition(3, "connection refused");
        assert_eq!(
            err.to_string(),
            "Acquisition failed after 3 attempt(s): connection refused"
        );
    }

    #[test]
    fn test_config_errors_use_generic_exit_code() {
        assert_eq!(AppError::config("missing webhook").exit_code(), 1);
    }
}
