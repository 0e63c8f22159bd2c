//! Application configuration structures.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::selectors::RankingSelectors;
use crate::error::{AppError, Result};

/// Root application configuration.
///
/// Built once at startup and handed to each component; nothing reads
/// configuration from global state.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// HTTP acquisition settings
    #[serde(default)]
    pub fetch: FetchConfig,

    /// Item extraction settings
    #[serde(default)]
    pub extract: ExtractConfig,

    /// History file settings
    #[serde(default)]
    pub history: HistoryConfig,

    /// Discord webhook settings
    #[serde(default)]
    pub notify: NotifyConfig,

    /// Generated summary settings
    #[serde(default)]
    pub summary: SummaryConfig,

    /// Log output settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Apply overrides from process environment variables.
    pub fn apply_env(&mut self) {
        self.apply_env_from(|key| std::env::var(key).ok());
    }

    /// Apply overrides from an arbitrary variable lookup.
    pub fn apply_env_from<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(limit) = lookup("KINDLE_RANKING_LIMIT") {
            match limit.trim().parse() {
                Ok(limit) => self.extract.limit = limit,
                Err(_) => log::warn!("Ignoring invalid KINDLE_RANKING_LIMIT '{}'", limit),
            }
        }
        if let Some(url) = lookup("DISCORD_WEBHOOK_URL") {
            self.notify.discord_webhook_url = url;
        }
        if let Some(thread_id) = lookup("DISCORD_THREAD_ID") {
            self.notify.discord_thread_id = Some(thread_id).filter(|s| !s.trim().is_empty());
        }
        if let Some(key) = lookup("GEMINI_API_KEY") {
            self.summary.gemini_api_key = key;
        }
        if let Some(model) = lookup("GEMINI_MODEL") {
            self.summary.gemini_model = model;
        }
        if let Some(enabled) = lookup("ENABLE_GEMINI_SUMMARY") {
            self.summary.enabled = enabled.trim().eq_ignore_ascii_case("true");
        }
        if let Some(level) = lookup("LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(path) = lookup("HISTORY_FILE") {
            self.history.path = PathBuf::from(path);
        }
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        url::Url::parse(&self.fetch.source_url)
            .map_err(|e| AppError::validation(format!("fetch.source_url is invalid: {e}")))?;
        if self.fetch.user_agent.trim().is_empty() {
            return Err(AppError::validation("fetch.user_agent is empty"));
        }
        if self.fetch.timeout_secs == 0 {
            return Err(AppError::validation("fetch.timeout_secs must be > 0"));
        }
        if self.extract.limit == 0 {
            return Err(AppError::validation("extract.limit must be > 0"));
        }
        if !self.extract.detail_url_template.contains("{id}") {
            return Err(AppError::validation(
                "extract.detail_url_template must contain '{id}'",
            ));
        }
        if self.history.max_entries == 0 {
            return Err(AppError::validation("history.max_entries must be > 0"));
        }
        Ok(())
    }

    /// Validate the settings needed to deliver a message.
    pub fn validate_delivery(&self) -> Result<()> {
        if self.notify.discord_webhook_url.trim().is_empty() {
            return Err(AppError::config(
                "DISCORD_WEBHOOK_URL (notify.discord_webhook_url) is not set",
            ));
        }
        if self.summary.enabled && self.summary.gemini_api_key.trim().is_empty() {
            return Err(AppError::config(
                "Summary is enabled but GEMINI_API_KEY (summary.gemini_api_key) is not set",
            ));
        }
        Ok(())
    }
}

/// HTTP acquisition settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetchConfig {
    /// Ranking page URL
    #[serde(default = "defaults::source_url")]
    pub source_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Accept-Language header
    #[serde(default = "defaults::accept_language")]
    pub accept_language: String,

    /// Accept header
    #[serde(default = "defaults::accept")]
    pub accept: String,

    /// Per-attempt request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Number of attempts before giving up
    #[serde(default = "defaults::max_retries")]
    pub max_retries: u32,

    /// Backoff time unit in milliseconds (waits are 1, 2, 4, ... units)
    #[serde(default = "defaults::backoff_unit")]
    pub backoff_unit_ms: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            source_url: defaults::source_url(),
            user_agent: defaults::user_agent(),
            accept_language: defaults::accept_language(),
            accept: defaults::accept(),
            timeout_secs: defaults::timeout(),
            max_retries: defaults::max_retries(),
            backoff_unit_ms: defaults::backoff_unit(),
        }
    }
}

/// Item extraction settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractConfig {
    /// Number of ranked items to read
    #[serde(default = "defaults::limit")]
    pub limit: usize,

    /// Detail page URL, `{id}` is replaced by the product identifier
    #[serde(default = "defaults::detail_url_template")]
    pub detail_url_template: String,

    /// Markup hooks
    #[serde(default)]
    pub selectors: RankingSelectors,
}

impl Default for ExtractConfig {
    fn default() -> Self {
        Self {
            limit: defaults::limit(),
            detail_url_template: defaults::detail_url_template(),
            selectors: RankingSelectors::default(),
        }
    }
}

/// History file settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Path of the JSON history file
    #[serde(default = "defaults::history_path")]
    pub path: PathBuf,

    /// Number of snapshots kept
    #[serde(default = "defaults::max_entries")]
    pub max_entries: usize,
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            path: defaults::history_path(),
            max_entries: defaults::max_entries(),
        }
    }
}

/// Discord webhook settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotifyConfig {
    /// Webhook URL, normally supplied through `DISCORD_WEBHOOK_URL`
    #[serde(default)]
    pub discord_webhook_url: String,

    /// Post into this thread of a forum channel
    #[serde(default)]
    pub discord_thread_id: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            discord_webhook_url: String::new(),
            discord_thread_id: None,
            timeout_secs: defaults::timeout(),
        }
    }
}

/// Generated summary settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryConfig {
    #[serde(default = "defaults::summary_enabled")]
    pub enabled: bool,

    /// API key, normally supplied through `GEMINI_API_KEY`
    #[serde(default)]
    pub gemini_api_key: String,

    #[serde(default = "defaults::gemini_model")]
    pub gemini_model: String,

    #[serde(default = "defaults::gemini_endpoint")]
    pub gemini_endpoint: String,

    /// Number of top items included in the prompt
    #[serde(default = "defaults::summary_ranking_limit")]
    pub ranking_limit: usize,

    #[serde(default = "defaults::temperature")]
    pub temperature: f32,

    #[serde(default = "defaults::max_output_tokens")]
    pub max_output_tokens: u32,

    #[serde(default = "defaults::summary_timeout")]
    pub timeout_secs: u64,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::summary_enabled(),
            gemini_api_key: String::new(),
            gemini_model: defaults::gemini_model(),
            gemini_endpoint: defaults::gemini_endpoint(),
            ranking_limit: defaults::summary_ranking_limit(),
            temperature: defaults::temperature(),
            max_output_tokens: defaults::max_output_tokens(),
            timeout_secs: defaults::summary_timeout(),
        }
    }
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default level filter when `RUST_LOG` is unset
    #[serde(default = "defaults::log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::log_level(),
        }
    }
}

mod defaults {
    use std::path::PathBuf;

    // Fetch defaults
    pub fn source_url() -> String {
        "https://www.amazon.co.jp/gp/bestsellers/digital-text/2275256051/".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
         (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36"
            .into()
    }
    pub fn accept_language() -> String {
        "ja-JP,ja;q=0.9,en;q=0.8".into()
    }
    pub fn accept() -> String {
        "text/html,application/xhtml+xml,application/xml;q=0.9,image/webp,*/*;q=0.8".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn max_retries() -> u32 {
        3
    }
    pub fn backoff_unit() -> u64 {
        1000
    }

    // Extract defaults
    pub fn limit() -> usize {
        10
    }
    pub fn detail_url_template() -> String {
        "https://www.amazon.co.jp/dp/{id}".into()
    }

    // History defaults
    pub fn history_path() -> PathBuf {
        PathBuf::from("ranking_history.json")
    }
    pub fn max_entries() -> usize {
        crate::models::DEFAULT_HISTORY_CAPACITY
    }

    // Summary defaults
    pub fn summary_enabled() -> bool {
        true
    }
    pub fn gemini_model() -> String {
        "gemini-2.5-pro".into()
    }
    pub fn gemini_endpoint() -> String {
        "https://generativelanguage.googleapis.com/v1beta".into()
    }
    pub fn summary_ranking_limit() -> usize {
        5
    }
    pub fn temperature() -> f32 {
        0.7
    }
    pub fn max_output_tokens() -> u32 {
        500
    }
    pub fn summary_timeout() -> u64 {
        60
    }

    // Logging defaults
    pub fn log_level() -> String {
        "info".into()
    }
}
