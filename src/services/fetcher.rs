// src/services/fetcher.rs

//! Ranking page acquisition with bounded retry.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::{AppError, Result};
use crate::models::FetchConfig;
use crate::utils::http::create_page_client;

/// Status and body of one HTTP exchange.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub body: String,
}

impl HttpResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// The outbound HTTP seam.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform a GET request. Transport-level failures (DNS, refused
    /// connection, timeout) are errors; any HTTP status is a response.
    async fn get(&self, url: &str) -> Result<HttpResponse>;
}

/// Production transport backed by `reqwest`.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build a transport with the browser-like header set from `config`.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Ok(Self::new(create_page_client(config)?))
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn get(&self, url: &str) -> Result<HttpResponse> {
        let response = self.client.get(url).send().await?;
        let status = response.status().as_u16();
        let body = response.text().await?;
        Ok(HttpResponse { status, body })
    }
}

/// How many times to try and how long to wait in between.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total number of attempts; zero is treated as one
    pub max_retries: u32,
    /// Base wait; the wait after attempt `n` (0-based) is `unit * 2^n`
    pub backoff_unit: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_unit: Duration::from_secs(1),
        }
    }
}

impl RetryPolicy {
    pub fn from_config(config: &FetchConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff_unit: Duration::from_millis(config.backoff_unit_ms),
        }
    }

    /// Number of attempts actually made.
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Wait after the failed attempt with 0-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.backoff_unit.saturating_mul(factor)
    }
}

/// A successfully retrieved page.
#[derive(Debug, Clone)]
pub struct RawDocument {
    /// Requested URL
    pub url: String,
    /// HTTP status of the successful response
    pub status: u16,
    /// Response body
    pub body: String,
    /// Attempts made, including the successful one
    pub attempts: u32,
    /// Time spent waiting between attempts
    pub total_backoff: Duration,
}

/// Retrieves the ranking page, retrying transient failures.
pub struct Fetcher {
    transport: Box<dyn Transport>,
    policy: RetryPolicy,
}

impl Fetcher {
    pub fn new(transport: Box<dyn Transport>, policy: RetryPolicy) -> Self {
        Self { transport, policy }
    }

    /// Create a fetcher using the production transport.
    pub fn from_config(config: &FetchConfig) -> Result<Self> {
        Ok(Self::new(
            Box::new(ReqwestTransport::from_config(config)?),
            RetryPolicy::from_config(config),
        ))
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch `url`, retrying on transport errors and non-2xx statuses.
    ///
    /// Fails with [`AppError::Acquisition`] once every attempt has failed.
    pub async fn fetch(&self, url: &str) -> Result<RawDocument> {
        let attempts = self.policy.attempts();
        let mut total_backoff = Duration::ZERO;
        let mut last_error = String::new();

        for attempt in 0..attempts {
            match self.transport.get(url).await {
                Ok(response) if response.is_success() => {
                    log::debug!(
                        "Fetched {} ({} bytes, attempt {}/{})",
                        url,
                        response.body.len(),
                        attempt + 1,
                        attempts
                    );
                    return Ok(RawDocument {
                        url: url.to_string(),
                        status: response.status,
                        body: response.body,
                        attempts: attempt + 1,
                        total_backoff,
                    });
                }
                Ok(response) => last_error = format!("HTTP status {}", response.status),
                Err(error) => last_error = error.to_string(),
            }

            if attempt + 1 < attempts {
                let wait = self.policy.delay_for(attempt);
                log::warn!(
                    "Retry {}/{} - waiting {:?} (error: {})",
                    attempt + 1,
                    attempts,
                    wait,
                    last_error
                );
                tokio::time::sleep(wait).await;
                total_backoff += wait;
            }
        }

        log::error!("Giving up on {} after {} attempt(s)", url, attempts);
        Err(AppError::acquisition(attempts, last_error))
    }
}


#[cfg(test)]
mod tests {
    use super::testing::ScriptedTransport;
    use super::*;

    const URL: &str = "https://www.amazon.co.jp/gp/bestsellers/digital-text/2275256051/";

    fn policy(max_retries: u32) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            backoff_unit: Duration::from_millis(1),
        }
    }

    #[test]
    fn test_backoff_doubles_per_attempt() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_backoff_saturates() {
        let policy = RetryPolicy::default();
        assert!(policy.delay_for(64) >= policy.delay_for(31));
    }

    #[test]
    fn test_zero_retries_still_tries_once() {
        assert_eq!(policy(0).attempts(), 1);
    }

    #[tokio::test]
    async fn test_succeeds_after_two_failures() {
        let fetcher = Fetcher::new(
            Box::new(ScriptedTransport::new(vec![
                ScriptedTransport::refused(),
                ScriptedTransport::status(503),
                ScriptedTransport::ok("<html></html>"),
            ])),
            policy(3),
        );

        let document = fetcher.fetch(URL).await.unwrap();
        assert_eq!(document.attempts, 3);
        // 1 + 2 units
        assert_eq!(document.total_backoff, Duration::from_millis(3));
        assert_eq!(document.body, "<html></html>");
        assert_eq!(document.status, 200);
    }

    #[tokio::test]
    async fn test_first_attempt_success_does_not_wait() {
        let fetcher = Fetcher::new(
            Box::new(ScriptedTransport::new(vec![ScriptedTransport::ok("x")])),
            policy(3),
        );
        let document = fetcher.fetch(URL).await.unwrap();
        assert_eq!(document.attempts, 1);
        assert_eq!(document.total_backoff, Duration::ZERO);
    }

    #[tokio::test]
    async fn test_exhausted_retries_report_last_cause() {
        let fetcher = Fetcher::new(
            Box::new(ScriptedTransport::new(vec![
                ScriptedTransport::refused(),
                ScriptedTransport::refused(),
                ScriptedTransport::status(500),
            ])),
            policy(3),
        );

        match fetcher.fetch(URL).await {
            Err(AppError::Acquisition { attempts, message }) => {
                assert_eq!(attempts, 3);
                assert_eq!(message, "HTTP status 500");
            }
            other => panic!("expected acquisition error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_non_success_status_is_retried() {
        let transport = ScriptedTransport::new(vec![
            ScriptedTransport::status(404),
            ScriptedTransport::ok("ok"),
        ]);
        let fetcher = Fetcher::new(Box::new(transport), policy(2));
        let document = fetcher.fetch(URL).await.unwrap();
        assert_eq!(document.attempts, 2);
    }
}
