// src/utils/http.rs

//! HTTP client utilities.

use std::time::Duration;

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue, UPGRADE_INSECURE_REQUESTS};

use crate::error::{AppError, Result};
use crate::models::FetchConfig;

/// Create the client used to fetch the ranking page.
///
/// Sends the header set of an ordinary browser visit; the storefront serves
/// a stripped page to clients that look automated.
pub fn create_page_client(config: &FetchConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT_LANGUAGE, header_value(&config.accept_language)?);
    headers.insert(ACCEPT, header_value(&config.accept)?);
    headers.insert(UPGRADE_INSECURE_REQUESTS, HeaderValue::from_static("1"));

    let client = reqwest::Client::builder()
        .user_agent(&config.user_agent)
        .default_headers(headers)
        .timeout(Duration::from_secs(config.timeout_secs))
        .build()?;
    Ok(client)
}

/// Create a plain client for JSON APIs (webhooks, summarizer).
pub fn create_api_client(timeout_secs: u64) -> Result<reqwest::Client> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_secs))
        .build()?;
    Ok(client)
}

fn header_value(value: &str) -> Result<HeaderValue> {
    HeaderValue::from_str(value)
        .map_err(|e| AppError::config(format!("Invalid header value '{value}': {e}")))
}
