// src/services/notifier.rs

//! Message delivery to chat destinations.

use async_trait::async_trait;
use serde::Serialize;

use crate::error::{AppError, Result};
use crate::models::NotifyConfig;
use crate::utils::http::create_api_client;
use crate::utils::truncate_chars;

/// Discord rejects message content longer than this.
pub const DISCORD_MESSAGE_LIMIT: usize = 2000;

/// Destination for the final ranking message.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: &str) -> Result<()>;
}

#[derive(Serialize)]
struct WebhookPayload<'a> {
    content: &'a str,
}

/// Posts messages to a Discord webhook.
pub struct DiscordNotifier {
    client: reqwest::Client,
    endpoint: url::Url,
}

impl DiscordNotifier {
    pub fn new(client: reqwest::Client, webhook_url: &str, thread_id: Option<&str>) -> Result<Self> {
        let mut endpoint = url::Url::parse(webhook_url)?;
        if let Some(thread_id) = thread_id {
            endpoint.query_pairs_mut().append_pair("thread_id", thread_id);
        }
        Ok(Self { client, endpoint })
    }

    pub fn from_config(config: &NotifyConfig) -> Result<Self> {
        if config.discord_webhook_url.trim().is_empty() {
            return Err(AppError::config("Discord webhook URL is not set"));
        }
        Self::new(
            create_api_client(config.timeout_secs)?,
            &config.discord_webhook_url,
            config.discord_thread_id.as_deref(),
        )
    }

    async fn post(&self, content: &str) -> Result<()> {
        let response = self
            .client
            .post(self.endpoint.clone())
            .json(&WebhookPayload { content })
            .send()
            .await
            .map_err(|e| AppError::notify(format!("webhook connection failed: {e}")))?;

        let status = response.status().as_u16();
        if is_delivered(status) {
            return Ok(());
        }
        let body = response.text().await.unwrap_or_default();
        Err(rejection(status, &body))
    }
}

/// Discord answers 204 without `?wait=true` and 200 with it.
fn is_delivered(status: u16) -> bool {
    status == 200 || status == 204
}

fn rejection(status: u16, body: &str) -> AppError {
    let mut message = format!("webhook returned status {status}");
    if !body.is_empty() {
        message.push_str(&format!(", response: {}", truncate_chars(body, 500)));
    }
    AppError::notify(message)
}

#[async_trait]
impl Notifier for DiscordNotifier {
    async fn send(&self, message: &str) -> Result<()> {
        let parts = split_message(message, DISCORD_MESSAGE_LIMIT);
        for (i, part) in parts.iter().enumerate() {
            self.post(part).await?;
            log::debug!("Posted message part {}/{}", i + 1, parts.len());
        }
        log::info!("Discord message sent ({} part(s))", parts.len());
        Ok(())
    }
}

/// Split `message` into chunks of at most `limit` characters, breaking
/// between blank-line separated blocks where possible.
pub fn split_message(message: &str, limit: usize) -> Vec<String> {
    let limit = limit.max(1);
    let mut parts = Vec::new();
    let mut current = String::new();

    for block in message.split("\n\n") {
        let block_len = block.chars().count();
        let current_len = current.chars().count();

        if !current.is_empty() && current_len + 2 + block_len <= limit {
            current.push_str("\n\n");
            current.push_str(block);
            continue;
        }
        if !current.is_empty() {
            parts.push(std::mem::take(&mut current));
        }

        if block_len <= limit {
            current.push_str(block);
        } else {
            let mut rest = block;
            while !rest.is_empty() {
                let head = truncate_chars(rest, limit);
                parts.push(head.to_string());
                rest = &rest[head.len()..];
            }
        }
    }

    if !current.is_empty() || parts.is_empty() {
        parts.push(current);
    }
    parts
}
