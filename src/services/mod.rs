//! Service layer for the ranking watcher.
//!
//! This module contains the business logic for:
//! - Page acquisition with retry (`Fetcher`)
//! - Item extraction (`RankingExtractor`)
//! - Message delivery (`DiscordNotifier`)
//! - Generated summaries (`GeminiSummarizer`)

mod extractor;
mod fetcher;
mod notifier;
mod summarizer;

pub use extractor::RankingExtractor;
pub use fetcher::{Fetcher, HttpResponse, RawDocument, ReqwestTransport, RetryPolicy, Transport};
pub use notifier::{DISCORD_MESSAGE_LIMIT, DiscordNotifier, Notifier, split_message};
#[cfg(test)]
pub(crate) use fetcher::testing;

pub use summarizer::{
    GeminiSummarizer, Prompt, Summarizer, SummaryRequest, compose_message, format_changes_digest,
};
