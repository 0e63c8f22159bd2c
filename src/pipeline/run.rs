// src/pipeline/run.rs

//! The end-to-end ranking run.

use chrono::{DateTime, FixedOffset};

use crate::error::{AppError, Result};
use crate::models::{Config, RankedItem, Snapshot, render_items};
use crate::services::{
    DiscordNotifier, Fetcher, GeminiSummarizer, Notifier, RankingExtractor, Summarizer,
    SummaryRequest, compose_message,
};
use crate::storage::{HistoryStorage, LocalHistoryStore};

use super::diff::{ChangeAnalysis, analyze};

/// Per-invocation switches.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Skip saving history and sending the message
    pub dry_run: bool,
    /// Override the configured number of items
    pub limit: Option<usize>,
}

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub snapshot: Snapshot,
    /// `None` on the first run, when there is nothing to compare against
    pub analysis: Option<ChangeAnalysis>,
    pub first_run: bool,
    /// The message that was (or, on a dry run, would have been) sent
    pub message: String,
}

/// Fetcher → extractor → history → analyzer → collaborators.
pub struct RankingPipeline {
    source_url: String,
    fetcher: Fetcher,
    extractor: RankingExtractor,
    storage: Box<dyn HistoryStorage>,
    summarizer: Option<Box<dyn Summarizer>>,
    notifier: Option<Box<dyn Notifier>>,
    summary_ranking_limit: usize,
}

impl RankingPipeline {
    pub fn new(
        config: &Config,
        fetcher: Fetcher,
        storage: Box<dyn HistoryStorage>,
    ) -> Result<Self> {
        Ok(Self {
            source_url: config.fetch.source_url.clone(),
            fetcher,
            extractor: RankingExtractor::new(&config.extract)?,
            storage,
            summarizer: None,
            notifier: None,
            summary_ranking_limit: config.summary.ranking_limit,
        })
    }

    pub fn with_summarizer(mut self, summarizer: Box<dyn Summarizer>) -> Self {
        self.summarizer = Some(summarizer);
        self
    }

    pub fn with_notifier(mut self, notifier: Box<dyn Notifier>) -> Self {
        self.notifier = Some(notifier);
        self
    }

    /// Wire up the production components.
    ///
    /// With `deliver` set, the Discord notifier is required and the summary
    /// settings must be complete. Without it, a summarizer is still attached
    /// when it is enabled and has a key.
    pub fn from_config(config: &Config, deliver: bool) -> Result<Self> {
        config.validate()?;
        if deliver {
            config.validate_delivery()?;
        }

        let storage = LocalHistoryStore::new(&config.history.path, config.history.max_entries);
        let mut pipeline =
            Self::new(config, Fetcher::from_config(&config.fetch)?, Box::new(storage))?;

        let summary = &config.summary;
        if summary.enabled && !summary.gemini_api_key.trim().is_empty() {
            pipeline = pipeline.with_summarizer(Box::new(GeminiSummarizer::from_config(summary)?));
        } else if summary.enabled {
            log::info!("Summary enabled but no API key set; continuing without it");
        }
        if deliver {
            pipeline = pipeline.with_notifier(Box::new(DiscordNotifier::from_config(&config.notify)?));
        }
        Ok(pipeline)
    }

    async fn scrape_at(
        &self,
        limit: Option<usize>,
        timestamp: Option<DateTime<FixedOffset>>,
    ) -> Result<Snapshot> {
        if limit == Some(0) {
            return Err(AppError::validation("limit must be > 0"));
        }

        let document = self.fetcher.fetch(&self.source_url).await?;
        log::info!(
            "Fetched ranking page ({} bytes, {} attempt(s))",
            document.body.len(),
            document.attempts
        );

        let items = match limit {
            Some(limit) => self.extractor.extract_with_limit(&document.body, limit)?,
            None => self.extractor.extract(&document.body)?,
        };
        log::info!("Extracted {} ranked item(s)", items.len());

        Ok(match timestamp {
            Some(ts) => Snapshot::at(ts, items),
            None => Snapshot::capture(items),
        })
    }

    /// Run the full pipeline once.
    ///
    /// History is saved only after extraction succeeded, and before any
    /// message goes out.
    pub async fn run(&self, options: RunOptions) -> Result<RunReport> {
        self.run_at(options, None).await
    }

    /// [`run`](Self::run) with a fixed snapshot timestamp.
    pub async fn run_at(
        &self,
        options: RunOptions,
        timestamp: Option<DateTime<FixedOffset>>,
    ) -> Result<RunReport> {
        log::info!("Step 1/4: Fetching ranking");
        let snapshot = self.scrape_at(options.limit, timestamp).await?;

        log::info!("Step 2/4: Comparing with history");
        let loaded = self.storage.load().await;
        let first_run = loaded.is_empty();
        let window = loaded.append(snapshot.clone());

        let analysis = if first_run {
            None
        } else {
            window
                .previous()
                .map(|previous| analyze(&snapshot.items, previous))
        };
        if let Some(analysis) = &analysis {
            log::info!(
                "Changes: {} new, {} moved, {} dropped",
                analysis.new_entries.len(),
                analysis.rank_changes.len(),
                analysis.dropped_out.len()
            );
        }

        log::info!("Step 3/4: Saving history");
        if options.dry_run {
            log::info!("Dry run: history not saved");
        } else {
            self.storage.save(&window).await?;
        }

        log::info!("Step 4/4: Delivering message");
        let ranking_text = snapshot.render();
        let summary = self.summarize(&snapshot.items, analysis.as_ref()).await;
        let message = compose_message(&ranking_text, summary.as_deref());

        match (&self.notifier, options.dry_run) {
            (Some(notifier), false) => notifier.send(&message).await?,
            (None, false) => log::info!("No notifier configured; message not sent"),
            (_, true) => log::info!("Dry run: message not sent"),
        }

        Ok(RunReport {
            snapshot,
            analysis,
            first_run,
            message,
        })
    }

    /// Best-effort summary; failures are logged and dropped.
    async fn summarize(
        &self,
        items: &[RankedItem],
        analysis: Option<&ChangeAnalysis>,
    ) -> Option<String> {
        let summarizer = self.summarizer.as_ref()?;
        let top = &items[..items.len().min(self.summary_ranking_limit)];
        let ranking_text = render_items(top);

        let request = match analysis {
            Some(analysis) => SummaryRequest::Changes {
                analysis,
                ranking_text: &ranking_text,
            },
            None => SummaryRequest::FirstRun {
                ranking_text: &ranking_text,
            },
        };

        match summarizer.summarize(request).await {
            Ok(summary) => {
                log::info!("Summary generated ({} chars)", summary.chars().count());
                Some(summary)
            }
            Err(e) => {
                log::error!("Summary generation failed: {}", e);
                None
            }
        }
    }
}
