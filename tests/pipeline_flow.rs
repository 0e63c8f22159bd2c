//! End-to-end runs through the public API with in-memory collaborators.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset};
use tempfile::TempDir;

use ranking_watch::error::{AppError, Result};
use ranking_watch::models::Config;
use ranking_watch::pipeline::{RankingPipeline, RunOptions};
use ranking_watch::services::{Fetcher, HttpResponse, Notifier, RetryPolicy, Transport};
use ranking_watch::storage::{HistoryStorage, LocalHistoryStore};

/// Serves one queued page per request.
struct PageQueue {
    pages: Mutex<VecDeque<String>>,
}

#[async_trait]
impl Transport for PageQueue {
    async fn get(&self, _url: &str) -> Result<HttpResponse> {
        let page = self.pages.lock().unwrap().pop_front();
        Ok(match page {
            Some(body) => HttpResponse { status: 200, body },
            None => HttpResponse {
                status: 503,
                body: String::new(),
            },
        })
    }
}

/// Records sent messages; clones share the same buffer.
#[derive(Clone, Default)]
struct Outbox {
    messages: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl Notifier for Outbox {
    async fn send(&self, message: &str) -> Result<()> {
        self.messages.lock().unwrap().push(message.to_string());
        Ok(())
    }
}

fn ranking_page(titles: &[&str]) -> String {
    let blocks: String = titles
        .iter()
        .enumerate()
        .map(|(i, title)| {
            format!(
                r#"<div class="_cDEzb_grid-cell_1uMOS">
                     <div id="B0FLOW{i:04}" class="p13n-sc-uncoverable-faceout">
                       <a class="a-link-normal aok-block" href="/dp/B0FLOW{i:04}">
                         <div class="_cDEzb_p13n-sc-css-line-clamp-1_1Fn1y">{title}</div>
                       </a>
                       <div class="a-icon-row"><a aria-label="5つ星のうち4.2、88件のグローバル評価" href="/r">★</a></div>
                       <span class="_cDEzb_p13n-sc-price_3mJ9Z">¥1,100</span>
                     </div>
                   </div>"#
            )
        })
        .collect();
    format!("<html><body><div id=\"zg\">{blocks}</div></body></html>")
}

fn at(ts: &str) -> Option<DateTime<FixedOffset>> {
    Some(DateTime::parse_from_rfc3339(ts).unwrap())
}

fn build(dir: &TempDir, pages: Vec<String>, outbox: &Outbox) -> RankingPipeline {
    let config = Config::default();
    let fetcher = Fetcher::new(
        Box::new(PageQueue {
            pages: Mutex::new(pages.into()),
        }),
        RetryPolicy {
            max_retries: 2,
            backoff_unit: Duration::from_millis(1),
        },
    );
    let store = LocalHistoryStore::new(dir.path().join("data/history.json"), 3);
    RankingPipeline::new(&config, fetcher, Box::new(store))
        .unwrap()
        .with_notifier(Box::new(outbox.clone()))
}

#[tokio::test]
async fn test_window_rolls_over_after_four_runs() {
    let dir = TempDir::new().unwrap();
    let outbox = Outbox::default();
    let pages = vec![
        ranking_page(&["A", "B", "C"]),
        ranking_page(&["B", "A", "C"]),
        ranking_page(&["B", "C", "D"]),
        ranking_page(&["D", "B", "C"]),
    ];
    let pipeline = build(&dir, pages, &outbox);
    let stamps = [
        "2026-03-01T09:00:00+09:00",
        "2026-03-02T09:00:00+09:00",
        "2026-03-03T09:00:00+09:00",
        "2026-03-04T09:00:00+09:00",
    ];

    let mut reports = Vec::new();
    for ts in stamps {
        reports.push(pipeline.run_at(RunOptions::default(), at(ts)).await.unwrap());
    }

    assert!(reports[0].first_run);
    assert!(reports[1..].iter().all(|r| !r.first_run));

    let third = reports[2].analysis.as_ref().unwrap();
    assert_eq!(third.new_entries[0].title, "D");
    assert_eq!(third.dropped_out[0].title, "A");

    let fourth = reports[3].analysis.as_ref().unwrap();
    assert!(fourth.new_entries.is_empty());
    assert_eq!(fourth.rank_changes.len(), 3);

    let window = LocalHistoryStore::new(dir.path().join("data/history.json"), 3)
        .load()
        .await;
    assert_eq!(window.len(), 3);
    let kept: Vec<String> = window
        .iter()
        .map(|s| s.timestamp.to_rfc3339())
        .collect();
    assert_eq!(
        kept,
        vec![
            "2026-03-04T09:00:00+09:00",
            "2026-03-03T09:00:00+09:00",
            "2026-03-02T09:00:00+09:00",
        ]
    );

    assert_eq!(outbox.messages.lock().unwrap().len(), 4);
}

#[tokio::test]
async fn test_history_file_shape() {
    let dir = TempDir::new().unwrap();
    let outbox = Outbox::default();
    let pipeline = build(&dir, vec![ranking_page(&["薬屋のひとりごと"])], &outbox);

    pipeline
        .run_at(RunOptions::default(), at("2026-03-01T09:00:00+09:00"))
        .await
        .unwrap();

    let raw = std::fs::read_to_string(dir.path().join("data/history.json")).unwrap();
    let json: serde_json::Value = serde_json::from_str(&raw).unwrap();
    let entry = &json["history"][0];
    assert_eq!(entry["timestamp"], "2026-03-01T09:00:00+09:00");
    let item = &entry["rankings"][0];
    assert_eq!(item["rank"], 1);
    assert_eq!(item["title"], "薬屋のひとりごと");
    assert_eq!(item["rating"], 4.2);
    assert_eq!(item["review_count"], 88);
    assert_eq!(item["price"], "¥1,100");
    assert_eq!(item["url"], "https://www.amazon.co.jp/dp/B0FLOW0000");
}

#[tokio::test]
async fn test_failed_fetch_keeps_previous_history() {
    let dir = TempDir::new().unwrap();
    let outbox = Outbox::default();
    let pipeline = build(&dir, vec![ranking_page(&["A"])], &outbox);

    pipeline.run(RunOptions::default()).await.unwrap();
    let err = pipeline.run(RunOptions::default()).await.unwrap_err();

    assert!(matches!(err, AppError::Acquisition { attempts: 2, .. }));
    assert_eq!(err.exit_code(), 10);

    let window = LocalHistoryStore::new(dir.path().join("data/history.json"), 3)
        .load()
        .await;
    assert_eq!(window.len(), 1);
    assert_eq!(outbox.messages.lock().unwrap().len(), 1);
}
