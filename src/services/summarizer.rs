// src/services/summarizer.rs

//! Generated commentary on the ranking.
//!
//! The summary is garnish on top of the ranking message: callers treat any
//! failure here as "no summary", never as a failed run.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::SummaryConfig;
use crate::pipeline::ChangeAnalysis;
use crate::utils::http::create_api_client;

const SYSTEM_CHANGES: &str = "\
あなたはKindle電子書籍の売れ筋ランキングを解説するアナリストです。
前回と今回のランキングの違いから、読者に伝えるべき変化を2〜3文でまとめてください。
新しく入った作品、大きく動いた作品、全体の傾向に触れ、絵文字を交えて簡潔に書いてください。";

const SYSTEM_FIRST_RUN: &str = "\
あなたはKindle電子書籍の売れ筋ランキングを解説するアナリストです。
今回のランキングの特徴を2〜3文でまとめてください。
上位作品の傾向、目立つジャンル、評価の高い作品に触れ、絵文字を交えて簡潔に書いてください。";

/// Number of new entries listed in the change digest.
const DIGEST_NEW_ENTRIES: usize = 3;
/// Number of movers listed in the change digest.
const DIGEST_MOVERS: usize = 3;
/// Minimum rank movement for a change to be worth mentioning.
const DIGEST_MIN_MOVE: u64 = 3;
/// Number of drop-outs listed in the change digest.
const DIGEST_DROPPED: usize = 2;

/// What the summarizer is asked to describe.
#[derive(Debug, Clone, Copy)]
pub enum SummaryRequest<'a> {
    /// No earlier ranking to compare against
    FirstRun { ranking_text: &'a str },
    /// Describe what changed since the previous ranking
    Changes {
        analysis: &'a ChangeAnalysis,
        ranking_text: &'a str,
    },
}

/// System instruction plus user prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: &'static str,
    pub user: String,
}

impl SummaryRequest<'_> {
    pub fn prompt(&self) -> Prompt {
        match self {
            Self::FirstRun { ranking_text } => Prompt {
                system: SYSTEM_FIRST_RUN,
                user: format!("今回のKindleランキングを分析してください。\n\n【ランキング】\n{ranking_text}"),
            },
            Self::Changes {
                analysis,
                ranking_text,
            } => Prompt {
                system: SYSTEM_CHANGES,
                user: format!(
                    "前回と今回のKindleランキングの変化を分析してください。\n\n【変化の内容】\n{}\n\n【今回のランキング】\n{}",
                    format_changes_digest(analysis),
                    ranking_text
                ),
            },
        }
    }
}

/// Produces a short natural-language summary.
#[async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String>;
}

/// Summarizer backed by the Gemini `generateContent` REST API.
pub struct GeminiSummarizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

impl GenerateResponse {
    /// Concatenated text of the first candidate.
    fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content
            .parts
            .iter()
            .filter_map(|p| p.text.as_deref())
            .collect();
        let text = text.trim();
        (!text.is_empty()).then(|| text.to_string())
    }
}

impl GeminiSummarizer {
    pub fn from_config(config: &SummaryConfig) -> Result<Self> {
        if config.gemini_api_key.trim().is_empty() {
            return Err(AppError::config("Gemini API key is not set"));
        }
        Ok(Self {
            client: create_api_client(config.timeout_secs)?,
            endpoint: config.gemini_endpoint.trim_end_matches('/').to_string(),
            api_key: config.gemini_api_key.clone(),
            model: config.gemini_model.clone(),
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
        })
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

#[async_trait]
impl Summarizer for GeminiSummarizer {
    async fn summarize(&self, request: SummaryRequest<'_>) -> Result<String> {
        let prompt = request.prompt();
        let body = GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: prompt.system,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: &prompt.user }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        };

        let response = self
            .client
            .post(self.url())
            .header("x-goog-api-key", &self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AppError::summary(format!(
                "Gemini API returned {}: {}",
                status.as_u16(),
                crate::utils::truncate_chars(&text, 300)
            )));
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .text()
            .ok_or_else(|| AppError::summary("Gemini API returned an empty response"))
    }
}

/// Condense a change analysis into the bullet digest used in prompts.
pub fn format_changes_digest(analysis: &ChangeAnalysis) -> String {
    let mut sections: Vec<String> = Vec::new();

    if !analysis.new_entries.is_empty() {
        let mut lines = vec!["【新規ランクイン】".to_string()];
        lines.extend(
            analysis
                .new_entries
                .iter()
                .take(DIGEST_NEW_ENTRIES)
                .map(|e| format!("- {}位: {}", e.rank, e.title)),
        );
        sections.push(lines.join("\n"));
    }

    let big_moves: Vec<_> = analysis
        .largest_movers()
        .into_iter()
        .filter(|c| c.magnitude() >= DIGEST_MIN_MOVE)
        .take(DIGEST_MOVERS)
        .collect();
    if !big_moves.is_empty() {
        let mut lines = vec!["【大きな順位変動】".to_string()];
        lines.extend(big_moves.iter().map(|c| {
            let arrow = if c.improved() { '↑' } else { '↓' };
            format!(
                "- {}: {}位→{}位（{}{}）",
                c.title,
                c.previous_rank,
                c.current_rank,
                arrow,
                c.magnitude()
            )
        }));
        sections.push(lines.join("\n"));
    }

    if !analysis.dropped_out.is_empty() {
        let mut lines = vec!["【ランク外】".to_string()];
        lines.extend(
            analysis
                .dropped_out
                .iter()
                .take(DIGEST_DROPPED)
                .map(|d| format!("- {}（前回{}位）", d.title, d.previous_rank)),
        );
        sections.push(lines.join("\n"));
    }

    sections.join("\n\n")
}

/// Prefix the ranking text with the summary, if there is one.
pub fn compose_message(ranking_text: &str, summary: Option<&str>) -> String {
    match summary {
        Some(summary) if !summary.trim().is_empty() => {
            format!("{}\n\n---\n\n{}", summary.trim(), ranking_text)
        }
        _ => ranking_text.to_string(),
    }
}
