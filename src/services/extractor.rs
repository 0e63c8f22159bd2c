// src/services/extractor.rs

//! Ranking extractor service.
//!
//! Turns the ranking page markup into ranked items using the configured CSS
//! selectors. Each field is looked up independently so a missing price or
//! rating only degrades that field; only a missing title link drops an item.

use regex::Regex;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{ExtractConfig, NO_URL, PRICE_UNKNOWN, RankedItem, Rating, TITLE_UNKNOWN};
use crate::utils::{fill_template, normalize_whitespace, parse_grouped_int};

/// Rating label formats, tried in order. Group 1 is the star value, group 2
/// the review count.
const RATING_PATTERNS: &[&str] = &[
    r"5つ星のうち\s*([0-9]+(?:\.[0-9]+)?)\s*、\s*([0-9][0-9,]*)\s*件",
    r"([0-9]+(?:\.[0-9]+)?) out of 5 stars,\s*([0-9][0-9,]*) ratings?",
];

/// Compiled selectors for one extraction pass.
struct CompiledSelectors {
    item_block: Selector,
    title_link: Selector,
    title_text: Selector,
    rating_row: Selector,
    rating_link: Selector,
    price: Selector,
    uncoverable_faceout: Selector,
    data_id: Selector,
}

/// Service that parses the ranking page into [`RankedItem`]s.
pub struct RankingExtractor {
    selectors: CompiledSelectors,
    rating_attr: String,
    data_id_attr: String,
    rating_patterns: Vec<Regex>,
    detail_url_template: String,
    limit: usize,
}

impl RankingExtractor {
    /// Compile the extractor from configuration.
    pub fn new(config: &ExtractConfig) -> Result<Self> {
        let s = &config.selectors;
        let selectors = CompiledSelectors {
            item_block: Self::parse_selector(&s.item_block)?,
            title_link: Self::parse_selector(&s.title_link)?,
            title_text: Self::parse_selector(&s.title_text)?,
            rating_row: Self::parse_selector(&s.rating_row)?,
            rating_link: Self::parse_selector(&s.rating_link)?,
            price: Self::parse_selector(&s.price)?,
            uncoverable_faceout: Self::parse_selector(&s.uncoverable_faceout)?,
            data_id: Self::parse_selector(&s.data_id)?,
        };

        let rating_patterns = RATING_PATTERNS
            .iter()
            .map(|p| {
                Regex::new(p).map_err(|e| AppError::config(format!("rating pattern: {e}")))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            selectors,
            rating_attr: s.rating_attr.clone(),
            data_id_attr: s.data_id_attr.clone(),
            rating_patterns,
            detail_url_template: config.detail_url_template.clone(),
            limit: config.limit,
        })
    }

    /// Extract up to the configured number of items.
    pub fn extract(&self, html: &str) -> Result<Vec<RankedItem>> {
        self.extract_with_limit(html, self.limit)
    }

    /// Extract up to `limit` items from `html`.
    ///
    /// The first `limit` item blocks in document order define the ranking;
    /// an item's rank is its block position, even if earlier blocks are
    /// skipped.
    pub fn extract_with_limit(&self, html: &str, limit: usize) -> Result<Vec<RankedItem>> {
        let document = Html::parse_document(html);
        let blocks: Vec<ElementRef> = document
            .select(&self.selectors.item_block)
            .take(limit)
            .collect();

        if blocks.is_empty() {
            return Err(AppError::structural_mismatch(
                "No item blocks found; the ranking page layout has probably changed",
            ));
        }

        let candidates = blocks.len();
        let items: Vec<RankedItem> = blocks
            .iter()
            .enumerate()
            .filter_map(|(i, block)| self.parse_block(block, i as u32 + 1))
            .collect();

        if items.is_empty() {
            return Err(AppError::EmptyResult { candidates });
        }

        if items.len() < candidates {
            log::warn!(
                "Parsed {} of {} item block(s); the rest had no title link",
                items.len(),
                candidates
            );
        }
        Ok(items)
    }

    /// Parse one item block. Returns `None` when the title link is missing.
    fn parse_block(&self, block: &ElementRef, rank: u32) -> Option<RankedItem> {
        if block.select(&self.selectors.title_link).next().is_none() {
            log::warn!("Skipping item at position {}: title link not found", rank);
            return None;
        }

        let title = self
            .title(block)
            .unwrap_or_else(|| TITLE_UNKNOWN.to_string());
        let rating = self.rating(block);
        let price = self
            .price(block)
            .unwrap_or_else(|| PRICE_UNKNOWN.to_string());
        let url = self
            .product_id(block)
            .map(|id| fill_template(&self.detail_url_template, &id))
            .unwrap_or_else(|| NO_URL.to_string());

        log::debug!("Parsed #{} {}", rank, title);

        Some(RankedItem {
            rank,
            title,
            rating,
            price,
            url,
        })
    }

    fn title(&self, block: &ElementRef) -> Option<String> {
        first_text(block, &self.selectors.title_text)
    }

    fn rating(&self, block: &ElementRef) -> Option<Rating> {
        let row = block.select(&self.selectors.rating_row).next()?;
        let link = row.select(&self.selectors.rating_link).next()?;
        let label = link.value().attr(&self.rating_attr)?;
        parse_rating_label(label, &self.rating_patterns)
    }

    fn price(&self, block: &ElementRef) -> Option<String> {
        first_text(block, &self.selectors.price)
    }

    /// Product identifier: the faceout element's `id`, then a data
    /// attribute on a nested element, then the same attribute on the block.
    fn product_id(&self, block: &ElementRef) -> Option<String> {
        let from_faceout = || {
            block
                .select(&self.selectors.uncoverable_faceout)
                .find_map(|el| non_empty(el.value().attr("id")))
        };
        let from_nested = || {
            block
                .select(&self.selectors.data_id)
                .find_map(|el| non_empty(el.value().attr(&self.data_id_attr)))
        };
        let from_block = || non_empty(block.value().attr(&self.data_id_attr));

        from_faceout().or_else(from_nested).or_else(from_block)
    }

    fn parse_selector(s: &str) -> Result<Selector> {
        Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
    }
}

/// Normalised text of the first element matching `selector`, if non-empty.
fn first_text(block: &ElementRef, selector: &Selector) -> Option<String> {
    let element = block.select(selector).next()?;
    let text = normalize_whitespace(&element.text().collect::<String>());
    (!text.is_empty()).then_some(text)
}

fn non_empty(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}

/// Parse a star-rating label such as `5つ星のうち4.5、12,345件`.
fn parse_rating_label(label: &str, patterns: &[Regex]) -> Option<Rating> {
    patterns.iter().find_map(|pattern| {
        let caps = pattern.captures(label)?;
        let stars: f64 = caps.get(1)?.as_str().parse().ok()?;
        let review_count = parse_grouped_int(caps.get(2)?.as_str())?;
        (0.0..=5.0).contains(&stars).then_some(Rating {
            stars,
            review_count,
        })
    })
}
