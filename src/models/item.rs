//! Ranked item data structure.

use serde::{Deserialize, Serialize};

/// Title used when the title container is missing.
pub const TITLE_UNKNOWN: &str = "タイトル不明";

/// Price used when the price element is missing.
pub const PRICE_UNKNOWN: &str = "価格不明";

/// URL used when no product identifier could be recovered.
pub const NO_URL: &str = "URLなし";

/// Rating line used when the item carries no rating.
pub const NO_RATING: &str = "評価なし";

/// Star rating together with the number of reviews behind it.
///
/// The storefront always shows both or neither, so they travel together.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Rating {
    /// Stars out of 5
    pub stars: f64,
    /// Number of customer reviews
    pub review_count: u64,
}

/// One entry of a ranking snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "ItemRecord", into = "ItemRecord")]
pub struct RankedItem {
    /// 1-based position in the ranking
    pub rank: u32,

    /// Display title, also the identity key across snapshots
    pub title: String,

    /// Star rating, if the listing shows one
    pub rating: Option<Rating>,

    /// Price as displayed (opaque text)
    pub price: String,

    /// Absolute detail page URL, or [`NO_URL`]
    pub url: String,
}

impl RankedItem {
    /// Create an item with sentinel price/URL and no rating.
    pub fn new(rank: u32, title: impl Into<String>) -> Self {
        Self {
            rank,
            title: title.into(),
            rating: None,
            price: PRICE_UNKNOWN.to_string(),
            url: NO_URL.to_string(),
        }
    }

    /// Star rating, if any.
    pub fn stars(&self) -> Option<f64> {
        self.rating.map(|r| r.stars)
    }

    /// Review count, if any.
    pub fn review_count(&self) -> Option<u64> {
        self.rating.map(|r| r.review_count)
    }

    /// Render the four-line message block for this item.
    pub fn to_message_block(&self) -> String {
        let rating_line = match self.rating {
            Some(rating) => format!(
                "⭐️{:.1}({}件)",
                rating.stars,
                group_thousands(rating.review_count)
            ),
            None => NO_RATING.to_string(),
        };

        [
            format!("{}位|{}", self.rank, self.title),
            rating_line,
            self.price.clone(),
            self.url.clone(),
        ]
        .join("\n")
    }
}

/// Flat machine-readable form of a [`RankedItem`].
///
/// This is the shape stored in the history file and handed to collaborators
/// that need structured data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemRecord {
    pub rank: u32,
    pub title: String,
    #[serde(default)]
    pub rating: Option<f64>,
    #[serde(default)]
    pub review_count: Option<u64>,
    #[serde(default = "default_price")]
    pub price: String,
    #[serde(default = "default_url")]
    pub url: String,
}

fn default_price() -> String {
    PRICE_UNKNOWN.to_string()
}

fn default_url() -> String {
    NO_URL.to_string()
}

impl From<ItemRecord> for RankedItem {
    fn from(record: ItemRecord) -> Self {
        // A half-present rating cannot be shown, so it is dropped.
        let rating = match (record.rating, record.review_count) {
            (Some(stars), Some(review_count)) => Some(Rating {
                stars,
                review_count,
            }),
            _ => None,
        };

        Self {
            rank: record.rank,
            title: record.title,
            rating,
            price: record.price,
            url: record.url,
        }
    }
}

impl From<RankedItem> for ItemRecord {
    fn from(item: RankedItem) -> Self {
        Self {
            rank: item.rank,
            rating: item.stars(),
            review_count: item.review_count(),
            title: item.title,
            price: item.price,
            url: item.url,
        }
    }
}

impl From<&RankedItem> for ItemRecord {
    fn from(item: &RankedItem) -> Self {
        ItemRecord::from(item.clone())
    }
}

/// Format an integer with `,` thousands separators.
fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}
