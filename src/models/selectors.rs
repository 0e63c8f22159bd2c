// src/models/selectors.rs

//! CSS selectors for scraping the ranking page.

use serde::{Deserialize, Serialize};

/// CSS selectors for locating items and their fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankingSelectors {
    /// Selector for each item block, in ranking order
    #[serde(default = "defaults::item_block")]
    pub item_block: String,

    /// Primary link of an item; blocks without it are skipped
    #[serde(default = "defaults::title_link")]
    pub title_link: String,

    /// Container holding the title text
    #[serde(default = "defaults::title_text")]
    pub title_text: String,

    /// Row holding the star rating link
    #[serde(default = "defaults::rating_row")]
    pub rating_row: String,

    /// Element inside the rating row that carries the label
    #[serde(default = "defaults::rating_link")]
    pub rating_link: String,

    /// Attribute on the rating element holding the label text
    #[serde(default = "defaults::rating_attr")]
    pub rating_attr: String,

    /// Price element
    #[serde(default = "defaults::price")]
    pub price: String,

    /// Element whose `id` attribute is the product identifier
    #[serde(default = "defaults::uncoverable_faceout")]
    pub uncoverable_faceout: String,

    /// Fallback element carrying the product identifier as an attribute
    #[serde(default = "defaults::data_id")]
    pub data_id: String,

    /// Attribute read from the fallback element
    #[serde(default = "defaults::data_id_attr")]
    pub data_id_attr: String,
}

impl Default for RankingSelectors {
    fn default() -> Self {
        Self {
            item_block: defaults::item_block(),
            title_link: defaults::title_link(),
            title_text: defaults::title_text(),
            rating_row: defaults::rating_row(),
            rating_link: defaults::rating_link(),
            rating_attr: defaults::rating_attr(),
            price: defaults::price(),
            uncoverable_faceout: defaults::uncoverable_faceout(),
            data_id: defaults::data_id(),
            data_id_attr: defaults::data_id_attr(),
        }
    }
}

mod defaults {
    pub fn item_block() -> String {
        "div._cDEzb_grid-cell_1uMOS".into()
    }
    pub fn title_link() -> String {
        "a.a-link-normal.aok-block".into()
    }
    pub fn title_text() -> String {
        "div._cDEzb_p13n-sc-css-line-clamp-1_1Fn1y".into()
    }
    pub fn rating_row() -> String {
        "div.a-icon-row".into()
    }
    pub fn rating_link() -> String {
        "a".into()
    }
    pub fn rating_attr() -> String {
        "aria-label".into()
    }
    pub fn price() -> String {
        "span._cDEzb_p13n-sc-price_3mJ9Z".into()
    }
    pub fn uncoverable_faceout() -> String {
        "div.p13n-sc-uncoverable-faceout".into()
    }
    pub fn data_id() -> String {
        "div[data-asin]".into()
    }
    pub fn data_id_attr() -> String {
        "data-asin".into()
    }
}
