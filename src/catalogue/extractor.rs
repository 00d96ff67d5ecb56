//! Listing detail-page extraction
//!
//! Every field is an independent fallible lookup. A record is assembled only
//! when all lookups succeed; otherwise the listing degrades to the blank
//! record and the cause is kept as a diagnostic. Extraction never fails the
//! crawl.

use crate::catalogue::model::{AdRecord, CONDITION_NEW};
use crate::client::{FetchError, PageSource};
use scraper::{ElementRef, Html, Selector};
use thiserror::Error;
use url::Url;

const TITLE_SELECTOR: &str = r#"[data-marker="item-view/title-info"]"#;
const DESCRIPTION_SELECTOR: &str = r#"[data-marker="item-view/item-description"]"#;
const PRICE_SELECTOR: &str = r#"[data-marker="item-view/item-price"]"#;
const SELLER_SELECTOR: &str = r#"[data-marker="seller-info/name"]"#;
const VIEWS_SELECTOR: &str = r#"[data-marker="item-view/total-views"]"#;
const PARAM_ROW_SELECTOR: &str = r#"li[class*="params-paramsList__item"]"#;

/// Why a listing degraded to the blank record
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("detail fetch failed: {0}")]
    Fetch(#[from] FetchError),

    #[error("listing path cannot be resolved: {0}")]
    InvalidUrl(String),

    #[error("invalid selector {0}")]
    Selector(&'static str),

    #[error("missing field: {0}")]
    MissingField(&'static str),

    #[error("price attribute is not a non-negative integer: {0:?}")]
    InvalidPrice(String),
}

/// Outcome of extracting one listing
#[derive(Debug, Clone)]
pub struct Extraction {
    pub record: AdRecord,

    /// Set when the record fell back to defaults
    pub degradation: Option<ExtractionError>,
}

impl Extraction {
    pub fn degraded(url: impl Into<String>, cause: ExtractionError) -> Self {
        Self {
            record: AdRecord::blank(url),
            degradation: Some(cause),
        }
    }

    pub fn is_degraded(&self) -> bool {
        self.degradation.is_some()
    }
}

/// Text markers that identify a "new" condition parameter row
///
/// A row is the condition parameter when it contains one of `labels`. Its
/// value is the text after the label (after the first `:` when there is
/// one), and it is new when that value starts with one of `new_values`.
/// Matching is case-sensitive, so `Condition: New` is new while
/// `Condition: Like New` is not.
#[derive(Debug, Clone)]
pub struct ConditionMarkers {
    /// Any of these marks the row as the condition parameter
    pub labels: Vec<String>,

    /// Prefixes of a condition value that mean new
    pub new_values: Vec<String>,
}

impl Default for ConditionMarkers {
    fn default() -> Self {
        Self {
            labels: vec!["Состояние".to_string(), "Condition".to_string()],
            new_values: vec!["Нов".to_string(), "New".to_string()],
        }
    }
}

impl ConditionMarkers {
    fn matches(&self, row_text: &str) -> bool {
        self.labels.iter().any(|label| {
            row_text
                .find(label.as_str())
                .map(|at| condition_value(&row_text[at + label.len()..]))
                .is_some_and(|value| {
                    self.new_values
                        .iter()
                        .any(|marker| value.starts_with(marker.as_str()))
                })
        })
    }
}

fn condition_value(after_label: &str) -> &str {
    let value = match after_label.split_once(':') {
        Some((_, value)) => value,
        None => after_label,
    };
    value.trim()
}

/// Parses listing detail pages into records
#[derive(Debug, Clone, Default)]
pub struct PageExtractor {
    markers: ConditionMarkers,
}

impl PageExtractor {
    pub fn new(markers: ConditionMarkers) -> Self {
        Self { markers }
    }

    /// Fetches a listing and extracts its record
    ///
    /// Never fails: a fetch error or any missing field yields the blank
    /// record for `url` with the cause attached.
    pub async fn extract<S>(&self, source: &S, url: &Url) -> Extraction
    where
        S: PageSource + ?Sized,
    {
        let outcome = match source.fetch(url).await {
            Ok(html) => self.parse(&html, url),
            Err(e) => Err(ExtractionError::Fetch(e)),
        };

        match outcome {
            Ok(record) => Extraction {
                record,
                degradation: None,
            },
            Err(cause) => {
                tracing::warn!("Listing {} degraded to defaults: {}", url, cause);
                Extraction::degraded(url.as_str(), cause)
            }
        }
    }

    /// Extracts a record from detail-page HTML
    pub fn parse(&self, html: &str, url: &Url) -> Result<AdRecord, ExtractionError> {
        let document = Html::parse_document(html);

        let title = element_text(first(&document, TITLE_SELECTOR, "title")?);
        let description = element_text(first(&document, DESCRIPTION_SELECTOR, "description")?);
        let price = parse_price(
            first(&document, PRICE_SELECTOR, "price")?
                .value()
                .attr("content")
                .ok_or(ExtractionError::MissingField("price"))?,
        )?;
        let seller_name = element_text(first(&document, SELLER_SELECTOR, "seller_name")?);
        let views = leading_token(&element_text(first(&document, VIEWS_SELECTOR, "views")?))
            .ok_or(ExtractionError::MissingField("views"))?;
        let condition = self.condition(&document)?;

        Ok(AdRecord {
            title,
            description,
            price,
            seller_name,
            condition,
            views,
            url: url.to_string(),
        })
    }

    /// Scans parameter rows; the first row carrying both markers wins
    fn condition(&self, document: &Html) -> Result<String, ExtractionError> {
        let rows = selector(PARAM_ROW_SELECTOR)?;

        let is_new = document
            .select(&rows)
            .any(|row| self.markers.matches(&row.text().collect::<String>()));

        Ok(if is_new {
            CONDITION_NEW.to_string()
        } else {
            String::new()
        })
    }
}

fn selector(css: &'static str) -> Result<Selector, ExtractionError> {
    Selector::parse(css).map_err(|_| ExtractionError::Selector(css))
}

fn first<'a>(
    document: &'a Html,
    css: &'static str,
    field: &'static str,
) -> Result<ElementRef<'a>, ExtractionError> {
    let selector = selector(css)?;
    document
        .select(&selector)
        .next()
        .ok_or(ExtractionError::MissingField(field))
}

fn element_text(element: ElementRef<'_>) -> String {
    element.text().collect::<String>().trim().to_string()
}

/// First whitespace-delimited token, e.g. "123" from "123 просмотра"
fn leading_token(text: &str) -> Option<String> {
    text.split_whitespace().next().map(str::to_string)
}

fn parse_price(raw: &str) -> Result<u64, ExtractionError> {
    raw.trim()
        .parse::<u64>()
        .map_err(|_| ExtractionError::InvalidPrice(raw.to_string()))
}
