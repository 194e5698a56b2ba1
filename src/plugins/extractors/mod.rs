// Extraction strategy implementations
pub mod categorized;
pub mod flat_list;
pub mod ordered_list;
pub mod static_list;

pub use categorized::CategorizedStrategy;
pub use flat_list::FlatListStrategy;
pub use ordered_list::OrderedListStrategy;
pub use static_list::StaticListStrategy;

use scraper::{ElementRef, Html, Selector};

use crate::utils::error::{Result, ScrapeError};

pub(crate) fn parse_selector(selector: &str) -> Result<Selector> {
    Selector::parse(selector).map_err(|e| ScrapeError::selector(selector, e))
}

/// Text content with runs of whitespace collapsed to single spaces.
pub(crate) fn clean_text(element: &ElementRef) -> String {
    let raw: String = element.text().collect();
    raw.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub(crate) fn regions<'a>(document: &'a Html, region: &'a Selector) -> impl Iterator<Item = ElementRef<'a>> + 'a {
    document.select(region)
}
