use scraper::Html;

use crate::models::BiomarkerSet;
use crate::plugins::traits::{DocumentContext, ExtractionStrategy};
use crate::utils::error::Result;

/// A fixed, configured marker list for a product line whose pages carry no
/// usable structure.
pub struct StaticListStrategy {
    key: String,
    markers: Vec<String>,
}

impl StaticListStrategy {
    pub fn new(key: impl Into<String>, markers: Vec<String>) -> Self {
        Self {
            key: key.into(),
            markers,
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }
}

impl ExtractionStrategy for StaticListStrategy {
    fn name(&self) -> &str {
        "static_list"
    }

    fn extract(&self, _document: &Html, _context: &DocumentContext) -> Result<BiomarkerSet> {
        Ok(BiomarkerSet::Flat(self.markers.clone()))
    }
}
