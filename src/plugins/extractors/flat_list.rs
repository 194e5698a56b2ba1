use scraper::{Html, Selector};
use tracing::debug;

use super::{clean_text, parse_selector, regions};
use crate::models::BiomarkerSet;
use crate::plugins::classifier::ItemClassifier;
use crate::plugins::traits::{DocumentContext, ExtractionStrategy};
use crate::utils::error::Result;

/// Items of the first `<ul>` in the description region.
pub struct FlatListStrategy {
    region: Selector,
    list: Selector,
    item: Selector,
    classifier: ItemClassifier,
}

impl FlatListStrategy {
    pub fn new(region: &str, classifier: ItemClassifier) -> Result<Self> {
        Ok(Self {
            region: parse_selector(region)?,
            list: parse_selector("ul")?,
            item: parse_selector("li")?,
            classifier,
        })
    }
}

impl ExtractionStrategy for FlatListStrategy {
    fn name(&self) -> &str {
        "flat_list"
    }

    fn extract(&self, document: &Html, _context: &DocumentContext) -> Result<BiomarkerSet> {
        let Some(list) = regions(document, &self.region).find_map(|region| region.select(&self.list).next())
        else {
            return Ok(BiomarkerSet::empty());
        };

        let markers: Vec<String> = list
            .select(&self.item)
            .map(|li| clean_text(&li))
            .filter(|text| !text.is_empty())
            .filter(|text| self.classifier.accepts(text))
            .collect();

        debug!("Flat list: {} biomarkers", markers.len());
        Ok(BiomarkerSet::Flat(markers))
    }
}
