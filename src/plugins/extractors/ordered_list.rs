use scraper::{Html, Selector};
use tracing::debug;

use super::{clean_text, parse_selector, regions};
use crate::models::BiomarkerSet;
use crate::plugins::classifier::ItemClassifier;
use crate::plugins::traits::{DocumentContext, ExtractionStrategy};
use crate::utils::error::Result;

/// Biomarkers from `<ol>` lists in the description region.
///
/// Ordered lists are the highest-fidelity source on this kind of site, but
/// they also carry numbered ordering instructions, so every item goes through
/// the classifier cascade.
pub struct OrderedListStrategy {
    region: Selector,
    list: Selector,
    item: Selector,
    classifier: ItemClassifier,
}

impl OrderedListStrategy {
    pub fn new(region: &str, classifier: ItemClassifier) -> Result<Self> {
        Ok(Self {
            region: parse_selector(region)?,
            list: parse_selector("ol")?,
            item: parse_selector("li")?,
            classifier,
        })
    }
}

impl ExtractionStrategy for OrderedListStrategy {
    fn name(&self) -> &str {
        "ordered_list"
    }

    fn extract(&self, document: &Html, _context: &DocumentContext) -> Result<BiomarkerSet> {
        let mut markers = Vec::new();
        let mut lists = 0;

        for region in regions(document, &self.region) {
            for list in region.select(&self.list) {
                lists += 1;
                markers.extend(
                    list.select(&self.item)
                        .map(|li| clean_text(&li))
                        .filter(|text| !text.is_empty())
                        .filter(|text| self.classifier.accepts(text)),
                );
            }
        }

        debug!("Ordered lists: {} lists, {} biomarkers", lists, markers.len());
        Ok(BiomarkerSet::Flat(markers))
    }
}
