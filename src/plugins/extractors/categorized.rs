use scraper::{ElementRef, Html, Selector};
use tracing::debug;

use super::{clean_text, parse_selector, regions};
use crate::models::{BiomarkerSet, CategoryGroup};
use crate::plugins::traits::{DocumentContext, ExtractionStrategy};
use crate::utils::error::Result;

/// Markers grouped under bold category labels:
///
/// ```html
/// <li><strong>Lever</strong><ul><li>ALAT</li><li>ASAT</li></ul></li>
/// ```
pub struct CategorizedStrategy {
    region: Selector,
    label: Selector,
    sub_list: Selector,
    item: Selector,
}

impl CategorizedStrategy {
    pub fn new(region: &str) -> Result<Self> {
        Ok(Self {
            region: parse_selector(region)?,
            label: parse_selector("li > strong")?,
            sub_list: parse_selector("ul")?,
            item: parse_selector("li")?,
        })
    }

    fn closest_li<'a>(label: &ElementRef<'a>) -> Option<ElementRef<'a>> {
        label
            .ancestors()
            .filter_map(ElementRef::wrap)
            .find(|el| el.value().name() == "li")
    }
}

impl ExtractionStrategy for CategorizedStrategy {
    fn name(&self) -> &str {
        "categorized"
    }

    fn extract(&self, document: &Html, _context: &DocumentContext) -> Result<BiomarkerSet> {
        let mut groups = Vec::new();

        for region in regions(document, &self.region) {
            for label in region.select(&self.label) {
                let category = clean_text(&label);
                let Some(list) = Self::closest_li(&label).and_then(|li| li.select(&self.sub_list).next()) else {
                    continue;
                };

                let markers: Vec<String> = list
                    .select(&self.item)
                    .map(|li| clean_text(&li))
                    .filter(|text| !text.is_empty())
                    .collect();

                if !markers.is_empty() {
                    debug!("Category '{}': {} markers", category, markers.len());
                    groups.push(CategoryGroup { category, markers });
                }
            }
        }

        if groups.is_empty() {
            return Ok(BiomarkerSet::empty());
        }
        Ok(BiomarkerSet::Categorized(groups))
    }
}
