use scraper::Html;

use crate::models::BiomarkerSet;
use crate::utils::error::Result;

/// What is known about the page besides its markup.
#[derive(Debug, Clone, Default)]
pub struct DocumentContext {
    pub url: String,
    pub product_name: String,
}

impl DocumentContext {
    pub fn new(url: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            product_name: product_name.into(),
        }
    }
}

/// A structural heuristic that pulls biomarkers out of a rendered document.
///
/// "Nothing found" is an empty set, never an error. Errors are reserved for
/// failures of the document query itself.
pub trait ExtractionStrategy: Send + Sync {
    fn name(&self) -> &str;

    fn extract(&self, document: &Html, context: &DocumentContext) -> Result<BiomarkerSet>;
}
