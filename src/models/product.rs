use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::models::BiomarkerSet;

/// Minimal listing entry, produced before the detail page is visited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProductStub {
    pub name: String,
    pub link: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ProductRecord {
    pub name: String,
    pub link: String,
    #[serde(default)]
    pub source_url: String,

    // Numeric or null; zero only ever appears on skipped records
    #[serde(with = "rust_decimal::serde::float_option", default)]
    pub price: Option<Decimal>,

    #[serde(default)]
    pub biomarkers: BiomarkerSet,
    #[serde(default)]
    pub biomarker_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category_count: Option<usize>,
    #[serde(default)]
    pub extraction_attempts: u32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default)]
    pub skipped: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

impl ProductRecord {
    pub fn new(stub: &ProductStub, source_url: &str) -> Self {
        Self {
            name: stub.name.clone(),
            link: stub.link.clone(),
            source_url: source_url.to_string(),
            price: None,
            biomarkers: BiomarkerSet::empty(),
            biomarker_count: 0,
            category_count: None,
            extraction_attempts: 0,
            error: None,
            skipped: false,
            reason: None,
        }
    }

    /// Store the biomarker set together with its derived counts.
    pub fn set_biomarkers(&mut self, biomarkers: BiomarkerSet) {
        let count = biomarkers.count();
        self.biomarker_count = count.total;
        self.category_count = count.categories;
        self.biomarkers = biomarkers;
    }

    /// Reset to the shape shared by load failures and unexpected errors.
    pub fn fail(&mut self, error: impl Into<String>) {
        self.price = None;
        self.set_biomarkers(BiomarkerSet::empty());
        self.error = Some(error.into());
    }

    pub fn skip(&mut self, reason: impl Into<String>) {
        self.price = Some(Decimal::ZERO);
        self.set_biomarkers(BiomarkerSet::empty());
        self.skipped = true;
        self.reason = Some(reason.into());
    }
}
