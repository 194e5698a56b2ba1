use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;

use crate::models::ProductRecord;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SourceInfo {
    #[serde(deserialize_with = "lenient_timestamp")]
    pub last_updated: DateTime<Utc>,
    pub product_count: usize,
}

/// The persisted `products.json` document.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Catalog {
    #[serde(deserialize_with = "lenient_timestamp")]
    pub scrape_timestamp: DateTime<Utc>,
    #[serde(default)]
    pub sources: BTreeMap<String, SourceInfo>,
    #[serde(default)]
    pub total_products: usize,
    #[serde(default)]
    pub products: Vec<ProductRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            scrape_timestamp: Utc::now(),
            sources: BTreeMap::new(),
            total_products: 0,
            products: Vec::new(),
        }
    }

    pub fn position_of(&self, link: &str) -> Option<usize> {
        self.products.iter().position(|p| p.link == link)
    }

    pub fn source_mut(&mut self, source_url: &str) -> &mut SourceInfo {
        self.sources
            .entry(source_url.to_string())
            .or_insert_with(|| SourceInfo {
                last_updated: Utc::now(),
                product_count: 0,
            })
    }

    pub fn products_from<'a>(&'a self, source_url: &'a str) -> impl Iterator<Item = &'a ProductRecord> {
        self.products.iter().filter(move |p| p.source_url == source_url)
    }
}

impl Default for Catalog {
    fn default() -> Self {
        Self::new()
    }
}

/// RFC 3339, or an offset-less ISO 8601 timestamp read as local time.
/// Catalogs written by older tooling carry the latter.
fn lenient_timestamp<'de, D>(deserializer: D) -> std::result::Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    parse_timestamp(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {:?}", raw)))
}

pub(crate) fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(parsed.with_timezone(&Utc));
    }
    let naive = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok()?;
    Some(
        Local
            .from_local_datetime(&naive)
            .earliest()
            .map(|local| local.with_timezone(&Utc))
            .unwrap_or_else(|| naive.and_utc()),
    )
}
