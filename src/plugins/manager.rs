use scraper::Html;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, warn};

use super::classifier::ItemClassifier;
use super::extractors::{CategorizedStrategy, FlatListStrategy, OrderedListStrategy, StaticListStrategy};
use super::traits::{DocumentContext, ExtractionStrategy};
use crate::config::AppConfig;
use crate::models::BiomarkerSet;
use crate::scraper::RenderSession;
use crate::utils::error::Result;

pub type StrategyBox = Arc<dyn ExtractionStrategy>;

/// Which family of page a document belongs to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DocumentShape {
    Standard,
    /// A product line with a configured static marker list, named by its key.
    KnownLine(String),
}

/// Result of running the strategy chain over one snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct ExtractionOutcome {
    pub biomarkers: BiomarkerSet,
    /// Name of the strategy that produced a non-empty set.
    pub strategy: Option<String>,
}

impl ExtractionOutcome {
    fn empty() -> Self {
        Self {
            biomarkers: BiomarkerSet::empty(),
            strategy: None,
        }
    }
}

/// Precedence-ordered biomarker strategies plus per-shape fallbacks.
///
/// The structural strategies run for every document. A document classified as
/// a known product line additionally gets that line's static strategy as the
/// last resort.
#[derive(Clone, Default)]
pub struct BiomarkerExtractor {
    strategies: Vec<StrategyBox>,
    fallbacks: BTreeMap<String, StrategyBox>,
}

impl BiomarkerExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard chain: ordered lists, categorized lists, flat list, and
    /// one static fallback per configured product line.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let region = config.selectors.description.as_str();
        let vocabulary = &config.vocabulary;

        let mut extractor = Self::new();
        extractor.register(Arc::new(OrderedListStrategy::new(
            region,
            ItemClassifier::for_ordered_lists(vocabulary)?,
        )?));
        extractor.register(Arc::new(CategorizedStrategy::new(region)?));
        extractor.register(Arc::new(FlatListStrategy::new(
            region,
            ItemClassifier::excluding(&vocabulary.flat_list_exclusions),
        )?));

        for (key, markers) in &config.static_biomarkers {
            extractor.register_fallback(Arc::new(StaticListStrategy::new(key.as_str(), markers.clone())), key);
        }

        Ok(extractor)
    }

    /// Append a strategy at the lowest precedence so far.
    pub fn register(&mut self, strategy: StrategyBox) {
        debug!("Registered extraction strategy: {}", strategy.name());
        self.strategies.push(strategy);
    }

    pub fn register_fallback(&mut self, strategy: StrategyBox, key: &str) {
        self.fallbacks.insert(key.to_lowercase(), strategy);
    }

    pub fn strategy_names(&self) -> Vec<&str> {
        self.strategies.iter().map(|s| s.name()).collect()
    }

    /// Case-insensitive substring match of each fallback key against the
    /// product name and URL.
    pub fn classify(&self, context: &DocumentContext) -> DocumentShape {
        let name = context.product_name.to_lowercase();
        let url = context.url.to_lowercase();

        self.fallbacks
            .keys()
            .find(|key| name.contains(key.as_str()) || url.contains(key.as_str()))
            .map(|key| DocumentShape::KnownLine(key.clone()))
            .unwrap_or(DocumentShape::Standard)
    }

    fn chain_for(&self, shape: &DocumentShape) -> Vec<&StrategyBox> {
        let mut chain: Vec<&StrategyBox> = self.strategies.iter().collect();
        if let DocumentShape::KnownLine(key) = shape {
            if let Some(fallback) = self.fallbacks.get(key) {
                chain.push(fallback);
            }
        }
        chain
    }

    /// Run the chain over a parsed document; the first non-empty result wins.
    pub fn extract_from_document(&self, document: &Html, context: &DocumentContext) -> Result<ExtractionOutcome> {
        let shape = self.classify(context);
        if let DocumentShape::KnownLine(key) = &shape {
            debug!("Document classified as known product line '{}'", key);
        }

        for strategy in self.chain_for(&shape) {
            let biomarkers = strategy.extract(document, context)?;
            if !biomarkers.is_empty() {
                debug!(
                    "Strategy '{}' found {} biomarkers",
                    strategy.name(),
                    biomarkers.count().total
                );
                return Ok(ExtractionOutcome {
                    biomarkers,
                    strategy: Some(strategy.name().to_string()),
                });
            }
            debug!("Strategy '{}' found nothing", strategy.name());
        }

        Ok(ExtractionOutcome::empty())
    }

    pub fn extract_from_html(&self, html: &str, context: &DocumentContext) -> Result<ExtractionOutcome> {
        let document = Html::parse_document(html);
        self.extract_from_document(&document, context)
    }

    /// Snapshot the session's document and extract from it.
    pub async fn extract(&self, session: &dyn RenderSession, context: &DocumentContext) -> Result<ExtractionOutcome> {
        let html = session.content().await?;
        let outcome = self.extract_from_html(&html, context)?;
        if outcome.strategy.is_none() {
            warn!("No biomarkers found on {}", context.url);
        }
        Ok(outcome)
    }
}
