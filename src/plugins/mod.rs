pub mod classifier;
pub mod extractors;
pub mod manager;
pub mod traits;

pub use classifier::{ClassifierRule, ItemClassifier, Verdict};
pub use manager::{BiomarkerExtractor, DocumentShape, ExtractionOutcome};
pub use traits::{DocumentContext, ExtractionStrategy};
