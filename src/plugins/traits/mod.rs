pub mod extractor;

pub use extractor::{DocumentContext, ExtractionStrategy};
