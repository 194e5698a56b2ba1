pub mod biomarker;
pub mod catalog;
pub mod product;

// Re-exports for convenience
pub use biomarker::*;
pub use catalog::*;
pub use product::*;
