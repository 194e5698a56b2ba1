pub mod catalog;
pub mod cli;
pub mod config;
pub mod content_expander;
pub mod logging;
pub mod models;
pub mod page_loader;
pub mod plugins;
pub mod price;
pub mod product_visitor;
pub mod runner;
pub mod scraper;
pub mod store;
pub mod utils;

// Re-export commonly used types
pub use config::AppConfig;
pub use models::{BiomarkerSet, Catalog, ProductRecord, ProductStub};
pub use runner::{RunSummary, ScrapeRunner};
pub use utils::error::ScrapeError;

pub type Result<T> = std::result::Result<T, ScrapeError>;
