use clap::{Parser, Subcommand};
use std::fmt::Write;
use std::path::PathBuf;

use crate::config::AppConfig;
use crate::models::Catalog;

#[derive(Parser, Debug)]
#[command(name = "bloodkit-scraper", version, about = "Scrape blood-test kit catalogs into a JSON product store")]
pub struct Cli {
    /// Extra configuration file layered over config/ and the defaults
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Walk the listings and merge every product into the store
    Scrape {
        /// Listing URL to scrape; repeatable. Replaces sources.listing_urls
        #[arg(long = "url")]
        urls: Vec<String>,

        /// Catalog file to merge into
        #[arg(long)]
        output: Option<PathBuf>,

        /// Show the browser window
        #[arg(long)]
        headful: bool,
    },
    /// Summarize a stored catalog
    Stats {
        #[arg(long)]
        file: Option<PathBuf>,
    },
}

impl Command {
    /// Fold command-line overrides into the loaded configuration.
    pub fn apply(&self, config: &mut AppConfig) {
        match self {
            Command::Scrape { urls, output, headful } => {
                if !urls.is_empty() {
                    config.sources.listing_urls = urls.clone();
                }
                if let Some(output) = output {
                    config.storage.output_path = output.clone();
                }
                if *headful {
                    config.scraper.headless = false;
                }
            }
            Command::Stats { file } => {
                if let Some(file) = file {
                    config.storage.output_path = file.clone();
                }
            }
        }
    }
}

pub fn render_stats(catalog: &Catalog) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "Scraped at:     {}", catalog.scrape_timestamp.to_rfc3339());
    let _ = writeln!(out, "Total products: {}", catalog.total_products);

    let _ = writeln!(out, "\nSources:");
    for (url, info) in &catalog.sources {
        let _ = writeln!(
            out,
            "  {} ({} products, updated {})",
            url,
            info.product_count,
            info.last_updated.to_rfc3339()
        );
    }

    let _ = writeln!(out, "\nProducts:");
    for product in &catalog.products {
        let price = product
            .price
            .map(|p| format!("€{}", p))
            .unwrap_or_else(|| "n/a".to_string());
        let categories = product
            .category_count
            .map(|c| format!(" in {} categories", c))
            .unwrap_or_default();
        let _ = write!(
            out,
            "  {} | {} | {} biomarkers{}",
            product.name, price, product.biomarker_count, categories
        );
        if let Some(error) = &product.error {
            let _ = write!(out, " | {}", error);
        }
        out.push('\n');
    }

    out
}
