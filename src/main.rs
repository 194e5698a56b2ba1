use anyhow::{Context, Result, bail};
use clap::Parser;
use tracing::{error, info};

use bloodkit_scraper::cli::{Cli, Command, render_stats};
use bloodkit_scraper::config::AppConfig;
use bloodkit_scraper::logging::init_logging;
use bloodkit_scraper::runner::ScrapeRunner;
use bloodkit_scraper::scraper::ChromeSession;
use bloodkit_scraper::store::JsonCatalogStore;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();

    let mut config = AppConfig::load(cli.config.as_deref()).context("failed to load configuration")?;
    cli.command.apply(&mut config);
    config.validate().context("invalid configuration")?;

    match cli.command {
        Command::Scrape { .. } => scrape(config).await,
        Command::Stats { .. } => stats(&config),
    }
}

async fn scrape(config: AppConfig) -> Result<()> {
    let _guard = init_logging(&config.logging)?;

    if config.sources.listing_urls.is_empty() {
        bail!("no listing URLs configured; pass --url or set sources.listing_urls");
    }

    info!("Starting bloodkit scraper for {} listings", config.sources.listing_urls.len());
    let runner = ScrapeRunner::from_config(&config)?;

    let session = match ChromeSession::launch(&config.scraper) {
        Ok(session) => session,
        Err(e) => {
            error!("Could not start browser: {}", e);
            return Err(e.into());
        }
    };

    let summary = runner.run(&session, &config.sources.listing_urls).await;
    info!(
        "Catalog written to {} ({} saved, {} lost)",
        runner.store().path().display(),
        summary.saved(),
        summary.lost
    );

    if summary.sources > 0 && summary.failed_sources == summary.sources {
        bail!("every listing failed to load");
    }
    Ok(())
}

fn stats(config: &AppConfig) -> Result<()> {
    let store = JsonCatalogStore::new(config.storage.output_path.clone());
    if !store.path().exists() {
        bail!("no catalog at {}", store.path().display());
    }
    let catalog = store.load()?;
    print!("{}", render_stats(&catalog));
    Ok(())
}
