use std::sync::atomic::{AtomicU32, AtomicUsize, Ordering};
use std::time::Duration;
use tokio_retry::Retry;
use tracing::{debug, info, warn};

use crate::config::{LoadStrategy, LoaderConfig};
use crate::scraper::RenderSession;
use crate::utils::error::{Result, ScrapeError};

/// Which strategy finally loaded the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadOutcome {
    /// Index into the configured strategy list.
    pub strategy: usize,
    /// Zero-based round.
    pub round: u32,
    /// Navigations issued in total, the successful one included.
    pub attempts: usize,
}

/// Escalating page loader.
///
/// Each round tries every strategy in order on the same URL and stops at the
/// first that completes. A failed round is followed by a linearly growing
/// pause; there is no pause after the last round.
pub struct PageLoader {
    strategies: Vec<LoadStrategy>,
    max_rounds: u32,
    backoff_step: Duration,
}

impl PageLoader {
    pub fn new(config: &LoaderConfig) -> Self {
        Self {
            strategies: config.strategies.clone(),
            max_rounds: config.max_rounds.max(1),
            backoff_step: Duration::from_millis(config.backoff_step_ms),
        }
    }

    /// Pauses between rounds: `step * 1`, `step * 2`, ... one fewer than rounds.
    pub fn backoff_schedule(&self) -> impl Iterator<Item = Duration> + use<> {
        let step = self.backoff_step;
        (1..self.max_rounds).map(move |round| step * round)
    }

    pub async fn load(&self, session: &dyn RenderSession, url: &str) -> Result<LoadOutcome> {
        let round = AtomicU32::new(0);
        let attempts = AtomicUsize::new(0);

        let result = Retry::start(self.backoff_schedule(), || self.run_round(session, url, &round, &attempts)).await;

        match result {
            Ok(outcome) => Ok(outcome),
            Err(e) => {
                let attempts = attempts.load(Ordering::SeqCst);
                warn!("Giving up on {} after {} attempts: {}", url, attempts, e);
                Err(ScrapeError::Navigation {
                    url: url.to_string(),
                    attempts,
                })
            }
        }
    }

    async fn run_round(
        &self,
        session: &dyn RenderSession,
        url: &str,
        round: &AtomicU32,
        attempts: &AtomicUsize,
    ) -> Result<LoadOutcome> {
        let current = round.fetch_add(1, Ordering::SeqCst);
        let mut last_error = None;

        for (index, strategy) in self.strategies.iter().enumerate() {
            let total = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            debug!(
                "Loading {} with {} (timeout {:?}), round {}/{}",
                url,
                strategy.wait,
                strategy.timeout(),
                current + 1,
                self.max_rounds
            );

            match session.navigate(url, strategy.wait, strategy.timeout()).await {
                Ok(()) => {
                    info!("Loaded {} with strategy {} ({})", url, index + 1, strategy.wait);
                    return Ok(LoadOutcome {
                        strategy: index,
                        round: current,
                        attempts: total,
                    });
                }
                Err(e) => {
                    warn!("Strategy {} ({}) failed for {}: {}", index + 1, strategy.wait, url, e);
                    last_error = Some(e);
                }
            }
        }

        if current + 1 < self.max_rounds {
            info!(
                "All strategies failed for {}; retrying in {:?}",
                url,
                self.backoff_step * (current + 1)
            );
        }

        Err(last_error.unwrap_or_else(|| ScrapeError::Browser("No load strategies configured".to_string())))
    }
}
