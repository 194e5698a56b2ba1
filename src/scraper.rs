use async_trait::async_trait;
use headless_chrome::{Browser, LaunchOptions, Tab};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

use crate::config::ScraperConfig;
use crate::utils::error::{Result, ScrapeError};

/// Load-completion condition a navigation waits for, from least to most strict.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum WaitCondition {
    DomContentLoaded,
    Load,
    NetworkIdle,
}

impl std::fmt::Display for WaitCondition {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WaitCondition::DomContentLoaded => "domcontentloaded",
            WaitCondition::Load => "load",
            WaitCondition::NetworkIdle => "networkidle",
        };
        f.write_str(name)
    }
}

/// The document host the extraction pipeline drives.
///
/// One session is owned by the run orchestrator and passed explicitly to
/// every component; it is never navigated concurrently.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RenderSession: Send + Sync {
    /// Navigate and block until `wait` holds or `timeout` elapses.
    async fn navigate(&self, url: &str, wait: WaitCondition, timeout: Duration) -> Result<()>;

    /// Serialized HTML of the live document.
    async fn content(&self) -> Result<String>;

    async fn current_url(&self) -> Result<String>;

    async fn exists(&self, selector: &str) -> Result<bool>;

    /// Poll for `selector`; `Ok(false)` on timeout.
    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool>;

    async fn text_of(&self, selector: &str) -> Result<Option<String>>;

    async fn attribute_of(&self, selector: &str, attribute: &str) -> Result<Option<String>>;

    /// Click the first match; `Ok(false)` when nothing matches.
    async fn click(&self, selector: &str) -> Result<bool>;

    /// Evaluate a JS expression and return its JSON value.
    async fn evaluate(&self, script: &str) -> Result<serde_json::Value>;
}

const POLL_INTERVAL: Duration = Duration::from_millis(100);
const NETWORK_QUIET_WINDOW: Duration = Duration::from_millis(500);

/// `RenderSession` backed by a single headless Chrome tab.
pub struct ChromeSession {
    // Keeps the Chrome process alive for the tab's lifetime
    _browser: Browser,
    tab: Arc<Tab>,
}

impl ChromeSession {
    pub fn launch(config: &ScraperConfig) -> Result<Self> {
        let window_size = (config.window_width, config.window_height);
        let mut launch_options = LaunchOptions::default_builder()
            .headless(config.headless)
            .sandbox(false) // Often needed in containerized environments
            .window_size(Some(window_size))
            .idle_browser_timeout(Duration::from_secs(config.idle_timeout_secs))
            .args(vec![
                std::ffi::OsStr::new("--no-sandbox"),
                std::ffi::OsStr::new("--disable-dev-shm-usage"),
                std::ffi::OsStr::new("--disable-gpu"),
                std::ffi::OsStr::new("--disable-extensions"),
                std::ffi::OsStr::new("--ignore-certificate-errors"),
            ])
            .build()
            .map_err(|e| ScrapeError::Browser(format!("Failed to create launch options: {}", e)))?;

        if let Some(chrome_path) = &config.chrome_path {
            launch_options.path = Some(std::path::PathBuf::from(chrome_path));
        }

        let browser = Browser::new(launch_options)
            .map_err(|e| ScrapeError::Browser(format!("Failed to launch browser: {}", e)))?;

        let tab = browser
            .new_tab()
            .map_err(|e| ScrapeError::Browser(format!("Failed to create tab: {}", e)))?;

        tab.set_user_agent(&config.user_agent, None, None)
            .map_err(|e| ScrapeError::Browser(format!("Failed to set user agent: {}", e)))?;
        tab.set_default_timeout(Duration::from_secs(config.navigation_timeout_secs));

        Ok(Self { _browser: browser, tab })
    }

    fn eval_raw(&self, expression: &str) -> Result<serde_json::Value> {
        // Objects are only returned by reference, so everything goes through JSON.stringify
        let wrapped = format!("JSON.stringify({})", expression);
        let remote = self
            .tab
            .evaluate(&wrapped, false)
            .map_err(|e| ScrapeError::Browser(format!("Script evaluation failed: {}", e)))?;

        match remote.value {
            Some(serde_json::Value::String(json)) => Ok(serde_json::from_str(&json)?),
            _ => Ok(serde_json::Value::Null),
        }
    }

    fn ready_state(&self) -> Result<String> {
        Ok(self
            .eval_raw("document.readyState")?
            .as_str()
            .unwrap_or_default()
            .to_string())
    }

    fn resource_count(&self) -> Result<u64> {
        Ok(self
            .eval_raw("performance.getEntriesByType('resource').length")?
            .as_u64()
            .unwrap_or(0))
    }

    async fn wait_until(&self, wait: WaitCondition, deadline: Instant) -> Result<()> {
        let mut last_resources: Option<(u64, Instant)> = None;

        loop {
            // Evaluation can fail while the frame is being swapped; treat that as "not ready yet"
            let state = self.ready_state().unwrap_or_default();
            let satisfied = match wait {
                WaitCondition::DomContentLoaded => state == "interactive" || state == "complete",
                WaitCondition::Load => state == "complete",
                WaitCondition::NetworkIdle if state == "complete" => {
                    let count = self.resource_count().unwrap_or(0);
                    match last_resources {
                        Some((prev, since)) if prev == count => since.elapsed() >= NETWORK_QUIET_WINDOW,
                        _ => {
                            last_resources = Some((count, Instant::now()));
                            false
                        }
                    }
                }
                WaitCondition::NetworkIdle => false,
            };

            if satisfied {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(ScrapeError::Browser(format!(
                    "Timed out waiting for {} (readyState={})",
                    wait, state
                )));
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl RenderSession for ChromeSession {
    async fn navigate(&self, url: &str, wait: WaitCondition, timeout: Duration) -> Result<()> {
        let deadline = Instant::now() + timeout;
        self.tab.set_default_timeout(timeout);
        self.tab
            .navigate_to(url)
            .map_err(|e| ScrapeError::Browser(format!("Navigation failed: {}", e)))?;
        // Bounded by the default timeout set above
        self.tab
            .wait_until_navigated()
            .map_err(|e| ScrapeError::Browser(format!("Navigation did not complete: {}", e)))?;
        self.wait_until(wait, deadline).await?;
        debug!("Navigated to {} ({})", url, wait);
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.tab
            .get_content()
            .map_err(|e| ScrapeError::Browser(format!("Failed to get page content: {}", e)))
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.tab.get_url())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        let script = format!("document.querySelector({}) !== null", js_string(selector)?);
        Ok(self.eval_raw(&script)?.as_bool().unwrap_or(false))
    }

    async fn wait_for_selector(&self, selector: &str, timeout: Duration) -> Result<bool> {
        let deadline = Instant::now() + timeout;
        loop {
            if self.exists(selector).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(POLL_INTERVAL).await;
        }
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.textContent : null; }})()",
            js_string(selector)?
        );
        Ok(self.eval_raw(&script)?.as_str().map(str::to_string))
    }

    async fn attribute_of(&self, selector: &str, attribute: &str) -> Result<Option<String>> {
        let script = format!(
            "(() => {{ const el = document.querySelector({}); return el ? el.getAttribute({}) : null; }})()",
            js_string(selector)?,
            js_string(attribute)?
        );
        Ok(self.eval_raw(&script)?.as_str().map(str::to_string))
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        if !self.exists(selector).await? {
            return Ok(false);
        }
        let element = self
            .tab
            .find_element(selector)
            .map_err(|e| ScrapeError::Browser(format!("Element lookup failed for '{}': {}", selector, e)))?;
        element
            .click()
            .map_err(|e| ScrapeError::Browser(format!("Click failed for '{}': {}", selector, e)))?;
        Ok(true)
    }

    async fn evaluate(&self, script: &str) -> Result<serde_json::Value> {
        self.eval_raw(script)
    }
}

/// Quote a value as a JS string literal.
fn js_string(value: &str) -> Result<String> {
    Ok(serde_json::to_string(value)?)
}
