use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use crate::config::{ExpanderConfig, ExpansionMode, SelectorConfig};
use crate::scraper::RenderSession;
use crate::utils::error::{Result, ScrapeError};

/// Discloses description content hidden behind a "read more" toggle.
///
/// Never fails: a missing trigger, a toggle that does not react, or a session
/// error all come back as `false`, and extraction carries on with whatever is
/// visible.
pub struct ContentExpander {
    config: ExpanderConfig,
    trigger: String,
    container: String,
    content: String,
    expanded_class: String,
}

impl ContentExpander {
    pub fn new(config: ExpanderConfig, selectors: &SelectorConfig) -> Self {
        Self {
            config,
            trigger: selectors.show_more.clone(),
            container: selectors.toggle_container.clone(),
            content: selectors.toggle_content.clone(),
            expanded_class: selectors.expanded_class.clone(),
        }
    }

    pub async fn expand(&self, session: &dyn RenderSession) -> bool {
        match self.try_expand(session).await {
            Ok(expanded) => expanded,
            Err(e) => {
                warn!("Content expansion failed: {}", e);
                false
            }
        }
    }

    async fn try_expand(&self, session: &dyn RenderSession) -> Result<bool> {
        if !session.exists(&self.trigger).await? {
            debug!("No show-more trigger present");
            return Ok(false);
        }

        if self.is_expanded(session).await? {
            debug!("Content already expanded");
            return Ok(true);
        }

        if matches!(self.config.mode, ExpansionMode::Click | ExpansionMode::ClickThenDom) {
            if session.click(&self.trigger).await? && self.poll_expanded(session).await? {
                info!("Expanded content via show-more click");
                return Ok(true);
            }
            debug!("Toggle did not react to click");
        }

        if self.config.mode == ExpansionMode::Click {
            return Ok(false);
        }

        session.evaluate(&self.force_script()?).await?;
        if self.is_expanded(session).await? {
            info!("Expanded content via DOM state change");
            Ok(true)
        } else {
            warn!("Content still collapsed after DOM fallback");
            Ok(false)
        }
    }

    async fn poll_expanded(&self, session: &dyn RenderSession) -> Result<bool> {
        let deadline = Instant::now() + Duration::from_millis(self.config.poll_timeout_ms);
        let interval = Duration::from_millis(self.config.poll_interval_ms);

        loop {
            if self.is_expanded(session).await? {
                return Ok(true);
            }
            if Instant::now() >= deadline {
                return Ok(false);
            }
            tokio::time::sleep(interval).await;
        }
    }

    async fn is_expanded(&self, session: &dyn RenderSession) -> Result<bool> {
        let value = session.evaluate(&self.state_script()?).await?;
        Ok(value.as_bool().unwrap_or(false))
    }

    /// True when the container carries the expanded class or its content
    /// region is displayed.
    pub fn state_script(&self) -> Result<String> {
        Ok(format!(
            r#"(() => {{
                const container = document.querySelector({container});
                if (!container) return false;
                if (container.classList.contains({class})) return true;
                const content = container.querySelector({content});
                return !!content && window.getComputedStyle(content).display !== 'none';
            }})()"#,
            container = literal(&self.container)?,
            class = literal(&self.expanded_class)?,
            content = literal(&self.content)?,
        ))
    }

    /// Puts the toggle into its expanded state directly; safe to run twice.
    pub fn force_script(&self) -> Result<String> {
        Ok(format!(
            r#"(() => {{
                const container = document.querySelector({container});
                if (container) {{
                    container.classList.add({class});
                    const content = container.querySelector({content});
                    if (content) content.style.display = 'block';
                }}
                const trigger = document.querySelector({trigger});
                if (trigger) {{
                    trigger.classList.add('active');
                    if (trigger.textContent.includes({collapsed})) {{
                        trigger.textContent = trigger.textContent.replace({collapsed}, {expanded});
                    }}
                }}
                return !!container;
            }})()"#,
            container = literal(&self.container)?,
            class = literal(&self.expanded_class)?,
            content = literal(&self.content)?,
            trigger = literal(&self.trigger)?,
            collapsed = literal(&self.config.collapsed_label)?,
            expanded = literal(&self.config.expanded_label)?,
        ))
    }
}

fn literal(value: &str) -> Result<String> {
    serde_json::to_string(value).map_err(ScrapeError::from)
}
