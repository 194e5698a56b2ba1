use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;
use url::Url;

use crate::scraper::WaitCondition;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub scraper: ScraperConfig,
    pub loader: LoaderConfig,
    pub visitor: VisitorConfig,
    pub expander: ExpanderConfig,
    pub selectors: SelectorConfig,
    pub vocabulary: VocabularyConfig,
    /// Product-line key (matched against name/URL) to a known biomarker list.
    pub static_biomarkers: BTreeMap<String, Vec<String>>,
    pub storage: StorageConfig,
    pub sources: SourcesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScraperConfig {
    pub headless: bool,
    pub chrome_path: Option<String>,
    pub user_agent: String,
    pub window_width: u32,
    pub window_height: u32,
    pub navigation_timeout_secs: u64,
    pub idle_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoadStrategy {
    pub wait: WaitCondition,
    pub timeout_ms: u64,
}

impl LoadStrategy {
    pub fn new(wait: WaitCondition, timeout_ms: u64) -> Self {
        Self { wait, timeout_ms }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoaderConfig {
    /// Ordered least to most strict.
    pub strategies: Vec<LoadStrategy>,
    pub max_rounds: u32,
    /// Round `n` (zero-based) is followed by a sleep of `(n + 1) * backoff_step_ms`.
    pub backoff_step_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VisitorConfig {
    pub biomarker_attempts: u32,
    pub settle_ms: u64,
    pub retry_delay_ms: u64,
    pub content_wait_ms: u64,
    pub price_wait_ms: u64,
    pub politeness_delay_ms: u64,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ExpansionMode {
    Click,
    Dom,
    ClickThenDom,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ExpanderConfig {
    pub mode: ExpansionMode,
    pub poll_timeout_ms: u64,
    pub poll_interval_ms: u64,
    pub collapsed_label: String,
    pub expanded_label: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectorConfig {
    pub listing_item: String,
    pub listing_link: String,
    pub next_page: String,
    pub cookie_accept: String,
    pub content_ready: String,
    pub price: String,
    pub description: String,
    pub show_more: String,
    pub toggle_container: String,
    pub toggle_content: String,
    pub expanded_class: String,
}

/// Word lists feeding the list-item classifiers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VocabularyConfig {
    pub ordered_list_exclusions: Vec<String>,
    pub flat_list_exclusions: Vec<String>,
    pub known_biomarkers: Vec<String>,
    pub zero_price_patterns: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub output_path: PathBuf,
    pub save_retries: u32,
    pub save_retry_delay_ms: u64,
    pub save_skipped: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SourcesConfig {
    pub listing_urls: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub file: Option<PathBuf>,
    pub console_directive: String,
}

impl Default for ScraperConfig {
    fn default() -> Self {
        Self {
            headless: true,
            chrome_path: None,
            user_agent: "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string(),
            window_width: 1920,
            window_height: 1080,
            navigation_timeout_secs: 60,
            idle_timeout_secs: 300,
        }
    }
}

impl Default for LoaderConfig {
    fn default() -> Self {
        Self {
            strategies: vec![
                LoadStrategy::new(WaitCondition::DomContentLoaded, 30_000),
                LoadStrategy::new(WaitCondition::Load, 60_000),
                LoadStrategy::new(WaitCondition::NetworkIdle, 90_000),
            ],
            max_rounds: 3,
            backoff_step_ms: 5_000,
        }
    }
}

impl Default for VisitorConfig {
    fn default() -> Self {
        Self {
            biomarker_attempts: 3,
            settle_ms: 2_000,
            retry_delay_ms: 3_000,
            content_wait_ms: 10_000,
            price_wait_ms: 5_000,
            politeness_delay_ms: 2_000,
        }
    }
}

impl Default for ExpanderConfig {
    fn default() -> Self {
        Self {
            mode: ExpansionMode::ClickThenDom,
            poll_timeout_ms: 3_000,
            poll_interval_ms: 200,
            collapsed_label: "Lees meer".to_string(),
            expanded_label: "Lees minder".to_string(),
        }
    }
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_item: "ul.list-collection li.data-product".to_string(),
            listing_link: "h3 a".to_string(),
            next_page: r#"nav.pagination-a li.next a[rel="next"]"#.to_string(),
            cookie_accept: "button#CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll".to_string(),
            content_ready: "div.price-wrapper, div.desc-wrapper".to_string(),
            price: "div.price-wrapper span.main-price".to_string(),
            description: "div.desc-wrapper".to_string(),
            show_more: "a.show-more".to_string(),
            toggle_container: "article.module-info.toggle".to_string(),
            toggle_content: ".toggle-content".to_string(),
            expanded_class: "expanded".to_string(),
        }
    }
}

fn words(list: &[&str]) -> Vec<String> {
    list.iter().map(|s| s.to_string()).collect()
}

impl Default for VocabularyConfig {
    fn default() -> Self {
        Self {
            ordered_list_exclusions: words(&[
                "bestel",
                "brievenbus",
                "prikpunt",
                "kortingscode",
                "upload",
                "plaats je bestelling",
                "ontvang je",
                "maak een dashboard",
            ]),
            flat_list_exclusions: words(&[
                "bestel",
                "brievenbus",
                "prikpunt",
                "kortingscode",
                "upload",
                "laat je",
                "ontvang je",
                "plaats je",
                "leg je",
                "voer je",
            ]),
            known_biomarkers: words(&[
                "Vitamine",
                "Calcium",
                "Glucose",
                "Cholesterol",
                "Albumine",
                "Ferritine",
                "Kalium",
                "Natrium",
                "Foliumzuur",
                "Transferrine",
                "Testosteron",
                "Globulin",
                "Cortisol",
                "Creatine",
                "Hemoglobine",
                "IJzer",
            ]),
            zero_price_patterns: crate::price::default_zero_patterns(),
        }
    }
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            output_path: PathBuf::from("data/products.json"),
            save_retries: 2,
            save_retry_delay_ms: 500,
            save_skipped: false,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            file: Some(PathBuf::from("data/scraper.log")),
            console_directive: "bloodkit_scraper=info".to_string(),
        }
    }
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::load(None)
    }

    /// Layer built-in defaults, `config/*` files, an optional explicit file,
    /// and `BLOODKIT__SECTION__KEY` environment variables.
    pub fn load(explicit_file: Option<&Path>) -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let mut builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            .add_source(File::with_name("config/local").required(false));

        if let Some(path) = explicit_file {
            builder = builder.add_source(File::from(path).required(true));
        }

        let s = builder
            .add_source(Environment::with_prefix("BLOODKIT").separator("__"))
            .build()?;

        let mut config: AppConfig = s.try_deserialize()?;

        if config.scraper.chrome_path.is_none() {
            config.scraper.chrome_path = env::var("CHROME_PATH").ok();
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.loader.strategies.is_empty() {
            return Err(ConfigError::Message("Loader needs at least one strategy".into()));
        }

        if self.loader.strategies.iter().any(|s| s.timeout_ms == 0) {
            return Err(ConfigError::Message("Loader strategy timeout must be greater than 0".into()));
        }

        if self.loader.max_rounds == 0 {
            return Err(ConfigError::Message("Loader max_rounds must be greater than 0".into()));
        }

        if self.visitor.biomarker_attempts == 0 {
            return Err(ConfigError::Message("Visitor biomarker_attempts must be greater than 0".into()));
        }

        if self.expander.poll_interval_ms == 0 {
            return Err(ConfigError::Message("Expander poll_interval_ms must be greater than 0".into()));
        }

        if self.storage.output_path.as_os_str().is_empty() {
            return Err(ConfigError::Message("Storage output_path must not be empty".into()));
        }

        for listing in &self.sources.listing_urls {
            if Url::parse(listing).is_err() {
                return Err(ConfigError::Message(format!("Invalid listing URL: {}", listing)));
            }
        }

        for (name, selector) in self.selectors.all() {
            if scraper::Selector::parse(selector).is_err() {
                return Err(ConfigError::Message(format!(
                    "Invalid CSS selector for selectors.{}: {}",
                    name, selector
                )));
            }
        }

        Ok(())
    }
}

impl SelectorConfig {
    fn all(&self) -> [(&'static str, &str); 10] {
        [
            ("listing_item", self.listing_item.as_str()),
            ("listing_link", self.listing_link.as_str()),
            ("next_page", self.next_page.as_str()),
            ("cookie_accept", self.cookie_accept.as_str()),
            ("content_ready", self.content_ready.as_str()),
            ("price", self.price.as_str()),
            ("description", self.description.as_str()),
            ("show_more", self.show_more.as_str()),
            ("toggle_container", self.toggle_container.as_str()),
            ("toggle_content", self.toggle_content.as_str()),
        ]
    }
}
