// Shared fixtures for the end-to-end tests: an in-memory rendering session
// serving canned pages, and a fast configuration pointing at a temp dir.

pub mod catalog_tests;
pub mod runner_tests;

use async_trait::async_trait;
use scraper::{Html, Selector};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;
use std::time::Duration;

use bloodkit_scraper::AppConfig;
use bloodkit_scraper::scraper::{RenderSession, WaitCondition};
use bloodkit_scraper::utils::error::{Result, ScrapeError};

pub const LISTING_URL: &str = "https://shop.example/bloedtest/";
pub const LISTING_PAGE_2: &str = "https://shop.example/bloedtest/?page=2";

/// Serves fixed HTML per URL. Unknown URLs fail to load like a dead host.
pub struct FakeSession {
    pages: HashMap<String, String>,
    current: Mutex<Option<String>>,
    navigations: Mutex<Vec<String>>,
    clicks: Mutex<Vec<String>>,
}

impl FakeSession {
    pub fn new(pages: impl IntoIterator<Item = (String, String)>) -> Self {
        Self {
            pages: pages.into_iter().collect(),
            current: Mutex::new(None),
            navigations: Mutex::new(Vec::new()),
            clicks: Mutex::new(Vec::new()),
        }
    }

    pub fn navigations(&self) -> Vec<String> {
        self.navigations.lock().unwrap().clone()
    }

    pub fn navigations_to(&self, url: &str) -> usize {
        self.navigations().iter().filter(|u| *u == url).count()
    }

    pub fn clicks_on(&self, selector: &str) -> usize {
        self.clicks.lock().unwrap().iter().filter(|s| *s == selector).count()
    }

    fn current_html(&self) -> Result<String> {
        let current = self.current.lock().unwrap();
        let url = current
            .as_ref()
            .ok_or_else(|| ScrapeError::Browser("no page loaded".to_string()))?;
        Ok(self.pages[url].clone())
    }

    fn select_first<T>(&self, selector: &str, f: impl FnOnce(scraper::ElementRef) -> T) -> Result<Option<T>> {
        let parsed = Selector::parse(selector).map_err(|e| ScrapeError::selector(selector, e))?;
        let document = Html::parse_document(&self.current_html()?);
        Ok(document.select(&parsed).next().map(f))
    }
}

#[async_trait]
impl RenderSession for FakeSession {
    async fn navigate(&self, url: &str, _wait: WaitCondition, _timeout: Duration) -> Result<()> {
        self.navigations.lock().unwrap().push(url.to_string());
        if !self.pages.contains_key(url) {
            return Err(ScrapeError::Browser(format!("net::ERR_NAME_NOT_RESOLVED at {}", url)));
        }
        *self.current.lock().unwrap() = Some(url.to_string());
        Ok(())
    }

    async fn content(&self) -> Result<String> {
        self.current_html()
    }

    async fn current_url(&self) -> Result<String> {
        Ok(self.current.lock().unwrap().clone().unwrap_or_default())
    }

    async fn exists(&self, selector: &str) -> Result<bool> {
        Ok(self.select_first(selector, |_| ())?.is_some())
    }

    async fn wait_for_selector(&self, selector: &str, _timeout: Duration) -> Result<bool> {
        self.exists(selector).await
    }

    async fn text_of(&self, selector: &str) -> Result<Option<String>> {
        self.select_first(selector, |el| el.text().collect::<String>())
    }

    async fn attribute_of(&self, selector: &str, attribute: &str) -> Result<Option<String>> {
        Ok(self
            .select_first(selector, |el| el.value().attr(attribute).map(str::to_string))?
            .flatten())
    }

    async fn click(&self, selector: &str) -> Result<bool> {
        self.clicks.lock().unwrap().push(selector.to_string());
        self.exists(selector).await
    }

    async fn evaluate(&self, _script: &str) -> Result<serde_json::Value> {
        Ok(serde_json::Value::Bool(false))
    }
}

fn listing_item(href: &str, name: &str) -> String {
    format!(r#"<li class="data-product"><h3><a href="{}">{}</a></h3></li>"#, href, name)
}

pub fn listing_page(items: &[(&str, &str)], next: Option<&str>) -> String {
    let items: String = items.iter().map(|(href, name)| listing_item(href, name)).collect();
    let pagination = next
        .map(|href| {
            format!(
                r#"<nav class="pagination-a"><ul><li class="next"><a rel="next" href="{}">Volgende</a></li></ul></nav>"#,
                href
            )
        })
        .unwrap_or_default();
    format!(
        r#"<html><body><ul class="list-collection">{}</ul>{}</body></html>"#,
        items, pagination
    )
}

/// `html` with a consent banner injected at the top of the body.
pub fn with_cookie_banner(html: &str) -> String {
    html.replacen(
        "<body>",
        r#"<body><div id="CybotCookiebotDialog"><button id="CybotCookiebotDialogBodyLevelButtonLevelOptinAllowAll">OK</button></div>"#,
        1,
    )
}

pub fn product_page(price: &str, description: &str) -> String {
    format!(
        r#"<html><body>
            <div class="price-wrapper"><span class="main-price">{}</span></div>
            <div class="desc-wrapper">{}</div>
        </body></html>"#,
        price, description
    )
}

pub fn product_url(slug: &str) -> String {
    format!("https://shop.example/bloedtest/{}", slug)
}

/// Two listing pages, the second repeating one product from the first.
pub fn shop_pages() -> Vec<(String, String)> {
    vec![
        (
            LISTING_URL.to_string(),
            listing_page(
                &[("check-up", "Check-up"), ("vitamine", "Vitamine Pakket")],
                Some("?page=2"),
            ),
        ),
        (
            LISTING_PAGE_2.to_string(),
            listing_page(
                &[
                    ("/bloedtest/gratis-consult", "Gratis Consult"),
                    ("/bloedtest/check-up", "Check-up"),
                    ("/bloedtest/hormonen", "Hormonen Vrouw"),
                ],
                None,
            ),
        ),
        (
            product_url("check-up"),
            product_page(
                "€ 149,00",
                "<ol><li>Bestel de test</li><li>Glucose</li><li>Kalium</li><li>Ferritine</li></ol>",
            ),
        ),
        (
            product_url("vitamine"),
            product_page(
                "€ 39,95",
                "<ul><li><strong>Vitamines</strong><ul><li>Vitamine D</li><li>Vitamine B12</li></ul></li>\
                 <li><strong>Mineralen</strong><ul><li>Magnesium</li></ul></li></ul>",
            ),
        ),
        (
            product_url("gratis-consult"),
            product_page("€0,-", "<ol><li>Intakegesprek</li></ol>"),
        ),
        (
            product_url("hormonen"),
            product_page("€ 79,00", "<p>Meer informatie volgt.</p>"),
        ),
    ]
}

pub fn test_config(output: &Path) -> AppConfig {
    let mut config = AppConfig::default();
    config.loader.max_rounds = 1;
    config.loader.backoff_step_ms = 0;
    config.visitor.settle_ms = 0;
    config.visitor.retry_delay_ms = 0;
    config.visitor.politeness_delay_ms = 0;
    config.storage.save_retry_delay_ms = 0;
    config.storage.output_path = output.to_path_buf();
    config.logging.file = None;
    config.static_biomarkers.insert(
        "hormonen".to_string(),
        vec!["Oestradiol".to_string(), "Progesteron".to_string(), "LH".to_string()],
    );
    config
}
