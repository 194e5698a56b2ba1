use scraper::{Html, Selector};
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

use crate::config::AppConfig;
use crate::models::ProductStub;
use crate::page_loader::PageLoader;
use crate::plugins::extractors::{clean_text, parse_selector};
use crate::product_visitor::dismiss_cookie_banner;
use crate::scraper::RenderSession;
use crate::utils::error::Result;

/// Products found on one listing page plus the link to the following page.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListingPage {
    pub stubs: Vec<ProductStub>,
    pub next_page: Option<String>,
}

/// Follows a paginated catalog listing and collects product stubs.
pub struct CatalogWalker {
    loader: PageLoader,
    item: Selector,
    link: Selector,
    next_page: Selector,
    item_selector: String,
    cookie_accept: String,
    listing_wait: Duration,
}

impl CatalogWalker {
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let selectors = &config.selectors;
        Ok(Self {
            loader: PageLoader::new(&config.loader),
            item: parse_selector(&selectors.listing_item)?,
            link: parse_selector(&selectors.listing_link)?,
            next_page: parse_selector(&selectors.next_page)?,
            item_selector: selectors.listing_item.clone(),
            cookie_accept: selectors.cookie_accept.clone(),
            listing_wait: Duration::from_millis(config.visitor.content_wait_ms),
        })
    }

    /// All stubs reachable from `listing_url`, in page order, each link once.
    pub async fn collect(&self, session: &dyn RenderSession, listing_url: &str) -> Result<Vec<ProductStub>> {
        let mut stubs = Vec::new();
        let mut seen_links = HashSet::new();
        let mut visited = HashSet::new();
        let mut next = Some(listing_url.to_string());
        let mut page_number = 0;

        while let Some(page_url) = next.take() {
            if !visited.insert(page_url.clone()) {
                warn!("Pagination loops back to {}; stopping", page_url);
                break;
            }
            page_number += 1;
            info!("Fetching listing page {}: {}", page_number, page_url);

            let page = match self.fetch_page(session, &page_url).await {
                Ok(page) => page,
                Err(e) if page_number == 1 => return Err(e),
                Err(e) => {
                    warn!("Listing page {} failed, keeping earlier pages: {}", page_number, e);
                    break;
                }
            };

            let before = stubs.len();
            for stub in page.stubs {
                if seen_links.insert(stub.link.clone()) {
                    stubs.push(stub);
                } else {
                    debug!("Duplicate listing entry skipped: {}", stub.link);
                }
            }
            info!("Found {} products on page {}", stubs.len() - before, page_number);

            next = page.next_page;
        }

        info!("Collected {} products from {} pages", stubs.len(), page_number);
        Ok(stubs)
    }

    async fn fetch_page(&self, session: &dyn RenderSession, page_url: &str) -> Result<ListingPage> {
        self.loader.load(session, page_url).await?;
        dismiss_cookie_banner(session, &self.cookie_accept).await;
        if !session.wait_for_selector(&self.item_selector, self.listing_wait).await? {
            warn!("No product items appeared on {}", page_url);
        }

        let html = session.content().await?;
        self.parse_page(&html, page_url)
    }

    /// Extract stubs and the next-page link from one listing document.
    /// Relative links are resolved against `page_url`.
    pub fn parse_page(&self, html: &str, page_url: &str) -> Result<ListingPage> {
        let base = Url::parse(page_url)?;
        let document = Html::parse_document(html);

        let mut stubs = Vec::new();
        for item in document.select(&self.item) {
            let Some(anchor) = item.select(&self.link).next() else {
                debug!("Listing item without product link");
                continue;
            };
            let Some(href) = anchor.value().attr("href") else {
                continue;
            };
            let name = clean_text(&anchor);
            if name.is_empty() {
                continue;
            }
            stubs.push(ProductStub {
                name,
                link: base.join(href)?.to_string(),
            });
        }

        let next_page = match document
            .select(&self.next_page)
            .next()
            .and_then(|a| a.value().attr("href"))
        {
            Some(href) => Some(base.join(href)?.to_string()),
            None => None,
        };

        Ok(ListingPage { stubs, next_page })
    }
}
