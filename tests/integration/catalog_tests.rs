// Listing traversal across pages

use super::*;
use bloodkit_scraper::catalog::CatalogWalker;

#[tokio::test]
async fn test_two_page_listing_in_page_order_without_duplicates() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new(shop_pages());

    let walker = CatalogWalker::from_config(&config).unwrap();
    let stubs = walker.collect(&session, LISTING_URL).await.unwrap();

    let links: Vec<_> = stubs.iter().map(|s| s.link.clone()).collect();
    assert_eq!(
        links,
        vec![
            product_url("check-up"),
            product_url("vitamine"),
            product_url("gratis-consult"),
            product_url("hormonen"),
        ]
    );
    assert_eq!(session.navigations(), vec![LISTING_URL.to_string(), LISTING_PAGE_2.to_string()]);
}

#[tokio::test]
async fn test_pagination_cycle_terminates() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new([
        (
            LISTING_URL.to_string(),
            listing_page(&[("a", "A")], Some("?page=2")),
        ),
        (
            LISTING_PAGE_2.to_string(),
            listing_page(&[("b", "B")], Some("/bloedtest/")),
        ),
    ]);

    let walker = CatalogWalker::from_config(&config).unwrap();
    let stubs = walker.collect(&session, LISTING_URL).await.unwrap();

    assert_eq!(stubs.len(), 2);
    assert_eq!(session.navigations_to(LISTING_URL), 1);
}

#[tokio::test]
async fn test_unreachable_listing_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new(Vec::new());

    let walker = CatalogWalker::from_config(&config).unwrap();
    let result = walker.collect(&session, LISTING_URL).await;

    assert!(matches!(
        result,
        Err(bloodkit_scraper::ScrapeError::Navigation { .. })
    ));
}

#[tokio::test]
async fn test_cookie_banner_dismissed_on_every_listing_page() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new([
        (
            LISTING_URL.to_string(),
            with_cookie_banner(&listing_page(&[("a", "A")], Some("?page=2"))),
        ),
        (
            LISTING_PAGE_2.to_string(),
            with_cookie_banner(&listing_page(&[("b", "B")], None)),
        ),
    ]);

    let walker = CatalogWalker::from_config(&config).unwrap();
    let stubs = walker.collect(&session, LISTING_URL).await.unwrap();

    assert_eq!(stubs.len(), 2);
    assert_eq!(session.clicks_on(&config.selectors.cookie_accept), 2);
}

#[tokio::test]
async fn test_failed_later_page_keeps_earlier_stubs() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new([(
        LISTING_URL.to_string(),
        listing_page(&[("a", "A"), ("b", "B")], Some("?page=2")),
    )]);

    let walker = CatalogWalker::from_config(&config).unwrap();
    let stubs = walker.collect(&session, LISTING_URL).await.unwrap();

    let links: Vec<_> = stubs.iter().map(|s| s.link.clone()).collect();
    assert_eq!(links, vec![product_url("a"), product_url("b")]);
    assert_eq!(session.navigations_to(LISTING_PAGE_2), config.loader.strategies.len());
}
