// Runs through the orchestrator and the JSON store

use super::*;
use bloodkit_scraper::ScrapeRunner;
use bloodkit_scraper::product_visitor::ZERO_PRICE_REASON;
use bloodkit_scraper::store::JsonCatalogStore;
use rust_decimal::Decimal;

#[tokio::test]
async fn test_zero_price_product_is_not_persisted() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.json");
    let config = test_config(&output);
    let session = FakeSession::new([
        (
            LISTING_URL.to_string(),
            listing_page(&[("gratis-consult", "Gratis Consult")], None),
        ),
        (
            product_url("gratis-consult"),
            product_page("€0,-", "<ol><li>Intakegesprek</li></ol>"),
        ),
    ]);

    let runner = ScrapeRunner::from_config(&config).unwrap();
    let summary = runner.run(&session, &[LISTING_URL.to_string()]).await;

    assert_eq!(summary.skipped, 1);
    assert_eq!(summary.saved(), 0);
    assert!(!output.exists());
}

#[tokio::test]
async fn test_skipped_records_saved_when_enabled() {
    let dir = tempfile::tempdir().unwrap();
    let mut config = test_config(&dir.path().join("products.json"));
    config.storage.save_skipped = true;
    let session = FakeSession::new([
        (
            LISTING_URL.to_string(),
            listing_page(&[("gratis-consult", "Gratis Consult")], None),
        ),
        (
            product_url("gratis-consult"),
            product_page("gratis", "<ol><li>Intakegesprek</li></ol>"),
        ),
    ]);

    let runner = ScrapeRunner::from_config(&config).unwrap();
    runner.run(&session, &[LISTING_URL.to_string()]).await;

    let catalog = runner.store().load().unwrap();
    let record = &catalog.products[0];
    assert!(record.skipped);
    assert_eq!(record.price, Some(Decimal::ZERO));
    assert_eq!(record.biomarker_count, 0);
    assert!(record.biomarkers.is_empty());
    assert_eq!(record.reason.as_deref(), Some(ZERO_PRICE_REASON));
}

#[tokio::test]
async fn test_second_run_updates_in_place() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new(shop_pages());
    let runner = ScrapeRunner::from_config(&config).unwrap();

    runner.run(&session, &[LISTING_URL.to_string()]).await;
    let first = runner.store().load().unwrap();

    let summary = runner.run(&session, &[LISTING_URL.to_string()]).await;
    assert_eq!(summary.inserted, 0);
    assert_eq!(summary.updated, 3);

    let second = runner.store().load().unwrap();
    assert_eq!(second.total_products, first.total_products);
    assert_eq!(second.sources[LISTING_URL].product_count, 3);
    assert_eq!(second.scrape_timestamp, first.scrape_timestamp);
}

#[tokio::test]
async fn test_dead_product_page_becomes_error_record() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    // The product link is listed but never served
    let session = FakeSession::new([(
        LISTING_URL.to_string(),
        listing_page(&[("verdwenen", "Verdwenen Test")], None),
    )]);

    let runner = ScrapeRunner::from_config(&config).unwrap();
    let summary = runner.run(&session, &[LISTING_URL.to_string()]).await;
    assert_eq!(summary.with_errors, 1);
    assert_eq!(summary.inserted, 1);

    let catalog = runner.store().load().unwrap();
    let record = &catalog.products[0];
    assert_eq!(record.price, None);
    assert_eq!(record.biomarker_count, 0);
    assert!(record.error.as_deref().unwrap().contains("Navigation failed"));
    // One round, one navigation per configured strategy
    assert_eq!(session.navigations_to(&product_url("verdwenen")), 3);
}

#[tokio::test]
async fn test_failed_listing_does_not_stop_other_sources() {
    let dir = tempfile::tempdir().unwrap();
    let config = test_config(&dir.path().join("products.json"));
    let session = FakeSession::new(shop_pages());
    let runner = ScrapeRunner::from_config(&config).unwrap();

    let summary = runner
        .run(
            &session,
            &["https://offline.example/".to_string(), LISTING_URL.to_string()],
        )
        .await;

    assert_eq!(summary.sources, 2);
    assert_eq!(summary.failed_sources, 1);
    assert_eq!(summary.inserted, 3);
}

#[tokio::test]
async fn test_unwritable_store_counts_lost_records() {
    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("products.json");
    std::fs::write(&output, "not a catalog").unwrap();
    let config = test_config(&output);
    let session = FakeSession::new(shop_pages());

    let runner = ScrapeRunner::from_config(&config).unwrap();
    let summary = runner.run(&session, &[LISTING_URL.to_string()]).await;

    assert_eq!(summary.lost, 3);
    assert_eq!(summary.saved(), 0);
    assert_eq!(std::fs::read_to_string(&output).unwrap(), "not a catalog");
    assert!(JsonCatalogStore::new(&output).load().is_err());
}
