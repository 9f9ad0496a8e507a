use super::*;
use uatu_pricewatch::config::NotificationsConfig;
use uatu_pricewatch::models::{ChangeKind, PreviousPrice, TrackedUrl, ValidatedPrice};
use uatu_pricewatch::pipeline::PipelineOutcome;
use uatu_pricewatch::plugins::NotifierManager;

fn tracked(server: &MockServer, route: &str) -> TrackedUrl {
    TrackedUrl::parse(&format!("{}{}?ref=integration#reviews", server.uri(), route)).unwrap()
}

#[tokio::test]
async fn test_price_lifecycle_end_to_end() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = env.pipeline(notifier.clone());
    let url = tracked(&server, "/dp/B0001");

    // first sighting
    serve(&server, "/dp/B0001", 200, product_page("Acme Anvil", "$19.99")).await;
    let outcome = pipeline.run(&url).await;
    let PipelineOutcome::Success { record, kind, notified } = outcome else {
        panic!("expected success");
    };
    assert_eq!(kind, ChangeKind::NewlyTracked);
    assert!(!notified);
    assert_eq!(record.title, "Acme Anvil");
    assert_eq!(record.previous_price, PreviousPrice::NotFound);

    let row = record.to_row();
    assert_eq!(row.previous_price, "N/A");
    assert_eq!(row.price_change, "No Change");
    assert!(notifier.events().is_empty());
    println!("✓ First observation recorded without alert");

    // price goes up
    serve(&server, "/dp/B0001", 200, product_page("Acme Anvil", "$24.99")).await;
    let outcome = pipeline.run(&url).await;
    let PipelineOutcome::Success { record, kind, notified } = outcome else {
        panic!("expected success");
    };
    assert_eq!(kind, ChangeKind::Increased);
    assert!(notified);
    assert_eq!(record.change_summary, "19.99 → 24.99");

    let events = notifier.events();
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeKind::Increased);
    assert_eq!(events[0].old_price.to_string(), "19.99");
    assert_eq!(events[0].new_price.to_string(), "24.99");
    println!("✓ Increase detected and notified once");

    // same price again
    let outcome = pipeline.run(&url).await;
    assert!(matches!(outcome, PipelineOutcome::Success { kind: ChangeKind::NoChange, notified: false, .. }));
    assert_eq!(notifier.events().len(), 1);

    let rows = env.history().records()?;
    assert_eq!(rows.len(), 3);
    assert!(rows.iter().all(|r| r.url == format!("{}/dp/B0001", server.uri())));
    println!("✓ History holds one row per observation");

    Ok(())
}

#[tokio::test]
async fn test_challenge_page_is_not_recorded() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    let notifier = Arc::new(RecordingNotifier::default());
    let pipeline = env.pipeline(notifier.clone());

    serve(&server, "/dp/B0002", 200, challenge_page()).await;
    let outcome = pipeline.run(&tracked(&server, "/dp/B0002")).await;

    assert_eq!(outcome, PipelineOutcome::CaptchaBlocked);
    assert!(!env.history_path().exists());
    assert!(notifier.events().is_empty());
    println!("✓ Challenge page left the history untouched");

    Ok(())
}

#[tokio::test]
async fn test_http_errors_are_fetch_failures() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    let pipeline = env.pipeline(Arc::new(RecordingNotifier::default()));

    serve(&server, "/dp/B0003", 503, "Service Unavailable".to_string()).await;
    let outcome = pipeline.run(&tracked(&server, "/dp/B0003")).await;
    assert!(matches!(&outcome, PipelineOutcome::FetchFailed(reason) if reason.contains("503")));

    // nothing listens on this port once the server is gone
    let gone = tracked(&server, "/dp/B0003");
    drop(server);
    let outcome = pipeline.run(&gone).await;
    assert!(matches!(outcome, PipelineOutcome::FetchFailed(_)));

    assert!(!env.history_path().exists());
    Ok(())
}

#[tokio::test]
async fn test_missing_price_is_recorded_as_unavailable() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    let pipeline = env.pipeline(Arc::new(RecordingNotifier::default()));
    let url = tracked(&server, "/dp/B0004");

    serve(&server, "/dp/B0004", 200, "<html><body><h1>Gadget</h1><p>Currently unavailable.</p></body></html>".to_string()).await;
    let outcome = pipeline.run(&url).await;

    let PipelineOutcome::Success { record, kind, .. } = outcome else {
        panic!("expected success");
    };
    assert_eq!(kind, ChangeKind::NewlyTracked);
    assert_eq!(record.title, "Gadget");
    assert_eq!(record.price, ValidatedPrice::Unavailable);

    // an Unavailable row is history, not absence of history
    serve(&server, "/dp/B0004", 200, product_page("Gadget", "$5.00")).await;
    let outcome = pipeline.run(&url).await;
    assert!(matches!(outcome, PipelineOutcome::Success { kind: ChangeKind::NoChange, .. }));

    Ok(())
}

#[tokio::test]
async fn test_disabled_notifications_still_record_changes() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    let manager = NotifierManager::from_config(&NotificationsConfig::default()).await?;
    let pipeline = env.pipeline(Arc::new(manager));
    let url = tracked(&server, "/dp/B0005");

    serve(&server, "/dp/B0005", 200, product_page("Kettle", "$40.00")).await;
    pipeline.run(&url).await;
    serve(&server, "/dp/B0005", 200, product_page("Kettle", "$35.00")).await;
    let outcome = pipeline.run(&url).await;

    assert!(matches!(outcome, PipelineOutcome::Success { kind: ChangeKind::Decreased, notified: false, .. }));
    assert_eq!(env.history().records()?[1].price_change, "40.00 → 35.00");
    Ok(())
}
