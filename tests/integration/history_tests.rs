use super::*;
use uatu_pricewatch::models::{ChangeKind, HistoryRecord, Observation, PreviousPrice, TrackedUrl};
use uatu_pricewatch::plugins::trackers::validate;

#[tokio::test]
async fn test_history_file_layout() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    let env = TestEnv::new();
    let pipeline = env.pipeline(Arc::new(RecordingNotifier::default()));
    let url = TrackedUrl::parse(&format!("{}/p/1?utm_source=mail", server.uri()))?;

    serve(&server, "/p/1", 200, product_page("Desk Lamp, \"Brass\"", "$1,299.99")).await;
    pipeline.run(&url).await;
    serve(&server, "/p/1", 200, product_page("Desk Lamp, \"Brass\"", "$1,199.99")).await;
    pipeline.run(&url).await;

    let contents = std::fs::read_to_string(env.history_path())?;
    let mut lines = contents.lines();
    assert_eq!(lines.next(), Some("Title,Price,Previous_Price,Price_Change,URL,Timestamp"));
    assert_eq!(contents.matches("Title,Price").count(), 1);

    let rows = env.history().records()?;
    assert_eq!(rows.len(), 2);
    assert_eq!(rows[0].title, "Desk Lamp, \"Brass\"");
    assert_eq!(rows[0].price, "1299.99");
    assert_eq!(rows[0].previous_price, "N/A");
    assert_eq!(rows[1].previous_price, "1299.99");
    assert_eq!(rows[1].price_change, "1299.99 → 1199.99");
    assert_eq!(rows[1].url, format!("{}/p/1", server.uri()));

    for row in &rows {
        let parsed = chrono::DateTime::parse_from_rfc3339(&row.timestamp)?;
        assert_eq!(parsed.offset().local_minus_utc(), 0);
        assert!(row.timestamp.ends_with('Z'));
    }
    println!("✓ History file layout verified");

    Ok(())
}

#[test]
fn test_existing_log_is_appended_not_rewritten() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let path = env.history_path();
    std::fs::create_dir_all(path.parent().unwrap())?;
    std::fs::write(
        &path,
        "Title,Price,Previous_Price,Price_Change,URL,Timestamp\nOld,9.99,N/A,No Change,https://example.com/a,2024-01-01T03:00:00Z\n",
    )?;

    let store = env.history();
    let url = TrackedUrl::parse("https://example.com/a")?;
    let previous = store.last_price_for(&url);
    assert_eq!(previous, PreviousPrice::Recorded(validate("9.99")));

    let record = HistoryRecord::new(
        Observation::new(url, "Old".to_string(), validate("7.50")),
        previous,
        ChangeKind::Decreased,
    );
    store.append(&record)?;

    let contents = std::fs::read_to_string(&path)?;
    assert_eq!(contents.lines().count(), 3);
    assert!(contents.starts_with("Title,Price,Previous_Price,Price_Change,URL,Timestamp\nOld,9.99,"));
    assert_eq!(store.records()?[1].price_change, "9.99 → 7.50");

    Ok(())
}
