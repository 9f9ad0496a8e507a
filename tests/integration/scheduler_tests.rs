use super::*;
use uatu_pricewatch::scheduler::{DailyTrigger, RunOrigin, RunSummary, SchedulerStatus};

#[tokio::test]
async fn test_run_counts_every_outcome() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    for (route, status, body) in [
        ("/ok", 200, product_page("Lamp", "$12.00")),
        ("/blocked", 200, challenge_page()),
        ("/broken", 500, String::new()),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_string(body))
            .mount(&server)
            .await;
    }

    let env = TestEnv::new();
    env.write_urls(&[
        "# nightly list".to_string(),
        format!("{}/ok", server.uri()),
        String::new(),
        format!("{}/blocked", server.uri()),
        "ftp://files.example.com/manual.pdf".to_string(),
        format!("{}/broken", server.uri()),
    ]);

    let scheduler = env.scheduler(Arc::new(RecordingNotifier::default()));
    let summary = scheduler.run_once().await;

    assert_eq!(
        summary,
        RunSummary {
            attempted: 3,
            succeeded: 1,
            failed: 1,
            captcha_blocked: 1,
        }
    );
    assert_eq!(env.history().records()?.len(), 1);
    println!("✓ Summary: {:?}", summary);

    let stats = scheduler.stats().await;
    assert_eq!(stats.runs_completed, 1);
    assert_eq!(stats.last_summary, Some(summary));
    assert!(stats.last_run_at.is_some());
    assert_eq!(scheduler.status().await, SchedulerStatus::Idle);

    Ok(())
}

#[tokio::test]
async fn test_one_https_and_one_ftp_line_attempts_one() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve(&server, "/item", 200, product_page("Chair", "$80.00")).await;

    let env = TestEnv::new();
    env.write_urls(&[format!("{}/item", server.uri()), "ftp://example.com/item".to_string()]);

    let summary = env.scheduler(Arc::new(RecordingNotifier::default())).run_once().await;
    assert_eq!(summary.attempted, 1);
    Ok(())
}

#[tokio::test]
async fn test_missing_url_list_aborts_only_the_run() -> anyhow::Result<()> {
    let env = TestEnv::new();
    let scheduler = env.scheduler(Arc::new(RecordingNotifier::default()));

    assert_eq!(scheduler.trigger(RunOrigin::Manual).await, Some(RunSummary::default()));

    // the next trigger gets a fresh chance
    let server = MockServer::start().await;
    serve(&server, "/item", 200, product_page("Chair", "$80.00")).await;
    env.write_urls(&[format!("{}/item", server.uri())]);

    let summary = scheduler.trigger(RunOrigin::Manual).await;
    assert_eq!(summary.map(|s| s.succeeded), Some(1));
    assert_eq!(scheduler.stats().await.runs_completed, 2);
    Ok(())
}

#[tokio::test]
async fn test_schedule_runs_once_at_startup() -> anyhow::Result<()> {
    let server = MockServer::start().await;
    serve(&server, "/item", 200, product_page("Desk", "$150.00")).await;

    let env = TestEnv::new();
    env.write_urls(&[format!("{}/item", server.uri())]);

    let scheduler = Arc::new(env.scheduler(Arc::new(RecordingNotifier::default())));
    let trigger = DailyTrigger::from_config(&env.config.scheduler)?;
    let handle = scheduler.schedule(trigger, true).await?;

    let ran = wait_for_condition(
        || {
            let scheduler = Arc::clone(&scheduler);
            async move { scheduler.stats().await.runs_completed == 1 }
        },
        10,
    )
    .await;
    assert!(ran, "startup run never completed");
    println!("✓ Startup run completed");

    scheduler.request_shutdown();
    handle.shutdown().await?;
    scheduler.wait_idle().await;

    assert_eq!(env.history().records()?.len(), 1);
    assert_eq!(scheduler.trigger(RunOrigin::Daily).await, None);
    println!("✓ Scheduler shut down cleanly");

    Ok(())
}
