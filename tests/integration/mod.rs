// Integration tests for Uatu Pricewatch
// These tests drive the real fetcher, extractor and history log against a local HTTP server

pub mod history_tests;
pub mod pipeline_tests;
pub mod scheduler_tests;

use async_trait::async_trait;
use std::io::Write;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use uatu_pricewatch::{
    AppConfig,
    config::{SchedulerConfig, TrackerConfig},
    element_finder::SelectorExtractor,
    history::HistoryStore,
    models::ChangeEvent,
    pipeline::{ObservationPipeline, PipelineConfig},
    plugins::traits::{NotificationResult, Notifier},
    scheduler::TrackingScheduler,
    scraper::HttpFetcher,
    url_list::UrlListSource,
};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Notifier that remembers every event it was handed.
#[derive(Default)]
pub struct RecordingNotifier {
    events: Mutex<Vec<ChangeEvent>>,
}

impl RecordingNotifier {
    pub fn events(&self) -> Vec<ChangeEvent> {
        self.events.lock().unwrap().clone()
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    fn channel(&self) -> &'static str {
        "recording"
    }

    async fn notify(&self, event: &ChangeEvent) -> uatu_pricewatch::Result<NotificationResult> {
        self.events.lock().unwrap().push(event.clone());
        Ok(NotificationResult::delivered("recording", None))
    }
}

/// Test configuration for integration tests: everything under a temp dir, no pacing.
pub struct TestEnv {
    _dir: TempDir,
    pub config: AppConfig,
}

impl TestEnv {
    pub fn new() -> Self {
        let dir = TempDir::new().unwrap();
        let mut config = AppConfig {
            tracker: TrackerConfig {
                data_dir: dir.path().join("data"),
                urls_file: dir.path().join("urls.txt"),
                ..TrackerConfig::default()
            },
            scheduler: SchedulerConfig {
                min_delay_secs: 0,
                max_delay_secs: 0,
                ..SchedulerConfig::default()
            },
            ..AppConfig::default()
        };
        config.scraper.request_timeout = 5;
        Self { _dir: dir, config }
    }

    pub fn history_path(&self) -> PathBuf {
        self.config.tracker.history_path()
    }

    pub fn history(&self) -> HistoryStore {
        HistoryStore::new(self.history_path())
    }

    pub fn write_urls(&self, lines: &[String]) {
        let mut file = std::fs::File::create(&self.config.tracker.urls_file).unwrap();
        for line in lines {
            writeln!(file, "{}", line).unwrap();
        }
    }

    pub fn pipeline(&self, notifier: Arc<dyn Notifier>) -> ObservationPipeline {
        ObservationPipeline::new(
            Arc::new(HttpFetcher::new().unwrap()),
            Arc::new(SelectorExtractor::from_config(&self.config.scraper).unwrap()),
            Arc::new(self.history()),
            notifier,
            PipelineConfig::from(&self.config.scraper),
        )
        .unwrap()
    }

    pub fn scheduler(&self, notifier: Arc<dyn Notifier>) -> TrackingScheduler {
        TrackingScheduler::new(
            UrlListSource::new(&self.config.tracker.urls_file),
            Arc::new(self.pipeline(notifier)),
            &self.config.scheduler,
        )
    }
}

/// A minimal product page the default selectors understand.
pub fn product_page(title: &str, price: &str) -> String {
    format!(
        r#"<html>
<head><title>{title}</title></head>
<body>
    <span id="productTitle">  {title}  </span>
    <div id="corePrice_feature_div"><span class="a-price"><span class="a-offscreen">{price}</span></span></div>
</body>
</html>"#
    )
}

pub fn challenge_page() -> String {
    r#"<html><head><title>Robot Check</title></head>
<body><p>Enter the characters you see below</p><form action="/errors/validateCaptcha"></form></body></html>"#
        .to_string()
}

/// Serve `body` at `route`, replacing whatever was mounted before.
pub async fn serve(server: &MockServer, route: &str, status: u16, body: String) {
    server.reset().await;
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(ResponseTemplate::new(status).set_body_string(body))
        .mount(server)
        .await;
}

/// Helper to wait for async operations
pub async fn wait_for_condition<F, Fut>(mut condition: F, timeout_seconds: u64) -> bool
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = bool>,
{
    let start = std::time::Instant::now();
    let timeout = std::time::Duration::from_secs(timeout_seconds);

    while start.elapsed() < timeout {
        if condition().await {
            return true;
        }
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
    }

    false
}
