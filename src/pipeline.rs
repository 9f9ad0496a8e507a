//! One URL, one pass: fetch → extract → validate → compare → persist → notify.

use regex::{Regex, RegexBuilder};
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::ScraperConfig;
use crate::history::HistoryStore;
use crate::models::{ChangeEvent, ChangeKind, HistoryRecord, Observation, TrackedUrl, NOT_AVAILABLE};
use crate::plugins::trackers::{validate, ChangeDetector};
use crate::plugins::traits::{Extractor, FetchRequest, Fetcher, Notifier};
use crate::scraper::RequestIdentity;
use crate::utils::error::{AppError, Result};

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub user_agents: Vec<String>,
    pub accept_language: String,
    pub request_timeout: Duration,
    pub challenge_markers: Vec<String>,
}

impl From<&ScraperConfig> for PipelineConfig {
    fn from(config: &ScraperConfig) -> Self {
        Self {
            user_agents: config.user_agents.clone(),
            accept_language: config.accept_language.clone(),
            request_timeout: config.timeout(),
            challenge_markers: config.challenge_markers.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub enum PipelineOutcome {
    Success {
        record: HistoryRecord,
        kind: ChangeKind,
        notified: bool,
    },
    FetchFailed(String),
    CaptchaBlocked,
    ExtractFailed(String),
    PersistenceFailed(String),
}

impl PipelineOutcome {
    pub fn label(&self) -> &'static str {
        match self {
            PipelineOutcome::Success { .. } => "success",
            PipelineOutcome::FetchFailed(_) => "fetch_failed",
            PipelineOutcome::CaptchaBlocked => "captcha_blocked",
            PipelineOutcome::ExtractFailed(_) => "extract_failed",
            PipelineOutcome::PersistenceFailed(_) => "persistence_failed",
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, PipelineOutcome::Success { .. })
    }
}

pub struct ObservationPipeline {
    fetcher: Arc<dyn Fetcher>,
    extractor: Arc<dyn Extractor>,
    store: Arc<HistoryStore>,
    notifier: Arc<dyn Notifier>,
    detector: ChangeDetector,
    challenge_markers: Vec<Regex>,
    config: PipelineConfig,
}

impl ObservationPipeline {
    pub fn new(
        fetcher: Arc<dyn Fetcher>,
        extractor: Arc<dyn Extractor>,
        store: Arc<HistoryStore>,
        notifier: Arc<dyn Notifier>,
        config: PipelineConfig,
    ) -> Result<Self> {
        let challenge_markers = config
            .challenge_markers
            .iter()
            .filter(|marker| !marker.trim().is_empty())
            .map(|marker| {
                RegexBuilder::new(&regex::escape(marker.trim()))
                    .case_insensitive(true)
                    .build()
                    .map_err(|e| AppError::Configuration(format!("Invalid challenge marker '{}': {}", marker, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            fetcher,
            extractor,
            store,
            notifier,
            detector: ChangeDetector::new(),
            challenge_markers,
            config,
        })
    }

    pub fn store(&self) -> &HistoryStore {
        &self.store
    }

    pub async fn run(&self, url: &TrackedUrl) -> PipelineOutcome {
        let start_time = Instant::now();
        let outcome = self.observe(url).await;

        match &outcome {
            PipelineOutcome::Success { record, kind, notified } => tracing::info!(
                url = %url,
                price = %record.price,
                previous = %record.previous_price,
                change = %kind,
                notified,
                elapsed_ms = start_time.elapsed().as_millis() as u64,
                "Recorded observation"
            ),
            PipelineOutcome::FetchFailed(reason) => tracing::warn!(url = %url, "Fetch failed: {}", reason),
            PipelineOutcome::CaptchaBlocked => {
                tracing::warn!(url = %url, "Bot challenge page served; no history written, consider backing off")
            }
            PipelineOutcome::ExtractFailed(reason) => tracing::warn!(url = %url, "Extraction failed: {}", reason),
            PipelineOutcome::PersistenceFailed(reason) => {
                tracing::error!(url = %url, path = %self.store.path().display(), "Failed to persist observation: {}", reason)
            }
        }

        outcome
    }

    async fn observe(&self, url: &TrackedUrl) -> PipelineOutcome {
        let identity = RequestIdentity::random(&self.config.user_agents, &self.config.accept_language);
        let request = FetchRequest {
            url: url.clone(),
            headers: identity.headers(),
            timeout: self.config.request_timeout,
        };

        // the fetcher's own timeout is advisory; this bound is not
        let fetched = tokio::time::timeout(self.config.request_timeout, self.fetcher.fetch(&request)).await;
        let response = match fetched {
            Err(_) => {
                return PipelineOutcome::FetchFailed(format!(
                    "timed out after {}s",
                    self.config.request_timeout.as_secs_f32()
                ));
            }
            Ok(Err(e)) => return PipelineOutcome::FetchFailed(e.to_string()),
            Ok(Ok(response)) if !response.is_success() => {
                return PipelineOutcome::FetchFailed(AppError::HttpStatus { status: response.status }.to_string());
            }
            Ok(Ok(response)) => response,
        };

        if let Some(marker) = self.challenge_marker(&response.body) {
            tracing::debug!(url = %url, "{}", AppError::ChallengeDetected { marker });
            return PipelineOutcome::CaptchaBlocked;
        }

        let fields = match self.extractor.extract(&response.body) {
            Ok(fields) => fields,
            Err(e) => return PipelineOutcome::ExtractFailed(e.to_string()),
        };

        let title = fields.title.unwrap_or_else(|| {
            tracing::debug!(url = %url, "No title element found");
            NOT_AVAILABLE.to_string()
        });
        let raw_price = fields.raw_price.unwrap_or_else(|| {
            tracing::debug!(url = %url, "No price element found");
            NOT_AVAILABLE.to_string()
        });

        let price = validate(&raw_price);
        if !price.is_available() && raw_price != NOT_AVAILABLE {
            tracing::debug!(url = %url, raw = %raw_price, "Unparseable price text recorded as unavailable");
        }

        let observation = Observation::new(url.clone(), title, price);
        let previous = self.store.lookup(url).await;
        let kind = self.detector.detect(&previous, &observation.price);
        let event = ChangeEvent::from_observation(&observation, &previous, kind);
        let record = HistoryRecord::new(observation, previous, kind);

        if let Err(e) = self.store.persist(record.clone()).await {
            return PipelineOutcome::PersistenceFailed(e.to_string());
        }

        let notified = match event {
            Some(event) => self.dispatch(&event).await,
            None => false,
        };

        PipelineOutcome::Success { record, kind, notified }
    }

    fn challenge_marker(&self, body: &str) -> Option<String> {
        self.challenge_markers
            .iter()
            .find(|marker| marker.is_match(body))
            .map(|marker| marker.as_str().to_string())
    }

    async fn dispatch(&self, event: &ChangeEvent) -> bool {
        match self.notifier.notify(event).await {
            Ok(result) => {
                if result.delivered {
                    tracing::info!(url = %event.url, channel = %result.channel, kind = %event.kind, "Price change notification sent");
                }
                result.delivered
            }
            Err(e) => {
                tracing::warn!(url = %event.url, "Notification failed: {}", e);
                false
            }
        }
    }
}
