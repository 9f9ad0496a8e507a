use chrono::{DateTime, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::Instrument;

use crate::config::SchedulerConfig;
use crate::models::generate_id;
use crate::pipeline::{ObservationPipeline, PipelineOutcome};
use crate::url_list::UrlListSource;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum SchedulerStatus {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum RunOrigin {
    Startup,
    Daily,
    Manual,
}

impl fmt::Display for RunOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RunOrigin::Startup => "startup",
            RunOrigin::Daily => "daily",
            RunOrigin::Manual => "manual",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct RunSummary {
    pub attempted: u32,
    pub succeeded: u32,
    pub failed: u32,
    pub captcha_blocked: u32,
}

impl RunSummary {
    fn record(&mut self, outcome: &PipelineOutcome) {
        self.attempted += 1;
        match outcome {
            PipelineOutcome::Success { .. } => self.succeeded += 1,
            PipelineOutcome::CaptchaBlocked => self.captcha_blocked += 1,
            PipelineOutcome::FetchFailed(_)
            | PipelineOutcome::ExtractFailed(_)
            | PipelineOutcome::PersistenceFailed(_) => self.failed += 1,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchedulerStats {
    pub runs_completed: u64,
    pub runs_skipped: u64,
    pub last_summary: Option<RunSummary>,
    pub last_run_at: Option<DateTime<Utc>>,
}

/// Random pause between consecutive URLs of a run.
pub struct Pacing {
    min: Duration,
    max: Duration,
    rng: StdRng,
}

impl Pacing {
    pub fn new(min: Duration, max: Duration) -> Self {
        Self::with_rng(min, max, StdRng::from_entropy())
    }

    pub fn seeded(min: Duration, max: Duration, seed: u64) -> Self {
        Self::with_rng(min, max, StdRng::seed_from_u64(seed))
    }

    fn with_rng(min: Duration, max: Duration, rng: StdRng) -> Self {
        let (min, max) = if min <= max { (min, max) } else { (max, min) };
        Self { min, max, rng }
    }

    /// Uniform over `[min, max]`, millisecond resolution.
    pub fn next_delay(&mut self) -> Duration {
        let min_ms = self.min.as_millis() as u64;
        let max_ms = self.max.as_millis() as u64;
        Duration::from_millis(self.rng.gen_range(min_ms..=max_ms))
    }

    pub fn bounds(&self) -> (Duration, Duration) {
        (self.min, self.max)
    }
}

/// Fire once a day at `hour:minute` local time in `tz`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DailyTrigger {
    pub hour: u32,
    pub minute: u32,
    pub tz: chrono_tz::Tz,
}

impl DailyTrigger {
    pub fn from_config(config: &SchedulerConfig) -> crate::Result<Self> {
        Ok(Self {
            hour: config.hour,
            minute: config.minute,
            tz: config.tz()?,
        })
    }

    /// Six-field cron expression (seconds first).
    pub fn cron_expression(&self) -> String {
        format!("0 {} {} * * *", self.minute, self.hour)
    }
}

/// Runs the pipeline over the URL list, one URL at a time.
pub struct TrackingScheduler {
    urls: UrlListSource,
    approved_schemes: Vec<String>,
    pipeline: Arc<ObservationPipeline>,
    pacing: StdMutex<Pacing>,
    run_guard: Mutex<()>,
    shutdown: watch::Sender<bool>,
    status: RwLock<SchedulerStatus>,
    stats: RwLock<SchedulerStats>,
}

impl TrackingScheduler {
    pub fn new(urls: UrlListSource, pipeline: Arc<ObservationPipeline>, config: &SchedulerConfig) -> Self {
        let (min, max) = config.delay_range();
        let (shutdown, _) = watch::channel(false);

        Self {
            urls,
            approved_schemes: config.approved_schemes.clone(),
            pipeline,
            pacing: StdMutex::new(Pacing::new(min, max)),
            run_guard: Mutex::new(()),
            shutdown,
            status: RwLock::new(SchedulerStatus::Idle),
            stats: RwLock::new(SchedulerStats::default()),
        }
    }

    pub fn with_pacing(mut self, pacing: Pacing) -> Self {
        self.pacing = StdMutex::new(pacing);
        self
    }

    pub async fn status(&self) -> SchedulerStatus {
        *self.status.read().await
    }

    pub async fn stats(&self) -> SchedulerStats {
        self.stats.read().await.clone()
    }

    /// Run now, waiting for any in-flight run to finish first.
    pub async fn run_once(&self) -> RunSummary {
        let _guard = self.run_guard.lock().await;
        self.execute(RunOrigin::Manual).await
    }

    /// Run now unless a run is already in progress, in which case skip.
    pub async fn trigger(&self, origin: RunOrigin) -> Option<RunSummary> {
        if self.is_shutting_down() {
            tracing::info!(%origin, "Shutdown requested, ignoring trigger");
            return None;
        }

        let Ok(_guard) = self.run_guard.try_lock() else {
            tracing::warn!(%origin, "Previous run still in progress, skipping this trigger");
            self.stats.write().await.runs_skipped += 1;
            metrics::counter!("uatu_runs_skipped_total").increment(1);
            return None;
        };

        Some(self.execute(origin).await)
    }

    /// Stop before the next URL of the current run and refuse new triggers.
    pub fn request_shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    pub fn is_shutting_down(&self) -> bool {
        *self.shutdown.borrow()
    }

    /// Resolves once no run is in progress.
    pub async fn wait_idle(&self) {
        let _guard = self.run_guard.lock().await;
    }

    /// Register the daily job and, if asked, kick off one run right away.
    pub async fn schedule(self: &Arc<Self>, trigger: DailyTrigger, run_on_startup: bool) -> anyhow::Result<ScheduleHandle> {
        let jobs = JobScheduler::new().await?;

        let scheduler = Arc::clone(self);
        let job = Job::new_async_tz(trigger.cron_expression().as_str(), trigger.tz, move |_uuid, _l| {
            let scheduler = Arc::clone(&scheduler);
            Box::pin(async move {
                scheduler.trigger(RunOrigin::Daily).await;
            })
        })?;
        jobs.add(job).await?;
        jobs.start().await?;

        tracing::info!(
            cron = %trigger.cron_expression(),
            timezone = %trigger.tz,
            "Daily run scheduled at {:02}:{:02}",
            trigger.hour,
            trigger.minute
        );

        let startup = run_on_startup.then(|| {
            let scheduler = Arc::clone(self);
            tokio::spawn(async move {
                scheduler.trigger(RunOrigin::Startup).await;
            })
        });

        Ok(ScheduleHandle { jobs, startup })
    }

    async fn execute(&self, origin: RunOrigin) -> RunSummary {
        let span = tracing::info_span!("run", run_id = %generate_id(), %origin);
        async move {
            *self.status.write().await = SchedulerStatus::Running;
            let start_time = tokio::time::Instant::now();

            let summary = match self.urls.load(&self.approved_schemes) {
                Ok(list) if list.is_empty() => {
                    tracing::error!(file = %self.urls.path().display(), "No valid URLs to track");
                    RunSummary::default()
                }
                Ok(list) => self.process(&list.accepted).await,
                Err(e) => {
                    tracing::error!("Run aborted: {}", e);
                    RunSummary::default()
                }
            };

            tracing::info!(
                attempted = summary.attempted,
                succeeded = summary.succeeded,
                failed = summary.failed,
                captcha_blocked = summary.captcha_blocked,
                elapsed_secs = start_time.elapsed().as_secs(),
                "Run complete"
            );

            self.finish(summary).await;
            summary
        }
        .instrument(span)
        .await
    }

    async fn process(&self, urls: &[crate::models::TrackedUrl]) -> RunSummary {
        let mut summary = RunSummary::default();
        let mut shutdown = self.shutdown.subscribe();

        for (index, url) in urls.iter().enumerate() {
            if *shutdown.borrow_and_update() {
                tracing::info!(remaining = urls.len() - index, "Shutdown requested, stopping run early");
                break;
            }

            let outcome = self.pipeline.run(url).await;
            metrics::counter!("uatu_pipeline_outcomes_total", "outcome" => outcome.label()).increment(1);
            summary.record(&outcome);

            if index + 1 < urls.len() {
                let delay = self.next_delay();
                tracing::debug!(delay_ms = delay.as_millis() as u64, "Pausing before next URL");
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = shutdown.changed() => {}
                }
            }
        }

        summary
    }

    fn next_delay(&self) -> Duration {
        self.pacing
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .next_delay()
    }

    async fn finish(&self, summary: RunSummary) {
        let now = Utc::now();
        {
            let mut stats = self.stats.write().await;
            stats.runs_completed += 1;
            stats.last_summary = Some(summary);
            stats.last_run_at = Some(now);
        }
        *self.status.write().await = SchedulerStatus::Idle;

        metrics::counter!("uatu_runs_total").increment(1);
        metrics::gauge!("uatu_last_run_timestamp_seconds").set(now.timestamp() as f64);
    }
}

/// Keeps the daily job alive; dropping it without `shutdown` leaves the job running.
pub struct ScheduleHandle {
    jobs: JobScheduler,
    startup: Option<JoinHandle<()>>,
}

impl ScheduleHandle {
    pub async fn shutdown(mut self) -> anyhow::Result<()> {
        self.jobs.shutdown().await?;
        if let Some(startup) = self.startup.take() {
            if let Err(e) = startup.await {
                tracing::warn!("Startup run task ended abnormally: {}", e);
            }
        }
        tracing::info!("Tracking scheduler shutdown");
        Ok(())
    }
}
