use clap::Parser;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::{Ipv4Addr, SocketAddr};
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;

use uatu_pricewatch::config::AppConfig;
use uatu_pricewatch::element_finder::SelectorExtractor;
use uatu_pricewatch::history::HistoryStore;
use uatu_pricewatch::pipeline::{ObservationPipeline, PipelineConfig};
use uatu_pricewatch::plugins::NotifierManager;
use uatu_pricewatch::scheduler::{DailyTrigger, TrackingScheduler};
use uatu_pricewatch::scraper::HttpFetcher;
use uatu_pricewatch::url_list::UrlListSource;
use uatu_pricewatch::utils::instance::InstanceGuard;
use uatu_pricewatch::utils::logging;
use uatu_pricewatch::{AppError, Result};

#[derive(Parser, Debug)]
#[command(name = "uatu-pricewatch", version, about = "Scheduled product price tracker with change alerts")]
struct Cli {
    /// Path to a TOML config file
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Run over the URL list once and exit
    #[arg(long)]
    once: bool,

    /// Print the effective configuration and exit
    #[arg(long)]
    print_config: bool,
}

/// Take the instance lock, then open the log. A rejected second instance
/// never touches the running instance's log file.
fn claim_instance(config: &AppConfig) -> Result<(InstanceGuard, WorkerGuard)> {
    let instance = InstanceGuard::acquire(config.instance.lock_port)?;
    let log_guard = logging::init(&config.logging, &config.tracker.data_dir)?;
    Ok((instance, log_guard))
}

#[tokio::main]
async fn main() -> ExitCode {
    // a missing .env is fine
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{}", e);
            eprintln!("uatu-pricewatch: {}", e);
            ExitCode::from(e.exit_code())
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = AppConfig::load(cli.config.as_deref())?;

    if cli.print_config {
        let rendered = config
            .to_toml()
            .map_err(|e| AppError::Configuration(format!("Failed to render config: {}", e)))?;
        print!("{}", rendered);
        return Ok(());
    }

    std::fs::create_dir_all(&config.tracker.data_dir).map_err(|e| {
        AppError::Configuration(format!(
            "Cannot create data directory {}: {}",
            config.tracker.data_dir.display(),
            e
        ))
    })?;

    let (instance, _log_guard) = claim_instance(&config)?;
    info!("Starting Uatu Pricewatch v{}", env!("CARGO_PKG_VERSION"));
    info!(port = instance.port(), "Instance lock acquired");

    if config.metrics.enabled {
        let addr = SocketAddr::from((Ipv4Addr::UNSPECIFIED, config.metrics.port));
        PrometheusBuilder::new()
            .with_http_listener(addr)
            .install()
            .map_err(|e| AppError::Configuration(format!("Failed to start metrics exporter: {}", e)))?;
        info!("Metrics exporter listening on {}", addr);
    }

    let scheduler = Arc::new(build_scheduler(&config).await?);

    if cli.once {
        let summary = scheduler.run_once().await;
        info!(
            attempted = summary.attempted,
            succeeded = summary.succeeded,
            failed = summary.failed,
            captcha_blocked = summary.captcha_blocked,
            "Single run finished"
        );
        return Ok(());
    }

    let trigger = DailyTrigger::from_config(&config.scheduler)?;
    let handle = scheduler
        .schedule(trigger, config.scheduler.run_on_startup)
        .await
        .map_err(|e| AppError::Configuration(format!("Failed to start job scheduler: {}", e)))?;

    shutdown_signal().await;
    info!("Shutting down...");

    scheduler.request_shutdown();
    if let Err(e) = handle.shutdown().await {
        tracing::warn!("Job scheduler did not stop cleanly: {}", e);
    }
    scheduler.wait_idle().await;

    info!("Shutdown complete");
    Ok(())
}

async fn build_scheduler(config: &AppConfig) -> Result<TrackingScheduler> {
    let fetcher = Arc::new(HttpFetcher::new()?);
    let extractor = Arc::new(SelectorExtractor::from_config(&config.scraper)?);
    let store = Arc::new(HistoryStore::new(config.tracker.history_path()));
    let notifier = Arc::new(NotifierManager::from_config(&config.notifications).await?);

    info!(history = %store.path().display(), urls = %config.tracker.urls_file.display(), "Tracker configured");

    let pipeline = ObservationPipeline::new(
        fetcher,
        extractor,
        store,
        notifier,
        PipelineConfig::from(&config.scraper),
    )?;

    Ok(TrackingScheduler::new(
        UrlListSource::new(&config.tracker.urls_file),
        Arc::new(pipeline),
        &config.scheduler,
    ))
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
