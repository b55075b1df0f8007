mod bootstrap;

use anyhow::Result;
use carmarket_core::config::{AppConfig, LoadOptions, LogFormat};
use carmarket_engine::start_scheduler;
use tracing_subscriber::EnvFilter;

fn init_logging(config: &AppConfig) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.logging.level.as_str()));
    let builder = tracing_subscriber::fmt().with_target(false).with_env_filter(filter);

    match config.logging.format {
        LogFormat::Compact => builder.compact().init(),
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Json => builder.json().init(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    run().await
}

async fn run() -> Result<()> {
    let config = AppConfig::load(LoadOptions::default())?;
    init_logging(&config);

    let app = bootstrap::bootstrap_with_config(config).await?;

    let scheduler = if app.config.scheduler.enabled {
        Some(start_scheduler(app.sweeper.clone(), &app.config.scheduler).await?)
    } else {
        tracing::warn!(
            event_name = "system.worker.scheduler_disabled",
            correlation_id = "bootstrap",
            "scheduler disabled; lifecycle sweeps only run through the CLI"
        );
        None
    };

    tracing::info!(
        event_name = "system.worker.started",
        correlation_id = "bootstrap",
        environment = app.config.environment.as_str(),
        "carmarket worker started"
    );
    tokio::signal::ctrl_c().await?;
    tracing::info!(
        event_name = "system.worker.stopping",
        correlation_id = "shutdown",
        "carmarket worker stopping"
    );

    if let Some(mut scheduler) = scheduler {
        scheduler.shutdown().await?;
    }
    app.db_pool.close().await;
    Ok(())
}
