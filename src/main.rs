//! Tableside background service.
//!
//! Loads configuration, connects storage and external clients, then runs
//! the daily scheduler until Ctrl-C.

use tableside::bootstrap::{Backends, ServiceSettings, Services};
use tableside::config::AppConfig;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "tableside=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_target(true))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_target(false))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::load()?;
    config.validate()?;
    init_tracing(config.is_production());
    tracing::info!(environment = ?config.environment, "Starting tableside");

    let backends = Backends::connect(&config).await?;
    let services = Services::wire(backends, ServiceSettings::from_config(&config)?);

    if config.scheduler.enabled {
        services.scheduler.start()?;
    } else {
        tracing::warn!("Scheduler disabled; no sweeps or reports will run");
    }

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown requested");
    services.scheduler.shutdown().await;
    Ok(())
}
