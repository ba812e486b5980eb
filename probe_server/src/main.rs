//! Main entry point for the readiness probe server binary

use anyhow::{Context, Result};
use probe_core::{
    create_app, get_database_pool, run_server, AppConfig, AppState, DatabaseHealthCheck,
    FilesystemHealthCheck, HealthChecker,
};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() {
    init_tracing();

    if let Err(e) = run().await {
        error!("startup failed: {:#}", e);
        std::process::exit(1);
    }

    info!("Server shutdown complete");
}

async fn run() -> Result<()> {
    let config = AppConfig::load().context("loading configuration from environment")?;

    let pool = get_database_pool(&config.database)
        .await
        .context("initializing MySQL connection pool")?;

    info!(
        host = %config.database.host,
        database = %config.database.name,
        user = %config.database.user,
        "configured database server"
    );
    info!(path = %config.volume.path.display(), "using volume");

    let health_checker = HealthChecker::new(
        DatabaseHealthCheck::new(pool.clone()),
        FilesystemHealthCheck::new(config.volume.path.clone()),
    );

    info!("probe-server v{}", env!("CARGO_PKG_VERSION"));

    let app = create_app(AppState::new(health_checker));
    run_server(app, config.bind_address()).await?;

    pool.close().await;
    Ok(())
}

fn init_tracing() {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "probe_server=info,probe_core=info,tower_http=info".into());

    let fmt_layer = fmt::layer().with_target(true);

    let is_json = std::env::var("LOG_FORMAT")
        .map(|v| v.to_lowercase() == "json")
        .unwrap_or(false);

    if is_json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer.json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(fmt_layer)
            .init();
    }
}
