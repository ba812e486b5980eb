//! Core library for the readiness probe service: configuration, database
//! handle, dependency checks and the HTTP probe routes.

pub mod config;
pub mod database;
pub mod error;
pub mod handlers;
pub mod health;
pub mod middleware;

#[cfg(test)]
mod test_support;

pub use config::AppConfig;
pub use database::{get_database_pool, load_root_ca};
pub use error::{AppError, CheckError, Result};
pub use handlers::create_routes;
pub use health::{
    CheckKind, CheckResult, DatabaseHealthCheck, FilesystemHealthCheck, HealthCheck, HealthChecker,
    HealthStatus, Verdict,
};

use axum::Router;
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing::{error, info};

/// Shared, immutable-after-startup state handed to every handler.
#[derive(Clone)]
pub struct AppState {
    pub health_checker: Arc<HealthChecker>,
}

impl AppState {
    pub fn new(health_checker: HealthChecker) -> Self {
        Self {
            health_checker: Arc::new(health_checker),
        }
    }
}

pub fn create_app(state: AppState) -> Router {
    Router::new()
        .merge(create_routes())
        .layer(middleware::logging_layer())
        .with_state(state)
}

pub async fn run_server(app: Router, addr: SocketAddr) -> Result<()> {
    info!("Starting server on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        },
        _ = terminate => {
            info!("Received SIGTERM, starting graceful shutdown");
        },
    }
}
