//! Dependency checks probed on every readiness request

use crate::error::CheckError;
use sqlx::{Connection, MySqlPool};
use std::path::PathBuf;
use std::time::Duration;
use tokio::fs;

/// Marker file (re)created in the volume on every readiness probe.
pub const MARKER_FILE_NAME: &str = "healthcheck.txt";

/// Ceiling on a single database round trip, measured from the start of the
/// check and applied inside the composite deadline.
pub const DATABASE_PING_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CheckKind {
    Database,
    Filesystem,
}

impl std::fmt::Display for CheckKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CheckKind::Database => write!(f, "database"),
            CheckKind::Filesystem => write!(f, "filesystem"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HealthStatus::Healthy => write!(f, "healthy"),
            HealthStatus::Unhealthy => write!(f, "unhealthy"),
        }
    }
}

/// Outcome of one dependency check. `error` is set iff the check failed.
#[derive(Debug)]
pub struct CheckResult {
    pub kind: CheckKind,
    pub error: Option<CheckError>,
    pub elapsed: Duration,
}

impl CheckResult {
    pub fn passed(kind: CheckKind, elapsed: Duration) -> Self {
        Self {
            kind,
            error: None,
            elapsed,
        }
    }

    pub fn failed(kind: CheckKind, error: CheckError, elapsed: Duration) -> Self {
        Self {
            kind,
            error: Some(error),
            elapsed,
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    pub fn status(&self) -> HealthStatus {
        if self.is_ok() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }
}

#[async_trait::async_trait]
pub trait HealthCheck: Send + Sync {
    async fn check(&self) -> Result<(), CheckError>;
    fn kind(&self) -> CheckKind;
}

/// Pings the database through the shared pool.
pub struct DatabaseHealthCheck {
    pool: MySqlPool,
    timeout: Duration,
}

impl DatabaseHealthCheck {
    pub fn new(pool: MySqlPool) -> Self {
        Self {
            pool,
            timeout: DATABASE_PING_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[async_trait::async_trait]
impl HealthCheck for DatabaseHealthCheck {
    async fn check(&self) -> Result<(), CheckError> {
        let ping = async {
            let mut conn = self.pool.acquire().await?;
            conn.ping().await?;
            Ok::<(), sqlx::Error>(())
        };

        tokio::time::timeout(self.timeout, ping)
            .await
            .map_err(|_| CheckError::Timeout(self.timeout))??;

        Ok(())
    }

    fn kind(&self) -> CheckKind {
        CheckKind::Database
    }
}

/// Probes write access to the volume by creating the marker file.
pub struct FilesystemHealthCheck {
    dir: PathBuf,
}

impl FilesystemHealthCheck {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn marker_path(&self) -> PathBuf {
        self.dir.join(MARKER_FILE_NAME)
    }
}

#[async_trait::async_trait]
impl HealthCheck for FilesystemHealthCheck {
    async fn check(&self) -> Result<(), CheckError> {
        // Create-or-truncate only; the handle is released right away.
        let file = fs::File::create(self.marker_path()).await?;
        drop(file);
        Ok(())
    }

    fn kind(&self) -> CheckKind {
        CheckKind::Filesystem
    }
}
