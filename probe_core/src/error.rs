//! Application error types and handling

use std::path::PathBuf;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, AppError>;

/// Errors raised while bringing the service up. Every variant is fatal:
/// the process logs it and exits before serving traffic.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read root CA certificate {}: {source}", .path.display())]
    CaCertificateRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid root CA certificate {}: no usable certificate found", .path.display())]
    InvalidCaCertificate { path: PathBuf },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Config(err.to_string())
    }
}

/// Failure of a single dependency check. These never leave the health
/// checker; they only flip one result to failed and get logged.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("check timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("composite deadline exceeded before the check reported")]
    DeadlineExceeded,

    #[error("database ping failed: {0}")]
    Database(#[from] sqlx::Error),

    #[error("volume write failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("check panicked: {0}")]
    Panicked(String),

    #[error("check task was aborted")]
    TaskAborted,
}

impl CheckError {
    pub fn is_timeout(&self) -> bool {
        matches!(self, CheckError::Timeout(_) | CheckError::DeadlineExceeded)
    }
}
