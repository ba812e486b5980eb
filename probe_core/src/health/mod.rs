pub mod checker;
pub mod checks;


pub use checker::{HealthChecker, Verdict, READINESS_DEADLINE};
pub use checks::{
    CheckKind, CheckResult, DatabaseHealthCheck, FilesystemHealthCheck, HealthCheck, HealthStatus,
    MARKER_FILE_NAME,
};
