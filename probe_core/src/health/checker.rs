//! Composite readiness check: both dependencies probed concurrently under a
//! shared deadline, folded into a single verdict.

use crate::error::CheckError;
use crate::health::checks::{CheckKind, CheckResult, HealthCheck, HealthStatus};
use futures_util::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tokio::time::{timeout_at, Instant};
use tracing::{debug, error, info, warn};

/// Budget for the whole composite check.
pub const READINESS_DEADLINE: Duration = Duration::from_secs(2);

/// Extra time the join point waits past the deadline for tasks to report
/// their own timeout before it gives up on them.
const JOIN_GRACE: Duration = Duration::from_millis(250);

#[derive(Debug)]
pub struct Verdict {
    results: Vec<CheckResult>,
}

impl Verdict {
    pub fn new(results: Vec<CheckResult>) -> Self {
        Self { results }
    }

    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(CheckResult::is_ok)
    }

    pub fn status(&self) -> HealthStatus {
        if self.is_healthy() {
            HealthStatus::Healthy
        } else {
            HealthStatus::Unhealthy
        }
    }

    pub fn results(&self) -> &[CheckResult] {
        &self.results
    }

    pub fn result(&self, kind: CheckKind) -> Option<&CheckResult> {
        self.results.iter().find(|r| r.kind == kind)
    }

    pub fn failures(&self) -> impl Iterator<Item = &CheckResult> {
        self.results.iter().filter(|r| !r.is_ok())
    }
}

pub struct HealthChecker {
    checks: Vec<Arc<dyn HealthCheck>>,
    deadline: Duration,
}

impl HealthChecker {
    pub fn new<D, F>(database: D, filesystem: F) -> Self
    where
        D: HealthCheck + 'static,
        F: HealthCheck + 'static,
    {
        let database: Arc<dyn HealthCheck> = Arc::new(database);
        let filesystem: Arc<dyn HealthCheck> = Arc::new(filesystem);

        Self {
            checks: vec![database, filesystem],
            deadline: READINESS_DEADLINE,
        }
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Runs every check in its own task and waits for all of them.
    ///
    /// Never returns early on a failure: each dependency yields exactly one
    /// result. A check still running at the deadline is recorded as failed.
    /// Dropping the returned future aborts the in-flight tasks.
    pub async fn check(&self) -> Verdict {
        let started = Instant::now();
        let deadline = started + self.deadline;

        let mut tasks = JoinSet::new();
        for (index, check) in self.checks.iter().enumerate() {
            let check = Arc::clone(check);
            tasks.spawn(async move { (index, run_check(check, deadline).await) });
        }

        let mut slots: Vec<Option<CheckResult>> = self.checks.iter().map(|_| None).collect();
        let mut reported = 0;
        let mut deadline_elapsed = false;

        while reported < slots.len() {
            match timeout_at(deadline + JOIN_GRACE, tasks.join_next()).await {
                Ok(Some(Ok((index, result)))) => {
                    if slots[index].replace(result).is_none() {
                        reported += 1;
                    }
                }
                Ok(Some(Err(e))) => {
                    warn!(error = %e, "health check task ended without reporting");
                }
                Ok(None) => break,
                Err(_) => {
                    deadline_elapsed = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        let results = slots
            .into_iter()
            .zip(&self.checks)
            .map(|(slot, check)| {
                slot.unwrap_or_else(|| {
                    let error = if deadline_elapsed {
                        CheckError::DeadlineExceeded
                    } else {
                        CheckError::TaskAborted
                    };
                    CheckResult::failed(check.kind(), error, started.elapsed())
                })
            })
            .collect::<Vec<_>>();

        for result in &results {
            log_result(result);
        }

        let verdict = Verdict::new(results);
        if verdict.is_healthy() {
            debug!(elapsed_ms = started.elapsed().as_millis() as u64, "readiness check passed");
        } else {
            warn!(
                failed = verdict.failures().count(),
                elapsed_ms = started.elapsed().as_millis() as u64,
                "readiness check failed"
            );
        }

        verdict
    }
}

async fn run_check(check: Arc<dyn HealthCheck>, deadline: Instant) -> CheckResult {
    let kind = check.kind();
    let started = Instant::now();

    let outcome = AssertUnwindSafe(timeout_at(deadline, check.check()))
        .catch_unwind()
        .await;
    let elapsed = started.elapsed();

    match outcome {
        Ok(Ok(Ok(()))) => CheckResult::passed(kind, elapsed),
        Ok(Ok(Err(e))) => CheckResult::failed(kind, e, elapsed),
        Ok(Err(_)) => CheckResult::failed(kind, CheckError::DeadlineExceeded, elapsed),
        Err(panic) => {
            let error = CheckError::Panicked(panic_message(&*panic));
            CheckResult::failed(kind, error, elapsed)
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn log_result(result: &CheckResult) {
    let elapsed_ms = result.elapsed.as_millis() as u64;
    match &result.error {
        None => info!(check = %result.kind, elapsed_ms, "health check passed"),
        Some(e) => error!(
            check = %result.kind,
            elapsed_ms,
            timeout = e.is_timeout(),
            error = %e,
            "health check failed"
        ),
    }
}
