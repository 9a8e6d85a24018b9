//! Top-level entry point for running a pipeline.

use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{ExecutionRecord, Task};
use crate::error::Error;
use crate::orchestration::reporter::Reporter;
use crate::orchestration::sink::{LogSink, ReportEvent};
use crate::{rig_error, rig_log};

/// Result of one pipeline run.
///
/// Unlike the reporter, the runner never hands an error back as `Err`: the
/// failure is logged and kept here so the host can decide on an exit status.
#[derive(Debug)]
pub struct RunOutcome {
    /// Name of the task that was run.
    pub name: String,
    /// When the run started.
    pub started_at: Option<DateTime<Utc>>,
    /// When the run finished.
    pub finished_at: Option<DateTime<Utc>>,
    /// Total time of the run.
    pub elapsed: Duration,
    /// The failure, if the run failed.
    pub error: Option<Error>,
}

impl RunOutcome {
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Process exit status for a host binary: 0 on success, 1 on failure.
    pub fn exit_code(&self) -> ExitCode {
        if self.is_success() {
            ExitCode::SUCCESS
        } else {
            ExitCode::FAILURE
        }
    }

    pub fn summary(&self) -> RunSummary {
        RunSummary {
            name: self.name.clone(),
            success: self.is_success(),
            started_at: self.started_at,
            finished_at: self.finished_at,
            elapsed_ms: self.elapsed.as_millis(),
            failures: self
                .error
                .iter()
                .flat_map(|e| e.causes())
                .map(|e| e.to_string())
                .collect(),
        }
    }
}

/// Serializable digest of a [`RunOutcome`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    pub name: String,
    pub success: bool,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub elapsed_ms: u128,
    /// One message per underlying failure.
    pub failures: Vec<String>,
}

/// Runs one task (usually a whole pipeline) and reports the overall result.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use buildrig::core::Task;
/// use buildrig::orchestration::{series, MemorySink, Runner};
///
/// # tokio_test::block_on(async {
/// let sink = Arc::new(MemorySink::new());
/// let runner = Runner::new(sink.clone());
/// let pipeline = series(vec![Task::new("clean", || async { Ok(()) })]);
///
/// let outcome = runner.run(&pipeline).await;
/// assert!(outcome.is_success());
/// assert!(sink.contains("Completed in"));
/// # });
/// ```
#[derive(Debug, Clone)]
pub struct Runner {
    reporter: Reporter,
}

impl Runner {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            reporter: Reporter::new(sink),
        }
    }

    pub fn with_reporter(reporter: Reporter) -> Self {
        Self { reporter }
    }

    pub fn reporter(&self) -> &Reporter {
        &self.reporter
    }

    /// Run `task` to completion. Never fails; see [`RunOutcome`].
    pub async fn run(&self, task: &Task) -> RunOutcome {
        rig_log!("Running '{}' ({} leaf tasks)", task.name(), task.leaf_count());
        let mut record = ExecutionRecord::new(task);
        record.start();

        let result = self.reporter.report(task).await;
        match &result {
            Ok(()) => record.complete(),
            Err(err) => record.fail(&err.to_string()),
        }
        let elapsed = record.elapsed();
        let elapsed_ms = elapsed.as_millis();

        let error = match result {
            Ok(()) => {
                rig_log!("'{}' completed in {}ms", task.name(), elapsed_ms);
                self.reporter
                    .sink()
                    .record(&ReportEvent::RunCompleted { elapsed_ms });
                None
            }
            Err(err) => {
                rig_error!("'{}' failed in {}ms: {}", task.name(), elapsed_ms, err);
                self.reporter.sink().record(&ReportEvent::RunFailed {
                    elapsed_ms,
                    error: err.to_string(),
                });
                Some(err)
            }
        };

        RunOutcome {
            name: record.name,
            started_at: record.started_at,
            finished_at: record.finished_at,
            elapsed,
            error,
        }
    }
}

/// Run `task` with a fresh [`Runner`] writing to `sink`.
pub async fn run_tasks(task: &Task, sink: Arc<dyn LogSink>) -> RunOutcome {
    Runner::new(sink).run(task).await
}
