//! Timing and status reporting around a single task invocation.

use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::core::task::Body;
use crate::core::{ExecutionRecord, Task};
use crate::error::Result;
use crate::orchestration::composer;
use crate::orchestration::sink::{LogSink, ReportEvent};
use crate::rig_trace;

/// Runs tasks and reports each leaf's start, duration and outcome.
///
/// Series and parallel groups are run through the same reporter so every
/// leaf inside them is reported, while the groups themselves stay silent.
/// Errors are never swallowed: whatever a task fails with is returned as-is.
#[derive(Clone)]
pub struct Reporter {
    sink: Arc<dyn LogSink>,
}

impl Reporter {
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self { sink }
    }

    pub fn sink(&self) -> &Arc<dyn LogSink> {
        &self.sink
    }

    /// Run `task` once, timing and reporting it.
    pub fn report<'a>(&'a self, task: &'a Task) -> BoxFuture<'a, Result<()>> {
        async move {
            let mut record = ExecutionRecord::new(task);
            let logged = !task.kind().is_composite();

            record.start();
            rig_trace!("{} '{}' -> {}", record.kind, record.name, record.status);
            if logged {
                self.sink.record(&ReportEvent::TaskStarted {
                    name: record.name.clone(),
                });
            }

            let result = self.invoke(task).await;

            match &result {
                Ok(()) => {
                    record.complete();
                    if logged {
                        self.sink.record(&ReportEvent::TaskCompleted {
                            name: record.name.clone(),
                            elapsed_ms: record.elapsed_ms(),
                        });
                    }
                }
                Err(err) => {
                    record.fail(&err.to_string());
                    if logged {
                        self.sink.record(&ReportEvent::TaskFailed {
                            name: record.name.clone(),
                            elapsed_ms: record.elapsed_ms(),
                        });
                    }
                }
            }
            rig_trace!(
                "{} '{}' -> {} ({}ms)",
                record.kind,
                record.name,
                record.status,
                record.elapsed_ms()
            );

            result
        }
        .boxed()
    }

    async fn invoke(&self, task: &Task) -> Result<()> {
        match task.body() {
            Body::Leaf(op) => op().await,
            Body::Series(children) => composer::run_series(self, children).await,
            Body::Parallel(children) => composer::run_parallel(self, children).await,
        }
    }
}

impl std::fmt::Debug for Reporter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Reporter").finish_non_exhaustive()
    }
}
