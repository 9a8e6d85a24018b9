//! Task data model for build pipelines.
//!
//! A [`Task`] is a named, zero-argument unit of async work. Leaf tasks wrap
//! caller code; series and parallel tasks wrap an ordered list of other
//! tasks. All of them are cheap to clone and can be run any number of times.

use std::borrow::Cow;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures::future::BoxFuture;
use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use crate::error::Result;

/// Future returned by a leaf task's operation.
pub type TaskFuture = BoxFuture<'static, Result<()>>;

type Operation = Arc<dyn Fn() -> TaskFuture + Send + Sync>;

/// What a task is made of. Composite kinds are never reported themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskKind {
    /// Caller-supplied work.
    Leaf,
    /// Children run one after another.
    Series,
    /// Children run concurrently.
    Parallel,
}

impl TaskKind {
    pub fn is_composite(&self) -> bool {
        !matches!(self, TaskKind::Leaf)
    }
}

impl fmt::Display for TaskKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskKind::Leaf => write!(f, "leaf"),
            TaskKind::Series => write!(f, "series"),
            TaskKind::Parallel => write!(f, "parallel"),
        }
    }
}

#[derive(Clone)]
pub(crate) enum Body {
    Leaf(Operation),
    Series(Arc<[Task]>),
    Parallel(Arc<[Task]>),
}

/// A named unit of asynchronous work.
///
/// # Example
///
/// ```
/// use buildrig::core::Task;
///
/// let task = Task::new("hello", || async { Ok(()) });
/// assert_eq!(task.name(), "hello");
/// ```
#[derive(Clone)]
pub struct Task {
    name: Cow<'static, str>,
    body: Body,
}

impl Task {
    /// Create a leaf task. `f` is called once per run and must produce a
    /// fresh future each time.
    pub fn new<F, Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<()>> + Send + 'static,
    {
        let op: Operation = Arc::new(move || -> TaskFuture { Box::pin(f()) });
        Self {
            name: name.into(),
            body: Body::Leaf(op),
        }
    }

    pub(crate) fn composite(name: impl Into<Cow<'static, str>>, body: Body) -> Self {
        Self {
            name: name.into(),
            body,
        }
    }

    /// Replace the task's name, keeping its work.
    pub fn named(mut self, name: impl Into<Cow<'static, str>>) -> Self {
        self.name = name.into();
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> TaskKind {
        match self.body {
            Body::Leaf(_) => TaskKind::Leaf,
            Body::Series(_) => TaskKind::Series,
            Body::Parallel(_) => TaskKind::Parallel,
        }
    }

    /// Direct children of a composite task; empty for leaves.
    pub fn children(&self) -> &[Task] {
        match &self.body {
            Body::Leaf(_) => &[],
            Body::Series(children) | Body::Parallel(children) => &children[..],
        }
    }

    pub(crate) fn body(&self) -> &Body {
        &self.body
    }

    /// Number of leaf tasks in this tree.
    pub fn leaf_count(&self) -> usize {
        match self.kind() {
            TaskKind::Leaf => 1,
            _ => self.children().iter().map(Task::leaf_count).sum(),
        }
    }
}

impl fmt::Debug for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Task")
            .field("name", &self.name)
            .field("kind", &self.kind())
            .field("children", &self.children())
            .finish()
    }
}

/// Outcome of one task invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "state")]
pub enum TaskStatus {
    /// Record created, work not yet started.
    Pending,
    /// Work is in flight.
    Running,
    /// Work finished successfully.
    Completed,
    /// Work failed.
    Failed {
        /// Error message describing the failure.
        error: String,
    },
}

impl Default for TaskStatus {
    fn default() -> Self {
        Self::Pending
    }
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed { .. })
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TaskStatus::Pending => write!(f, "pending"),
            TaskStatus::Running => write!(f, "running"),
            TaskStatus::Completed => write!(f, "completed"),
            TaskStatus::Failed { error } => write!(f, "failed: {}", error),
        }
    }
}

/// Timing and outcome of a single invocation.
///
/// Lives only as long as the invocation; each run of a task gets a fresh
/// record. Terminal states are final: later transitions are ignored.
///
/// Elapsed time follows the tokio clock, so it advances with paused time in
/// tests.
#[derive(Debug, Clone)]
pub struct ExecutionRecord {
    /// Name of the task being run.
    pub name: String,
    /// Kind of the task being run.
    pub kind: TaskKind,
    /// Current state.
    pub status: TaskStatus,
    /// Wall-clock time the run started.
    pub started_at: Option<DateTime<Utc>>,
    /// Wall-clock time the run finished (success or failure).
    pub finished_at: Option<DateTime<Utc>>,
    clock: Option<Instant>,
    elapsed: Option<Duration>,
}

impl ExecutionRecord {
    pub fn new(task: &Task) -> Self {
        Self {
            name: task.name().to_string(),
            kind: task.kind(),
            status: TaskStatus::Pending,
            started_at: None,
            finished_at: None,
            clock: None,
            elapsed: None,
        }
    }

    /// Pending → Running.
    pub fn start(&mut self) {
        if self.status != TaskStatus::Pending {
            return;
        }
        self.status = TaskStatus::Running;
        self.started_at = Some(Utc::now());
        self.clock = Some(Instant::now());
    }

    /// Running → Completed.
    pub fn complete(&mut self) {
        if self.finish() {
            self.status = TaskStatus::Completed;
        }
    }

    /// Running → Failed.
    pub fn fail(&mut self, error: &str) {
        if self.finish() {
            self.status = TaskStatus::Failed {
                error: error.to_string(),
            };
        }
    }

    fn finish(&mut self) -> bool {
        if self.status != TaskStatus::Running {
            return false;
        }
        self.finished_at = Some(Utc::now());
        self.elapsed = self.clock.map(|c| c.elapsed());
        true
    }

    /// Time between start and finish, or since start while still running.
    pub fn elapsed(&self) -> Duration {
        match (self.elapsed, self.clock) {
            (Some(elapsed), _) => elapsed,
            (None, Some(clock)) => clock.elapsed(),
            (None, None) => Duration::ZERO,
        }
    }

    /// Elapsed time in whole milliseconds.
    pub fn elapsed_ms(&self) -> u128 {
        self.elapsed().as_millis()
    }
}
