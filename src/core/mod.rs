//! Core domain models for build pipelines.
//!
//! Tasks and the per-invocation execution record that the orchestration
//! layer fills in while it runs them.

pub mod task;

pub use task::{ExecutionRecord, Task, TaskFuture, TaskKind, TaskStatus};
