//! Orchestration layer for build pipelines.
//!
//! Tasks are composed with [`series`] and [`parallel`] into a tree, and
//! that tree is handed to a [`Runner`]. Every leaf is timed and reported
//! through the [`Reporter`]; the runner prints the overall outcome and
//! turns failure into a value instead of an error.

mod composer;
mod reporter;
mod runner;
mod sink;

pub use composer::{parallel, series};
pub use reporter::Reporter;
pub use runner::{run_tasks, RunOutcome, RunSummary, Runner};
pub use sink::{ConsoleSink, LineLevel, LogSink, MemorySink, ReportEvent};
