//! Build-scripting toolkit: compose build steps into series and parallel
//! pipelines, run them with per-step timing, and use the bundled file,
//! archive and bundler helpers as leaf steps.

pub mod archive;
pub mod bundler;
pub mod config;
pub mod core;
pub mod error;
pub mod fsops;
pub mod log;
pub mod orchestration;
pub mod pipeline;
pub mod util;

pub use crate::core::{Task, TaskKind};
pub use error::{Error, FailureKind, Result};
pub use orchestration::{parallel, run_tasks, series, Runner};
