//! Integration test suite for buildrig.
//!
//! These tests drive the public API end to end: composing tasks, running
//! them through the runner, and executing pipeline files against a
//! temporary workspace.
//!
//! # Test Categories
//!
//! - `composition`: series/parallel ordering, failure and nesting behavior
//! - `runner`: terminal reporting and run outcomes
//! - `pipeline_e2e`: pipeline files running real file, zip and bundler steps
//! - `performance`: concurrency of large parallel groups
//!
//! Time-sensitive tests run on paused tokio time so they are deterministic.


mod composition;
mod performance;
mod pipeline_e2e;
