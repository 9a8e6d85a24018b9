//! Series and parallel composition of tasks.
//!
//! Both return an ordinary [`Task`] so groups nest to any depth. Neither
//! holds state between runs: running a group twice runs every leaf twice.

use std::sync::Arc;

use futures::future::join_all;

use crate::core::task::Body;
use crate::core::{Task, TaskKind};
use crate::error::{Error, Result};
use crate::orchestration::reporter::Reporter;

/// Run `tasks` one after another.
///
/// The first failure ends the group with that same error; later tasks are
/// not started. Nothing already done is rolled back.
pub fn series(tasks: impl IntoIterator<Item = Task>) -> Task {
    let tasks: Arc<[Task]> = tasks.into_iter().collect();
    Task::composite(group_name(TaskKind::Series, &tasks), Body::Series(tasks))
}

/// Run `tasks` concurrently and wait for all of them.
///
/// A failure does not stop siblings; every task runs to completion and all
/// failures are returned together (see [`Error::aggregate`]).
pub fn parallel(tasks: impl IntoIterator<Item = Task>) -> Task {
    let tasks: Arc<[Task]> = tasks.into_iter().collect();
    Task::composite(group_name(TaskKind::Parallel, &tasks), Body::Parallel(tasks))
}

fn group_name(kind: TaskKind, tasks: &[Task]) -> String {
    let names: Vec<&str> = tasks.iter().map(Task::name).collect();
    format!("{}({})", kind, names.join(", "))
}

pub(crate) async fn run_series(reporter: &Reporter, tasks: &[Task]) -> Result<()> {
    for task in tasks {
        reporter.report(task).await?;
    }
    Ok(())
}

pub(crate) async fn run_parallel(reporter: &Reporter, tasks: &[Task]) -> Result<()> {
    // join_all polls every child on one task: all start before any is awaited
    let results = join_all(tasks.iter().map(|task| reporter.report(task))).await;

    let errors: Vec<Error> = results.into_iter().filter_map(|r| r.err()).collect();
    if errors.is_empty() {
        Ok(())
    } else {
        Err(Error::aggregate(errors))
    }
}
