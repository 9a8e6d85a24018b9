//! Series and parallel composition behavior.

use std::time::Duration;

use buildrig::orchestration::{parallel, series};
use buildrig::{FailureKind, TaskKind};

use crate::fixtures::{failing_task, timed_task, Journal, RunHarness};

/// Given N tasks with decreasing delays
/// When they run in series
/// Then each starts only after the previous one ended
#[tokio::test(start_paused = true)]
async fn test_series_total_order() {
    let journal = Journal::new();
    let names = ["t0", "t1", "t2", "t3", "t4"];
    let tasks: Vec<_> = names
        .iter()
        .enumerate()
        .map(|(i, name)| timed_task(name, &journal, 50 - 10 * i as u64))
        .collect();

    let outcome = RunHarness::new().runner.run(&series(tasks)).await;

    assert!(outcome.is_success());
    for pair in names.windows(2) {
        assert!(
            journal.position(&format!("{}:end", pair[0])) < journal.position(&format!("{}:start", pair[1])),
            "{} started before {} ended: {:?}",
            pair[1],
            pair[0],
            journal.labels()
        );
    }
    assert_eq!(journal.finished(), names.to_vec());
}

/// Given tasks with different delays
/// When they run in parallel
/// Then all start at the same instant and finish in delay order
#[tokio::test(start_paused = true)]
async fn test_parallel_starts_together() {
    let journal = Journal::new();
    let group = parallel(vec![
        timed_task("slow", &journal, 300),
        timed_task("medium", &journal, 200),
        timed_task("fast", &journal, 100),
    ]);

    RunHarness::new().runner.run(&group).await;

    let entries = journal.entries();
    let starts: Vec<_> = entries.iter().filter(|e| e.event == "start").collect();
    assert_eq!(starts.len(), 3);
    let first = starts[0].at;
    assert!(starts.iter().all(|e| e.at - first < Duration::from_millis(5)));

    // every start precedes every end
    assert_eq!(
        &journal.labels()[..3],
        &["slow:start", "medium:start", "fast:start"]
    );
    assert_eq!(journal.finished(), vec!["fast", "medium", "slow"]);
}

/// Given a series whose second task fails
/// When it runs
/// Then the third task is never started and the series fails with that error
#[tokio::test(start_paused = true)]
async fn test_series_fail_fast() {
    let journal = Journal::new();
    let harness = RunHarness::new();
    let group = series(vec![
        timed_task("first", &journal, 10),
        failing_task("second", &journal, 10, "lint failed"),
        timed_task("third", &journal, 10),
    ]);

    let outcome = harness.runner.run(&group).await;

    let err = outcome.error.expect("series should fail");
    assert_eq!(err.to_string(), "lint failed");
    assert_eq!(journal.count("third:start"), 0);
    assert!(!harness.sink.contains("third"));
}

/// Given a parallel group where one task fails quickly
/// When it runs
/// Then the group fails but the slow sibling still completes
#[tokio::test(start_paused = true)]
async fn test_parallel_failure_does_not_cancel_siblings() {
    let journal = Journal::new();
    let harness = RunHarness::new();
    let group = parallel(vec![
        failing_task("broken", &journal, 5, "cannot resolve ./missing"),
        timed_task("assets", &journal, 200),
    ]);

    let outcome = harness.runner.run(&group).await;

    assert!(!outcome.is_success());
    assert_eq!(journal.count("assets:end"), 1);
    assert!(journal.position("broken:fail") < journal.position("assets:end"));
    assert_eq!(harness.lines_starting("completed assets").len(), 1);
    assert_eq!(harness.lines_starting("failed broken").len(), 1);
}

/// Given several failures in one parallel group
/// When it runs
/// Then every failure is kept, in declared order
#[tokio::test(start_paused = true)]
async fn test_parallel_collects_all_failures() {
    let journal = Journal::new();
    let group = parallel(vec![
        failing_task("a", &journal, 30, "a broke"),
        timed_task("ok", &journal, 10),
        failing_task("b", &journal, 10, "b broke"),
    ]);

    let outcome = RunHarness::new().runner.run(&group).await;

    let err = outcome.error.expect("parallel should fail");
    assert_eq!(err.kind(), FailureKind::Aggregate);
    let causes: Vec<_> = err.causes().iter().map(|e| e.to_string()).collect();
    assert_eq!(causes, vec!["a broke", "b broke"]);
}

/// series([parallel([a, b]), c]): a and b overlap, c waits for both
#[tokio::test(start_paused = true)]
async fn test_nested_parallel_then_series() {
    let journal = Journal::new();
    let pipeline = series(vec![
        parallel(vec![
            timed_task("a", &journal, 100),
            timed_task("b", &journal, 50),
        ]),
        timed_task("c", &journal, 10),
    ]);

    let outcome = RunHarness::new().runner.run(&pipeline).await;

    assert!(outcome.is_success());
    assert!(journal.position("b:start") < journal.position("a:end"));
    assert!(journal.position("a:start") < journal.position("b:end"));
    assert!(journal.position("a:end") < journal.position("c:start"));
    assert!(journal.position("b:end") < journal.position("c:start"));
}

/// Deep nesting reports every leaf and no group
#[tokio::test(start_paused = true)]
async fn test_deep_nesting_reports_only_leaves() {
    let journal = Journal::new();
    let harness = RunHarness::new();
    let pipeline = series(vec![
        timed_task("clean", &journal, 1),
        parallel(vec![
            series(vec![timed_task("copy", &journal, 5), timed_task("rewrite", &journal, 5)]),
            parallel(vec![timed_task("css", &journal, 3), timed_task("js", &journal, 7)]),
        ]),
        timed_task("zip", &journal, 1),
    ]);
    assert_eq!(pipeline.kind(), TaskKind::Series);
    assert_eq!(pipeline.leaf_count(), 6);

    harness.runner.run(&pipeline).await;

    assert_eq!(harness.lines_starting("start ").len(), 6);
    assert_eq!(harness.lines_starting("completed ").len(), 6);
    assert!(!harness.sink.contains("series("));
    assert!(!harness.sink.contains("parallel("));
    assert!(journal.position("rewrite:end") < journal.position("zip:start"));
    assert!(journal.position("copy:end") < journal.position("rewrite:start"));
}

/// Running the same composed task twice runs every leaf twice
#[tokio::test(start_paused = true)]
async fn test_composed_task_is_reusable() {
    let journal = Journal::new();
    let harness = RunHarness::new();
    let pipeline = series(vec![
        parallel(vec![timed_task("a", &journal, 10), timed_task("b", &journal, 20)]),
        timed_task("c", &journal, 5),
    ]);

    let first = harness.runner.run(&pipeline).await;
    let after_first = journal.labels().len();
    let second = harness.runner.run(&pipeline).await;

    assert!(first.is_success() && second.is_success());
    assert_eq!(journal.labels().len(), after_first * 2);
    for name in ["a", "b", "c"] {
        assert_eq!(journal.count(&format!("{}:end", name)), 2);
    }
    assert_eq!(harness.lines_starting("Completed in").len(), 2);

    journal.clear();
    harness.sink.clear();
    harness.runner.run(&pipeline).await;
    assert_eq!(journal.finished(), vec!["a", "b", "c"]);
}
