//! Timing checks on the paused tokio clock.
//!
//! Parallel groups interleave on one thread, so N equal sleeps take about
//! one sleep; series groups take their sum.

use std::time::Duration;

use tokio::time::Instant;

use buildrig::orchestration::{parallel, series};

use crate::fixtures::{timed_task, Journal, RunHarness};

const SLEEP_MS: u64 = 100;
const WIDTH: usize = 50;

fn names(prefix: &str) -> Vec<&'static str> {
    (0..WIDTH)
        .map(|i| -> &'static str { Box::leak(format!("{}{}", prefix, i).into_boxed_str()) })
        .collect()
}

/// Given 50 tasks that each sleep 100ms
/// When they run in parallel
/// Then the group takes about 100ms, not 5s
#[tokio::test(start_paused = true)]
async fn test_parallel_sleeps_overlap() {
    let journal = Journal::new();
    let group = parallel(
        names("p")
            .into_iter()
            .map(|name| timed_task(name, &journal, SLEEP_MS))
            .collect::<Vec<_>>(),
    );

    let start = Instant::now();
    let outcome = RunHarness::new().runner.run(&group).await;
    let elapsed = start.elapsed();

    assert!(outcome.is_success());
    assert_eq!(journal.finished().len(), WIDTH);
    assert!(elapsed >= Duration::from_millis(SLEEP_MS));
    assert!(elapsed < Duration::from_millis(SLEEP_MS * 2), "took {:?}", elapsed);
}

/// Series of the same tasks takes the sum of the sleeps
#[tokio::test(start_paused = true)]
async fn test_series_sleeps_add_up() {
    let journal = Journal::new();
    let group = series(
        names("s")
            .into_iter()
            .take(5)
            .map(|name| timed_task(name, &journal, SLEEP_MS))
            .collect::<Vec<_>>(),
    );

    let start = Instant::now();
    RunHarness::new().runner.run(&group).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(SLEEP_MS * 5));
    assert!(elapsed < Duration::from_millis(SLEEP_MS * 6), "took {:?}", elapsed);
}

/// A series of parallel stages takes the sum of each stage's longest task
#[tokio::test(start_paused = true)]
async fn test_staged_pipeline_timing() {
    let journal = Journal::new();
    let pipeline = series(vec![
        parallel(vec![timed_task("a1", &journal, 50), timed_task("a2", &journal, 150)]),
        parallel(vec![timed_task("b1", &journal, 200), timed_task("b2", &journal, 10)]),
    ]);

    let start = Instant::now();
    RunHarness::new().runner.run(&pipeline).await;
    let elapsed = start.elapsed();

    assert!(elapsed >= Duration::from_millis(350));
    assert!(elapsed < Duration::from_millis(400), "took {:?}", elapsed);
}
