//! Pipeline files run end to end against a temporary workspace.

use std::io::Read;
use std::sync::Arc;

use buildrig::config::Config;
use buildrig::orchestration::LogSink;
use buildrig::pipeline::{outline, BuildContext, Pipeline};
use buildrig::TaskKind;

use crate::fixtures::{RunHarness, TestWorkspace};

const RELEASE: &str = r#"
name = "release"

[[steps]]
step = "clean"
path = "dist"

[[steps]]
name = "assets"
step = "parallel"

  [[steps.steps]]
  step = "copy_dir"
  src = "static/css"
  dest = "dist/css"

  [[steps.steps]]
  name = "stamp version"
  step = "replace"
  src = "static/index.html"
  dest = "dist/index.html"
  pattern = "__VERSION__"
  replacement = "1.4.0"

[[steps]]
step = "zip"
source = "dist"
output = "release.zip"
"#;

fn load(ws: &TestWorkspace, text: &str) -> buildrig::Task {
    let path = ws.pipeline_file(text);
    let pipeline = Pipeline::load(&path).expect("pipeline parses");
    pipeline
        .to_task(&BuildContext::for_file(&path, &Config::default()))
        .expect("pipeline builds")
}

fn load_with_sink(ws: &TestWorkspace, text: &str, sink: Arc<dyn LogSink>) -> buildrig::Task {
    let path = ws.pipeline_file(text);
    let ctx = BuildContext::for_file(&path, &Config::default()).with_sink(sink);
    Pipeline::load(&path)
        .expect("pipeline parses")
        .to_task(&ctx)
        .expect("pipeline builds")
}

/// Given a workspace with static assets
/// When the release pipeline runs
/// Then dist/ holds the stamped copy and release.zip holds dist/
#[tokio::test]
async fn test_release_pipeline() {
    let ws = TestWorkspace::new();
    ws.write("dist/stale.txt", "old");
    let task = load(&ws, RELEASE);
    assert_eq!(task.name(), "release");
    assert_eq!(task.kind(), TaskKind::Series);

    let harness = RunHarness::new();
    let outcome = harness.runner.run(&task).await;

    assert!(outcome.is_success(), "run failed: {:?}", outcome.error);
    assert!(!ws.exists("dist/stale.txt"));
    assert_eq!(ws.read("dist/index.html"), "<title>1.4.0</title>");
    assert_eq!(ws.read("dist/css/site.css"), "body {}");
    assert!(ws.exists("release.zip"));

    let file = std::fs::File::open(ws.root().join("release.zip")).unwrap();
    let mut archive = zip::ZipArchive::new(file).unwrap();
    let mut html = String::new();
    archive
        .by_name("index.html")
        .unwrap()
        .read_to_string(&mut html)
        .unwrap();
    assert_eq!(html, "<title>1.4.0</title>");
    assert!(archive.by_name("css/site.css").is_ok());

    assert_eq!(harness.lines_starting("start ").len(), 4);
    assert!(harness.sink.contains("start stamp version"));
    assert!(!harness.sink.contains("assets"));
}

/// Outline shows named groups with their kind
#[test]
fn test_release_outline() {
    let ws = TestWorkspace::new();
    let task = load(&ws, RELEASE);

    let text = outline(&task);

    assert!(text.starts_with("release [series]\n"));
    assert!(text.contains("  assets [parallel]\n"));
    assert!(text.contains("    - stamp version\n"));
    assert_eq!(task.leaf_count(), 4);
}

/// Given a copy step whose source is missing
/// When the pipeline runs
/// Then later steps do not run and the error is reported
#[tokio::test]
async fn test_failing_step_stops_series() {
    let ws = TestWorkspace::new();
    let task = load(
        &ws,
        r#"
[[steps]]
name = "copy missing"
step = "copy"
src = "static/nope.txt"
dest = "dist/nope.txt"

[[steps]]
step = "zip"
source = "static"
output = "static.zip"
"#,
    );

    let harness = RunHarness::new();
    let outcome = harness.runner.run(&task).await;

    assert!(!outcome.is_success());
    assert!(!ws.exists("static.zip"));
    assert_eq!(harness.lines_starting("failed copy missing in ").len(), 1);
    assert_eq!(harness.lines_starting("Failed in ").len(), 1);
}

/// Empty groups are rejected before anything runs
#[test]
fn test_empty_group_rejected() {
    let ws = TestWorkspace::new();
    let path = ws.pipeline_file(
        r#"
[[steps]]
name = "nothing"
step = "parallel"
steps = []
"#,
    );
    let pipeline = Pipeline::load(&path).unwrap();

    let err = pipeline
        .to_task(&BuildContext::for_file(&path, &Config::default()))
        .unwrap_err();

    assert!(err.to_string().contains("nothing"));
}

/// A bundle step runs the configured program in the workspace
#[cfg(unix)]
#[tokio::test]
async fn test_bundle_step_runs_program() {
    let ws = TestWorkspace::new();
    let task = load(
        &ws,
        r#"
[[steps]]
name = "fake bundle"
step = "bundle"
program = "sh"
args = ["-c", "mkdir -p out && cp src/main.ts out/main.js"]
"#,
    );

    let outcome = RunHarness::new().runner.run(&task).await;

    assert!(outcome.is_success(), "run failed: {:?}", outcome.error);
    assert_eq!(ws.read("out/main.js"), "console.log('hi');");
}

/// Bundler errors become one failure per reported block
#[cfg(unix)]
#[tokio::test]
async fn test_bundle_errors_are_collected() {
    let ws = TestWorkspace::new();
    let task = load(
        &ws,
        r#"
[[steps]]
step = "bundle"
program = "sh"
args = ["-c", "printf 'ERROR in ./a.ts\n\nERROR in ./b.ts\n'; exit 2"]
"#,
    );

    let outcome = RunHarness::new().runner.run(&task).await;

    assert_eq!(
        outcome.summary().failures,
        vec!["ERROR in ./a.ts", "ERROR in ./b.ts"]
    );
}

/// Given a bundler installed under the workspace's node_modules
/// When a bundle step names it by relative path
/// Then it is found next to the pipeline file, not the process directory
#[cfg(unix)]
#[tokio::test]
async fn test_bundle_program_relative_to_pipeline_file() {
    use std::os::unix::fs::PermissionsExt;

    let ws = TestWorkspace::new();
    ws.write(
        "node_modules/.bin/webpack",
        "#!/bin/sh\nmkdir -p dist && cp src/main.ts dist/main.js\n",
    );
    let script = ws.root().join("node_modules/.bin/webpack");
    std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
    assert_ne!(std::env::current_dir().unwrap(), ws.root());

    let task = load(
        &ws,
        r#"
[[steps]]
step = "bundle"
program = "node_modules/.bin/webpack"
"#,
    );

    let outcome = RunHarness::new().runner.run(&task).await;

    assert!(outcome.is_success(), "run failed: {:?}", outcome.error);
    assert_eq!(ws.read("dist/main.js"), "console.log('hi');");
}

/// Bundler warnings reach the run's sink while the step still succeeds
#[cfg(unix)]
#[tokio::test]
async fn test_bundle_warnings_reach_sink() {
    let ws = TestWorkspace::new();
    let harness = RunHarness::new();
    let task = load_with_sink(
        &ws,
        r#"
[[steps]]
name = "bundle"
step = "bundle"
program = "sh"
args = ["-c", "printf 'WARNING in ./src/main.ts\\nunused import\\n'"]
"#,
        harness.sink.clone(),
    );

    let outcome = harness.runner.run(&task).await;

    assert!(outcome.is_success());
    assert_eq!(
        harness.sink.warnings(),
        vec!["WARNING in ./src/main.ts\nunused import"]
    );
    assert!(harness.sink.errors().is_empty());
    assert_eq!(harness.lines_starting("completed bundle in ").len(), 1);
}
