//! Pipeline files: a TOML description of a task tree.
//!
//! ```toml
//! name = "release"
//!
//! [[steps]]
//! step = "clean"
//! path = "dist"
//!
//! [[steps]]
//! step = "parallel"
//!
//! [[steps.steps]]
//! step = "copy"
//! src = "static/index.html"
//! dest = "dist/index.html"
//!
//! [[steps.steps]]
//! step = "bundle"
//! args = ["--mode", "production"]
//!
//! [[steps]]
//! step = "zip"
//! source = "dist"
//! output = "release.zip"
//! ```
//!
//! Top-level steps run in series. Relative paths are resolved against the
//! directory holding the pipeline file.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::bundler::Bundler;
use crate::config::Config;
use crate::core::{Task, TaskKind};
use crate::orchestration::{parallel, series, ConsoleSink, LogSink};
use crate::util::resolve;
use crate::{archive, fsops, rig_debug, rig_log, Error, Result};

/// Default pipeline file name looked up in the working directory.
pub const DEFAULT_PIPELINE_FILE: &str = "buildrig.toml";

/// A whole pipeline file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pipeline {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub steps: Vec<Step>,
}

/// One entry in a pipeline, optionally named.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(flatten)]
    pub action: Action,
}

/// What a step does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum Action {
    /// Delete a file or directory tree.
    Clean { path: PathBuf },
    /// Copy one file.
    Copy { src: PathBuf, dest: PathBuf },
    /// Copy a directory tree.
    CopyDir { src: PathBuf, dest: PathBuf },
    /// Copy a text file, replacing every match of `pattern`.
    Replace {
        src: PathBuf,
        dest: PathBuf,
        pattern: String,
        replacement: String,
    },
    /// Run the bundler.
    Bundle {
        #[serde(default)]
        program: Option<String>,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        cwd: Option<PathBuf>,
    },
    /// Zip a directory.
    Zip { source: PathBuf, output: PathBuf },
    /// Nested steps run one after another.
    Series { steps: Vec<Step> },
    /// Nested steps run concurrently.
    Parallel { steps: Vec<Step> },
}

/// Values the steps need when they are turned into tasks.
#[derive(Clone)]
pub struct BuildContext {
    /// Base for relative paths.
    pub base_dir: PathBuf,
    /// Bundler program for `bundle` steps that don't name one.
    pub bundler: String,
    /// Where steps send warnings while they run.
    pub sink: Arc<dyn LogSink>,
}

impl BuildContext {
    pub fn new(base_dir: impl Into<PathBuf>, config: &Config) -> Self {
        Self {
            base_dir: base_dir.into(),
            bundler: config.effective_bundler().to_string(),
            sink: Arc::new(ConsoleSink::new(config.effective_color())),
        }
    }

    /// Send step warnings to `sink` instead of the console.
    pub fn with_sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Context for a pipeline file: paths resolve next to the file.
    pub fn for_file(path: &Path, config: &Config) -> Self {
        let base = path
            .parent()
            .filter(|p| !p.as_os_str().is_empty())
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        Self::new(base, config)
    }

    fn path(&self, path: &Path) -> PathBuf {
        resolve(&self.base_dir, path)
    }
}

impl std::fmt::Debug for BuildContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BuildContext")
            .field("base_dir", &self.base_dir)
            .field("bundler", &self.bundler)
            .finish_non_exhaustive()
    }
}

impl Pipeline {
    pub fn from_toml(text: &str) -> Result<Self> {
        Ok(toml::from_str(text)?)
    }

    pub fn load(path: &Path) -> Result<Self> {
        rig_debug!("Pipeline::load path={}", path.display());
        let pipeline = Self::from_toml(&fs::read_to_string(path)?)?;
        rig_log!(
            "Loaded pipeline '{}' with {} top-level steps",
            pipeline.display_name(),
            pipeline.steps.len()
        );
        Ok(pipeline)
    }

    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("pipeline")
    }

    /// Reject empty pipelines, empty groups and bad patterns.
    pub fn validate(&self) -> Result<()> {
        if self.steps.is_empty() {
            return Err(Error::Validation(format!(
                "pipeline '{}' has no steps",
                self.display_name()
            )));
        }
        self.steps.iter().try_for_each(Step::validate)
    }

    /// Build the task tree. The top level is a series named after the
    /// pipeline.
    pub fn to_task(&self, ctx: &BuildContext) -> Result<Task> {
        self.validate()?;
        let tasks = self
            .steps
            .iter()
            .map(|step| step.to_task(ctx))
            .collect::<Result<Vec<_>>>()?;
        Ok(series(tasks).named(self.display_name().to_string()))
    }
}

impl Step {
    fn validate(&self) -> Result<()> {
        match &self.action {
            Action::Series { steps } | Action::Parallel { steps } => {
                if steps.is_empty() {
                    return Err(Error::Validation(format!(
                        "group '{}' has no steps",
                        self.display_name()
                    )));
                }
                steps.iter().try_for_each(Step::validate)
            }
            Action::Replace { pattern, .. } => {
                Regex::new(pattern)?;
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The explicit name, or one derived from the action.
    pub fn display_name(&self) -> String {
        if let Some(name) = &self.name {
            return name.clone();
        }
        match &self.action {
            Action::Clean { path } => format!("clean {}", path.display()),
            Action::Copy { src, dest } => format!("copy {} -> {}", src.display(), dest.display()),
            Action::CopyDir { src, dest } => {
                format!("copy_dir {} -> {}", src.display(), dest.display())
            }
            Action::Replace { src, dest, .. } => {
                format!("replace {} -> {}", src.display(), dest.display())
            }
            Action::Bundle { program, args, .. } => {
                let mut line = program.clone().unwrap_or_else(|| "bundle".to_string());
                for arg in args {
                    line.push(' ');
                    line.push_str(arg);
                }
                line
            }
            Action::Zip { source, output } => {
                format!("zip {} -> {}", source.display(), output.display())
            }
            Action::Series { .. } => "series".to_string(),
            Action::Parallel { .. } => "parallel".to_string(),
        }
    }

    pub fn to_task(&self, ctx: &BuildContext) -> Result<Task> {
        let name = self.display_name();
        let task = match &self.action {
            Action::Clean { path } => {
                let path = ctx.path(path);
                Task::new(name, move || {
                    let path = path.clone();
                    async move { fsops::rmrf(path).await }
                })
            }
            Action::Copy { src, dest } => {
                let (src, dest) = (ctx.path(src), ctx.path(dest));
                Task::new(name, move || {
                    let (src, dest) = (src.clone(), dest.clone());
                    async move { fsops::copy_file(src, dest).await }
                })
            }
            Action::CopyDir { src, dest } => {
                let (src, dest) = (ctx.path(src), ctx.path(dest));
                Task::new(name, move || {
                    let (src, dest) = (src.clone(), dest.clone());
                    async move { fsops::copy_dir(src, dest).await }
                })
            }
            Action::Replace {
                src,
                dest,
                pattern,
                replacement,
            } => {
                let (src, dest) = (ctx.path(src), ctx.path(dest));
                let regex = Regex::new(pattern)?;
                let replacement = replacement.clone();
                Task::new(name, move || {
                    let (src, dest) = (src.clone(), dest.clone());
                    let (regex, replacement) = (regex.clone(), replacement.clone());
                    async move {
                        fsops::transform_text(src, dest, |text| {
                            regex.replace_all(&text, replacement.as_str()).into_owned()
                        })
                        .await
                    }
                })
            }
            Action::Bundle { program, args, cwd } => {
                let bundler = Bundler {
                    program: program.clone().unwrap_or_else(|| ctx.bundler.clone()),
                    args: args.clone(),
                    cwd: Some(cwd.as_deref().map_or_else(|| ctx.base_dir.clone(), |c| ctx.path(c))),
                };
                let sink = Arc::clone(&ctx.sink);
                Task::new(name, move || {
                    let (bundler, sink) = (bundler.clone(), Arc::clone(&sink));
                    async move {
                        let output = bundler.run().await?;
                        for warning in &output.warnings {
                            sink.warn(warning);
                        }
                        rig_log!("{} output:\n{}", bundler.command_line(), output.log.trim_end());
                        Ok(())
                    }
                })
            }
            Action::Zip { source, output } => {
                let (source, output) = (ctx.path(source), ctx.path(output));
                Task::new(name, move || {
                    let (source, output) = (source.clone(), output.clone());
                    async move { archive::zip_directory(source, output).await }
                })
            }
            Action::Series { steps } => {
                let group = series(Self::children(steps, ctx)?);
                self.keep_group_name(group)
            }
            Action::Parallel { steps } => {
                let group = parallel(Self::children(steps, ctx)?);
                self.keep_group_name(group)
            }
        };
        Ok(task)
    }

    fn children(steps: &[Step], ctx: &BuildContext) -> Result<Vec<Task>> {
        steps.iter().map(|step| step.to_task(ctx)).collect()
    }

    fn keep_group_name(&self, group: Task) -> Task {
        match &self.name {
            Some(name) => group.named(name.clone()),
            None => group,
        }
    }
}

/// Indented outline of a task tree, one task per line.
pub fn outline(task: &Task) -> String {
    let mut out = String::new();
    write_outline(task, 0, &mut out);
    out
}

fn write_outline(task: &Task, depth: usize, out: &mut String) {
    let indent = "  ".repeat(depth);
    match task.kind() {
        TaskKind::Leaf => {
            let _ = writeln!(out, "{}- {}", indent, task.name());
        }
        kind => {
            let label = if task.name().starts_with(&format!("{}(", kind)) {
                kind.to_string()
            } else {
                format!("{} [{}]", task.name(), kind)
            };
            let _ = writeln!(out, "{}{}", indent, label);
            for child in task.children() {
                write_outline(child, depth + 1, out);
            }
        }
    }
}

/// Path of the pipeline file to use: `explicit`, or `buildrig.toml` in the
/// current directory.
pub fn pipeline_path(explicit: Option<PathBuf>) -> PathBuf {
    explicit.unwrap_or_else(|| PathBuf::from(DEFAULT_PIPELINE_FILE))
}
