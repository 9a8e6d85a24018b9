//! Running an external bundler (webpack, esbuild, rollup, ...).
//!
//! The bundler is an ordinary program on `PATH`. Its stdout is returned as
//! the build log; on failure its `ERROR`/`WARNING` blocks are picked out of
//! the output so each error becomes its own cause.

use std::path::PathBuf;
use std::process::Stdio;

use serde::{Deserialize, Serialize};
use tokio::process::Command;

use crate::{rig_debug, rig_warn, Error, Result};

/// How to invoke the bundler.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bundler {
    /// Program name or path, resolved through `PATH`.
    pub program: String,
    /// Arguments passed verbatim.
    #[serde(default)]
    pub args: Vec<String>,
    /// Working directory; the current directory when unset.
    #[serde(default)]
    pub cwd: Option<PathBuf>,
}

/// What a successful bundler run produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BundleOutput {
    /// Standard output, the bundler's build log.
    pub log: String,
    /// `WARNING` blocks found in stdout or stderr.
    pub warnings: Vec<String>,
}

impl Bundler {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    /// Human-readable command line, for task names and logs.
    pub fn command_line(&self) -> String {
        std::iter::once(self.program.as_str())
            .chain(self.args.iter().map(String::as_str))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Locate the program. A relative path like `node_modules/.bin/webpack`
    /// is taken relative to `cwd` when one is set; bare names go through
    /// `PATH`.
    fn resolve_program(&self) -> Result<PathBuf> {
        let found = match &self.cwd {
            Some(cwd) => which::which_in(&self.program, std::env::var_os("PATH"), cwd),
            None => which::which(&self.program),
        };
        found.map_err(|_| Error::CommandNotFound(self.program.clone()))
    }

    /// Run the bundler and return its stdout and warnings.
    ///
    /// Warnings are also written to the diagnostic log. A non-zero exit
    /// becomes one [`Error::Bundler`] per reported error, combined with
    /// [`Error::aggregate`].
    pub async fn run(&self) -> Result<BundleOutput> {
        let program = self.resolve_program()?;
        rig_debug!("bundler: {} (resolved {})", self.command_line(), program.display());

        let mut cmd = Command::new(program);
        cmd.args(&self.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }

        let output = cmd.output().await?;
        let stdout = String::from_utf8_lossy(&output.stdout).into_owned();
        let stderr = String::from_utf8_lossy(&output.stderr).into_owned();

        let mut diagnostics = parse_diagnostics(&stdout);
        diagnostics.extend(parse_diagnostics(&stderr));

        let warnings: Vec<String> = diagnostics
            .iter()
            .filter(|d| d.severity == Severity::Warning)
            .map(|d| d.message.clone())
            .collect();
        for warning in &warnings {
            rig_warn!("{}: {}", self.program, warning);
        }

        if output.status.success() {
            return Ok(BundleOutput {
                log: stdout,
                warnings,
            });
        }

        let errors: Vec<Error> = diagnostics
            .into_iter()
            .filter(|d| d.severity == Severity::Error)
            .map(|d| Error::Bundler(d.message))
            .collect();
        if !errors.is_empty() {
            return Err(Error::aggregate(errors));
        }

        let detail = [stderr.trim(), stdout.trim()]
            .into_iter()
            .find(|s| !s.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("exited with {}", output.status));
        Err(Error::Bundler(format!("{} failed: {}", self.program, detail)))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Severity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct Diagnostic {
    severity: Severity,
    message: String,
}

fn severity_of(line: &str) -> Option<Severity> {
    let head = line.trim_start().to_ascii_lowercase();
    if head.starts_with("error") {
        Some(Severity::Error)
    } else if head.starts_with("warning") || head.starts_with("warn ") {
        Some(Severity::Warning)
    } else {
        None
    }
}

/// Split bundler output into error and warning blocks.
///
/// A block starts at a line beginning with `ERROR`/`WARNING` (any case) and
/// runs until a blank line or the next block.
fn parse_diagnostics(text: &str) -> Vec<Diagnostic> {
    let mut found = Vec::new();
    let mut current: Option<(Severity, Vec<&str>)> = None;

    for line in text.lines() {
        if let Some(severity) = severity_of(line) {
            if let Some((sev, lines)) = current.take() {
                found.push(Diagnostic { severity: sev, message: lines.join("\n") });
            }
            current = Some((severity, vec![line.trim_end()]));
        } else if line.trim().is_empty() {
            if let Some((sev, lines)) = current.take() {
                found.push(Diagnostic { severity: sev, message: lines.join("\n") });
            }
        } else if let Some((_, lines)) = current.as_mut() {
            lines.push(line.trim_end());
        }
    }
    if let Some((severity, lines)) = current {
        found.push(Diagnostic { severity, message: lines.join("\n") });
    }
    found
}
