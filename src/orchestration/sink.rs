//! Status output for pipeline runs.
//!
//! The reporter and runner never print directly; they hand [`ReportEvent`]s
//! to an injected [`LogSink`]. The CLI uses [`ConsoleSink`], tests use
//! [`MemorySink`] to capture lines.

use std::fmt;
use std::sync::Mutex;

use crossterm::style::{Color, Stylize};

/// A status change worth telling the user about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReportEvent {
    /// A leaf task started.
    TaskStarted { name: String },
    /// A leaf task finished successfully.
    TaskCompleted { name: String, elapsed_ms: u128 },
    /// A leaf task failed.
    TaskFailed { name: String, elapsed_ms: u128 },
    /// The whole run succeeded.
    RunCompleted { elapsed_ms: u128 },
    /// The whole run failed with `error`.
    RunFailed { elapsed_ms: u128, error: String },
}

impl ReportEvent {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ReportEvent::TaskFailed { .. } | ReportEvent::RunFailed { .. }
        )
    }
}

impl fmt::Display for ReportEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReportEvent::TaskStarted { name } => write!(f, "start {}", name),
            ReportEvent::TaskCompleted { name, elapsed_ms } => {
                write!(f, "completed {} in {}ms", name, elapsed_ms)
            }
            ReportEvent::TaskFailed { name, elapsed_ms } => {
                write!(f, "failed {} in {}ms", name, elapsed_ms)
            }
            ReportEvent::RunCompleted { elapsed_ms } => write!(f, "Completed in {}ms", elapsed_ms),
            ReportEvent::RunFailed { elapsed_ms, .. } => write!(f, "Failed in {}ms", elapsed_ms),
        }
    }
}

/// Destination for status lines.
pub trait LogSink: Send + Sync {
    fn info(&self, line: &str);

    fn error(&self, line: &str);

    /// A non-fatal diagnostic from a step, such as a bundler warning.
    fn warn(&self, line: &str) {
        self.error(line);
    }

    /// Write one event. A failed run first writes its error message, then the
    /// summary line.
    fn record(&self, event: &ReportEvent) {
        if let ReportEvent::RunFailed { error, .. } = event {
            self.error(error);
        }
        let line = event.to_string();
        if event.is_failure() {
            self.error(&line);
        } else {
            self.info(&line);
        }
    }
}

/// Prints to stdout (info) and stderr (errors), optionally colored.
#[derive(Debug, Clone, Copy)]
pub struct ConsoleSink {
    color: bool,
}

impl ConsoleSink {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    fn background(event: &ReportEvent) -> Color {
        match event {
            ReportEvent::TaskStarted { .. } => Color::Rgb { r: 0xd6, g: 0xe9, b: 0xff },
            ReportEvent::TaskCompleted { .. } => Color::Rgb { r: 0xdc, g: 0xff, b: 0xdc },
            ReportEvent::TaskFailed { .. } => Color::Rgb { r: 0xb9, g: 0x65, b: 0x65 },
            ReportEvent::RunCompleted { .. } => Color::Green,
            ReportEvent::RunFailed { .. } => Color::Red,
        }
    }
}

impl Default for ConsoleSink {
    fn default() -> Self {
        Self::new(true)
    }
}

impl LogSink for ConsoleSink {
    fn info(&self, line: &str) {
        println!("{}", line);
    }

    fn error(&self, line: &str) {
        eprintln!("{}", line);
    }

    fn warn(&self, line: &str) {
        if self.color {
            eprintln!("{}", line.yellow());
        } else {
            eprintln!("{}", line);
        }
    }

    fn record(&self, event: &ReportEvent) {
        if !self.color {
            if let ReportEvent::RunFailed { error, .. } = event {
                self.error(error);
            }
            let line = event.to_string();
            if event.is_failure() {
                self.error(&line);
            } else {
                self.info(&line);
            }
            return;
        }

        if let ReportEvent::RunFailed { error, .. } = event {
            eprintln!("{}", error.as_str().red());
        }
        let styled = event
            .to_string()
            .with(Color::Black)
            .on(Self::background(event));
        if event.is_failure() {
            eprintln!("{}", styled);
        } else {
            println!("{}", styled);
        }
    }
}

/// Severity of a captured line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineLevel {
    Info,
    Warn,
    Error,
}

/// Collects lines in memory, in emission order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(LineLevel, String)>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&self, level: LineLevel, line: &str) {
        let mut lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.push((level, line.to_string()));
    }

    /// Every captured line, info and error interleaved.
    pub fn lines(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines.iter().map(|(_, l)| l.clone()).collect()
    }

    /// Lines written through [`LogSink::error`].
    pub fn errors(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines
            .iter()
            .filter(|(level, _)| *level == LineLevel::Error)
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// Lines written through [`LogSink::warn`].
    pub fn warnings(&self) -> Vec<String> {
        let lines = self.lines.lock().unwrap_or_else(|e| e.into_inner());
        lines
            .iter()
            .filter(|(level, _)| *level == LineLevel::Warn)
            .map(|(_, l)| l.clone())
            .collect()
    }

    /// True if any captured line contains `needle`.
    pub fn contains(&self, needle: &str) -> bool {
        self.lines().iter().any(|l| l.contains(needle))
    }

    pub fn clear(&self) {
        self.lines.lock().unwrap_or_else(|e| e.into_inner()).clear();
    }
}

impl LogSink for MemorySink {
    fn info(&self, line: &str) {
        self.push(LineLevel::Info, line);
    }

    fn error(&self, line: &str) {
        self.push(LineLevel::Error, line);
    }

    fn warn(&self, line: &str) {
        self.push(LineLevel::Warn, line);
    }
}
