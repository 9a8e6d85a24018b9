use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Zip error: {0}")]
    Zip(#[from] zip::result::ZipError),

    #[error("Invalid pattern: {0}")]
    Regex(#[from] regex::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Task join error: {0}")]
    TaskJoin(String),

    /// Failure raised by caller-supplied task code. The message is shown verbatim.
    #[error("{0}")]
    Task(String),

    #[error("{0}")]
    Bundler(String),

    /// Several independent failures, e.g. from siblings in a parallel group.
    #[error("{}", join_messages(.0))]
    Aggregate(Vec<Error>),
}

pub type Result<T> = std::result::Result<T, Error>;

/// Whether an error stands alone or groups several underlying failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    Single,
    Aggregate,
}

impl Error {
    /// Shorthand for a task failure with a plain message.
    pub fn task(msg: impl Into<String>) -> Self {
        Error::Task(msg.into())
    }

    /// Normalize a list of failures into one error.
    ///
    /// Nested aggregates are flattened and a single failure is returned as-is,
    /// so a lone error passes through unchanged.
    pub fn aggregate(errors: Vec<Error>) -> Self {
        let mut flat = Vec::with_capacity(errors.len());
        for err in errors {
            match err {
                Error::Aggregate(inner) => flat.extend(inner),
                other => flat.push(other),
            }
        }
        if flat.len() == 1 {
            if let Some(only) = flat.pop() {
                return only;
            }
        }
        Error::Aggregate(flat)
    }

    pub fn kind(&self) -> FailureKind {
        match self {
            Error::Aggregate(_) => FailureKind::Aggregate,
            _ => FailureKind::Single,
        }
    }

    /// The underlying failures. A single error is its own only cause.
    pub fn causes(&self) -> &[Error] {
        match self {
            Error::Aggregate(errors) => errors,
            other => std::slice::from_ref(other),
        }
    }
}

fn join_messages(errors: &[Error]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("\n\n")
}
