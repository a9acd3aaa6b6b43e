use std::path::PathBuf;

use thiserror::Error;

// ---------------------------------------------------------------------------
// Crate-wide error type
// ---------------------------------------------------------------------------

/// Convenient result type used throughout the library.
pub type Result<T, E = TokenFileError> = std::result::Result<T, E>;

/// Failures raised while decoding, encoding or editing token data.
#[derive(Debug, Error)]
pub enum TokenFileError {
    /// The input is not in the format the codec expects (bad magic header,
    /// wrong DOCTYPE, malformed markup). Loaders treat this as "try the next
    /// codec".
    #[error("format error: {0}")]
    Format(String),

    /// Filesystem IO error with optional context path.
    #[error("io error while processing {path:?}: {source}")]
    Io {
        source: std::io::Error,
        path: Option<PathBuf>,
    },

    /// A binary token file ended before its declared content was complete.
    #[error("token data truncated while reading {what}")]
    Truncated { what: &'static str },

    /// A caller broke an API contract (wrong buffer width, unknown column, ...).
    #[error("illegal argument: {0}")]
    IllegalArgument(String),

    /// Run configuration is inconsistent.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A sorted view was used after its source changed shape without being told.
    #[error("sorted view has {view_rows} rows but its source has {source_rows}")]
    StaleView {
        view_rows: usize,
        source_rows: usize,
    },
}

impl TokenFileError {
    /// Helper constructor that attaches an optional path when wrapping IO errors.
    pub fn io(source: std::io::Error, path: Option<PathBuf>) -> Self {
        Self::Io { source, path }
    }

    /// Whether the error only means "wrong format", i.e. another codec may
    /// still accept the same input.
    pub fn is_format(&self) -> bool {
        matches!(self, Self::Format(_))
    }
}

impl From<quick_xml::Error> for TokenFileError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Format(format!("malformed XML: {err}"))
    }
}

impl From<csv::Error> for TokenFileError {
    fn from(err: csv::Error) -> Self {
        match err.into_kind() {
            csv::ErrorKind::Io(source) => Self::io(source, None),
            other => Self::IllegalArgument(format!("csv output failed: {other:?}")),
        }
    }
}
