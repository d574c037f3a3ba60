// Error taxonomy shared by the codec and the calendar store.
use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type Result<T, E = Error> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum Error {
    /// The text has no BEGIN:VCALENDAR / END:VCALENDAR pair.
    #[error("not an iCalendar file: {0}")]
    Format(String),

    /// Reading, listing or opening a calendar failed.
    #[error("I/O error on '{}': {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing a calendar failed. The original file is left untouched.
    #[error("failed to write '{}': {source}", path.display())]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl Error {
    pub(crate) fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn write(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::WriteFailure {
            path: path.into(),
            source,
        }
    }

    /// Returns the underlying I/O error kind, if any.
    pub fn io_kind(&self) -> Option<io::ErrorKind> {
        match self {
            Error::Io { source, .. } | Error::WriteFailure { source, .. } => Some(source.kind()),
            Error::Format(_) => None,
        }
    }
}

/// Why a VTODO block was left out of the returned task set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SkipReason {
    /// The block reached EOF, END:VCALENDAR or another BEGIN:VTODO before END:VTODO.
    Unterminated,
    /// PRIORITY is not an integer.
    InvalidPriority(String),
    /// SUMMARY is missing or empty.
    MissingSummary,
}

impl std::fmt::Display for SkipReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SkipReason::Unterminated => write!(f, "missing END:VTODO"),
            SkipReason::InvalidPriority(v) => write!(f, "unparsable PRIORITY '{}'", v),
            SkipReason::MissingSummary => write!(f, "missing SUMMARY"),
        }
    }
}

/// A record dropped during parsing or mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedRecord {
    /// 1-based physical line where the block starts, when known.
    pub line: Option<usize>,
    pub uid: Option<String>,
    pub reason: SkipReason,
}
