//! Error types for nmatch operations.

use std::fmt;
use std::io;
use std::path::PathBuf;

use serde::Serialize;
use thiserror::Error;

/// Result type alias for nmatch operations
pub type Result<T> = std::result::Result<T, MatchError>;

/// An input line that sorts before its predecessor in the same input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderViolation {
    /// Name of the offending input
    pub input: String,
    /// 1-based physical line number of the offending line
    pub line: u64,
    /// The held value the offending line was compared against
    pub previous: String,
    /// The offending line itself
    pub offending: String,
}

impl fmt::Display for OrderViolation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: wrong sequence at line {}: {:?} sorts before {:?}",
            self.input, self.line, self.offending, self.previous
        )
    }
}

/// Error type for nmatch operations
#[derive(Error, Debug)]
pub enum MatchError {
    /// Reading an input stream failed
    #[error("{input}: read error after line {after:?}")]
    Io {
        /// Name of the input
        input: String,
        /// Last successfully held value, if any
        after: Option<String>,
        #[source]
        source: io::Error,
    },

    /// Writing or flushing an output channel failed
    #[error("write error on output '{label}'")]
    Write {
        /// Label of the channel
        label: String,
        #[source]
        source: io::Error,
    },

    /// An input is not sorted ascending
    #[error("{0}")]
    OrderViolation(OrderViolation),

    /// A selected output pattern cannot be produced by this run
    #[error("impossible pattern '{pattern}': {reason}")]
    InvalidPattern {
        /// The pattern as given
        pattern: String,
        /// Explanation of why it's invalid
        reason: String,
    },

    /// Nothing to match
    #[error("nothing to match: no input given")]
    NoInputs,

    /// More inputs than the pattern space supports
    #[error("too many inputs: {count} (at most {max})")]
    TooManyInputs {
        /// Number of inputs given
        count: usize,
        /// Maximum supported
        max: usize,
    },

    /// Cursors and channels were built for different numbers of inputs
    #[error("channels cover {channels} inputs but {cursors} cursors were given")]
    WidthMismatch {
        /// Inputs covered by the channel set
        channels: usize,
        /// Number of cursors
        cursors: usize,
    },

    /// The merge engine already returned an error and cannot continue
    #[error("merge engine stopped after an earlier error")]
    EngineFailed,

    /// An input file has no content
    #[error("{}: is empty", path.display())]
    EmptyInput {
        /// Path of the input
        path: PathBuf,
    },

    /// An input path is a directory or other non-regular file
    #[error("{}: is not a file", path.display())]
    NotAFile {
        /// Path of the input
        path: PathBuf,
    },

    /// An input file could not be opened or inspected
    #[error("cannot open {}", path.display())]
    Open {
        /// Path of the input
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// An output file could not be created
    #[error("cannot create {}", path.display())]
    Create {
        /// Path of the output
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl MatchError {
    /// Whether this error is an unsorted-input contract violation rather than a system fault.
    #[must_use]
    pub fn is_order_violation(&self) -> bool {
        matches!(self, MatchError::OrderViolation(_))
    }
}

impl From<OrderViolation> for MatchError {
    fn from(violation: OrderViolation) -> Self {
        MatchError::OrderViolation(violation)
    }
}
