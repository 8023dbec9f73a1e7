use thiserror::Error;

use crate::patterns::PatternError;

/// Failure that prevents a single line from being normalized.
///
/// Never escapes a batch: the parser turns it into an error-flagged entry.
#[derive(Error, Debug, Clone)]
pub enum LineError {
    #[error("line is {len} bytes, limit is {max}")]
    LineTooLong { len: usize, max: usize },

    #[error(transparent)]
    Pattern(#[from] PatternError),
}

/// Invalid value in a textual search filter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    #[error("unknown section '{0}', expected plan, apply or other")]
    UnknownSection(String),

    #[error("invalid timestamp '{0}'")]
    InvalidTimestamp(String),
}
