use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Errors raised by the pair encoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum PairError {
    #[error("pair ({a}, {b}) out of range for {n} nodes")]
    OutOfRange { a: usize, b: usize, n: usize },
    #[error("pair elements must differ, got ({a}, {a})")]
    Identical { a: usize },
    #[error("pair ({a}, {b}) contains a negative index")]
    Negative { a: i64, b: i64 },
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("malformed instance at line {line}: {reason}")]
    MalformedInput { line: usize, reason: String },

    #[error("cannot access {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid node pair: {0}")]
    InvalidPair(#[from] PairError),

    #[error("invalid state: {0}")]
    InvalidState(&'static str),

    #[error("unknown variable {0}")]
    UnknownVariable(usize),

    #[error("unknown constraint {0}")]
    UnknownConstraint(usize),

    #[error("model not supported by this backend: {0}")]
    UnsupportedModel(String),

    #[error("warm start failed: {0}")]
    WarmStart(String),

    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

impl Error {
    pub fn malformed(line: usize, reason: impl Into<String>) -> Self {
        Error::MalformedInput {
            line,
            reason: reason.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Error::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pair_error_converts() {
        let err: Error = PairError::Identical { a: 3 }.into();
        assert!(matches!(err, Error::InvalidPair(PairError::Identical { a: 3 })));
        assert_eq!(
            err.to_string(),
            "invalid node pair: pair elements must differ, got (3, 3)"
        );
    }

    #[test]
    fn test_malformed_message_carries_line() {
        let err = Error::malformed(4, "expected '|' separator");
        assert_eq!(
            err.to_string(),
            "malformed instance at line 4: expected '|' separator"
        );
    }
}
