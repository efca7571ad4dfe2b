//! Evaluation error types
//!
//! Stage-local failures (a candidate that does not compile, a failing test
//! run, a crashed measurement) are *not* errors: they become a
//! [`Status`](crate::status::Status). Everything here means the environment
//! itself is broken and the benchmark must not be reused silently.

use crate::status::Status;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for evaluation operations
pub type EvalResult<T> = Result<T, EvalError>;

/// Errors that abort an evaluation call
#[derive(Error, Debug)]
pub enum EvalError {
    /// Reading or writing a file the pipeline owns failed
    #[error("IO error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The measurement log is missing, empty, malformed, or holds no valid sample
    #[error("Measurement data error in {path}: {message}")]
    MeasurementData { path: PathBuf, message: String },

    /// The build-tree source file could not be written back to its original content
    #[error("Failed to restore original source at {path}: {source}")]
    Restore {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// History insertion out of sequence
    #[error("History index {index} rejected: last recorded index is {last}")]
    HistoryOrder { index: usize, last: usize },

    /// The unmodified source did not make it through the pipeline
    #[error("Baseline evaluation ended with {status}: {detail}")]
    Baseline { status: Status, detail: String },

    /// Invalid pipeline configuration
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl EvalError {
    /// Create an IO error bound to a path
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a measurement data error
    pub fn measurement(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::MeasurementData {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a config error
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Whether the benchmark's build tree may be left inconsistent
    pub fn is_tree_corrupting(&self) -> bool {
        matches!(self, Self::Restore { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_history_order_message() {
        let err = EvalError::HistoryOrder { index: 2, last: 3 };
        assert_eq!(
            err.to_string(),
            "History index 2 rejected: last recorded index is 3"
        );
    }

    #[test]
    fn test_restore_is_tree_corrupting() {
        let err = EvalError::Restore {
            path: PathBuf::from("/tmp/x.java"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(err.is_tree_corrupting());
        assert!(!EvalError::config("bad").is_tree_corrupting());
    }

    #[test]
    fn test_baseline_message_names_status() {
        let err = EvalError::Baseline {
            status: Status::CompilationError,
            detail: "missing symbol".to_string(),
        };
        assert!(err.to_string().contains("COMPILATION_ERROR"));
        assert!(err.to_string().contains("missing symbol"));
    }
}
