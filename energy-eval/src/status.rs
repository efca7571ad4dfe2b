//! Evaluation status — terminal outcome of one pipeline call.
//!
//! Variants are declared in pipeline-progress order so the derived `Ord`
//! matches how far a candidate got:
//!
//! ```text
//! TIMEOUT < COMPILATION_ERROR < RUNTIME_ERROR_OR_TEST_FAILED < ALL_TEST_PASSED < PERFORMANCE_IMPROVED
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Outcome classification of one evaluation call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Status {
    /// An external process exceeded the stage timeout.
    Timeout,
    /// The candidate did not compile.
    CompilationError,
    /// The candidate compiled but the functional tests failed or crashed.
    RuntimeErrorOrTestFailed,
    /// Tests passed but the measurement run itself failed.
    AllTestPassed,
    /// Every stage succeeded and a new energy record was stored.
    PerformanceImproved,
}

impl Status {
    /// Whether the candidate produced a measurement record.
    pub fn is_measured(self) -> bool {
        self == Self::PerformanceImproved
    }

    /// Whether the candidate compiled (tests may still have failed).
    pub fn compiled(self) -> bool {
        self >= Self::RuntimeErrorOrTestFailed
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Timeout => write!(f, "TIMEOUT"),
            Self::CompilationError => write!(f, "COMPILATION_ERROR"),
            Self::RuntimeErrorOrTestFailed => write!(f, "RUNTIME_ERROR_OR_TEST_FAILED"),
            Self::AllTestPassed => write!(f, "ALL_TEST_PASSED"),
            Self::PerformanceImproved => write!(f, "PERFORMANCE_IMPROVED"),
        }
    }
}
