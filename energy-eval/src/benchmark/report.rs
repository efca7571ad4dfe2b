//! Evaluation Report — structured output of one pipeline call
//!
//! One [`StageResult`] per stage in pipeline order; stages after the first
//! non-passing one are recorded as skipped.

use crate::status::Status;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Pipeline stages in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Compile,
    Test,
    Measure,
}

impl Stage {
    pub const ALL: [Stage; 3] = [Stage::Compile, Stage::Test, Stage::Measure];

    /// Status reported when this stage fails.
    pub fn failure_status(self) -> Status {
        match self {
            Self::Compile => Status::CompilationError,
            Self::Test => Status::RuntimeErrorOrTestFailed,
            Self::Measure => Status::AllTestPassed,
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Compile => write!(f, "compile"),
            Self::Test => write!(f, "test"),
            Self::Measure => write!(f, "measure"),
        }
    }
}

/// Outcome of a single stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageOutcome {
    /// Stage passed
    Passed,
    /// Stage failed (non-zero exit, failure marker, or process could not start)
    Failed,
    /// External process exceeded the stage timeout
    TimedOut,
    /// Not run because an earlier stage did not pass
    Skipped,
}

impl StageOutcome {
    pub fn is_passed(&self) -> bool {
        matches!(self, Self::Passed)
    }
}

impl fmt::Display for StageOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Passed => write!(f, "PASS"),
            Self::Failed => write!(f, "FAIL"),
            Self::TimedOut => write!(f, "TIMEOUT"),
            Self::Skipped => write!(f, "SKIP"),
        }
    }
}

/// Result of a single stage
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StageResult {
    pub stage: Stage,
    pub outcome: StageOutcome,
    pub duration_ms: u64,
    /// Exit code of the external process, if it completed
    pub exit_code: Option<i32>,
    /// Combined process output (truncated), kept for failed stages
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_excerpt: Option<String>,
}

impl StageResult {
    pub fn passed(stage: Stage, duration: Duration, exit_code: Option<i32>) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Passed,
            duration_ms: duration.as_millis() as u64,
            exit_code,
            output_excerpt: None,
        }
    }

    pub fn failed(
        stage: Stage,
        duration: Duration,
        exit_code: Option<i32>,
        output: impl Into<String>,
    ) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Failed,
            duration_ms: duration.as_millis() as u64,
            exit_code,
            output_excerpt: Some(output.into()),
        }
    }

    pub fn timed_out(stage: Stage, duration: Duration, output: impl Into<String>) -> Self {
        Self {
            stage,
            outcome: StageOutcome::TimedOut,
            duration_ms: duration.as_millis() as u64,
            exit_code: None,
            output_excerpt: Some(output.into()),
        }
    }

    pub fn skipped(stage: Stage) -> Self {
        Self {
            stage,
            outcome: StageOutcome::Skipped,
            duration_ms: 0,
            exit_code: None,
            output_excerpt: None,
        }
    }
}

/// Complete evaluation report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvaluationReport {
    pub timestamp: DateTime<Utc>,
    /// Target label (`program/test_group/test_class`)
    pub target: String,
    pub status: Status,
    pub stages: Vec<StageResult>,
    /// First stage that did not pass
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_failure: Option<Stage>,
    /// History index the measurement was stored at
    #[serde(skip_serializing_if = "Option::is_none")]
    pub history_index: Option<usize>,
    pub total_duration_ms: u64,
}

impl EvaluationReport {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            timestamp: Utc::now(),
            target: target.into(),
            status: Status::CompilationError,
            stages: Vec::new(),
            first_failure: None,
            history_index: None,
            total_duration_ms: 0,
        }
    }

    /// Record a stage result; returns whether the pipeline may continue.
    pub fn add_stage(&mut self, result: StageResult) -> bool {
        let passed = result.outcome.is_passed();
        if !passed && result.outcome != StageOutcome::Skipped && self.first_failure.is_none() {
            self.first_failure = Some(result.stage);
        }
        self.stages.push(result);
        passed
    }

    /// Record every stage after `stage` as skipped.
    pub fn skip_after(&mut self, stage: Stage) {
        for later in Stage::ALL.iter().skip_while(|s| **s != stage).skip(1) {
            self.stages.push(StageResult::skipped(*later));
        }
    }

    /// Derive the status from the recorded stages and stamp the duration.
    pub fn finalize(&mut self, total_duration: Duration) {
        self.total_duration_ms = total_duration.as_millis() as u64;
        self.status = match self
            .stages
            .iter()
            .find(|s| s.outcome != StageOutcome::Passed)
        {
            None => Status::PerformanceImproved,
            Some(s) if s.outcome == StageOutcome::TimedOut => Status::Timeout,
            Some(s) => s.stage.failure_status(),
        };
    }

    pub fn stage(&self, stage: Stage) -> Option<&StageResult> {
        self.stages.iter().find(|s| s.stage == stage)
    }

    /// One-line summary for logs
    pub fn summary(&self) -> String {
        let stages: Vec<String> = self
            .stages
            .iter()
            .map(|s| format!("{}={}", s.stage, s.outcome))
            .collect();
        format!(
            "{} [{}] {} in {}ms",
            self.target,
            stages.join(" "),
            self.status,
            self.total_duration_ms
        )
    }
}
