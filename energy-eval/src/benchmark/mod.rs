//! Benchmark Module — the staged evaluation contract
//!
//! A [`Benchmark`] binds the pipeline to one external build/test target.
//! Implementations provide the primitive stages; the ordering, status
//! mapping and source restoration live in the provided
//! [`Benchmark::evaluate`] so every target family gets them for free.
//!
//! # Pipeline
//!
//! ```text
//! stage candidate → compile → run_tests → measure_energy → restore original
//!                      │           │              │
//!                      ▼           ▼              ▼
//!             COMPILATION_ERROR  RUNTIME_ERROR   ALL_TEST_PASSED
//!                                _OR_TEST_FAILED
//!
//! all stages pass → PERFORMANCE_IMPROVED      any stage times out → TIMEOUT
//! ```

pub mod make;
pub mod report;
pub mod target;

pub use make::MakeBenchmark;
pub use report::{EvaluationReport, Stage, StageOutcome, StageResult};
pub use target::{BenchmarkTarget, TargetSpec};

use crate::error::EvalResult;
use crate::history::{Comparison, History};
use crate::staging::StagedSource;
use crate::status::Status;
use async_trait::async_trait;
use std::time::Instant;

/// The evaluation contract for one target.
#[async_trait]
pub trait Benchmark: Send + Sync {
    fn target(&self) -> &BenchmarkTarget;

    fn history(&self) -> &History;

    /// Optional structural decoration of a candidate via an external helper.
    ///
    /// Failures are informational: they are logged and yield `None`.
    async fn pre_process(&self, candidate: &str) -> Option<String>;

    /// Strip markdown code-fence lines from a generated candidate.
    fn post_process(&self, raw: &str) -> String {
        strip_code_fences(raw)
    }

    /// Build the staged candidate.
    async fn compile(&mut self, staged: &StagedSource) -> EvalResult<StageResult>;

    /// Run the target's functional tests against the last compiled build.
    async fn run_tests(&mut self) -> EvalResult<StageResult>;

    /// Measure the staged candidate and record it in history at `index`,
    /// or at the next free index when `index` is `None`.
    ///
    /// A failing measurement process is a stage failure; a missing or
    /// unusable measurement log is an error.
    async fn measure_energy(
        &mut self,
        staged: &StagedSource,
        index: Option<usize>,
    ) -> EvalResult<StageResult>;

    /// Combined compiler output of the last failed compilation.
    fn compilation_error(&self) -> Option<&str>;

    /// Output of the last test run.
    fn test_output(&self) -> Option<&str>;

    /// Store the measurement of the next [`evaluate`](Self::evaluate) call
    /// at `index` instead of the next free index.
    fn set_optimization_iteration(&mut self, index: usize);

    /// Take the index set by
    /// [`set_optimization_iteration`](Self::set_optimization_iteration).
    fn take_optimization_iteration(&mut self) -> Option<usize>;

    /// Run compile → test → measure for `candidate`.
    ///
    /// The build-tree source is restored before returning on every path. If
    /// restoration fails that error is returned even when a stage also
    /// errored.
    async fn evaluate(&mut self, candidate: &str) -> EvalResult<EvaluationReport> {
        let start = Instant::now();
        let mut report = EvaluationReport::new(self.target().label());
        let index = self.take_optimization_iteration();

        let mut staged = self.target().source().stage(candidate)?;
        let outcome = run_stages(&mut *self, &staged, index, &mut report).await;
        let restored = staged.restore();
        restored?;
        outcome?;

        report.finalize(start.elapsed());
        if report.status.is_measured() {
            report.history_index = self.history().last_index();
        }

        tracing::info!(
            benchmark = %report.target,
            status = %report.status,
            duration_ms = report.total_duration_ms,
            history_index = ?report.history_index,
            "Evaluation finished"
        );
        Ok(report)
    }

    /// [`evaluate`](Self::evaluate) reduced to its status.
    async fn static_analysis(&mut self, candidate: &str) -> EvalResult<Status> {
        Ok(self.evaluate(candidate).await?.status)
    }

    /// Original / lowest-energy / current view of the history.
    fn comparison(&self) -> Option<Comparison> {
        self.history().extract_comparison()
    }
}

/// Run the stages in order, stopping at the first one that does not pass.
async fn run_stages<B: Benchmark + ?Sized>(
    bench: &mut B,
    staged: &StagedSource,
    index: Option<usize>,
    report: &mut EvaluationReport,
) -> EvalResult<()> {
    let compiled = bench.compile(staged).await?;
    if !record(report, compiled) {
        report.skip_after(Stage::Compile);
        return Ok(());
    }

    let tested = bench.run_tests().await?;
    if !record(report, tested) {
        report.skip_after(Stage::Test);
        return Ok(());
    }

    let measured = bench.measure_energy(staged, index).await?;
    record(report, measured);
    Ok(())
}

fn record(report: &mut EvaluationReport, result: StageResult) -> bool {
    if result.outcome.is_passed() {
        tracing::debug!(stage = %result.stage, duration_ms = result.duration_ms, "Stage passed");
    } else {
        tracing::warn!(
            stage = %result.stage,
            outcome = %result.outcome,
            exit_code = ?result.exit_code,
            "Stage did not pass"
        );
    }
    report.add_stage(result)
}

/// Remove markdown fence lines (```` ``` ```` with or without a language tag).
pub fn strip_code_fences(raw: &str) -> String {
    let mut out: Vec<&str> = raw
        .lines()
        .filter(|line| !line.trim_start().starts_with("```"))
        .collect();
    while out.first().is_some_and(|l| l.trim().is_empty()) {
        out.remove(0);
    }
    let mut text = out.join("\n");
    if raw.ends_with('\n') {
        text.push('\n');
    }
    text
}
