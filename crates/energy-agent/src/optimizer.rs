//! The optimization loop.
//!
//! ```text
//! comparison → evaluator feedback → candidate → pre_process → evaluate
//!      ▲                                                          │
//!      └──────────────── history / diagnostics ◄──────────────────┘
//! ```

use crate::candidate::extract_code_block;
use crate::evaluator::{Diagnostics, EvaluatorClient, FeedbackRequest};
use anyhow::{Context, Result};
use energy_eval::{Benchmark, EvaluationReport, Status};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Result of one optimization iteration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IterationOutcome {
    pub iteration: usize,
    pub status: Status,
    /// Evaluator reply the candidate was taken from
    pub feedback: String,
    /// History index of the measurement, when one was recorded
    pub history_index: Option<usize>,
}

pub struct Optimizer<B, E> {
    bench: B,
    evaluator: E,
    iterations: usize,
    diagnostics: Option<Diagnostics>,
    structure: Option<String>,
}

impl<B: Benchmark, E: EvaluatorClient> Optimizer<B, E> {
    pub fn new(bench: B, evaluator: E, iterations: usize) -> Self {
        Self {
            bench,
            evaluator,
            iterations,
            diagnostics: None,
            structure: None,
        }
    }

    pub fn benchmark(&self) -> &B {
        &self.bench
    }

    pub fn into_benchmark(self) -> B {
        self.bench
    }

    /// Run every iteration in order.
    ///
    /// Evaluation errors and evaluator failures abort the loop.
    pub async fn run(&mut self) -> Result<Vec<IterationOutcome>> {
        let mut outcomes = Vec::with_capacity(self.iterations);
        for iteration in 1..=self.iterations {
            let outcome = self
                .step(iteration)
                .await
                .with_context(|| format!("Optimization iteration {iteration} failed"))?;
            outcomes.push(outcome);
        }
        Ok(outcomes)
    }

    /// Request feedback, evaluate the candidate it carries and store it at
    /// `iteration` if it reaches measurement.
    pub async fn step(&mut self, iteration: usize) -> Result<IterationOutcome> {
        let label = self.bench.target().label();
        let comparison = self
            .bench
            .comparison()
            .context("History has no baseline record")?;

        let request = FeedbackRequest {
            comparison,
            diagnostics: self.diagnostics.take(),
            structure: self.structure.take(),
        };
        let feedback = self
            .evaluator
            .feedback(&request)
            .await
            .context("Evaluator request failed")?;

        let candidate = match extract_code_block(&feedback) {
            Some(code) => code,
            None => {
                warn!(benchmark = %label, iteration, "Evaluator reply has no fenced code block");
                self.bench.post_process(&feedback)
            }
        };

        self.structure = self.bench.pre_process(&candidate).await;
        self.bench.set_optimization_iteration(iteration);
        let report = self.bench.evaluate(&candidate).await?;

        self.diagnostics = self.diagnostics_for(&report);
        info!(
            benchmark = %label,
            iteration,
            status = %report.status,
            "Optimization iteration finished"
        );

        Ok(IterationOutcome {
            iteration,
            status: report.status,
            feedback,
            history_index: report.history_index,
        })
    }

    fn diagnostics_for(&self, report: &EvaluationReport) -> Option<Diagnostics> {
        let output = match report.status {
            Status::PerformanceImproved => return None,
            Status::CompilationError => self.bench.compilation_error().map(str::to_string),
            Status::RuntimeErrorOrTestFailed => self.bench.test_output().map(str::to_string),
            Status::Timeout | Status::AllTestPassed => None,
        };
        let output = output.or_else(|| {
            report
                .first_failure
                .and_then(|stage| report.stage(stage))
                .and_then(|result| result.output_excerpt.clone())
        })?;
        Some(Diagnostics {
            status: report.status,
            output,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::evaluator::MockEvaluatorClient;
    use async_trait::async_trait;
    use energy_eval::{
        Aggregate, BenchmarkTarget, EnergyRecord, EvalResult, History, PipelineConfig, Stage,
        StageResult, StagedSource, TargetSpec,
    };
    use std::time::Duration;
    use tempfile::TempDir;

    /// Benchmark whose stages react to markers in the candidate:
    /// `BROKEN` fails compilation, `WRONG` fails tests, and `energy=<n>`
    /// sets the measured energy.
    struct MarkerBenchmark {
        target: BenchmarkTarget,
        history: History,
        pending: Option<usize>,
        compilation_error: Option<String>,
    }

    impl MarkerBenchmark {
        fn new(dir: &TempDir) -> Self {
            std::fs::write(dir.path().join("T.java"), "class T {} // energy=10").unwrap();
            let config = PipelineConfig {
                build_root: dir.path().to_path_buf(),
                ..Default::default()
            };
            let target = BenchmarkTarget::open(
                TargetSpec::new("fop", "pdf", "T").with_source_path("T.java"),
                &config,
            )
            .unwrap();
            Self {
                target,
                history: History::with_baseline(record("class T {} // energy=10", 10.0)),
                pending: None,
                compilation_error: None,
            }
        }
    }

    fn record(code: &str, energy: f64) -> EnergyRecord {
        EnergyRecord::from_aggregate(
            code,
            &Aggregate {
                avg_energy: energy,
                avg_latency: 1.0,
                avg_cpu_cycles: 1.0,
                max_peak_memory: 1.0,
                throughput: 1.0,
                samples_used: 1,
                samples_rejected: 0,
            },
        )
    }

    fn energy_of(code: &str) -> f64 {
        code.split("energy=")
            .nth(1)
            .and_then(|rest| rest.split_whitespace().next())
            .and_then(|n| n.parse().ok())
            .unwrap_or(5.0)
    }

    #[async_trait]
    impl Benchmark for MarkerBenchmark {
        fn target(&self) -> &BenchmarkTarget {
            &self.target
        }

        fn history(&self) -> &History {
            &self.history
        }

        async fn pre_process(&self, candidate: &str) -> Option<String> {
            Some(format!("lines={}", candidate.lines().count()))
        }

        async fn compile(&mut self, staged: &StagedSource) -> EvalResult<StageResult> {
            if staged.candidate().contains("BROKEN") {
                self.compilation_error = Some("error: ';' expected".to_string());
                return Ok(StageResult::failed(
                    Stage::Compile,
                    Duration::ZERO,
                    Some(1),
                    "error: ';' expected",
                ));
            }
            self.compilation_error = None;
            Ok(StageResult::passed(Stage::Compile, Duration::ZERO, Some(0)))
        }

        async fn run_tests(&mut self) -> EvalResult<StageResult> {
            let staged = std::fs::read_to_string(self.target.source().path()).unwrap();
            if staged.contains("WRONG") {
                return Ok(StageResult::failed(
                    Stage::Test,
                    Duration::ZERO,
                    Some(0),
                    "[INFO] BUILD FAILURE",
                ));
            }
            Ok(StageResult::passed(Stage::Test, Duration::ZERO, Some(0)))
        }

        async fn measure_energy(
            &mut self,
            staged: &StagedSource,
            index: Option<usize>,
        ) -> EvalResult<StageResult> {
            let rec = record(staged.candidate(), energy_of(staged.candidate()));
            match index {
                Some(index) => self.history.insert_at(index, rec)?,
                None => {
                    self.history.append(rec);
                }
            }
            Ok(StageResult::passed(Stage::Measure, Duration::ZERO, Some(0)))
        }

        fn compilation_error(&self) -> Option<&str> {
            self.compilation_error.as_deref()
        }

        fn test_output(&self) -> Option<&str> {
            None
        }

        fn set_optimization_iteration(&mut self, index: usize) {
            self.pending = Some(index);
        }

        fn take_optimization_iteration(&mut self) -> Option<usize> {
            self.pending.take()
        }
    }

    fn reply(code: &str) -> String {
        format!("Hoist the allocation out of the loop.\n```java\n{code}\n```\n")
    }

    #[tokio::test]
    async fn test_loop_records_at_iteration_indices() {
        let dir = tempfile::tempdir().unwrap();
        let bench = MarkerBenchmark::new(&dir);

        let mut evaluator = MockEvaluatorClient::new();
        let mut replies = vec![
            reply("class T {} // energy=4"),
            reply("class T { BROKEN"),
            reply("class T {} // energy=6"),
        ]
        .into_iter();
        evaluator
            .expect_feedback()
            .times(3)
            .returning(move |_| Ok(replies.next().unwrap()));

        let mut optimizer = Optimizer::new(bench, evaluator, 3);
        let outcomes = optimizer.run().await.unwrap();

        let statuses: Vec<Status> = outcomes.iter().map(|o| o.status).collect();
        assert_eq!(
            statuses,
            vec![
                Status::PerformanceImproved,
                Status::CompilationError,
                Status::PerformanceImproved
            ]
        );
        assert_eq!(outcomes[0].history_index, Some(1));
        assert_eq!(outcomes[1].history_index, None);
        assert_eq!(outcomes[2].history_index, Some(3));

        let bench = optimizer.into_benchmark();
        let indices: Vec<usize> = bench.history().iter().map(|(i, _)| i).collect();
        assert_eq!(indices, vec![0, 1, 3]);

        let cmp = bench.comparison().unwrap();
        assert_eq!(cmp.lowest_avg_energy.index, 1);
        assert_eq!(cmp.current.index, 3);
        assert_eq!(
            std::fs::read_to_string(dir.path().join("T.java")).unwrap(),
            "class T {} // energy=10"
        );
    }

    #[tokio::test]
    async fn test_failure_diagnostics_reach_next_request() {
        let dir = tempfile::tempdir().unwrap();
        let bench = MarkerBenchmark::new(&dir);

        let mut evaluator = MockEvaluatorClient::new();
        let mut seq = mockall::Sequence::new();
        evaluator
            .expect_feedback()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| req.diagnostics.is_none() && req.structure.is_none())
            .returning(|_| Ok(reply("class T { BROKEN")));
        evaluator
            .expect_feedback()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| {
                req.diagnostics.as_ref().is_some_and(|d| {
                    d.status == Status::CompilationError && d.output.contains("';' expected")
                }) && req.structure.as_deref() == Some("lines=1")
            })
            .returning(|_| Ok(reply("class T {} // WRONG")));
        evaluator
            .expect_feedback()
            .times(1)
            .in_sequence(&mut seq)
            .withf(|req| {
                req.diagnostics.as_ref().is_some_and(|d| {
                    d.status == Status::RuntimeErrorOrTestFailed
                        && d.output.contains("BUILD FAILURE")
                })
            })
            .returning(|_| Ok(reply("class T {} // energy=2")));

        let mut optimizer = Optimizer::new(bench, evaluator, 3);
        let outcomes = optimizer.run().await.unwrap();
        assert_eq!(outcomes[2].status, Status::PerformanceImproved);
    }

    #[tokio::test]
    async fn test_reply_without_fence_is_post_processed() {
        let dir = tempfile::tempdir().unwrap();
        let bench = MarkerBenchmark::new(&dir);

        let mut evaluator = MockEvaluatorClient::new();
        evaluator
            .expect_feedback()
            .returning(|_| Ok("class T {} // energy=3".to_string()));

        let mut optimizer = Optimizer::new(bench, evaluator, 1);
        let outcome = optimizer.step(1).await.unwrap();
        assert_eq!(outcome.status, Status::PerformanceImproved);
        assert_eq!(
            optimizer.benchmark().history().get(1).unwrap().source_code(),
            "class T {} // energy=3"
        );
    }

    #[tokio::test]
    async fn test_evaluator_failure_aborts_loop() {
        let dir = tempfile::tempdir().unwrap();
        let bench = MarkerBenchmark::new(&dir);

        let mut evaluator = MockEvaluatorClient::new();
        evaluator
            .expect_feedback()
            .times(1)
            .returning(|_| Err(crate::evaluator::EvaluatorError::EmptyResponse));

        let mut optimizer = Optimizer::new(bench, evaluator, 3);
        let err = optimizer.run().await.unwrap_err();
        let message = format!("{err:#}");
        assert!(message.contains("iteration 1"));
        assert!(message.contains("no content"));
        assert_eq!(optimizer.benchmark().history().len(), 1);
    }
}
