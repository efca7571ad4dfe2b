//! Make-driven benchmark target.
//!
//! The external orchestrator is invoked as
//! `<build_command> <verb> BENCHMARK=<program> TEST_GROUP=<group> TEST_CLASS=<class>`
//! from the build root, with `compile`, `test` and `measure` verbs by
//! default. The measurement verb appends samples to the configured log.

use crate::benchmark::report::{Stage, StageResult};
use crate::benchmark::target::{BenchmarkTarget, TargetSpec};
use crate::benchmark::Benchmark;
use crate::config::PipelineConfig;
use crate::error::{EvalError, EvalResult};
use crate::history::History;
use crate::measurement::{aggregate, clear_log, read_log};
use crate::record::EnergyRecord;
use crate::runner::{truncate_output, ProcessRun, ProcessRunner};
use crate::staging::StagedSource;
use crate::status::Status;
use async_trait::async_trait;
use tracing::{info, warn};

/// A benchmark bound to one make-driven target.
pub struct MakeBenchmark {
    target: BenchmarkTarget,
    config: PipelineConfig,
    runner: ProcessRunner,
    history: History,
    compilation_error: Option<String>,
    test_output: Option<String>,
    pending_index: Option<usize>,
}

impl MakeBenchmark {
    /// Open the target and evaluate its unmodified source as history entry 0.
    ///
    /// Fails unless the baseline compiles, passes its tests and produces a
    /// measurement.
    pub async fn new(spec: TargetSpec, config: PipelineConfig) -> EvalResult<Self> {
        config.validate()?;
        let target = BenchmarkTarget::open(spec, &config)?;
        let runner = config.build_runner()?;

        let mut bench = Self {
            target,
            config,
            runner,
            history: History::new(),
            compilation_error: None,
            test_output: None,
            pending_index: None,
        };

        info!(benchmark = %bench.target.label(), "Run benchmark on the original code");
        let original = bench.target.original_source().to_string();
        let report = bench.evaluate(&original).await?;

        if report.status != Status::PerformanceImproved {
            let detail = report
                .first_failure
                .and_then(|stage| report.stage(stage))
                .and_then(|result| result.output_excerpt.clone())
                .unwrap_or_default();
            return Err(EvalError::Baseline {
                status: report.status,
                detail,
            });
        }
        Ok(bench)
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    async fn run_verb(&self, verb: &str) -> ProcessRun {
        let mut args = vec![verb.to_string()];
        args.extend(self.target.scope_args());
        self.runner.run(&args).await
    }

    fn excerpt(&self, text: &str) -> String {
        truncate_output(text, self.config.output_max_bytes)
    }

    fn scratch_path(&self) -> std::path::PathBuf {
        self.config.resolve(&self.config.scratch_dir).join(format!(
            "ast_{}.{}",
            self.target.spec().test_class,
            self.config.source_extension
        ))
    }
}

#[async_trait]
impl Benchmark for MakeBenchmark {
    fn target(&self) -> &BenchmarkTarget {
        &self.target
    }

    fn history(&self) -> &History {
        &self.history
    }

    async fn pre_process(&self, candidate: &str) -> Option<String> {
        let helper = self.config.ast_runner()?;
        let path = self.scratch_path();

        if let Some(parent) = path.parent() {
            if let Err(e) = tokio::fs::create_dir_all(parent).await {
                warn!(dir = %parent.display(), error = %e, "Cannot create scratch directory");
                return None;
            }
        }
        if let Err(e) = tokio::fs::write(&path, candidate).await {
            warn!(path = %path.display(), error = %e, "Cannot write structural-analysis input");
            return None;
        }

        let run = helper.run([path.as_os_str()]).await;
        if run.success() {
            Some(run.stdout())
        } else {
            warn!(
                helper = helper.program(),
                output = %self.excerpt(&run.combined_output()),
                "Structural analysis failed"
            );
            None
        }
    }

    async fn compile(&mut self, staged: &StagedSource) -> EvalResult<StageResult> {
        let run = self.run_verb(&self.config.compile_verb).await;
        let output = self.excerpt(&run.combined_output());

        if run.success() {
            self.compilation_error = None;
            info!(lines = staged.candidate().lines().count(), "Compiled candidate");
            return Ok(StageResult::passed(Stage::Compile, run.duration, run.exit_code()));
        }

        self.compilation_error = Some(output.clone());
        if run.timed_out() {
            return Ok(StageResult::timed_out(Stage::Compile, run.duration, output));
        }
        Ok(StageResult::failed(
            Stage::Compile,
            run.duration,
            run.exit_code(),
            output,
        ))
    }

    async fn run_tests(&mut self) -> EvalResult<StageResult> {
        let run = self.run_verb(&self.config.test_verb).await;
        let output = self.excerpt(&run.combined_output());
        self.test_output = Some(output.clone());

        if run.timed_out() {
            return Ok(StageResult::timed_out(Stage::Test, run.duration, output));
        }

        let marker_hit = run.stdout().contains(&self.config.build_failure_marker);
        if run.success() && !marker_hit {
            return Ok(StageResult::passed(Stage::Test, run.duration, run.exit_code()));
        }
        Ok(StageResult::failed(
            Stage::Test,
            run.duration,
            run.exit_code(),
            output,
        ))
    }

    async fn measure_energy(
        &mut self,
        staged: &StagedSource,
        index: Option<usize>,
    ) -> EvalResult<StageResult> {
        let log_path = self.config.resolve(&self.config.measurement_log);
        info!(log = %log_path.display(), "Clearing measurement log");
        clear_log(&log_path).await?;

        let run = self.run_verb(&self.config.measure_verb).await;
        if run.timed_out() {
            let output = self.excerpt(&run.combined_output());
            return Ok(StageResult::timed_out(Stage::Measure, run.duration, output));
        }
        if !run.success() {
            let output = self.excerpt(&run.combined_output());
            warn!(exit_code = ?run.exit_code(), "Measurement run failed");
            return Ok(StageResult::failed(
                Stage::Measure,
                run.duration,
                run.exit_code(),
                output,
            ));
        }

        let log = read_log(&log_path, &self.config.summary_row).await?;
        let agg = aggregate(&log).map_err(|message| EvalError::measurement(&log_path, message))?;
        let record = EnergyRecord::from_aggregate(staged.candidate(), &agg);

        let index = match index {
            Some(index) => {
                self.history.insert_at(index, record)?;
                index
            }
            None => self.history.append(record),
        };
        info!(
            index,
            samples = agg.samples_used,
            rejected = agg.samples_rejected,
            "Recorded energy measurement"
        );
        if let Some(comparison) = self.history.extract_comparison() {
            comparison.log();
        }

        Ok(StageResult::passed(Stage::Measure, run.duration, run.exit_code()))
    }

    fn compilation_error(&self) -> Option<&str> {
        self.compilation_error.as_deref()
    }

    fn test_output(&self) -> Option<&str> {
        self.test_output.as_deref()
    }

    fn set_optimization_iteration(&mut self, index: usize) {
        self.pending_index = Some(index);
    }

    fn take_optimization_iteration(&mut self) -> Option<usize> {
        self.pending_index.take()
    }
}
