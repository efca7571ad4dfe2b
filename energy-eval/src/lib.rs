//! Energy Evaluation Library
//!
//! Evaluates candidate rewrites of a benchmark target's source against a
//! fixed baseline:
//! - Staged compile → test → measure pipeline with one [`Status`] per call
//! - Energy log parsing and aggregation (outlier rejection, means, peak memory)
//! - Optimization history with an original / best / current comparison
//! - Scoped staging that always restores the build-tree source
//!
//! # Usage
//!
//! ```rust,ignore
//! use energy_eval::{Benchmark, MakeBenchmark, PipelineConfig, TargetSpec};
//!
//! let config = PipelineConfig::load("pipeline.toml".as_ref())?;
//! let mut bench = MakeBenchmark::new(TargetSpec::new("fop", "pdf", "PDFNumsArray"), config).await?;
//! let status = bench.static_analysis(&candidate).await?;
//! let comparison = bench.comparison();
//! ```

pub mod benchmark;
pub mod config;
pub mod error;
pub mod history;
pub mod measurement;
pub mod record;
pub mod runner;
pub mod staging;
pub mod status;

pub use benchmark::{
    strip_code_fences, Benchmark, BenchmarkTarget, EvaluationReport, MakeBenchmark, Stage,
    StageOutcome, StageResult, TargetSpec,
};
pub use config::PipelineConfig;
pub use error::{EvalError, EvalResult};
pub use history::{Comparison, History, IndexedRecord};
pub use measurement::{Aggregate, MeasurementLog, Sample, SummaryRow};
pub use record::EnergyRecord;
pub use staging::{SourceSlot, StagedSource};
pub use status::Status;
