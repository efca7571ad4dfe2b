//! Benchmark target — which external program / test group / test class a
//! benchmark is bound to, and where its source lives in the build tree.

use crate::config::PipelineConfig;
use crate::error::EvalResult;
use crate::staging::SourceSlot;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Declarative description of a target, as written in configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TargetSpec {
    /// Program (benchmark application) identifier, e.g. `fop`
    pub program: String,
    /// Test group within the program, e.g. `pdf`
    pub test_group: String,
    /// Test class, e.g. `PDFNumsArray`
    pub test_class: String,
    /// Source path inside the build tree; derived from
    /// [`PipelineConfig::source_template`] when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_path: Option<PathBuf>,
}

impl TargetSpec {
    pub fn new(
        program: impl Into<String>,
        test_group: impl Into<String>,
        test_class: impl Into<String>,
    ) -> Self {
        Self {
            program: program.into(),
            test_group: test_group.into(),
            test_class: test_class.into(),
            source_path: None,
        }
    }

    pub fn with_source_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_path = Some(path.into());
        self
    }

    /// Source path relative to the build root (or absolute).
    pub fn source_path(&self, config: &PipelineConfig) -> PathBuf {
        match &self.source_path {
            Some(path) => path.clone(),
            None => PathBuf::from(
                config
                    .source_template
                    .replace("{program}", &self.program)
                    .replace("{test_group}", &self.test_group)
                    .replace("{test_class}", &self.test_class)
                    .replace("{ext}", &config.source_extension),
            ),
        }
    }

    pub fn label(&self) -> String {
        format!("{}/{}/{}", self.program, self.test_group, self.test_class)
    }
}

/// A target with its original source loaded. Immutable once opened.
#[derive(Debug, Clone)]
pub struct BenchmarkTarget {
    spec: TargetSpec,
    source: SourceSlot,
}

impl BenchmarkTarget {
    /// Resolve the source path against the build root and read the original.
    pub fn open(spec: TargetSpec, config: &PipelineConfig) -> EvalResult<Self> {
        let path = config.resolve(&spec.source_path(config));
        let source = SourceSlot::open(path)?;
        Ok(Self { spec, source })
    }

    pub fn spec(&self) -> &TargetSpec {
        &self.spec
    }

    pub fn source(&self) -> &SourceSlot {
        &self.source
    }

    pub fn original_source(&self) -> &str {
        self.source.original()
    }

    pub fn label(&self) -> String {
        self.spec.label()
    }

    /// Orchestrator scoping parameters for this target.
    pub fn scope_args(&self) -> [String; 3] {
        [
            format!("BENCHMARK={}", self.spec.program),
            format!("TEST_GROUP={}", self.spec.test_group),
            format!("TEST_CLASS={}", self.spec.test_class),
        ]
    }
}
