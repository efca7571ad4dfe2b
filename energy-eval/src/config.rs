//! Pipeline configuration.
//!
//! Passed explicitly to every benchmark at construction; nothing in this
//! crate reads the environment.

use crate::error::{EvalError, EvalResult};
use crate::measurement::SummaryRow;
use crate::runner::ProcessRunner;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Configuration for the evaluation pipeline
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Directory the build orchestrator is invoked from
    pub build_root: PathBuf,
    /// Build orchestrator command line (program plus leading arguments)
    pub build_command: String,
    /// Orchestrator verb that compiles the current target
    pub compile_verb: String,
    /// Orchestrator verb that runs the target's functional tests
    pub test_verb: String,
    /// Orchestrator verb that runs the energy measurement trials
    pub measure_verb: String,
    /// Log file the measurement subsystem appends samples to
    pub measurement_log: PathBuf,
    /// Where the throughput summary row sits in the log
    pub summary_row: SummaryRow,
    /// Test output substring that signals failure despite a zero exit code
    pub build_failure_marker: String,
    /// Maximum time per external process (seconds)
    pub stage_timeout_secs: u64,
    /// Truncate retained process output to this many bytes
    pub output_max_bytes: usize,
    /// Scratch directory for structural-analysis input files (relative to `build_root`)
    pub scratch_dir: PathBuf,
    /// Structural-analysis helper command; the source file path is appended
    pub ast_helper: Option<String>,
    /// File extension of target sources
    pub source_extension: String,
    /// Source location inside the build tree for targets without an explicit
    /// path; `{program}`, `{test_group}`, `{test_class}` and `{ext}` are substituted
    pub source_template: String,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            build_root: PathBuf::from("."),
            build_command: "make".to_string(),
            compile_verb: "compile".to_string(),
            test_verb: "test".to_string(),
            measure_verb: "measure".to_string(),
            measurement_log: PathBuf::from("runtime_logs/java.csv"),
            summary_row: SummaryRow::default(),
            build_failure_marker: "BUILD FAILURE".to_string(),
            stage_timeout_secs: 1800,
            output_max_bytes: 8192,
            scratch_dir: PathBuf::from("tmp"),
            ast_helper: None,
            source_extension: "java".to_string(),
            source_template: "{program}/build/{program}-2.8/{program}-core/src/main/java/org/apache/{program}/{test_group}/{test_class}.{ext}".to_string(),
        }
    }
}

impl PipelineConfig {
    /// Parse from TOML text; missing keys take their defaults.
    pub fn from_toml_str(text: &str) -> EvalResult<Self> {
        let config: Self =
            toml::from_str(text).map_err(|e| EvalError::config(format!("invalid TOML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a TOML file.
    pub fn load(path: &Path) -> EvalResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| EvalError::io(path, e))?;
        Self::from_toml_str(&text)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> EvalResult<()> {
        if self.stage_timeout_secs == 0 {
            return Err(EvalError::config("stage_timeout_secs must be positive"));
        }
        self.build_runner()?;
        if let Some(helper) = &self.ast_helper {
            if shlex::split(helper).map_or(true, |w| w.is_empty()) {
                return Err(EvalError::config(format!(
                    "ast_helper '{helper}' is not a valid command line"
                )));
            }
        }
        Ok(())
    }

    pub fn stage_timeout(&self) -> Duration {
        Duration::from_secs(self.stage_timeout_secs)
    }

    /// Runner for the build orchestrator, rooted at `build_root`.
    pub fn build_runner(&self) -> EvalResult<ProcessRunner> {
        ProcessRunner::from_command_line(&self.build_command, &self.build_root, self.stage_timeout())
            .ok_or_else(|| {
                EvalError::config(format!(
                    "build_command '{}' is not a valid command line",
                    self.build_command
                ))
            })
    }

    /// Runner for the structural-analysis helper, if one is configured.
    pub fn ast_runner(&self) -> Option<ProcessRunner> {
        let helper = self.ast_helper.as_deref()?;
        ProcessRunner::from_command_line(helper, &self.build_root, self.stage_timeout())
    }

    /// Resolve a path relative to `build_root`.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.build_root.join(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_config_defaults() {
        let config = PipelineConfig::default();
        assert_eq!(config.build_command, "make");
        assert_eq!(config.summary_row, SummaryRow::Index(10));
        assert_eq!(config.build_failure_marker, "BUILD FAILURE");
        assert!(config.ast_helper.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_toml_partial_override() {
        let config = PipelineConfig::from_toml_str(
            r#"
build_root = "/opt/dacapo/bms"
build_command = "make -s"
stage_timeout_secs = 60
summary_row = { label = "throughput" }
"#,
        )
        .unwrap();
        assert_eq!(config.build_root, PathBuf::from("/opt/dacapo/bms"));
        assert_eq!(config.stage_timeout(), Duration::from_secs(60));
        assert_eq!(config.summary_row, SummaryRow::Label("throughput".to_string()));
        assert_eq!(config.test_verb, "test");
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let err = PipelineConfig::from_toml_str("stage_timeout_secs = 0").unwrap_err();
        assert!(matches!(err, EvalError::Config { .. }));
    }

    #[test]
    fn test_bad_build_command_rejected() {
        let err = PipelineConfig::from_toml_str("build_command = \"\"").unwrap_err();
        assert!(err.to_string().contains("build_command"));
    }

    #[test]
    fn test_bad_ast_helper_rejected() {
        let err = PipelineConfig::from_toml_str("ast_helper = \"java -jar 'x\"").unwrap_err();
        assert!(err.to_string().contains("ast_helper"));
    }

    #[test]
    fn test_resolve_relative_to_build_root() {
        let config = PipelineConfig {
            build_root: PathBuf::from("/bms"),
            ..Default::default()
        };
        assert_eq!(
            config.resolve(Path::new("fop/src/A.java")),
            PathBuf::from("/bms/fop/src/A.java")
        );
        assert_eq!(config.resolve(Path::new("/abs/A.java")), PathBuf::from("/abs/A.java"));
    }
}
