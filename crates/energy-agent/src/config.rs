use anyhow::{bail, Context, Result};
use energy_eval::{PipelineConfig, TargetSpec};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// OpenAI-compatible evaluator endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// API base URL; `/chat/completions` is appended
    pub base_url: String,
    pub model: String,
    /// Environment variable holding the API key (None = unauthenticated)
    pub api_key_env: Option<String>,
    pub max_tokens: u32,
    pub temperature: f32,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/v1".to_string(),
            model: "gpt-4o".to_string(),
            api_key_env: Some("OPENAI_API_KEY".to_string()),
            max_tokens: 4096,
            temperature: 0.2,
            timeout_secs: 300,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

/// Top-level agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AgentConfig {
    pub pipeline: PipelineConfig,
    pub llm: LlmConfig,
    /// Optimization iterations per target
    pub iterations: usize,
    /// Root of the per-target run artifacts
    pub output_dir: PathBuf,
    /// Targets evaluated in sequence
    pub targets: Vec<TargetSpec>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            llm: LlmConfig::default(),
            iterations: 5,
            output_dir: PathBuf::from("benchmarks_out"),
            targets: Vec::new(),
        }
    }
}

impl AgentConfig {
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: Self = toml::from_str(text).context("Failed to parse agent config")?;
        config.validate()?;
        Ok(config)
    }

    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        Self::from_toml_str(&text).with_context(|| format!("Invalid config {}", path.display()))
    }

    pub fn validate(&self) -> Result<()> {
        self.pipeline.validate()?;
        if self.llm.timeout_secs == 0 {
            bail!("llm.timeout_secs must be positive");
        }
        if self.llm.base_url.trim().is_empty() {
            bail!("llm.base_url must not be empty");
        }
        Ok(())
    }

    /// Keep only targets whose test class or label matches `filter`.
    pub fn retain_targets(&mut self, filter: &str) {
        self.targets
            .retain(|t| t.test_class == filter || t.label() == filter);
    }
}
