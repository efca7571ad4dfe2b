//! Per-target run artifacts.
//!
//! ```text
//! <output_dir>/<program>/<test_class>/
//!   history.json              every measured record, by index
//!   comparison.json           original / lowest-energy / current
//!   summary.md                comparison table and per-iteration statuses
//!   optimized_<class>.<ext>   lowest-energy source
//! ```

use crate::optimizer::IterationOutcome;
use anyhow::{Context, Result};
use energy_eval::{History, IndexedRecord, TargetSpec};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};

pub struct RunArtifacts {
    dir: PathBuf,
    optimized_name: String,
}

impl RunArtifacts {
    pub fn for_target(output_dir: &Path, spec: &TargetSpec, extension: &str) -> Self {
        Self {
            dir: output_dir.join(&spec.program).join(&spec.test_class),
            optimized_name: format!("optimized_{}.{}", spec.test_class, extension),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn optimized_path(&self) -> PathBuf {
        self.dir.join(&self.optimized_name)
    }

    /// Write all artifacts, replacing earlier ones.
    pub async fn write(&self, history: &History, outcomes: &[IterationOutcome]) -> Result<()> {
        let comparison = history
            .extract_comparison()
            .context("Cannot write artifacts for an empty history")?;

        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("Failed to create {}", self.dir.display()))?;

        let records: Vec<IndexedRecord> = history
            .iter()
            .map(|(index, record)| IndexedRecord::new(index, record))
            .collect();
        self.write_file("history.json", &serde_json::to_string_pretty(&records)?)
            .await?;
        self.write_file("comparison.json", &serde_json::to_string_pretty(&comparison)?)
            .await?;
        self.write_file("summary.md", &summary(&comparison.format_report(), outcomes))
            .await?;
        self.write_file(
            &self.optimized_name,
            comparison.lowest_avg_energy.record.source_code(),
        )
        .await?;

        tracing::info!(
            dir = %self.dir.display(),
            best_index = comparison.lowest_avg_energy.index,
            "Wrote run artifacts"
        );
        Ok(())
    }

    async fn write_file(&self, name: &str, content: &str) -> Result<()> {
        let path = self.dir.join(name);
        tokio::fs::write(&path, content)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))
    }
}

fn summary(comparison_report: &str, outcomes: &[IterationOutcome]) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Generated {}\n",
        chrono::Utc::now().format("%Y-%m-%d %H:%M:%S UTC")
    );
    out.push_str(comparison_report);
    out.push_str("\n\n## Iterations\n\n| Iteration | Status | History index |\n|---|---|---|\n");
    for outcome in outcomes {
        let index = outcome
            .history_index
            .map_or_else(|| "-".to_string(), |i| i.to_string());
        let _ = writeln!(out, "| {} | {} | {} |", outcome.iteration, outcome.status, index);
    }
    out
}
