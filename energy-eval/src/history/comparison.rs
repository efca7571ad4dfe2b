//! Three-way comparison handed to the evaluator.

use crate::record::EnergyRecord;
use serde::{Deserialize, Serialize};

/// A history record together with the index it was stored at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexedRecord {
    pub index: usize,
    pub record: EnergyRecord,
}

impl IndexedRecord {
    pub fn new(index: usize, record: &EnergyRecord) -> Self {
        Self {
            index,
            record: record.clone(),
        }
    }
}

/// Original, best-by-energy and current views of a history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comparison {
    pub original: IndexedRecord,
    pub lowest_avg_energy: IndexedRecord,
    pub current: IndexedRecord,
}

impl Comparison {
    /// Relative energy change of the best record against the original, in percent.
    ///
    /// Negative values mean the best candidate uses less energy.
    pub fn best_energy_delta_pct(&self) -> f64 {
        let original = self.original.record.avg_energy();
        if original == 0.0 {
            return 0.0;
        }
        (self.lowest_avg_energy.record.avg_energy() - original) / original * 100.0
    }

    /// Format as a markdown table
    pub fn format_report(&self) -> String {
        let mut report = String::new();
        report.push_str(
            "| View | Index | Avg Energy | Avg Runtime | Avg CPU Cycles | Max Peak Memory | Throughput | Lines |\n\
             |------|-------|------------|-------------|----------------|-----------------|------------|-------|\n",
        );
        for (name, view) in [
            ("Original", &self.original),
            ("Lowest Avg Energy", &self.lowest_avg_energy),
            ("Current", &self.current),
        ] {
            let r = &view.record;
            report.push_str(&format!(
                "| {} | {} | {} | {} | {} | {} | {} | {} |\n",
                name,
                view.index,
                r.avg_energy(),
                r.avg_latency(),
                r.avg_cpu_cycles(),
                r.peak_memory(),
                r.throughput(),
                r.line_count()
            ));
        }
        report.push_str(&format!(
            "\nBest energy change vs original: {:+.2}%\n",
            self.best_energy_delta_pct()
        ));
        report
    }

    /// Emit one structured log line per view.
    pub fn log(&self) {
        for (view, entry) in [
            ("original", &self.original),
            ("lowest_avg_energy", &self.lowest_avg_energy),
            ("current", &self.current),
        ] {
            let r = &entry.record;
            tracing::info!(
                view,
                index = entry.index,
                avg_energy = r.avg_energy(),
                avg_runtime = r.avg_latency(),
                avg_cpu_cycles = r.avg_cpu_cycles(),
                max_peak_memory = r.peak_memory(),
                throughput = r.throughput(),
                lines = r.line_count(),
                "Energy comparison"
            );
        }
    }
}
