//! Energy record — the aggregated, per-candidate result stored in history.

use crate::measurement::Aggregate;
use serde::{Deserialize, Serialize};

/// One evaluated candidate. Fields are private so a record cannot change
/// after it has been built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnergyRecord {
    source_code: String,
    avg_energy: f64,
    avg_latency: f64,
    avg_cpu_cycles: f64,
    peak_memory: f64,
    throughput: f64,
    line_count: usize,
}

/// Round to three decimals, the precision measurement summaries are kept at.
fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}

impl EnergyRecord {
    /// Build a record from a candidate and its aggregated measurement.
    ///
    /// Energy, latency and throughput are rounded to three decimals; cpu
    /// cycles and peak memory are kept as measured.
    pub fn from_aggregate(source_code: impl Into<String>, aggregate: &Aggregate) -> Self {
        let source_code = source_code.into();
        let line_count = source_code.lines().count();
        Self {
            source_code,
            avg_energy: round3(aggregate.avg_energy),
            avg_latency: round3(aggregate.avg_latency),
            avg_cpu_cycles: aggregate.avg_cpu_cycles,
            peak_memory: aggregate.max_peak_memory,
            throughput: round3(aggregate.throughput),
            line_count,
        }
    }

    pub fn source_code(&self) -> &str {
        &self.source_code
    }

    pub fn avg_energy(&self) -> f64 {
        self.avg_energy
    }

    pub fn avg_latency(&self) -> f64 {
        self.avg_latency
    }

    pub fn avg_cpu_cycles(&self) -> f64 {
        self.avg_cpu_cycles
    }

    pub fn peak_memory(&self) -> f64 {
        self.peak_memory
    }

    pub fn throughput(&self) -> f64 {
        self.throughput
    }

    pub fn line_count(&self) -> usize {
        self.line_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn aggregate(energy: f64) -> Aggregate {
        Aggregate {
            avg_energy: energy,
            avg_latency: 2.00049,
            avg_cpu_cycles: 1234.5678,
            max_peak_memory: 512.25,
            throughput: 7.51234,
            samples_used: 3,
            samples_rejected: 1,
        }
    }

    #[test]
    fn test_line_count_matches_source() {
        let record = EnergyRecord::from_aggregate("a\nb\nc\n", &aggregate(1.0));
        assert_eq!(record.line_count(), 3);
        let empty = EnergyRecord::from_aggregate("", &aggregate(1.0));
        assert_eq!(empty.line_count(), 0);
    }

    #[test]
    fn test_rounding_applies_to_energy_latency_throughput_only() {
        let record = EnergyRecord::from_aggregate("x", &aggregate(10.12345));
        assert_eq!(record.avg_energy(), 10.123);
        assert_eq!(record.avg_latency(), 2.0);
        assert_eq!(record.throughput(), 7.512);
        assert_eq!(record.avg_cpu_cycles(), 1234.5678);
        assert_eq!(record.peak_memory(), 512.25);
    }
}
