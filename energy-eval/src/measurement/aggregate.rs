//! Sample aggregation.
//!
//! Samples with negative (or non-finite) energy are sensor errors and are
//! dropped from the population entirely. Energy, latency and cpu cycles are
//! averaged over the survivors; peak memory is a worst-case signal and takes
//! the maximum.

use crate::measurement::log::{MeasurementLog, Sample};
use serde::{Deserialize, Serialize};

/// Reduced measurement of one evaluation run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Aggregate {
    pub avg_energy: f64,
    pub avg_latency: f64,
    pub avg_cpu_cycles: f64,
    pub max_peak_memory: f64,
    pub throughput: f64,
    /// Samples that entered the averages
    pub samples_used: usize,
    /// Samples dropped as invalid
    pub samples_rejected: usize,
}

fn is_valid(sample: &Sample) -> bool {
    sample.energy.is_finite() && sample.energy >= 0.0
}

/// Aggregate a parsed log.
///
/// Returns `Err` when no sample survives rejection; the mean is undefined
/// and must not be reported as zero.
pub fn aggregate(log: &MeasurementLog) -> Result<Aggregate, String> {
    let valid: Vec<&Sample> = log.samples.iter().filter(|s| is_valid(s)).collect();
    let rejected = log.samples.len() - valid.len();

    if valid.is_empty() {
        return Err(format!(
            "no valid samples ({} rejected for negative or non-finite energy)",
            rejected
        ));
    }

    let n = valid.len() as f64;
    let mean = |f: fn(&Sample) -> f64| valid.iter().map(|s| f(s)).sum::<f64>() / n;
    let max_peak_memory = valid
        .iter()
        .map(|s| s.peak_memory)
        .fold(f64::NEG_INFINITY, f64::max);

    let throughput = match log.throughput {
        Some(value) => value,
        None => {
            tracing::warn!("Measurement log has no summary row; throughput recorded as 0");
            0.0
        }
    };

    if rejected > 0 {
        tracing::debug!(rejected, used = valid.len(), "Dropped invalid energy samples");
    }

    Ok(Aggregate {
        avg_energy: mean(|s| s.energy),
        avg_latency: mean(|s| s.latency),
        avg_cpu_cycles: mean(|s| s.cpu_cycles),
        max_peak_memory,
        throughput,
        samples_used: valid.len(),
        samples_rejected: rejected,
    })
}
