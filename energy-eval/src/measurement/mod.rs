//! Measurement Module — energy log parsing and sample aggregation
//!
//! The external measurement subsystem appends one comma-separated row per
//! trial to a log file, plus one summary row carrying throughput:
//!
//! ```text
//! row 0..N   label, energy, latency, cpu_cycles, peak_memory
//! summary    label, throughput              (position 10 by default)
//! ```
//!
//! Parsing routes rows into samples and throughput; aggregation rejects
//! invalid samples and reduces the rest. Neither step holds state between
//! calls.

pub mod aggregate;
pub mod log;

pub use aggregate::{aggregate, Aggregate};
pub use log::{clear_log, parse_log, read_log, MeasurementLog, Sample, SummaryRow};
