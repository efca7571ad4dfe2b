//! Measurement log reader.
//!
//! The summary row is located by [`SummaryRow`], either a fixed position or
//! a marker label. Blank lines are ignored and do not occupy a position.

use crate::error::{EvalError, EvalResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default position of the throughput row written by the measurement harness.
pub const DEFAULT_SUMMARY_INDEX: usize = 10;

/// How the throughput summary row is recognised in the log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SummaryRow {
    /// The row at this zero-based position.
    Index(usize),
    /// The first row whose label field equals this marker.
    Label(String),
}

impl Default for SummaryRow {
    fn default() -> Self {
        Self::Index(DEFAULT_SUMMARY_INDEX)
    }
}

impl SummaryRow {
    fn matches(&self, position: usize, label: &str) -> bool {
        match self {
            Self::Index(index) => *index == position,
            Self::Label(marker) => marker == label,
        }
    }
}

/// One raw measurement trial.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub label: String,
    pub energy: f64,
    pub latency: f64,
    pub cpu_cycles: f64,
    pub peak_memory: f64,
}

/// Parsed content of one measurement run.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeasurementLog {
    /// Sample rows in file order
    pub samples: Vec<Sample>,
    /// Throughput from the summary row, if the run wrote one
    pub throughput: Option<f64>,
}

/// Truncate the log so the next measurement run starts from an empty file.
///
/// A log that does not exist yet is left alone; the subsystem creates it.
pub async fn clear_log(path: &Path) -> EvalResult<()> {
    match tokio::fs::metadata(path).await {
        Ok(_) => tokio::fs::write(path, b"")
            .await
            .map_err(|e| EvalError::io(path, e)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(EvalError::io(path, e)),
    }
}

/// Read and parse the log at `path`.
pub async fn read_log(path: &Path, summary: &SummaryRow) -> EvalResult<MeasurementLog> {
    let content = match tokio::fs::read_to_string(path).await {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(EvalError::measurement(path, "measurement log not found"));
        }
        Err(e) => return Err(EvalError::io(path, e)),
    };
    parse_log(&content, summary).map_err(|message| EvalError::measurement(path, message))
}

/// Parse log text into samples and throughput.
///
/// Returns a description of the first malformed row on failure.
pub fn parse_log(content: &str, summary: &SummaryRow) -> Result<MeasurementLog, String> {
    let mut log = MeasurementLog::default();
    let rows = content.lines().filter(|line| !line.trim().is_empty());

    for (position, line) in rows.enumerate() {
        let fields = split_record(line);
        let label = fields.first().map(String::as_str).unwrap_or_default();

        if log.throughput.is_none() && summary.matches(position, label) {
            let value = field(&fields, 1, position, "throughput")?;
            log.throughput = Some(value);
            continue;
        }

        log.samples.push(Sample {
            label: label.to_string(),
            energy: field(&fields, 1, position, "energy")?,
            latency: field(&fields, 2, position, "latency")?,
            cpu_cycles: field(&fields, 3, position, "cpu_cycles")?,
            peak_memory: field(&fields, 4, position, "peak_memory")?,
        });
    }

    if log.samples.is_empty() && log.throughput.is_none() {
        return Err("measurement log is empty".to_string());
    }
    Ok(log)
}

fn field(fields: &[String], index: usize, row: usize, name: &str) -> Result<f64, String> {
    let raw = fields
        .get(index)
        .ok_or_else(|| format!("row {row}: missing {name} column"))?;
    raw.trim()
        .parse::<f64>()
        .map_err(|_| format!("row {row}: {name} '{raw}' is not a number"))
}

/// Split one comma-separated record, honouring double-quoted fields.
fn split_record(line: &str) -> Vec<String> {
    let mut fields = Vec::new();
    let mut current = String::new();
    let mut in_quotes = false;
    let mut chars = line.trim_end_matches('\r').chars().peekable();

    while let Some(c) = chars.next() {
        match c {
            '"' if in_quotes && chars.peek() == Some(&'"') => {
                current.push('"');
                chars.next();
            }
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => fields.push(std::mem::take(&mut current)),
            _ => current.push(c),
        }
    }
    fields.push(current);
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_rows(count: usize) -> String {
        (0..count)
            .map(|i| format!("fop,{}.0,2.0,100.0,{}.0\n", i + 1, i))
            .collect()
    }

    #[test]
    fn test_summary_row_at_default_position() {
        let content = format!("{}fop,7.5\n", sample_rows(10));
        let log = parse_log(&content, &SummaryRow::default()).unwrap();
        assert_eq!(log.samples.len(), 10);
        assert_eq!(log.throughput, Some(7.5));
    }

    #[test]
    fn test_rows_after_summary_are_samples() {
        let content = format!("{}fop,7.5\nfop,3.0,1.0,1.0,1.0\n", sample_rows(10));
        let log = parse_log(&content, &SummaryRow::default()).unwrap();
        assert_eq!(log.samples.len(), 11);
        assert_eq!(log.samples[10].energy, 3.0);
    }

    #[test]
    fn test_missing_summary_row_leaves_throughput_unset() {
        let log = parse_log(&sample_rows(3), &SummaryRow::default()).unwrap();
        assert_eq!(log.samples.len(), 3);
        assert_eq!(log.throughput, None);
    }

    #[test]
    fn test_summary_row_by_label() {
        let content = "fop,4,2,2,2\nthroughput,9.25\nfop,6,2,2,3\n";
        let summary = SummaryRow::Label("throughput".to_string());
        let log = parse_log(content, &summary).unwrap();
        assert_eq!(log.samples.len(), 2);
        assert_eq!(log.throughput, Some(9.25));
    }

    #[test]
    fn test_blank_lines_do_not_count_as_positions() {
        let content = "\nfop,1,1,1,1\n\n   \nsummary,2.5\n";
        let log = parse_log(content, &SummaryRow::Index(1)).unwrap();
        assert_eq!(log.samples.len(), 1);
        assert_eq!(log.throughput, Some(2.5));
    }

    #[test]
    fn test_quoted_label_with_comma() {
        let content = "\"fop, pdf\",4,2,2,2\r\n";
        let log = parse_log(content, &SummaryRow::default()).unwrap();
        assert_eq!(log.samples[0].label, "fop, pdf");
        assert_eq!(log.samples[0].peak_memory, 2.0);
    }

    #[test]
    fn test_malformed_number_is_reported() {
        let err = parse_log("fop,abc,1,1,1\n", &SummaryRow::default()).unwrap_err();
        assert!(err.contains("row 0"));
        assert!(err.contains("energy"));
    }

    #[test]
    fn test_short_row_is_reported() {
        let err = parse_log("fop,1,1\n", &SummaryRow::default()).unwrap_err();
        assert!(err.contains("cpu_cycles"));
    }

    #[test]
    fn test_empty_log_is_an_error() {
        assert!(parse_log("", &SummaryRow::default()).is_err());
        assert!(parse_log("\n\n", &SummaryRow::default()).is_err());
    }

    #[test]
    fn test_summary_row_serde_shape() {
        let parsed: SummaryRow = toml::from_str::<toml::Value>("index = 10")
            .unwrap()
            .try_into()
            .unwrap();
        assert_eq!(parsed, SummaryRow::Index(10));
    }

    #[tokio::test]
    async fn test_read_log_missing_file_is_measurement_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_log(&dir.path().join("java.csv"), &SummaryRow::default())
            .await
            .unwrap_err();
        assert!(matches!(err, EvalError::MeasurementData { .. }));
    }

    #[tokio::test]
    async fn test_clear_log_truncates_existing_and_skips_missing() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("java.csv");
        clear_log(&path).await.unwrap();
        assert!(!path.exists());

        std::fs::write(&path, "fop,1,1,1,1\n").unwrap();
        clear_log(&path).await.unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "");
    }
}
