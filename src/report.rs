//! # Run Reports and Error Collection
//!
//! Every file touched by a run ends in exactly one per-file outcome: a
//! success summary or a [`Failure`]. The [`ErrorCollector`] owns the failure
//! side for the duration of one run and can flush it to a structured error
//! log; nothing here is shared across runs or stored in globals.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{self, BufWriter};
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::classify::FileCategory;

/// What went wrong with a single file. File-scoped by construction; fatal
/// conditions use [`crate::error::ArcxError`] instead.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// The source path vanished or became unreadable.
    Scan,
    /// The codec rejected the input during archive creation.
    Compression,
    /// The payload slice was corrupt or truncated.
    Decompression,
    /// Decompressed bytes did not match the recorded checksum.
    ChecksumMismatch,
}

/// A per-file failure outcome. The run carries on; this is recorded and
/// reported instead of unwinding.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Failure {
    pub path: String,
    pub kind: FailureKind,
    pub message: String,
}

impl Failure {
    pub fn new(path: impl Into<String>, kind: FailureKind, message: impl ToString) -> Self {
        Failure {
            path: path.into(),
            kind,
            message: message.to_string(),
        }
    }
}

/// Append-only accumulator of per-file failures for one run.
///
/// Created at run start, owned by the aggregating side of the scheduler,
/// flushed (optionally) to a JSON error log at run end.
#[derive(Debug, Default)]
pub struct ErrorCollector {
    failures: Vec<Failure>,
}

impl ErrorCollector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, failure: Failure) {
        tracing::warn!(path = %failure.path, kind = ?failure.kind, "{}", failure.message);
        self.failures.push(failure);
    }

    pub fn len(&self) -> usize {
        self.failures.len()
    }

    pub fn is_empty(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn failures(&self) -> &[Failure] {
        &self.failures
    }

    pub fn into_failures(self) -> Vec<Failure> {
        self.failures
    }

    /// Flush the failure list as a JSON error log. A run with no failures
    /// still writes a log (an empty list), so callers can tell "no errors"
    /// from "never ran".
    pub fn write_log(&self, path: &Path) -> io::Result<()> {
        write_error_log(&self.failures, path)
    }
}

/// Write a failures-only JSON error log.
pub fn write_error_log(failures: &[Failure], path: &Path) -> io::Result<()> {
    let file = File::create(path)?;
    serde_json::to_writer_pretty(BufWriter::new(file), failures)?;
    Ok(())
}

/// Per-category slice of the aggregate statistics.
#[derive(Serialize, Deserialize, Copy, Clone, Debug, Default)]
pub struct CategoryStats {
    pub files: u64,
    pub original_bytes: u64,
    pub compressed_bytes: u64,
}

/// One archived or restored file, as it appears in the success half of a
/// report.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct EntrySummary {
    pub path: String,
    pub category: FileCategory,
    pub level: i32,
    pub original_size: u64,
    pub compressed_size: u64,
}

#[derive(Serialize, Deserialize, Copy, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Create,
    Extract,
}

/// Structured result of a whole run, both directions.
///
/// `succeeded` is always sorted by archive path; pair it with the failure
/// list and every input file of the run is accounted for exactly once.
#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct RunReport {
    pub operation: Operation,
    pub succeeded: Vec<EntrySummary>,
    pub failures: Vec<Failure>,
    pub total_original_bytes: u64,
    pub total_compressed_bytes: u64,
    pub categories: BTreeMap<String, CategoryStats>,
    pub elapsed_secs: f64,
}

impl RunReport {
    /// Assemble a report from per-file outcomes, computing the aggregates.
    pub fn build(
        operation: Operation,
        succeeded: Vec<EntrySummary>,
        failures: Vec<Failure>,
        elapsed_secs: f64,
    ) -> Self {
        let mut categories: BTreeMap<String, CategoryStats> = BTreeMap::new();
        let mut total_original = 0u64;
        let mut total_compressed = 0u64;
        for entry in &succeeded {
            total_original += entry.original_size;
            total_compressed += entry.compressed_size;
            let slot = categories
                .entry(entry.category.as_str().to_string())
                .or_default();
            slot.files += 1;
            slot.original_bytes += entry.original_size;
            slot.compressed_bytes += entry.compressed_size;
        }
        RunReport {
            operation,
            succeeded,
            failures,
            total_original_bytes: total_original,
            total_compressed_bytes: total_compressed,
            categories,
            elapsed_secs,
        }
    }

    /// Original/compressed ratio over all succeeded files; 0 when nothing
    /// compressed.
    pub fn ratio(&self) -> f64 {
        if self.total_compressed_bytes == 0 {
            0.0
        } else {
            self.total_original_bytes as f64 / self.total_compressed_bytes as f64
        }
    }

    pub fn is_full_success(&self) -> bool {
        self.failures.is_empty()
    }

    pub fn write_json(&self, path: &Path) -> io::Result<()> {
        let file = File::create(path)?;
        serde_json::to_writer_pretty(BufWriter::new(file), self)?;
        Ok(())
    }
}

/// Render a byte count the way the summary tables expect it ("1.23 MB").
pub fn format_size(bytes: u64) -> String {
    const UNITS: [&str; 5] = ["B", "KB", "MB", "GB", "TB"];
    let mut size = bytes as f64;
    let mut unit = 0;
    while size >= 1024.0 && unit < UNITS.len() - 1 {
        size /= 1024.0;
        unit += 1;
    }
    format!("{:.2} {}", size, UNITS[unit])
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(path: &str, cat: FileCategory, orig: u64, comp: u64) -> EntrySummary {
        EntrySummary {
            path: path.to_string(),
            category: cat,
            level: cat.default_level(),
            original_size: orig,
            compressed_size: comp,
        }
    }

    #[test]
    fn report_aggregates_by_category() {
        let report = RunReport::build(
            Operation::Create,
            vec![
                entry("a.png", FileCategory::Texture, 100, 60),
                entry("b.png", FileCategory::Texture, 50, 30),
                entry("c.lua", FileCategory::Script, 40, 10),
            ],
            vec![],
            0.5,
        );
        assert_eq!(report.total_original_bytes, 190);
        assert_eq!(report.total_compressed_bytes, 100);
        assert_eq!(report.categories["texture"].files, 2);
        assert_eq!(report.categories["script"].original_bytes, 40);
        assert!((report.ratio() - 1.9).abs() < 1e-9);
    }

    #[test]
    fn collector_flushes_json_log() {
        let dir = tempfile::tempdir().unwrap();
        let log = dir.path().join("errors.json");
        let mut collector = ErrorCollector::new();
        collector.record(Failure::new("a.png", FailureKind::Scan, "gone"));
        collector.write_log(&log).unwrap();

        let parsed: Vec<Failure> =
            serde_json::from_reader(File::open(&log).unwrap()).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].kind, FailureKind::Scan);
    }

    #[test]
    fn format_size_picks_units() {
        assert_eq!(format_size(512), "512.00 B");
        assert_eq!(format_size(2048), "2.00 KB");
        assert_eq!(format_size(5 * 1024 * 1024), "5.00 MB");
    }
}
