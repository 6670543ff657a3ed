//! # Archive Reader / Extractor
//!
//! Restores a container to a directory tree, mirroring the relative paths
//! recorded at build time. The manifest is parsed and structurally validated
//! up front; a malformed container is rejected before a single file is
//! written. Entries are then decompressed by the same bounded worker pool
//! the compression side uses; a corrupt or checksum-failing entry is
//! recorded as a [`Failure`] and never blocks its siblings. Manifest path
//! uniqueness guarantees no two workers ever write the same output file.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::archive::{ArchiveReader, ManifestEntry};
use crate::codec;
use crate::error::ArcxError;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::report::{
    EntrySummary, ErrorCollector, Failure, FailureKind, Operation, RunReport,
};
use crate::workers::run_pool;

/// Holds all configuration options for an extraction run.
#[derive(Debug, Clone, Default)]
pub struct ExtractOptions {
    /// Number of worker threads. [0 = auto-detect from available cores]
    pub threads: usize,
}

enum Restored {
    Done(EntrySummary),
    Failed(Failure),
}

/// Restore one manifest entry: read its payload slice through a private file
/// handle, decompress, verify the checksum, then write the output file.
///
/// Corruption is file-scoped and becomes a `Failure`; an unwritable output
/// tree (missing permissions, disk full) is fatal for the whole run.
fn extract_one(
    reader: &ArchiveReader,
    output_root: &Path,
    entry: ManifestEntry,
) -> Result<Restored, ArcxError> {
    let mut archive = File::open(reader.archive_path()).map_err(|e| ArcxError::Io {
        source: e,
        path: reader.archive_path().to_path_buf(),
    })?;

    let block = match reader.read_block(&mut archive, &entry) {
        Ok(b) => b,
        Err(e) => {
            return Ok(Restored::Failed(Failure::new(
                entry.path,
                FailureKind::Decompression,
                format!("payload slice unreadable: {e}"),
            )))
        }
    };

    let bytes = match codec::decompress(&block, entry.original_size) {
        Ok(b) => b,
        Err(e) => {
            return Ok(Restored::Failed(Failure::new(
                entry.path,
                FailureKind::Decompression,
                e,
            )))
        }
    };

    let actual = crc32fast::hash(&bytes);
    if actual != entry.checksum {
        return Ok(Restored::Failed(Failure::new(
            entry.path,
            FailureKind::ChecksumMismatch,
            format!(
                "checksum {:08x} does not match recorded {:08x}",
                actual, entry.checksum
            ),
        )));
    }

    let target: PathBuf = output_root.join(&entry.path);
    if let Some(parent) = target.parent() {
        fs::create_dir_all(parent).map_err(|e| ArcxError::Io {
            source: e,
            path: parent.to_path_buf(),
        })?;
    }
    fs::write(&target, &bytes).map_err(|e| ArcxError::Io {
        source: e,
        path: target.clone(),
    })?;

    Ok(Restored::Done(EntrySummary {
        path: entry.path,
        category: entry.category,
        level: entry.level,
        original_size: entry.original_size,
        compressed_size: entry.compressed_size,
    }))
}

/// Extract the container at `archive_path` under `output_root`.
pub fn extract_archive(
    archive_path: &Path,
    output_root: &Path,
    options: &ExtractOptions,
) -> Result<RunReport, ArcxError> {
    extract_archive_with_progress(archive_path, output_root, options, None)
}

/// [`extract_archive`] with an optional progress callback.
pub fn extract_archive_with_progress(
    archive_path: &Path,
    output_root: &Path,
    options: &ExtractOptions,
    progress_cb: Option<Box<ProgressCallback>>,
) -> Result<RunReport, ArcxError> {
    let start = Instant::now();
    // Structural validation happens here, before any output file exists.
    let reader = ArchiveReader::open(archive_path)?;
    fs::create_dir_all(output_root).map_err(|e| ArcxError::Io {
        source: e,
        path: output_root.to_path_buf(),
    })?;

    let entries = reader.manifest.entries.clone();
    let total_files = entries.len() as u64;
    let total_bytes: u64 = entries.iter().map(|e| e.original_size).sum();
    tracing::info!(
        files = total_files,
        bytes = total_bytes,
        threads = options.threads,
        "extracting {} into {}",
        archive_path.display(),
        output_root.display()
    );

    let mut progress = ProgressTracker::new(total_files, total_bytes, progress_cb);
    let reader_ref = &reader;
    let results = run_pool(
        entries,
        options.threads,
        |entry| extract_one(reader_ref, output_root, entry),
        |restored: &Restored| match restored {
            Restored::Done(entry) => progress.record_file(entry.original_size, false),
            Restored::Failed(_) => progress.record_file(0, true),
        },
    )?;

    let mut collector = ErrorCollector::new();
    let mut succeeded = Vec::new();
    for restored in results {
        match restored {
            Restored::Done(entry) => succeeded.push(entry),
            Restored::Failed(failure) => collector.record(failure),
        }
    }
    succeeded.sort_by(|a, b| a.path.cmp(&b.path));

    let report = RunReport::build(
        Operation::Extract,
        succeeded,
        collector.into_failures(),
        start.elapsed().as_secs_f64(),
    );
    tracing::info!(
        restored = report.succeeded.len(),
        failed = report.failures.len(),
        "extraction finished"
    );
    Ok(report)
}
