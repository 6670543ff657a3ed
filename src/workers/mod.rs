//! # Compression Scheduler
//!
//! Fans "compress one file" tasks out across a bounded pool of worker
//! threads and fans the outcomes back in over a single channel. Each worker
//! owns its read buffer and codec context; the only shared resource is the
//! outcome channel, consumed by the thread that called [`create_archive`].
//!
//! Failure isolation: anything that goes wrong with a single file is caught
//! at the task boundary and becomes a [`Failure`] outcome; sibling tasks
//! never notice. Only fatal conditions (unwritable destination, a panicking
//! worker) abort the run, draining the in-flight queue without doing the
//! remaining work.
//!
//! Because all outcomes are collected and then sorted by relative path before
//! the container is written, output bytes are identical whether the pool ran
//! one worker or sixteen.

use std::fs;
use std::panic;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::Instant;

use crossbeam_channel::bounded;

use crate::archive::{self, CompressedFile};
use crate::classify::FileCategory;
use crate::codec;
use crate::error::ArcxError;
use crate::progress::{ProgressCallback, ProgressTracker};
use crate::report::{
    EntrySummary, ErrorCollector, Failure, FailureKind, Operation, RunReport,
};
use crate::scan::{scan, FileDescriptor};

/// Holds all configuration options for an archive-creation run.
#[derive(Debug, Clone, Default)]
pub struct CreateOptions {
    /// Number of worker threads. [0 = auto-detect from available cores]
    pub threads: usize,
    /// When set, this level applies uniformly to every category.
    pub level_override: Option<i32>,
    /// Per-category level overrides; weaker than `level_override`, stronger
    /// than the built-in category defaults.
    pub category_levels: Vec<(FileCategory, i32)>,
    /// When true, zero the manifest creation timestamp so equal inputs yield
    /// byte-identical containers across runs.
    pub deterministic: bool,
}

impl CreateOptions {
    /// Resolve the level for a category: explicit override, then the
    /// category table, then the category default.
    pub fn effective_level(&self, category: FileCategory) -> i32 {
        if let Some(level) = self.level_override {
            return level;
        }
        self.category_levels
            .iter()
            .find(|(cat, _)| *cat == category)
            .map(|(_, level)| *level)
            .unwrap_or_else(|| category.default_level())
    }

    /// Reject out-of-range levels before any work starts.
    pub fn validate(&self) -> Result<(), ArcxError> {
        if let Some(level) = self.level_override {
            codec::validate_level(level)?;
        }
        for (_, level) in &self.category_levels {
            codec::validate_level(*level)?;
        }
        Ok(())
    }
}

/// Run `task` over `items` on a bounded pool of `threads` workers.
///
/// Tasks report per-item trouble inside their `R`; an `Err` from a task is a
/// fatal condition that flips the abort flag, drains the queue, and becomes
/// the pool's return value. Panics are caught at the task boundary and
/// treated as fatal. `observe` runs on the collecting thread once per
/// completed item, in completion order.
pub(crate) fn run_pool<T, R, F>(
    items: Vec<T>,
    threads: usize,
    task: F,
    mut observe: impl FnMut(&R),
) -> Result<Vec<R>, ArcxError>
where
    T: Send,
    R: Send,
    F: Fn(T) -> Result<R, ArcxError> + Sync,
{
    let threads = if threads == 0 { num_cpus::get() } else { threads }.max(1);
    let abort = AtomicBool::new(false);
    let (task_tx, task_rx) = bounded::<T>(threads);
    let (out_tx, out_rx) = bounded::<Result<R, ArcxError>>(threads);

    thread::scope(|s| {
        for _ in 0..threads {
            let task_rx = task_rx.clone();
            let out_tx = out_tx.clone();
            let task = &task;
            let abort = &abort;
            s.spawn(move || {
                for item in task_rx {
                    // After a fatal condition the queue is drained, not worked.
                    if abort.load(Ordering::Relaxed) {
                        continue;
                    }
                    let outcome =
                        match panic::catch_unwind(panic::AssertUnwindSafe(|| task(item))) {
                            Ok(res) => res,
                            Err(_) => Err(ArcxError::WorkerPanicked),
                        };
                    if outcome.is_err() {
                        abort.store(true, Ordering::Relaxed);
                    }
                    if out_tx.send(outcome).is_err() {
                        break;
                    }
                }
            });
        }
        drop(task_rx);
        drop(out_tx);

        {
            let abort = &abort;
            s.spawn(move || {
                for item in items {
                    if abort.load(Ordering::Relaxed) {
                        break;
                    }
                    if task_tx.send(item).is_err() {
                        break;
                    }
                }
            });
        }

        let mut results = Vec::new();
        let mut fatal: Option<ArcxError> = None;
        for outcome in out_rx {
            match outcome {
                Ok(r) => {
                    observe(&r);
                    results.push(r);
                }
                Err(e) => {
                    if fatal.is_none() {
                        fatal = Some(e);
                    }
                }
            }
        }
        match fatal {
            None => Ok(results),
            Some(e) => Err(e),
        }
    })
}

enum Packed {
    Done(CompressedFile),
    Failed(Failure),
}

/// Process one descriptor fully: read, compress at the effective level,
/// checksum. Every error becomes a `Failure` outcome; nothing unwinds.
fn compress_one(item: Result<FileDescriptor, Failure>, options: &CreateOptions) -> Packed {
    let desc = match item {
        Ok(d) => d,
        Err(failure) => return Packed::Failed(failure),
    };
    let data = match fs::read(&desc.source_path) {
        Ok(d) => d,
        Err(e) => return Packed::Failed(Failure::new(desc.path, FailureKind::Scan, e)),
    };
    let checksum = crc32fast::hash(&data);
    let level = options.effective_level(desc.category);
    match codec::compress(&data, level) {
        Ok(blob) => Packed::Done(CompressedFile {
            path: desc.path,
            category: desc.category,
            level,
            original_size: data.len() as u64,
            checksum,
            data: blob,
        }),
        Err(e) => Packed::Failed(Failure::new(desc.path, FailureKind::Compression, e)),
    }
}

/// Archive `source_root` into the container at `output_path`.
pub fn create_archive(
    source_root: &Path,
    output_path: &Path,
    options: &CreateOptions,
) -> Result<RunReport, ArcxError> {
    create_archive_with_progress(source_root, output_path, options, None)
}

/// [`create_archive`] with an optional progress callback.
pub fn create_archive_with_progress(
    source_root: &Path,
    output_path: &Path,
    options: &CreateOptions,
    progress_cb: Option<Box<ProgressCallback>>,
) -> Result<RunReport, ArcxError> {
    let start = Instant::now();
    options.validate()?;
    if !source_root.is_dir() {
        return Err(ArcxError::Io {
            source: std::io::Error::new(
                std::io::ErrorKind::NotFound,
                "source root is not a directory",
            ),
            path: source_root.to_path_buf(),
        });
    }

    let scanned: Vec<Result<FileDescriptor, Failure>> = scan(source_root).collect();
    let total_files = scanned.len() as u64;
    let total_bytes: u64 = scanned
        .iter()
        .filter_map(|r| r.as_ref().ok())
        .map(|d| d.size)
        .sum();
    tracing::info!(
        files = total_files,
        bytes = total_bytes,
        threads = options.threads,
        "compressing {} into {}",
        source_root.display(),
        output_path.display()
    );

    let mut progress = ProgressTracker::new(total_files, total_bytes, progress_cb);
    let results = run_pool(
        scanned,
        options.threads,
        |item| Ok(compress_one(item, options)),
        |packed: &Packed| match packed {
            Packed::Done(file) => progress.record_file(file.original_size, false),
            Packed::Failed(_) => progress.record_file(0, true),
        },
    )?;

    let mut collector = ErrorCollector::new();
    let mut files = Vec::new();
    for packed in results {
        match packed {
            Packed::Done(file) => files.push(file),
            Packed::Failed(failure) => collector.record(failure),
        }
    }

    let created = if options.deterministic {
        0
    } else {
        chrono::Utc::now().timestamp()
    };
    let manifest = archive::write_container(output_path, files, created)?;

    let succeeded = manifest
        .entries
        .iter()
        .map(|entry| EntrySummary {
            path: entry.path.clone(),
            category: entry.category,
            level: entry.level,
            original_size: entry.original_size,
            compressed_size: entry.compressed_size,
        })
        .collect();
    let report = RunReport::build(
        Operation::Create,
        succeeded,
        collector.into_failures(),
        start.elapsed().as_secs_f64(),
    );
    tracing::info!(
        archived = report.succeeded.len(),
        failed = report.failures.len(),
        ratio = report.ratio(),
        "archive written to {}",
        output_path.display()
    );
    Ok(report)
}
