//! Progress tracking for archive creation and extraction.
//!
//! Counters are aggregated on the scheduler's collection side, so updates
//! never contend between workers. Rendering is the caller's business: the
//! core only delivers [`ProgressState`] snapshots through a callback.

use std::time::{Duration, Instant};

/// Snapshot of a run's progress, delivered to the progress callback.
#[derive(Debug, Clone)]
pub struct ProgressState {
    pub total_files: u64,
    pub processed_files: u64,
    pub total_bytes: u64,
    pub processed_bytes: u64,
    pub failed_files: u64,
    pub elapsed: Duration,
    pub speed_mbps: f32,
}

impl ProgressState {
    pub fn percent(&self) -> f32 {
        if self.total_bytes == 0 {
            if self.total_files == 0 {
                return 100.0;
            }
            return (self.processed_files as f32 / self.total_files as f32) * 100.0;
        }
        ((self.processed_bytes as f32 / self.total_bytes as f32) * 100.0).min(100.0)
    }
}

/// Progress callback function type.
pub type ProgressCallback = dyn Fn(ProgressState) + Send + Sync;

/// Accumulates per-file completions and emits snapshots to a callback.
pub struct ProgressTracker {
    total_files: u64,
    total_bytes: u64,
    processed_files: u64,
    processed_bytes: u64,
    failed_files: u64,
    start_time: Instant,
    callback: Option<Box<ProgressCallback>>,
}

impl ProgressTracker {
    pub fn new(total_files: u64, total_bytes: u64, callback: Option<Box<ProgressCallback>>) -> Self {
        Self {
            total_files,
            total_bytes,
            processed_files: 0,
            processed_bytes: 0,
            failed_files: 0,
            start_time: Instant::now(),
            callback,
        }
    }

    /// Record one finished file and emit a snapshot.
    pub fn record_file(&mut self, bytes: u64, failed: bool) {
        self.processed_files += 1;
        self.processed_bytes += bytes;
        if failed {
            self.failed_files += 1;
        }
        self.emit();
    }

    fn emit(&self) {
        if let Some(ref cb) = self.callback {
            cb(self.state());
        }
    }

    pub fn state(&self) -> ProgressState {
        let elapsed = self.start_time.elapsed();
        let speed_mbps = if elapsed.as_secs_f32() > 0.0 {
            (self.processed_bytes as f32 / (1024.0 * 1024.0)) / elapsed.as_secs_f32()
        } else {
            0.0
        };
        ProgressState {
            total_files: self.total_files,
            processed_files: self.processed_files,
            total_bytes: self.total_bytes,
            processed_bytes: self.processed_bytes,
            failed_files: self.failed_files,
            elapsed,
            speed_mbps,
        }
    }
}
