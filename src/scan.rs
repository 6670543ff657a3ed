//! # Directory Scanner
//!
//! Walks a source tree and produces the file descriptors a run operates on.
//! The walk is lazy and finite; every call to [`scan`] starts from scratch.
//! Directories are traversed but never emitted, symlinks are followed, and
//! zero-byte files count like any other file. A file that vanishes between
//! discovery and its size query becomes a per-file [`Failure`]; the scan
//! itself never aborts.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use walkdir::WalkDir;

use crate::classify::{classify, FileCategory};
use crate::report::{CategoryStats, Failure, FailureKind};

/// Everything the scheduler needs to know about one file to archive.
///
/// `path` is the relative archive path computed from the scan root, with
/// forward slashes on every platform. It is the identity key inside a
/// container: duplicates are a hard error at manifest-build time.
#[derive(Clone, Debug)]
pub struct FileDescriptor {
    pub source_path: PathBuf,
    pub path: String,
    pub size: u64,
    pub category: FileCategory,
}

/// Relative path with forward slashes, `./` prefix dropped.
pub(crate) fn normalize_rel_path(path: &Path, root: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    let s = rel.to_string_lossy().replace('\\', "/");
    s.strip_prefix("./").unwrap_or(&s).to_string()
}

/// Lazily walk `root`, yielding one descriptor (or one failure) per file.
pub fn scan(root: &Path) -> impl Iterator<Item = Result<FileDescriptor, Failure>> {
    let root = root.to_path_buf();
    WalkDir::new(root.clone())
        .follow_links(true)
        .into_iter()
        .filter_map(move |entry| {
            let entry = match entry {
                Ok(e) => e,
                Err(err) => {
                    let path = err
                        .path()
                        .map(|p| normalize_rel_path(p, &root))
                        .unwrap_or_default();
                    return Some(Err(Failure::new(path, FailureKind::Scan, &err)));
                }
            };
            if entry.file_type().is_dir() {
                return None;
            }
            let rel = normalize_rel_path(entry.path(), &root);
            // Size query races with external mutation; fail the descriptor,
            // not the walk.
            match entry.metadata() {
                Ok(md) => {
                    let (category, _) = classify(entry.path());
                    Some(Ok(FileDescriptor {
                        source_path: entry.path().to_path_buf(),
                        path: rel,
                        size: md.len(),
                        category,
                    }))
                }
                Err(err) => Some(Err(Failure::new(rel, FailureKind::Scan, err))),
            }
        })
}

/// Result of a scan-only run: what is in the tree, by category, before any
/// compression happens.
#[derive(Serialize, Clone, Debug, Default)]
pub struct ScanStats {
    pub files: u64,
    pub total_bytes: u64,
    pub categories: BTreeMap<String, CategoryStats>,
    pub failures: Vec<Failure>,
}

/// Walk `root` and tally per-category file counts and byte totals.
pub fn scan_stats(root: &Path) -> ScanStats {
    let mut stats = ScanStats::default();
    for item in scan(root) {
        match item {
            Ok(desc) => {
                stats.files += 1;
                stats.total_bytes += desc.size;
                let slot = stats
                    .categories
                    .entry(desc.category.as_str().to_string())
                    .or_default();
                slot.files += 1;
                slot.original_bytes += desc.size;
            }
            Err(failure) => stats.failures.push(failure),
        }
    }
    stats
}
