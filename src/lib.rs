//! # arcx Core Library
//!
//! This crate provides the core functionality for the `arcx` game-asset
//! archiver: it packs a directory tree into a single `.arcx` container with
//! per-category compression policy, and restores the tree bit-for-bit.
//!
//! It is designed to be used by the `arcx` command-line application, but the
//! public API can also be used to programmatically create, inspect, and
//! extract containers.
//!
//! ## Key Modules
//!
//! - [`classify`]: Maps file extensions to asset categories and default
//!   compression levels.
//! - [`scan`]: Walks a source tree into file descriptors.
//! - [`codec`]: Thin adapter over the `zstd` primitive.
//! - [`archive`]: The `.arcx` container format: manifest encoding,
//!   validation, payload layout.
//! - [`workers`]: The bounded worker pool and the archive-creation pipeline.
//! - [`extract`]: Parallel extraction with per-entry integrity checks.
//! - [`report`]: Per-file outcomes, error collection, and run reports.
//! - [`progress`]: Progress snapshots for long-running operations.
//!
//! ## Example
//!
//! ```no_run
//! use arcx::workers::{create_archive, CreateOptions};
//! use arcx::extract::{extract_archive, ExtractOptions};
//! use std::path::Path;
//!
//! let report = create_archive(
//!     Path::new("assets/"),
//!     Path::new("assets.arcx"),
//!     &CreateOptions::default(),
//! )?;
//! assert!(report.is_full_success());
//!
//! extract_archive(
//!     Path::new("assets.arcx"),
//!     Path::new("restored/"),
//!     &ExtractOptions::default(),
//! )?;
//! # Ok::<(), arcx::ArcxError>(())
//! ```

pub mod archive;
pub mod classify;
pub mod cli;
pub mod codec;
pub mod error;
pub use error::ArcxError;

pub mod workers;

pub mod extract;
pub mod progress;
pub mod report;
pub mod scan;
