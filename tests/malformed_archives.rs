//! Tampered containers must be rejected before any output file is written,
//! and payload corruption must stay confined to the entry it hit.

use arcx::error::ArcxError;
use arcx::extract::{extract_archive, ExtractOptions};
use arcx::report::FailureKind;
use arcx::workers::{create_archive, CreateOptions};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::{tempdir, TempDir};

// Container layout constants mirrored here so tests can aim their tampering:
// [magic 4][version 2][entry count 4][manifest len 8][manifest][payload].
const VERSION_POS: usize = 4;
const COUNT_POS: usize = 6;
const MANIFEST_LEN_POS: usize = 10;
const HEADER_LEN: usize = 18;

/// Build a three-file container (a.txt, b.txt, c.txt) and return its bytes'
/// home. Deterministic so byte positions are stable.
fn build_archive() -> (TempDir, PathBuf) {
    let root = tempdir().unwrap();
    let src = root.path().join("src");
    fs::create_dir(&src).unwrap();
    fs::write(src.join("a.txt"), b"alpha alpha alpha alpha".repeat(8)).unwrap();
    fs::write(src.join("b.txt"), b"bravo bravo bravo bravo".repeat(8)).unwrap();
    fs::write(src.join("c.txt"), b"charlie charlie charlie".repeat(8)).unwrap();

    let arch_path = root.path().join("t.arcx");
    let report = create_archive(
        &src,
        &arch_path,
        &CreateOptions {
            deterministic: true,
            ..Default::default()
        },
    )
    .unwrap();
    assert!(report.is_full_success());
    (root, arch_path)
}

fn patch(path: &Path, pos: usize, bytes: &[u8]) {
    let mut data = fs::read(path).unwrap();
    data[pos..pos + bytes.len()].copy_from_slice(bytes);
    fs::write(path, data).unwrap();
}

/// Extraction must fail structurally and leave the output root untouched.
fn assert_rejected_before_write(arch_path: &Path) -> ArcxError {
    let out = tempdir().unwrap();
    let out_dir = out.path().join("restored");
    let err = extract_archive(arch_path, &out_dir, &ExtractOptions::default()).unwrap_err();
    assert!(
        !out_dir.exists(),
        "structural rejection must happen before any write"
    );
    err
}

/// Byte offset of the first manifest entry (path "a.txt" sorts first).
fn first_entry_pos() -> usize {
    let tool_len = concat!("arcx/", env!("CARGO_PKG_VERSION")).len();
    // created i64 + tool string + two u64 totals
    HEADER_LEN + 8 + 2 + tool_len + 8 + 8
}

#[test]
fn bad_magic_is_rejected() {
    let (_root, arch_path) = build_archive();
    patch(&arch_path, 0, b"NOPE");
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}

#[test]
fn unsupported_version_is_rejected() {
    let (_root, arch_path) = build_archive();
    patch(&arch_path, VERSION_POS, &99u16.to_le_bytes());
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Version { found: 99, .. }));
}

#[test]
fn lying_entry_count_is_rejected() {
    let (_root, arch_path) = build_archive();
    patch(&arch_path, COUNT_POS, &7u32.to_le_bytes());
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}

#[test]
fn manifest_longer_than_file_is_rejected() {
    let (_root, arch_path) = build_archive();
    patch(&arch_path, MANIFEST_LEN_POS, &u64::MAX.to_le_bytes());
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}

#[test]
fn truncated_payload_is_rejected() {
    let (_root, arch_path) = build_archive();
    let data = fs::read(&arch_path).unwrap();
    fs::write(&arch_path, &data[..data.len() - 1]).unwrap();
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}

#[test]
fn trailing_garbage_is_rejected() {
    let (_root, arch_path) = build_archive();
    let mut data = fs::read(&arch_path).unwrap();
    data.extend_from_slice(b"junk");
    fs::write(&arch_path, data).unwrap();
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}

#[test]
fn corrupted_offset_is_rejected() {
    let (_root, arch_path) = build_archive();
    // First entry: path(2+5) + category(1) + level(1) + sizes(8+8) + crc(4),
    // then the offset field.
    let offset_pos = first_entry_pos() + 2 + 5 + 1 + 1 + 8 + 8 + 4;
    patch(&arch_path, offset_pos, &9999u64.to_le_bytes());
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}

#[test]
fn tampered_checksum_fails_only_that_entry() {
    let (_root, arch_path) = build_archive();
    let crc_pos = first_entry_pos() + 2 + 5 + 1 + 1 + 8 + 8;
    patch(&arch_path, crc_pos, &0xDEADBEEFu32.to_le_bytes());

    let out = tempdir().unwrap();
    let report = extract_archive(&arch_path, out.path(), &ExtractOptions::default()).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "a.txt");
    assert_eq!(report.failures[0].kind, FailureKind::ChecksumMismatch);
    assert_eq!(report.succeeded.len(), 2);
    assert!(!out.path().join("a.txt").exists());
    assert!(out.path().join("b.txt").exists());
    assert!(out.path().join("c.txt").exists());
}

#[test]
fn flipped_payload_byte_fails_only_that_entry() {
    let (_root, arch_path) = build_archive();

    // Find b.txt's payload range through the public reader, then corrupt a
    // byte in the middle of it.
    let reader = arcx::archive::ArchiveReader::open(&arch_path).unwrap();
    let entry = reader
        .manifest
        .entries
        .iter()
        .find(|e| e.path == "b.txt")
        .unwrap();
    let pos = reader.block_offset(entry) + entry.length / 2;
    drop(reader);

    let mut data = fs::read(&arch_path).unwrap();
    data[pos as usize] ^= 0xFF;
    fs::write(&arch_path, data).unwrap();

    let out = tempdir().unwrap();
    let report = extract_archive(&arch_path, out.path(), &ExtractOptions { threads: 3 }).unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].path, "b.txt");
    assert!(matches!(
        report.failures[0].kind,
        FailureKind::Decompression | FailureKind::ChecksumMismatch
    ));
    assert_eq!(report.succeeded.len(), 2);
    assert!(out.path().join("a.txt").exists());
    assert!(!out.path().join("b.txt").exists());
    assert!(out.path().join("c.txt").exists());
}

#[test]
fn short_file_is_rejected() {
    let root = tempdir().unwrap();
    let arch_path = root.path().join("tiny.arcx");
    fs::write(&arch_path, b"ARCX").unwrap();
    let err = assert_rejected_before_write(&arch_path);
    assert!(matches!(err, ArcxError::Structure(_)));
}
