//! Property-based tests using proptest.
//!
//! These verify the ordering and determinism guarantees under randomized
//! inputs and worker counts, and that classification is a total, idempotent
//! function of the path.

use arcx::classify::classify;
use arcx::codec;
use arcx::extract::{extract_archive, ExtractOptions};
use arcx::workers::{create_archive, CreateOptions};
use proptest::prelude::*;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tempfile::tempdir;

/// Random small file sets: unique relative names (optionally nested one
/// level), arbitrary contents. Directory names never contain dots and file
/// names always do, so generated paths cannot collide.
fn file_set_strategy() -> impl Strategy<Value = HashMap<String, Vec<u8>>> {
    prop::collection::hash_map(
        "([a-z]{1,4}/)?[a-z][a-z0-9_]{0,8}\\.(png|ogg|glb|lua|bin|xyz)",
        prop::collection::vec(any::<u8>(), 0..512),
        1..8,
    )
}

fn materialize(root: &Path, files: &HashMap<String, Vec<u8>>) {
    for (rel, contents) in files {
        let path = root.join(rel);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).unwrap();
        }
        fs::write(path, contents).unwrap();
    }
}

proptest! {
    /// Same path in, same answer out, for any input.
    #[test]
    fn classification_is_total_and_idempotent(path in any::<String>()) {
        let first = classify(Path::new(&path));
        let second = classify(Path::new(&path));
        prop_assert_eq!(first, second);
        prop_assert!((codec::MIN_LEVEL..=codec::MAX_LEVEL).contains(&first.1));
    }
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(10))]

    /// One worker and many workers must produce byte-identical containers,
    /// and the container must round-trip every file exactly.
    #[test]
    fn container_is_deterministic_and_round_trips(
        files in file_set_strategy(),
        workers in 2usize..6,
    ) {
        let src = tempdir().unwrap();
        materialize(src.path(), &files);

        let arch_dir = tempdir().unwrap();
        let sequential = arch_dir.path().join("seq.arcx");
        let parallel = arch_dir.path().join("par.arcx");

        let base = CreateOptions { deterministic: true, ..Default::default() };
        let report = create_archive(
            src.path(),
            &sequential,
            &CreateOptions { threads: 1, ..base.clone() },
        )
        .unwrap();
        create_archive(
            src.path(),
            &parallel,
            &CreateOptions { threads: workers, ..base },
        )
        .unwrap();

        prop_assert!(report.is_full_success());
        prop_assert_eq!(fs::read(&sequential).unwrap(), fs::read(&parallel).unwrap());

        // Manifest order is sorted by path no matter what.
        let paths: Vec<&String> = report.succeeded.iter().map(|e| &e.path).collect();
        let mut sorted = paths.clone();
        sorted.sort();
        prop_assert_eq!(paths, sorted);

        let out = tempdir().unwrap();
        let restored = extract_archive(
            &parallel,
            out.path(),
            &ExtractOptions { threads: workers },
        )
        .unwrap();
        prop_assert!(restored.is_full_success());
        prop_assert_eq!(restored.succeeded.len(), files.len());
        for (rel, contents) in &files {
            prop_assert_eq!(&fs::read(out.path().join(rel)).unwrap(), contents);
        }
    }
}
