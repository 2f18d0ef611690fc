//! Property-based tests for attachment deltas.
//!
//! Applying a delta to the initial list must give the current list, under
//! file identity (name and size), whatever the order of either list.

use blogdesk_sync::compute_delta;
use blogdesk_types::{FileEntry, FileKey, RemoteFile};
use proptest::prelude::*;
use std::collections::BTreeSet;

fn file_strategy() -> impl Strategy<Value = FileEntry> {
    (prop::sample::select(vec!["a.txt", "b.png", "c.pdf", "d.doc"]), 1u64..4).prop_map(
        |(name, size)| {
            FileEntry::Remote(RemoteFile {
                filename: name.to_string(),
                filepath: "/".to_string(),
                filesize: size,
                fileurl: String::new(),
                timemodified: 0,
                mimetype: None,
            })
        },
    )
}

fn files_strategy() -> impl Strategy<Value = Vec<FileEntry>> {
    prop::collection::vec(file_strategy(), 0..8)
}

fn keys(files: &[FileEntry]) -> BTreeSet<FileKey> {
    files.iter().map(FileEntry::key).collect()
}

proptest! {
    #[test]
    fn applying_delta_yields_current(initial in files_strategy(), current in files_strategy()) {
        let delta = compute_delta(&initial, &current);

        let mut result = keys(&initial);
        for removed in &delta.to_remove {
            result.remove(&removed.key());
        }
        for added in &delta.to_add {
            result.insert(added.key());
        }

        prop_assert_eq!(result, keys(&current));
    }

    #[test]
    fn additions_and_removals_are_disjoint(initial in files_strategy(), current in files_strategy()) {
        let delta = compute_delta(&initial, &current);
        let added = keys(&delta.to_add);
        let removed = keys(&delta.to_remove);

        prop_assert!(added.is_disjoint(&removed));
        prop_assert!(added.is_disjoint(&keys(&initial)));
        prop_assert!(removed.is_subset(&keys(&initial)));
        prop_assert_eq!(added.len(), delta.to_add.len());
    }

    #[test]
    fn delta_ignores_input_order(initial in files_strategy(), current in files_strategy()) {
        let mut reversed_initial = initial.clone();
        reversed_initial.reverse();
        let mut reversed_current = current.clone();
        reversed_current.reverse();

        let a = compute_delta(&initial, &current);
        let b = compute_delta(&reversed_initial, &reversed_current);

        prop_assert_eq!(keys(&a.to_add), keys(&b.to_add));
        prop_assert_eq!(keys(&a.to_remove), keys(&b.to_remove));
    }

    #[test]
    fn delta_against_itself_is_empty(files in files_strategy()) {
        prop_assert!(compute_delta(&files, &files).is_empty());
    }
}
