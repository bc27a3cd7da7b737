//! Property-based tests for record resolution and layout.
//!
//! These tests use proptest to generate identifiers and records and check
//! that the invariants hold for all of them.

#[cfg(test)]
mod proptest_tests {
    use crate::layout::target_path;
    use crate::record::{resolve_endpoint, resolve_identifier, RepositoryIdentifier};
    use proptest::prelude::*;
    use serde_json::{json, Map, Value};
    use std::path::{Component, Path};

    /// A single well-formed path segment.
    fn segment() -> impl Strategy<Value = String> {
        "[a-zA-Z0-9_][a-zA-Z0-9_.-]{0,12}".prop_filter("no dot segments", |s| s != "." && s != "..")
    }

    fn identifier() -> impl Strategy<Value = String> {
        prop::collection::vec(segment(), 1..5).prop_map(|segments| segments.join("/"))
    }

    // ============================================================================
    // Identifier validation
    // ============================================================================

    proptest! {
        /// Property: any accepted identifier stays inside the backup root
        #[test]
        fn accepted_identifiers_never_escape_root(raw in ".{0,40}", bare in any::<bool>()) {
            if let Ok(id) = RepositoryIdentifier::parse(&raw) {
                let root = Path::new("/backup/root");
                let target = target_path(&id, root, bare);
                prop_assert!(target.starts_with(root));
                prop_assert!(target
                    .strip_prefix(root)
                    .unwrap()
                    .components()
                    .all(|c| matches!(c, Component::Normal(_))));
            }
        }

        /// Property: well-formed identifiers are accepted unchanged
        #[test]
        fn well_formed_identifiers_round_trip(raw in identifier()) {
            let id = RepositoryIdentifier::parse(&raw).unwrap();
            prop_assert_eq!(id.as_str(), raw.as_str());
        }

        /// Property: inserting a `..` segment anywhere is rejected
        #[test]
        fn parent_segments_are_rejected(
            segments in prop::collection::vec(segment(), 0..4),
            at in 0usize..4,
        ) {
            let mut segments = segments;
            let at = at.min(segments.len());
            segments.insert(at, "..".to_string());
            prop_assert!(RepositoryIdentifier::parse(&segments.join("/")).is_err());
        }

        /// Property: absolute paths are rejected
        #[test]
        fn absolute_paths_are_rejected(raw in identifier()) {
            let absolute = format!("/{}", raw);
            prop_assert!(RepositoryIdentifier::parse(&absolute).is_err());
        }
    }

    // ============================================================================
    // Resolution priority
    // ============================================================================

    proptest! {
        /// Property: path_with_namespace wins regardless of the other keys
        #[test]
        fn path_with_namespace_always_wins(
            full in identifier(),
            path in proptest::option::of(identifier()),
            name in proptest::option::of(identifier()),
        ) {
            let mut record = Map::new();
            record.insert("path_with_namespace".into(), Value::String(full.clone()));
            if let Some(path) = path {
                record.insert("path".into(), Value::String(path));
            }
            if let Some(name) = name {
                record.insert("name".into(), Value::String(name));
            }
            let resolved = resolve_identifier(&record).unwrap();
            prop_assert_eq!(resolved.as_str(), full.as_str());
        }

        /// Property: clone_url wins over ssh_url_to_repo when both are set
        #[test]
        fn clone_url_always_wins(clone in "[a-z]{1,10}", ssh in "[a-z]{1,10}") {
            let record = json!({"clone_url": clone.clone(), "ssh_url_to_repo": ssh});
            let record = record.as_object().unwrap();
            let endpoint = resolve_endpoint(record).unwrap();
            prop_assert_eq!(endpoint.as_str(), clone.as_str());
        }
    }
}
