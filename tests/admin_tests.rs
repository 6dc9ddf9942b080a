//! Tests for table and column-family administration
//!
//! These tests verify:
//! - Table create/delete/list lifecycle and name reuse
//! - Column family create/update/delete contracts
//! - Structural validation before any state is touched
//! - Namespace isolation between (project, instance) pairs
//! - DropRowRange semantics

use tabletkv::mutation::Mutation;
use tabletkv::read::RowSet;
use tabletkv::store::GcRule;
use tabletkv::{Emulator, InstanceKey, TabletError};

// =============================================================================
// Helper Functions
// =============================================================================

fn ns() -> InstanceKey {
    InstanceKey::new("proj", "instance").unwrap()
}

fn set_cell(family: &str, qualifier: &str, ts: i64, value: &str) -> Mutation {
    Mutation::SetCell {
        family: family.to_string(),
        qualifier: qualifier.as_bytes().to_vec(),
        timestamp_micros: ts,
        value: value.as_bytes().to_vec(),
    }
}

fn row_keys(emulator: &Emulator, table: &str) -> Vec<Vec<u8>> {
    emulator
        .read_rows(&ns(), table, &RowSet::all(), None, 0)
        .unwrap()
        .map(|row| row.key.to_vec())
        .collect()
}

// =============================================================================
// Table lifecycle
// =============================================================================

#[test]
fn test_create_table_twice_is_already_exists() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();

    let err = emulator.create_table(&ns(), "users").unwrap_err();
    assert!(matches!(err, TabletError::AlreadyExists(_)));
}

#[test]
fn test_table_names_are_case_sensitive() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator.create_table(&ns(), "Users").unwrap();

    assert_eq!(emulator.list_tables(&ns()), vec!["Users", "users"]);
}

#[test]
fn test_delete_absent_table_is_not_found() {
    let emulator = Emulator::new();
    let err = emulator.delete_table(&ns(), "users").unwrap_err();
    assert!(matches!(err, TabletError::NotFound(_)));
}

#[test]
fn test_table_name_reusable_after_delete() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();
    emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "name", 1, "alice")])
        .unwrap();

    emulator.delete_table(&ns(), "users").unwrap();
    emulator.create_table(&ns(), "users").unwrap();

    // The fresh table starts empty: no families, no rows.
    let err = emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "name", 1, "alice")])
        .unwrap_err();
    assert!(matches!(err, TabletError::InvalidArgument(_)));
    assert!(row_keys(&emulator, "users").is_empty());
}

#[test]
fn test_list_tables_is_sorted() {
    let emulator = Emulator::new();
    for name in ["zebra", "alpha", "midway"] {
        emulator.create_table(&ns(), name).unwrap();
    }
    assert_eq!(
        emulator.list_tables(&ns()),
        vec!["alpha", "midway", "zebra"]
    );
}

#[test]
fn test_data_operations_fail_fast_on_unknown_table() {
    let emulator = Emulator::new();

    let err = emulator
        .apply(&ns(), "nope", b"row-1", &[set_cell("f", "q", 1, "v")])
        .unwrap_err();
    assert!(matches!(err, TabletError::NotFound(_)));

    let err = emulator
        .read_rows(&ns(), "nope", &RowSet::all(), None, 0)
        .map(|_| ())
        .unwrap_err();
    assert!(matches!(err, TabletError::NotFound(_)));

    let err = emulator.sample_row_keys(&ns(), "nope").unwrap_err();
    assert!(matches!(err, TabletError::NotFound(_)));
}

#[test]
fn test_empty_table_name_is_invalid_argument() {
    let emulator = Emulator::new();
    let err = emulator.create_table(&ns(), "").unwrap_err();
    assert!(matches!(err, TabletError::InvalidArgument(_)));
}

// =============================================================================
// Column families
// =============================================================================

#[test]
fn test_create_family_twice_is_already_exists() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();

    let err = emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap_err();
    assert!(matches!(err, TabletError::AlreadyExists(_)));
}

#[test]
fn test_update_absent_family_is_not_found() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();

    let err = emulator
        .update_column_family(&ns(), "users", "profile", GcRule::max_versions(1))
        .unwrap_err();
    assert!(matches!(err, TabletError::NotFound(_)));
}

#[test]
fn test_delete_family_twice_is_not_found_and_state_unchanged() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();
    emulator
        .create_column_family(&ns(), "users", "audit", GcRule::default())
        .unwrap();
    emulator
        .apply(
            &ns(),
            "users",
            b"row-1",
            &[
                set_cell("profile", "name", 1, "alice"),
                set_cell("audit", "login", 1, "t1"),
            ],
        )
        .unwrap();

    emulator.delete_column_family(&ns(), "users", "profile").unwrap();
    let after_first: Vec<_> = emulator
        .read_rows(&ns(), "users", &RowSet::all(), None, 0)
        .unwrap()
        .collect();

    let err = emulator
        .delete_column_family(&ns(), "users", "profile")
        .unwrap_err();
    assert!(matches!(err, TabletError::NotFound(_)));

    let after_second: Vec<_> = emulator
        .read_rows(&ns(), "users", &RowSet::all(), None, 0)
        .unwrap()
        .collect();
    assert_eq!(after_first, after_second);
    // The surviving family is untouched.
    assert_eq!(after_second.len(), 1);
    assert!(after_second[0].families.contains_key("audit"));
    assert!(!after_second[0].families.contains_key("profile"));
}

#[test]
fn test_deleted_family_data_is_gone() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();
    emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "name", 1, "alice")])
        .unwrap();

    emulator.delete_column_family(&ns(), "users", "profile").unwrap();

    // The only cell lived in the deleted family, so the row is gone too.
    assert!(row_keys(&emulator, "users").is_empty());

    // Re-creating the family starts from scratch.
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();
    assert!(row_keys(&emulator, "users").is_empty());
}

#[test]
fn test_malformed_family_name_is_invalid_argument() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();

    for bad in ["", "has space", "emoji✨", "semi;colon"] {
        let err = emulator
            .create_column_family(&ns(), "users", bad, GcRule::default())
            .unwrap_err();
        assert!(
            matches!(err, TabletError::InvalidArgument(_)),
            "family name {:?} should be rejected",
            bad
        );
    }
}

// =============================================================================
// DropRowRange
// =============================================================================

#[test]
fn test_drop_row_range_all() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();
    for key in [b"a".as_slice(), b"b", b"c"] {
        emulator
            .apply(&ns(), "users", key, &[set_cell("profile", "q", 1, "v")])
            .unwrap();
    }

    emulator.drop_row_range(&ns(), "users", None).unwrap();
    assert!(row_keys(&emulator, "users").is_empty());
}

#[test]
fn test_drop_row_range_by_prefix() {
    let emulator = Emulator::new();
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", GcRule::default())
        .unwrap();
    for key in [b"us-east/1".as_slice(), b"us-east/2", b"us-west/1", b"eu/1"] {
        emulator
            .apply(&ns(), "users", key, &[set_cell("profile", "q", 1, "v")])
            .unwrap();
    }

    emulator
        .drop_row_range(&ns(), "users", Some(b"us-east/"))
        .unwrap();
    assert_eq!(
        row_keys(&emulator, "users"),
        vec![b"eu/1".to_vec(), b"us-west/1".to_vec()]
    );
}

// =============================================================================
// Namespaces
// =============================================================================

#[test]
fn test_namespaces_are_isolated() {
    let emulator = Emulator::new();
    let a = InstanceKey::new("proj", "alpha").unwrap();
    let b = InstanceKey::new("proj", "beta").unwrap();

    emulator.create_table(&a, "users").unwrap();
    assert!(emulator.list_tables(&b).is_empty());

    // Same table name is independent per namespace.
    emulator.create_table(&b, "users").unwrap();
    emulator.delete_table(&a, "users").unwrap();
    assert_eq!(emulator.list_tables(&b), vec!["users"]);
}

#[test]
fn test_namespace_parts_must_be_non_empty() {
    assert!(matches!(
        InstanceKey::new("", "instance"),
        Err(TabletError::InvalidArgument(_))
    ));
    assert!(matches!(
        InstanceKey::new("proj", ""),
        Err(TabletError::InvalidArgument(_))
    ));
}
