//! Tests for garbage-collection rules
//!
//! These tests verify:
//! - max-versions pruning after mutations
//! - max-age enforcement against the injected clock
//! - read-side rule enforcement when physical pruning is deferred
//! - rule replacement via UpdateColumnFamily

use std::sync::Arc;

use tabletkv::clock::FixedClock;
use tabletkv::mutation::Mutation;
use tabletkv::read::RowSet;
use tabletkv::store::{GcRule, RowSnapshot};
use tabletkv::{Emulator, InstanceKey};

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

fn setup(rule: GcRule) -> (Arc<FixedClock>, Emulator) {
    let clock = Arc::new(FixedClock::new(1_000_000));
    let emulator = Emulator::with_clock(clock.clone());
    emulator.create_table(&ns(), "users").unwrap();
    emulator
        .create_column_family(&ns(), "users", "profile", rule)
        .unwrap();
    (clock, emulator)
}

fn read_row(emulator: &Emulator, key: &[u8]) -> Option<RowSnapshot> {
    emulator
        .read_rows(&ns(), "users", &RowSet::single(key), None, 0)
        .unwrap()
        .next()
}

fn timestamps(row: &RowSnapshot, qualifier: &[u8]) -> Vec<i64> {
    row.families["profile"][qualifier]
        .iter()
        .map(|c| c.timestamp_micros)
        .collect()
}

// =============================================================================
// Tests
// =============================================================================

#[test]
fn test_max_versions_one_keeps_only_latest() {
    let (_clock, emulator) = setup(GcRule::max_versions(1));
    for ts in [10, 20, 30] {
        emulator
            .apply(
                &ns(),
                "users",
                b"row-1",
                &[set_cell("profile", "q", ts, &format!("v{}", ts))],
            )
            .unwrap();
    }

    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![30]);
}

#[test]
fn test_max_versions_prunes_per_qualifier() {
    let (_clock, emulator) = setup(GcRule::max_versions(2));
    for ts in [10, 20, 30] {
        emulator
            .apply(
                &ns(),
                "users",
                b"row-1",
                &[
                    set_cell("profile", "a", ts, "v"),
                    set_cell("profile", "b", ts, "v"),
                ],
            )
            .unwrap();
    }

    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"a"), vec![30, 20]);
    assert_eq!(timestamps(&row, b"b"), vec![30, 20]);
}

#[test]
fn test_max_age_hides_expired_versions_without_a_mutation() {
    let (clock, emulator) = setup(GcRule::max_age_micros(500_000));
    emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "q", 900_000, "v")])
        .unwrap();

    assert!(read_row(&emulator, b"row-1").is_some());

    // Let the cell expire. No further mutation runs, so physical pruning
    // is deferred, but the read must still respect the rule.
    clock.advance_micros(600_000);
    assert!(read_row(&emulator, b"row-1").is_none());
}

#[test]
fn test_max_age_prunes_on_next_mutation() {
    let (clock, emulator) = setup(GcRule::max_age_micros(500_000));
    emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "q", 900_000, "old")])
        .unwrap();

    clock.advance_micros(600_000);
    emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "q", 1_500_000, "new")])
        .unwrap();

    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![1_500_000]);
}

#[test]
fn test_both_limits_apply_together() {
    let (clock, emulator) = setup(GcRule {
        max_versions: Some(3),
        max_age_micros: Some(400_000),
    });
    for ts in [700_000, 800_000, 900_000, 950_000] {
        emulator
            .apply(&ns(), "users", b"row-1", &[set_cell("profile", "q", ts, "v")])
            .unwrap();
    }

    // max_versions already trimmed to the newest three.
    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![950_000, 900_000, 800_000]);

    // Age now catches the oldest survivor on the read path.
    clock.advance_micros(250_000); // now = 1_250_000, cutoff = 850_000
    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![950_000, 900_000]);
}

#[test]
fn test_update_family_replaces_the_rule() {
    let (_clock, emulator) = setup(GcRule::default());
    for ts in [10, 20, 30] {
        emulator
            .apply(&ns(), "users", b"row-1", &[set_cell("profile", "q", ts, "v")])
            .unwrap();
    }

    emulator
        .update_column_family(&ns(), "users", "profile", GcRule::max_versions(1))
        .unwrap();

    // Tightened rule applies to reads immediately, pruning lazily later.
    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![30]);

    // The next mutation physically prunes under the new rule.
    emulator
        .apply(&ns(), "users", b"row-1", &[set_cell("profile", "q", 40, "v")])
        .unwrap();
    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![40]);
}

#[test]
fn test_unrelated_family_is_not_pruned() {
    let (_clock, emulator) = setup(GcRule::max_versions(1));
    emulator
        .create_column_family(&ns(), "users", "audit", GcRule::default())
        .unwrap();
    for ts in [10, 20, 30] {
        emulator
            .apply(
                &ns(),
                "users",
                b"row-1",
                &[
                    set_cell("profile", "q", ts, "v"),
                    set_cell("audit", "q", ts, "v"),
                ],
            )
            .unwrap();
    }

    let row = read_row(&emulator, b"row-1").unwrap();
    assert_eq!(timestamps(&row, b"q"), vec![30]);
    let audit: Vec<i64> = row.families["audit"][b"q".as_slice()]
        .iter()
        .map(|c| c.timestamp_micros)
        .collect();
    assert_eq!(audit, vec![30, 20, 10]);
}
