//! Cell store
//!
//! Per-row, per-family, per-qualifier multi-version values. Leaf data
//! structure of the store; no locking here, callers serialize access.

use std::collections::BTreeMap;
use std::ops::Bound;

use bytes::Bytes;

use super::gc::GcRule;

/// One version of a column: (timestamp, value).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cell {
    /// Microseconds since the Unix epoch
    pub timestamp_micros: i64,
    pub value: Bytes,
}

/// All versions of a single (family, qualifier) coordinate.
///
/// Versions are keyed by timestamp; (family, qualifier, timestamp) is
/// unique per row, so a write at an existing timestamp overwrites the
/// value rather than adding a duplicate version.
#[derive(Debug, Clone, Default)]
pub struct ColumnVersions {
    /// Ascending by timestamp; read paths iterate in reverse for
    /// newest-first order.
    versions: BTreeMap<i64, Bytes>,
}

impl ColumnVersions {
    /// Insert or overwrite the version at `timestamp_micros`.
    pub fn set(&mut self, timestamp_micros: i64, value: Bytes) {
        self.versions.insert(timestamp_micros, value);
    }

    /// Remove every version whose timestamp falls in `[start, end)`.
    /// An unbounded range on both sides deletes all versions.
    pub fn delete_range(&mut self, start_micros: Option<i64>, end_micros: Option<i64>) {
        match (start_micros, end_micros) {
            (None, None) => self.versions.clear(),
            _ => {
                let lo = start_micros.map_or(Bound::Unbounded, Bound::Included);
                let hi = end_micros.map_or(Bound::Unbounded, Bound::Excluded);
                let doomed: Vec<i64> = self.versions.range((lo, hi)).map(|(ts, _)| *ts).collect();
                for ts in doomed {
                    self.versions.remove(&ts);
                }
            }
        }
    }

    /// Newest-first projection of up to `limit` versions (None = all).
    pub fn cells(&self, limit: Option<usize>) -> Vec<Cell> {
        let take = limit.unwrap_or(usize::MAX);
        self.versions
            .iter()
            .rev()
            .take(take)
            .map(|(&timestamp_micros, value)| Cell {
                timestamp_micros,
                value: value.clone(),
            })
            .collect()
    }

    /// Drop versions the GC rule no longer retains: everything beyond the
    /// most recent `max_versions`, and everything older than
    /// `now − max_age`. Returns the number of versions dropped.
    pub fn prune(&mut self, rule: &GcRule, now_micros: i64) -> usize {
        let before = self.versions.len();
        if let Some(max_versions) = rule.max_versions {
            while self.versions.len() > max_versions as usize {
                self.versions.pop_first();
            }
        }
        if let Some(max_age) = rule.max_age_micros {
            let cutoff = now_micros.saturating_sub(max_age);
            self.versions.retain(|&ts, _| ts >= cutoff);
        }
        before - self.versions.len()
    }

    pub fn len(&self) -> usize {
        self.versions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.versions.is_empty()
    }

    /// Approximate heap footprint, used for sample-row-key offsets.
    pub fn approx_size(&self) -> usize {
        self.versions
            .iter()
            .map(|(_, v)| std::mem::size_of::<i64>() + v.len())
            .sum()
    }
}

/// One row: family name → qualifier → versions.
///
/// Invariant (enforced by the mutation engine, not here): the family
/// names present are a subset of the owning table's declared families.
#[derive(Debug, Clone, Default)]
pub struct Row {
    families: BTreeMap<String, BTreeMap<Bytes, ColumnVersions>>,
}

impl Row {
    pub fn set_cell(&mut self, family: &str, qualifier: Bytes, timestamp_micros: i64, value: Bytes) {
        self.families
            .entry(family.to_string())
            .or_default()
            .entry(qualifier)
            .or_default()
            .set(timestamp_micros, value);
    }

    /// Delete versions of one (family, qualifier) in `[start, end)`.
    /// Empty columns and families are removed so the row shrinks to
    /// nothing when its last cell goes.
    pub fn delete_cells(
        &mut self,
        family: &str,
        qualifier: &[u8],
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    ) {
        if let Some(columns) = self.families.get_mut(family) {
            if let Some(versions) = columns.get_mut(qualifier) {
                versions.delete_range(start_micros, end_micros);
                if versions.is_empty() {
                    columns.remove(qualifier);
                }
            }
            if columns.is_empty() {
                self.families.remove(family);
            }
        }
    }

    /// Remove the family's entire column map.
    pub fn delete_family(&mut self, family: &str) {
        self.families.remove(family);
    }

    /// Remove every cell in the row.
    pub fn clear(&mut self) {
        self.families.clear();
    }

    /// Apply a GC rule to one family's columns, dropping emptied entries.
    pub fn prune_family(&mut self, family: &str, rule: &GcRule, now_micros: i64) -> usize {
        let mut dropped = 0;
        if let Some(columns) = self.families.get_mut(family) {
            let mut emptied: Vec<Bytes> = Vec::new();
            for (qualifier, versions) in columns.iter_mut() {
                dropped += versions.prune(rule, now_micros);
                if versions.is_empty() {
                    emptied.push(qualifier.clone());
                }
            }
            for qualifier in emptied {
                columns.remove(&qualifier);
            }
            if columns.is_empty() {
                self.families.remove(family);
            }
        }
        dropped
    }

    pub fn families(&self) -> &BTreeMap<String, BTreeMap<Bytes, ColumnVersions>> {
        &self.families
    }

    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }

    /// Approximate byte footprint of the row's cell data.
    pub fn approx_size(&self) -> usize {
        self.families
            .iter()
            .map(|(family, columns)| {
                family.len()
                    + columns
                        .iter()
                        .map(|(q, v)| q.len() + v.approx_size())
                        .sum::<usize>()
            })
            .sum()
    }
}
