//! Table: ordered row map + column-family administration
//!
//! ## Locking discipline
//! - `families` RwLock: family admin takes the write half; mutations hold
//!   the read half across validation *and* commit so a family deletion can
//!   never interleave with a write that references it.
//! - `rows` RwLock: protects the row-key index (adding/removing rows,
//!   listing keys). Readers take short read locks per row.
//! - `row_locks`: explicit reference-counted per-row-key lock registry,
//!   created on demand, so apply/check-and-mutate on the same key
//!   serialize while distinct keys proceed concurrently. The lock lives in
//!   a registry keyed by row key rather than in the row itself so it also
//!   covers rows that do not exist yet.
//!
//! Lock order where both are taken: families → rows. Row-key locks are
//! acquired one at a time and never nested across rows.

use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use dashmap::DashMap;
use parking_lot::{Mutex, RwLock};

use crate::error::{Result, TabletError};

use super::cells::{Cell, Row};
use super::gc::GcRule;

/// Resolved cell data for one row, as seen by the read path: family →
/// qualifier → newest-first cells.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RowSnapshot {
    pub key: Bytes,
    pub families: BTreeMap<String, BTreeMap<Bytes, Vec<Cell>>>,
}

impl RowSnapshot {
    pub fn is_empty(&self) -> bool {
        self.families.values().all(|columns| columns.is_empty())
    }

    pub fn cell_count(&self) -> usize {
        self.families
            .values()
            .flat_map(|columns| columns.values())
            .map(|cells| cells.len())
            .sum()
    }
}

/// One named table: declared families with their GC rules, plus the row
/// map ordered ascending by row key bytes.
pub struct Table {
    name: String,
    families: RwLock<BTreeMap<String, GcRule>>,
    rows: RwLock<BTreeMap<Bytes, Row>>,
    row_locks: DashMap<Bytes, Arc<Mutex<()>>>,
}

impl Table {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            families: RwLock::new(BTreeMap::new()),
            rows: RwLock::new(BTreeMap::new()),
            row_locks: DashMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    // =========================================================================
    // Column family administration
    // =========================================================================

    /// Declare a new family. Fails with AlreadyExists if present.
    pub fn create_family(&self, family: &str, rule: GcRule) -> Result<()> {
        let mut families = self.families.write();
        if families.contains_key(family) {
            return Err(TabletError::AlreadyExists(format!(
                "column family {:?} in table {:?}",
                family, self.name
            )));
        }
        families.insert(family.to_string(), rule);
        Ok(())
    }

    /// Replace an existing family's GC rule. Fails with NotFound if absent.
    pub fn update_family(&self, family: &str, rule: GcRule) -> Result<()> {
        let mut families = self.families.write();
        match families.get_mut(family) {
            Some(existing) => {
                *existing = rule;
                Ok(())
            }
            None => Err(TabletError::NotFound(format!(
                "column family {:?} in table {:?}",
                family, self.name
            ))),
        }
    }

    /// Remove a family and purge its row data. Fails with NotFound if
    /// absent; a second delete of the same name reports NotFound and
    /// changes nothing.
    pub fn delete_family(&self, family: &str) -> Result<()> {
        let mut families = self.families.write();
        if families.remove(family).is_none() {
            return Err(TabletError::NotFound(format!(
                "column family {:?} in table {:?}",
                family, self.name
            )));
        }
        // Purge while still holding the family write lock so no mutation
        // referencing the family can land in between.
        let mut rows = self.rows.write();
        rows.retain(|_, row| {
            row.delete_family(family);
            !row.is_empty()
        });
        Ok(())
    }

    /// Run `f` while holding the family map read-locked. Mutations use
    /// this to keep family deletion out of their critical section.
    pub fn with_families_read<R>(&self, f: impl FnOnce(&BTreeMap<String, GcRule>) -> R) -> R {
        let families = self.families.read();
        f(&families)
    }

    // =========================================================================
    // Row-key lock registry
    // =========================================================================

    /// Fetch (creating on demand) the lock for one row key.
    pub fn row_lock(&self, key: &Bytes) -> Arc<Mutex<()>> {
        self.row_locks
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Drop the registry entry once no other holder remains (one count in
    /// the map, one in the caller's clone). Best-effort: a racing acquirer
    /// keeps the entry alive.
    pub fn release_row_lock(&self, key: &Bytes) {
        self.row_locks
            .remove_if(key, |_, lock| Arc::strong_count(lock) <= 2);
    }

    // =========================================================================
    // Row access
    // =========================================================================

    /// Clone of the current row content, if the row exists.
    pub fn get_row(&self, key: &Bytes) -> Option<Row> {
        self.rows.read().get(key).cloned()
    }

    /// Replace a row wholesale. Empty rows are removed so scans and
    /// sampling never see keys with no cells.
    pub fn commit_row(&self, key: Bytes, row: Row) {
        let mut rows = self.rows.write();
        if row.is_empty() {
            rows.remove(&key);
        } else {
            rows.insert(key, row);
        }
    }

    /// Ascending keys within the given bounds.
    pub fn keys_in_range(&self, start: Bound<Bytes>, end: Bound<Bytes>) -> Vec<Bytes> {
        self.rows.read().range((start, end)).map(|(k, _)| k.clone()).collect()
    }

    /// Ascending (key, approximate row size) pairs for sampling.
    pub fn row_sizes(&self) -> Vec<(Bytes, usize)> {
        self.rows
            .read()
            .iter()
            .map(|(k, row)| (k.clone(), k.len() + row.approx_size()))
            .collect()
    }

    /// Delete every row, or every row whose key starts with `prefix`.
    pub fn drop_row_range(&self, prefix: Option<&[u8]>) {
        let mut rows = self.rows.write();
        match prefix {
            None => rows.clear(),
            Some(prefix) => rows.retain(|key, _| !key.starts_with(prefix)),
        }
    }

    /// Resolve one row into the read path's cell projection, applying the
    /// family GC rules as visibility limits even when physical pruning has
    /// not caught up yet.
    pub fn project_row(&self, key: &Bytes, now_micros: i64) -> Option<RowSnapshot> {
        let rules = self.families.read().clone();
        self.project_row_with_rules(key, &rules, now_micros)
    }

    /// Projection against caller-supplied rules. Used where the family
    /// read lock is already held (the lock is not reentrant).
    pub(crate) fn project_row_with_rules(
        &self,
        key: &Bytes,
        rules: &BTreeMap<String, GcRule>,
        now_micros: i64,
    ) -> Option<RowSnapshot> {
        let rows = self.rows.read();
        let row = rows.get(key)?;

        let mut snapshot = RowSnapshot {
            key: key.clone(),
            families: BTreeMap::new(),
        };
        for (family, columns) in row.families() {
            let rule = rules.get(family).copied().unwrap_or_default();
            let mut projected: BTreeMap<Bytes, Vec<Cell>> = BTreeMap::new();
            for (qualifier, versions) in columns {
                let mut cells = versions.cells(None);
                rule.apply_to_projection(&mut cells, now_micros);
                if !cells.is_empty() {
                    projected.insert(qualifier.clone(), cells);
                }
            }
            if !projected.is_empty() {
                snapshot.families.insert(family.clone(), projected);
            }
        }
        if snapshot.families.is_empty() {
            None
        } else {
            Some(snapshot)
        }
    }
}
