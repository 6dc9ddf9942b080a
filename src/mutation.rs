//! Mutation Engine
//!
//! Applies an ordered batch of per-cell operations to exactly one row as a
//! single atomic unit: either every operation takes effect and is visible
//! to subsequent reads, or none does. Validation runs up front against the
//! table's declared families, and the new row content is built on a
//! scratch copy that only replaces the live row once the whole batch has
//! succeeded, so a reported error implies zero partial state change.
//!
//! ## Concurrency
//! The batch runs inside the table's per-row-key lock, so calls for the
//! same key serialize while distinct keys proceed in parallel. The family
//! map's read lock is held across validation and commit, which keeps
//! family deletion (an exclusive-lock admin operation) from interleaving.

use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{Result, TabletError};
use crate::read::filter::RowFilter;
use crate::store::{GcRule, Row, RowSnapshot, Table};

/// A single set or delete operation targeting one cell, one column's
/// timestamp range, one family, or the whole row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Mutation {
    /// Insert or overwrite one version. A negative `timestamp_micros`
    /// means "server time": it is resolved against the injected clock at
    /// the moment of application, not at request-construction time.
    SetCell {
        family: String,
        qualifier: Vec<u8>,
        timestamp_micros: i64,
        value: Vec<u8>,
    },

    /// Delete versions of one (family, qualifier) with timestamps in
    /// `[start, end)`; both bounds absent deletes every version.
    DeleteCells {
        family: String,
        qualifier: Vec<u8>,
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    },

    /// Remove the family's entire column map from the row.
    DeleteFamily { family: String },

    /// Remove every cell in the row.
    DeleteRow,
}

impl Mutation {
    /// The family this mutation references, if any.
    fn family(&self) -> Option<&str> {
        match self {
            Mutation::SetCell { family, .. }
            | Mutation::DeleteCells { family, .. }
            | Mutation::DeleteFamily { family } => Some(family),
            Mutation::DeleteRow => None,
        }
    }
}

/// Applies mutation batches and conditional mutations.
pub struct MutationEngine {
    clock: Arc<dyn Clock>,
}

impl MutationEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Apply an ordered batch to one row atomically.
    ///
    /// Later operations on the same cell coordinate override earlier ones
    /// simply by folding in list order.
    pub fn apply(&self, table: &Table, row_key: &Bytes, mutations: &[Mutation]) -> Result<()> {
        if mutations.is_empty() {
            return Err(TabletError::InvalidArgument(
                "mutation batch is empty".to_string(),
            ));
        }

        let lock = table.row_lock(row_key);
        let guard = lock.lock();
        let result = table.with_families_read(|families| {
            Self::validate_families(mutations, families.keys())?;
            let mut row = table.get_row(row_key).unwrap_or_default();
            self.fold(&mut row, mutations);
            Self::prune(&mut row, families, self.clock.now_micros());
            table.commit_row(row_key.clone(), row);
            Ok(())
        });
        drop(guard);
        table.release_row_lock(row_key);
        result
    }

    /// Conditional mutation: evaluate `predicate` over the row's current
    /// cell data and apply the matching branch, all inside one per-row
    /// critical section so no writer interleaves between the predicate
    /// read and the chosen mutations. Returns whether the predicate
    /// matched.
    pub fn check_and_mutate(
        &self,
        table: &Table,
        row_key: &Bytes,
        predicate: &RowFilter,
        true_mutations: &[Mutation],
        false_mutations: &[Mutation],
    ) -> Result<bool> {
        if true_mutations.is_empty() && false_mutations.is_empty() {
            return Err(TabletError::InvalidArgument(
                "conditional mutation has no mutations on either branch".to_string(),
            ));
        }
        if !predicate.can_gate_rows() {
            return Err(TabletError::FailedPrecondition(
                "predicate filter cannot be used to gate a conditional mutation".to_string(),
            ));
        }
        let compiled = predicate.compile()?;
        let now = self.clock.now_micros();

        let lock = table.row_lock(row_key);
        let guard = lock.lock();
        let result = table.with_families_read(|families| {
            let matched = match table.project_row_with_rules(row_key, families, now) {
                Some(mut snapshot) => compiled.apply(&mut snapshot, 0) && !snapshot.is_empty(),
                None => {
                    // An absent row still gates: the predicate matches
                    // nothing, so the false branch applies.
                    let mut empty = RowSnapshot {
                        key: row_key.clone(),
                        ..RowSnapshot::default()
                    };
                    compiled.apply(&mut empty, 0) && !empty.is_empty()
                }
            };

            let chosen = if matched { true_mutations } else { false_mutations };
            if !chosen.is_empty() {
                Self::validate_families(chosen, families.keys())?;
                let mut row = table.get_row(row_key).unwrap_or_default();
                self.fold(&mut row, chosen);
                Self::prune(&mut row, families, self.clock.now_micros());
                table.commit_row(row_key.clone(), row);
            }
            Ok(matched)
        });
        drop(guard);
        table.release_row_lock(row_key);
        result
    }

    /// Every referenced family must be declared on the table and every
    /// delete range well-formed; the first offender aborts the batch,
    /// named in the error.
    fn validate_families<'a>(
        mutations: &[Mutation],
        declared: impl Iterator<Item = &'a String>,
    ) -> Result<()> {
        let declared: std::collections::BTreeSet<&str> =
            declared.map(|name| name.as_str()).collect();
        for mutation in mutations {
            if let Some(family) = mutation.family() {
                if !declared.contains(family) {
                    return Err(TabletError::InvalidArgument(format!(
                        "unknown column family {:?}",
                        family
                    )));
                }
            }
            if let Mutation::DeleteCells {
                start_micros: Some(start),
                end_micros: Some(end),
                ..
            } = mutation
            {
                if start > end {
                    return Err(TabletError::InvalidArgument(format!(
                        "timestamp range start {} exceeds end {}",
                        start, end
                    )));
                }
            }
        }
        Ok(())
    }

    fn fold(&self, row: &mut Row, mutations: &[Mutation]) {
        for mutation in mutations {
            match mutation {
                Mutation::SetCell {
                    family,
                    qualifier,
                    timestamp_micros,
                    value,
                } => {
                    let ts = if *timestamp_micros < 0 {
                        self.clock.now_micros()
                    } else {
                        *timestamp_micros
                    };
                    row.set_cell(
                        family,
                        Bytes::from(qualifier.clone()),
                        ts,
                        Bytes::from(value.clone()),
                    );
                }
                Mutation::DeleteCells {
                    family,
                    qualifier,
                    start_micros,
                    end_micros,
                } => {
                    row.delete_cells(family, qualifier, *start_micros, *end_micros);
                }
                Mutation::DeleteFamily { family } => {
                    row.delete_family(family);
                }
                Mutation::DeleteRow => {
                    row.clear();
                }
            }
        }
    }

    /// Opportunistic post-mutation pruning for every family with a
    /// bounded rule. Never errors.
    fn prune(
        row: &mut Row,
        families: &std::collections::BTreeMap<String, GcRule>,
        now_micros: i64,
    ) {
        for (family, rule) in families {
            if !rule.is_unbounded() {
                row.prune_family(family, rule, now_micros);
            }
        }
    }
}
