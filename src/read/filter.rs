//! Row filters
//!
//! A filter is a composable pipeline evaluated per row against the row's
//! resolved cell data, left to right. Filters either gate the whole row
//! (row key regex, sampling, block-all) or transform its cell set
//! (family/qualifier/value matches, timestamp ranges, version limits).
//! A row with zero cells remaining is omitted by the scan; keys-only
//! keeps the cells and strips the values, so key-only rows still emit.
//!
//! Regex matches are anchored: the pattern must match the entire row key,
//! family name, qualifier, or value.

use std::collections::BTreeMap;

use bytes::Bytes;
use regex::bytes::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TabletError};
use crate::store::{Cell, RowSnapshot};

/// Declarative filter tree, as carried in read and conditional-mutation
/// requests. Compile before use; compilation validates regexes and
/// limits so malformed filters fail the request before any row is
/// touched.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RowFilter {
    /// Pass every cell through unchanged
    PassAll,

    /// Drop every row
    BlockAll,

    /// Intersection: apply each sub-filter in order to the survivors of
    /// the previous one
    Chain(Vec<RowFilter>),

    /// Union: apply each sub-filter to the original row and merge the
    /// surviving cells
    Union(Vec<RowFilter>),

    /// Evaluate `predicate` against the row; apply `if_true` when any
    /// cell survives it, `if_false` otherwise. A missing branch drops the
    /// row.
    Condition {
        predicate: Box<RowFilter>,
        if_true: Option<Box<RowFilter>>,
        if_false: Option<Box<RowFilter>>,
    },

    /// Keep the row only when its key matches
    RowKeyRegex(String),

    /// Keep cells whose family matches
    FamilyRegex(String),

    /// Keep cells of exactly this family
    FamilyExact(String),

    /// Keep cells whose qualifier matches
    QualifierRegex(String),

    /// Keep cells of exactly this qualifier
    QualifierExact(Vec<u8>),

    /// Keep cells with timestamp in `[start, end)` microseconds; an
    /// absent bound is unbounded
    TimestampRange {
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    },

    /// Keep cells whose value matches
    ValueRegex(String),

    /// Keep only the first N (most recent) versions per qualifier
    CellsPerColumn(u32),

    /// Keep only the first N cells of the row in scan order
    CellsPerRow(u32),

    /// Keep every Nth row of the scan (the first row counts as matching)
    Sample { every_nth: u32 },

    /// Strip values, keeping cell coordinates (emits only the keys)
    KeysOnly,
}

impl RowFilter {
    /// Whether this filter can gate a conditional-mutation predicate.
    /// Sampling and keys-only say nothing about the row's content, so
    /// they are rejected as predicates.
    pub fn can_gate_rows(&self) -> bool {
        match self {
            RowFilter::Sample { .. } | RowFilter::KeysOnly => false,
            RowFilter::Chain(parts) | RowFilter::Union(parts) => {
                parts.iter().all(RowFilter::can_gate_rows)
            }
            RowFilter::Condition {
                predicate,
                if_true,
                if_false,
            } => {
                predicate.can_gate_rows()
                    && branch_gates(if_true)
                    && branch_gates(if_false)
            }
            _ => true,
        }
    }

    /// Validate the tree and pre-compile its regexes.
    pub fn compile(&self) -> Result<CompiledFilter> {
        Ok(match self {
            RowFilter::PassAll => CompiledFilter::PassAll,
            RowFilter::BlockAll => CompiledFilter::BlockAll,
            RowFilter::Chain(parts) => {
                CompiledFilter::Chain(parts.iter().map(RowFilter::compile).collect::<Result<_>>()?)
            }
            RowFilter::Union(parts) => {
                CompiledFilter::Union(parts.iter().map(RowFilter::compile).collect::<Result<_>>()?)
            }
            RowFilter::Condition {
                predicate,
                if_true,
                if_false,
            } => CompiledFilter::Condition {
                predicate: Box::new(predicate.compile()?),
                if_true: compile_branch(if_true)?,
                if_false: compile_branch(if_false)?,
            },
            RowFilter::RowKeyRegex(pattern) => CompiledFilter::RowKeyRegex(anchored(pattern)?),
            RowFilter::FamilyRegex(pattern) => CompiledFilter::FamilyRegex(anchored(pattern)?),
            RowFilter::FamilyExact(family) => CompiledFilter::FamilyExact(family.clone()),
            RowFilter::QualifierRegex(pattern) => {
                CompiledFilter::QualifierRegex(anchored(pattern)?)
            }
            RowFilter::QualifierExact(qualifier) => {
                CompiledFilter::QualifierExact(Bytes::from(qualifier.clone()))
            }
            RowFilter::TimestampRange {
                start_micros,
                end_micros,
            } => {
                if let (Some(start), Some(end)) = (start_micros, end_micros) {
                    if start > end {
                        return Err(TabletError::InvalidArgument(format!(
                            "timestamp range start {} exceeds end {}",
                            start, end
                        )));
                    }
                }
                CompiledFilter::TimestampRange {
                    start_micros: *start_micros,
                    end_micros: *end_micros,
                }
            }
            RowFilter::ValueRegex(pattern) => CompiledFilter::ValueRegex(anchored(pattern)?),
            RowFilter::CellsPerColumn(limit) => {
                if *limit == 0 {
                    return Err(TabletError::InvalidArgument(
                        "cells-per-column limit must be positive".to_string(),
                    ));
                }
                CompiledFilter::CellsPerColumn(*limit as usize)
            }
            RowFilter::CellsPerRow(limit) => {
                if *limit == 0 {
                    return Err(TabletError::InvalidArgument(
                        "cells-per-row limit must be positive".to_string(),
                    ));
                }
                CompiledFilter::CellsPerRow(*limit as usize)
            }
            RowFilter::Sample { every_nth } => {
                if *every_nth == 0 {
                    return Err(TabletError::InvalidArgument(
                        "sample interval must be positive".to_string(),
                    ));
                }
                CompiledFilter::Sample {
                    every_nth: *every_nth as u64,
                }
            }
            RowFilter::KeysOnly => CompiledFilter::KeysOnly,
        })
    }
}

fn branch_gates(branch: &Option<Box<RowFilter>>) -> bool {
    branch.as_deref().map_or(true, RowFilter::can_gate_rows)
}

fn compile_branch(branch: &Option<Box<RowFilter>>) -> Result<Option<Box<CompiledFilter>>> {
    branch
        .as_ref()
        .map(|filter| filter.compile().map(Box::new))
        .transpose()
}

/// Anchor a user pattern so it must match the whole subject.
fn anchored(pattern: &str) -> Result<Regex> {
    Regex::new(&format!("^(?s:{})$", pattern))
        .map_err(|e| TabletError::InvalidArgument(format!("invalid regex {:?}: {}", pattern, e)))
}

/// A validated, regex-compiled filter ready for per-row evaluation.
#[derive(Debug)]
pub enum CompiledFilter {
    PassAll,
    BlockAll,
    Chain(Vec<CompiledFilter>),
    Union(Vec<CompiledFilter>),
    Condition {
        predicate: Box<CompiledFilter>,
        if_true: Option<Box<CompiledFilter>>,
        if_false: Option<Box<CompiledFilter>>,
    },
    RowKeyRegex(Regex),
    FamilyRegex(Regex),
    FamilyExact(String),
    QualifierRegex(Regex),
    QualifierExact(Bytes),
    TimestampRange {
        start_micros: Option<i64>,
        end_micros: Option<i64>,
    },
    ValueRegex(Regex),
    CellsPerColumn(usize),
    CellsPerRow(usize),
    Sample {
        every_nth: u64,
    },
    KeysOnly,
}

impl CompiledFilter {
    /// Evaluate against one row, transforming its cells in place.
    /// Returns false when a row-level gate drops the row outright;
    /// content-emptiness is the caller's check (`RowSnapshot::is_empty`).
    /// `scan_index` is the zero-based position of the row in the scan,
    /// consumed by sampling.
    pub fn apply(&self, row: &mut RowSnapshot, scan_index: u64) -> bool {
        match self {
            CompiledFilter::PassAll => true,
            CompiledFilter::BlockAll => {
                row.families.clear();
                false
            }
            CompiledFilter::Chain(parts) => {
                for part in parts {
                    if !part.apply(row, scan_index) {
                        row.families.clear();
                        return false;
                    }
                }
                true
            }
            CompiledFilter::Union(parts) => {
                let original = row.clone();
                let mut merged = RowSnapshot {
                    key: row.key.clone(),
                    families: BTreeMap::new(),
                };
                let mut any = false;
                for part in parts {
                    let mut branch = original.clone();
                    if part.apply(&mut branch, scan_index) {
                        any = true;
                        merge_cells(&mut merged, branch);
                    }
                }
                *row = merged;
                any
            }
            CompiledFilter::Condition {
                predicate,
                if_true,
                if_false,
            } => {
                let mut probe = row.clone();
                let matched = predicate.apply(&mut probe, scan_index) && !probe.is_empty();
                let branch = if matched { if_true } else { if_false };
                match branch {
                    Some(filter) => filter.apply(row, scan_index),
                    None => {
                        row.families.clear();
                        false
                    }
                }
            }
            CompiledFilter::RowKeyRegex(regex) => {
                if regex.is_match(&row.key) {
                    true
                } else {
                    row.families.clear();
                    false
                }
            }
            CompiledFilter::FamilyRegex(regex) => {
                row.families
                    .retain(|family, _| regex.is_match(family.as_bytes()));
                true
            }
            CompiledFilter::FamilyExact(family) => {
                row.families.retain(|name, _| name == family);
                true
            }
            CompiledFilter::QualifierRegex(regex) => {
                retain_columns(row, |qualifier| regex.is_match(qualifier));
                true
            }
            CompiledFilter::QualifierExact(qualifier) => {
                retain_columns(row, |candidate| candidate == &qualifier[..]);
                true
            }
            CompiledFilter::TimestampRange {
                start_micros,
                end_micros,
            } => {
                retain_cells(row, |cell| {
                    start_micros.map_or(true, |start| cell.timestamp_micros >= start)
                        && end_micros.map_or(true, |end| cell.timestamp_micros < end)
                });
                true
            }
            CompiledFilter::ValueRegex(regex) => {
                retain_cells(row, |cell| regex.is_match(&cell.value));
                true
            }
            CompiledFilter::CellsPerColumn(limit) => {
                for columns in row.families.values_mut() {
                    for cells in columns.values_mut() {
                        cells.truncate(*limit);
                    }
                }
                prune_empty(row);
                true
            }
            CompiledFilter::CellsPerRow(limit) => {
                let mut remaining = *limit;
                for columns in row.families.values_mut() {
                    for cells in columns.values_mut() {
                        let take = remaining.min(cells.len());
                        cells.truncate(take);
                        remaining -= take;
                    }
                }
                prune_empty(row);
                true
            }
            CompiledFilter::Sample { every_nth } => {
                if scan_index % every_nth == 0 {
                    true
                } else {
                    row.families.clear();
                    false
                }
            }
            CompiledFilter::KeysOnly => {
                for columns in row.families.values_mut() {
                    for cells in columns.values_mut() {
                        for cell in cells.iter_mut() {
                            cell.value = Bytes::new();
                        }
                    }
                }
                true
            }
        }
    }
}

fn retain_columns(row: &mut RowSnapshot, mut keep: impl FnMut(&[u8]) -> bool) {
    for columns in row.families.values_mut() {
        columns.retain(|qualifier, _| keep(qualifier));
    }
    prune_empty(row);
}

fn retain_cells(row: &mut RowSnapshot, mut keep: impl FnMut(&Cell) -> bool) {
    for columns in row.families.values_mut() {
        for cells in columns.values_mut() {
            cells.retain(&mut keep);
        }
    }
    prune_empty(row);
}

fn prune_empty(row: &mut RowSnapshot) {
    for columns in row.families.values_mut() {
        columns.retain(|_, cells| !cells.is_empty());
    }
    row.families.retain(|_, columns| !columns.is_empty());
}

/// Merge a union branch's survivors into the accumulated result,
/// deduplicating by (family, qualifier, timestamp); the first branch to
/// produce a version wins.
fn merge_cells(target: &mut RowSnapshot, branch: RowSnapshot) {
    for (family, columns) in branch.families {
        let target_columns = target.families.entry(family).or_default();
        for (qualifier, cells) in columns {
            let slot = target_columns.entry(qualifier).or_default();
            for cell in cells {
                if !slot
                    .iter()
                    .any(|existing| existing.timestamp_micros == cell.timestamp_micros)
                {
                    slot.push(cell);
                }
            }
            slot.sort_by(|a, b| b.timestamp_micros.cmp(&a.timestamp_micros));
        }
    }
}
