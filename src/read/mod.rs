//! Read Engine
//!
//! Resolves row and range read requests into lazy, ascending-key result
//! streams. The candidate key list is captured from the row index when the
//! stream is created; each row's cell content is resolved against live
//! table state at iteration time. No cursor state survives the stream;
//! restarting means re-issuing the call.

pub mod filter;

use std::collections::BTreeSet;
use std::ops::Bound;
use std::sync::Arc;

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::clock::Clock;
use crate::error::{Result, TabletError};
use crate::store::{RowSnapshot, Table};

use filter::{CompiledFilter, RowFilter};

/// One end of a row-key range.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub enum KeyBound {
    #[default]
    Unbounded,
    Included(Vec<u8>),
    Excluded(Vec<u8>),
}

/// A contiguous range of row keys.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowRange {
    pub start: KeyBound,
    pub end: KeyBound,
}

/// The rows a read targets: explicit keys plus ranges. Empty means the
/// whole table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RowSet {
    pub keys: Vec<Vec<u8>>,
    pub ranges: Vec<RowRange>,
}

impl RowSet {
    pub fn all() -> Self {
        Self::default()
    }

    pub fn single(key: impl Into<Vec<u8>>) -> Self {
        Self {
            keys: vec![key.into()],
            ranges: Vec::new(),
        }
    }

    fn is_empty(&self) -> bool {
        self.keys.is_empty() && self.ranges.is_empty()
    }
}

/// One sample-row-keys checkpoint: a row key and the approximate byte
/// offset of the end of that row within the table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleKey {
    pub key: Vec<u8>,
    pub offset_bytes: u64,
}

/// Resolves reads against tables.
pub struct ReadEngine {
    clock: Arc<dyn Clock>,
}

impl ReadEngine {
    pub fn new(clock: Arc<dyn Clock>) -> Self {
        Self { clock }
    }

    /// Start a scan. The filter is validated and compiled before any row
    /// is touched; malformed filters fail here with InvalidArgument.
    /// `limit` of 0 means unlimited.
    pub fn read_rows(
        &self,
        table: Arc<Table>,
        rows: &RowSet,
        filter: Option<&RowFilter>,
        limit: u64,
    ) -> Result<RowStream> {
        let compiled = filter.map(RowFilter::compile).transpose()?;

        let mut candidates: BTreeSet<Bytes> = BTreeSet::new();
        if rows.is_empty() {
            candidates.extend(table.keys_in_range(Bound::Unbounded, Bound::Unbounded));
        } else {
            for key in &rows.keys {
                candidates.insert(Bytes::from(key.clone()));
            }
            for range in &rows.ranges {
                for key in range_keys(&table, range)? {
                    candidates.insert(key);
                }
            }
        }

        Ok(RowStream {
            table,
            keys: candidates.into_iter().collect::<Vec<_>>().into_iter(),
            filter: compiled,
            remaining: if limit == 0 { u64::MAX } else { limit },
            scan_index: 0,
            now_micros: self.clock.now_micros(),
        })
    }

    /// Monotonically increasing (key, offset) checkpoints over the whole
    /// table: every row key in ascending order with cumulative approximate
    /// byte offsets.
    pub fn sample_row_keys(&self, table: &Table) -> Vec<SampleKey> {
        let mut offset: u64 = 0;
        table
            .row_sizes()
            .into_iter()
            .map(|(key, size)| {
                offset += size as u64;
                SampleKey {
                    key: key.to_vec(),
                    offset_bytes: offset,
                }
            })
            .collect()
    }
}

/// Snapshot the index keys one range covers.
fn range_keys(table: &Table, range: &RowRange) -> Result<Vec<Bytes>> {
    let start = to_bound(&range.start);
    let end = to_bound(&range.end);

    // BTreeMap::range panics on inverted bounds; reject them as a
    // malformed request instead.
    if let (Some(start_key), Some(end_key)) = (bound_key(&range.start), bound_key(&range.end)) {
        if start_key > end_key {
            return Err(TabletError::InvalidArgument(
                "row range starts after it ends".to_string(),
            ));
        }
        if start_key == end_key
            && !(matches!(range.start, KeyBound::Included(_))
                && matches!(range.end, KeyBound::Included(_)))
        {
            return Ok(Vec::new());
        }
    }
    Ok(table.keys_in_range(start, end))
}

fn to_bound(bound: &KeyBound) -> Bound<Bytes> {
    match bound {
        KeyBound::Unbounded => Bound::Unbounded,
        KeyBound::Included(key) => Bound::Included(Bytes::from(key.clone())),
        KeyBound::Excluded(key) => Bound::Excluded(Bytes::from(key.clone())),
    }
}

fn bound_key(bound: &KeyBound) -> Option<&[u8]> {
    match bound {
        KeyBound::Unbounded => None,
        KeyBound::Included(key) | KeyBound::Excluded(key) => Some(key),
    }
}

/// Lazy, ordered scan over one table. Each `next` resolves the row
/// against live state and runs it through the filter chain; rows left
/// with no cells are skipped.
pub struct RowStream {
    table: Arc<Table>,
    keys: std::vec::IntoIter<Bytes>,
    filter: Option<CompiledFilter>,
    remaining: u64,
    scan_index: u64,
    now_micros: i64,
}

impl Iterator for RowStream {
    type Item = RowSnapshot;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }
        loop {
            let key = self.keys.next()?;
            let Some(mut snapshot) = self.table.project_row(&key, self.now_micros) else {
                continue;
            };
            let index = self.scan_index;
            self.scan_index += 1;
            let passes = match &self.filter {
                Some(filter) => filter.apply(&mut snapshot, index),
                None => true,
            };
            if passes && !snapshot.is_empty() {
                self.remaining -= 1;
                return Some(snapshot);
            }
        }
    }
}
