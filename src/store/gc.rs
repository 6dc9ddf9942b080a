//! Garbage-collection rules for column families
//!
//! A rule is a pure description; pruning is a function over
//! (versions, rule, current time) applied opportunistically after each
//! mutation. Pruning never errors and is best-effort cleanup: the read
//! path applies the same limits as a projection, so correctness does not
//! depend on physical pruning having run.

use serde::{Deserialize, Serialize};

use crate::store::Cell;

/// Garbage-collection rule for one column family.
///
/// Both limits may apply at once: keep at most `max_versions` per
/// qualifier AND nothing older than `max_age_micros`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GcRule {
    /// Retain only the N most recent versions per qualifier
    pub max_versions: Option<u32>,

    /// Retain only versions younger than this (microseconds)
    pub max_age_micros: Option<i64>,
}

impl GcRule {
    pub fn max_versions(n: u32) -> Self {
        Self {
            max_versions: Some(n),
            ..Self::default()
        }
    }

    pub fn max_age_micros(age: i64) -> Self {
        Self {
            max_age_micros: Some(age),
            ..Self::default()
        }
    }

    /// Whether the rule retains anything at all to enforce.
    pub fn is_unbounded(&self) -> bool {
        self.max_versions.is_none() && self.max_age_micros.is_none()
    }

    /// Read-side enforcement: trim a newest-first cell projection down to
    /// what the rule retains at `now_micros`, as if pruning had run.
    pub fn apply_to_projection(&self, cells: &mut Vec<Cell>, now_micros: i64) {
        if let Some(max_versions) = self.max_versions {
            cells.truncate(max_versions as usize);
        }
        if let Some(max_age) = self.max_age_micros {
            let cutoff = now_micros.saturating_sub(max_age);
            cells.retain(|c| c.timestamp_micros >= cutoff);
        }
    }
}
