//! Store Module
//!
//! In-memory wide-column data model.
//!
//! ## Ownership
//! - `Registry` owns every `Instance` (one per (project, instance) pair)
//! - an `Instance` owns its `Table`s
//! - a `Table` owns its rows, ordered ascending by row key bytes
//! - a `Row` owns its cells: family → qualifier → versions ordered by
//!   timestamp descending
//!
//! Nothing here is mutated from outside the mutation/read engines; the
//! engines mediate all concurrent access.
//!
//! ## Data Structure Choice
//! BTreeMaps throughout the row/cell paths:
//! - row keys must iterate in ascending lexicographic order for scans
//! - per-qualifier versions must iterate newest-first
//! Concurrent registries (namespaces, tables, row locks) use DashMap.

mod cells;
mod gc;
mod registry;
mod table;

pub use cells::{Cell, ColumnVersions, Row};
pub use gc::GcRule;
pub use registry::{Instance, InstanceKey, Registry};
pub use table::{RowSnapshot, Table};
