//! Request definitions
//!
//! One variant per operation, with explicit optional fields. Structural
//! validation (non-empty names, well-formed families) happens at the
//! service boundary before any engine is invoked.

use serde::{Deserialize, Serialize};

use crate::mutation::Mutation;
use crate::read::filter::RowFilter;
use crate::read::RowSet;
use crate::store::GcRule;

/// A decoded client request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Request {
    /// Must be the first request on a connection: names the
    /// (project, instance) namespace all later requests address.
    Hello { project: String, instance: String },

    /// Health check
    Ping,

    // -------------------------------------------------------------------------
    // Admin operations
    // -------------------------------------------------------------------------
    CreateTable {
        table: String,
    },
    DeleteTable {
        table: String,
    },
    ListTables,
    CreateColumnFamily {
        table: String,
        family: String,
        rule: GcRule,
    },
    UpdateColumnFamily {
        table: String,
        family: String,
        rule: GcRule,
    },
    DeleteColumnFamily {
        table: String,
        family: String,
    },
    /// Delete every row (`prefix: None`) or every row whose key starts
    /// with the prefix.
    DropRowRange {
        table: String,
        prefix: Option<Vec<u8>>,
    },

    // -------------------------------------------------------------------------
    // Data operations
    // -------------------------------------------------------------------------
    Apply {
        table: String,
        row_key: Vec<u8>,
        mutations: Vec<Mutation>,
    },
    CheckAndMutate {
        table: String,
        row_key: Vec<u8>,
        predicate: RowFilter,
        true_mutations: Vec<Mutation>,
        false_mutations: Vec<Mutation>,
    },
    ReadRows {
        table: String,
        rows: RowSet,
        filter: Option<RowFilter>,
        /// 0 = unlimited
        limit: u64,
    },
    SampleRowKeys {
        table: String,
    },
}
