//! Response definitions
//!
//! Represents responses to clients. Engine errors pass through unchanged
//! as (kind, message) pairs; the service layer adds nothing and retries
//! nothing.

use serde::{Deserialize, Serialize};

use crate::error::TabletError;
use crate::read::SampleKey;
use crate::store::RowSnapshot;

/// Protocol-visible error kinds, mirroring the engine taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ErrorKind {
    AlreadyExists,
    NotFound,
    InvalidArgument,
    FailedPrecondition,
    Internal,
    Protocol,
}

/// One cell of a read result, flattened for the wire.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellEntry {
    pub family: String,
    pub qualifier: Vec<u8>,
    pub timestamp_micros: i64,
    pub value: Vec<u8>,
}

/// One row of a read result: cells ordered by family, then qualifier,
/// then timestamp descending.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RowBlock {
    pub key: Vec<u8>,
    pub cells: Vec<CellEntry>,
}

impl From<RowSnapshot> for RowBlock {
    fn from(snapshot: RowSnapshot) -> Self {
        let mut cells = Vec::with_capacity(snapshot.cell_count());
        for (family, columns) in &snapshot.families {
            for (qualifier, versions) in columns {
                for cell in versions {
                    cells.push(CellEntry {
                        family: family.clone(),
                        qualifier: qualifier.to_vec(),
                        timestamp_micros: cell.timestamp_micros,
                        value: cell.value.to_vec(),
                    });
                }
            }
        }
        RowBlock {
            key: snapshot.key.to_vec(),
            cells,
        }
    }
}

/// A response to send to the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum Response {
    Ok,
    Pong,
    Error { kind: ErrorKind, message: String },
    Tables { names: Vec<String> },
    Rows { rows: Vec<RowBlock> },
    Samples { samples: Vec<SampleKey> },
    Predicate { matched: bool },
}

impl Response {
    /// Map an engine/transport error onto its wire representation.
    pub fn error(err: &TabletError) -> Self {
        let kind = match err {
            TabletError::AlreadyExists(_) => ErrorKind::AlreadyExists,
            TabletError::NotFound(_) => ErrorKind::NotFound,
            TabletError::InvalidArgument(_) => ErrorKind::InvalidArgument,
            TabletError::FailedPrecondition(_) => ErrorKind::FailedPrecondition,
            TabletError::Internal(_) => ErrorKind::Internal,
            TabletError::Io(_) => ErrorKind::Internal,
            TabletError::Protocol(_) => ErrorKind::Protocol,
        };
        Response::Error {
            kind,
            message: err.to_string(),
        }
    }
}
