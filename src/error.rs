//! Error types for tabletkv
//!
//! Provides a unified error type for all operations. The first five
//! variants form the protocol-visible taxonomy; every engine operation
//! reports the specific kind immediately and the service layer passes it
//! through to the client unchanged.

use thiserror::Error;

/// Result type alias using TabletError
pub type Result<T> = std::result::Result<T, TabletError>;

/// Unified error type for tabletkv operations
#[derive(Debug, Error)]
pub enum TabletError {
    // -------------------------------------------------------------------------
    // Protocol-visible taxonomy
    // -------------------------------------------------------------------------
    /// Create on a name that already exists (table, column family)
    #[error("already exists: {0}")]
    AlreadyExists(String),

    /// Reference to an absent table/family/row where one is required
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed request: empty names, undeclared family in a mutation,
    /// ill-formed filter, bad range
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Conditional mutation predicate referencing incompatible state
    #[error("failed precondition: {0}")]
    FailedPrecondition(String),

    /// Unexpected invariant violation. Must never be reachable from valid
    /// input; its occurrence is a defect.
    #[error("internal error: {0}")]
    Internal(String),

    // -------------------------------------------------------------------------
    // Transport Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("protocol error: {0}")]
    Protocol(String),
}
