//! # tabletkv
//!
//! An in-memory wide-column store emulator with:
//! - Table and column-family administration with GC rules
//! - Multi-version timestamped cells per (row, family, qualifier)
//! - Atomic per-row mutation batches and conditional mutations
//! - Filtered, ordered row/range reads
//! - TCP-based client protocol
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      TCP Server                              │
//! │                  (Multiple Clients)                          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                     Emulator                                 │
//! │           (Admin / Data request dispatch)                    │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │
//!          ┌────────────┴────────────┐
//!          │                         │
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │  Mutation   │          │    Read     │
//!   │   Engine    │          │   Engine    │
//!   └──────┬──────┘          └──────┬──────┘
//!          │                        │
//!          └───────────┬────────────┘
//!                      ▼
//!              ┌──────────────┐
//!              │   Registry   │
//!              │ Tables/Cells │
//!              └──────────────┘
//! ```
//!
//! Everything lives in memory; dropping the `Emulator` (or exiting the
//! process) releases all state. This is a conformance emulator for
//! client libraries, not a production storage engine.

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod clock;
pub mod mutation;
pub mod network;
pub mod protocol;
pub mod read;
pub mod service;
pub mod store;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use config::Config;
pub use error::{Result, TabletError};
pub use service::Emulator;
pub use store::InstanceKey;

// =============================================================================
// Version Info
// =============================================================================

/// Current version of tabletkv
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
