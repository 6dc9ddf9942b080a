//! Network Module
//!
//! TCP server frontend.
//!
//! ## Architecture
//! - Single acceptor thread
//! - Worker thread pool fed over a crossbeam channel
//! - Requests routed through the Emulator; unrelated requests never
//!   serialize against each other; only row-level atomicity does

mod connection;
mod server;

pub use connection::Connection;
pub use server::{Server, ServerHandle};
