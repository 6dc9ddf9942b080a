//! Protocol Module
//!
//! Defines the wire protocol for client-server communication. Decoded
//! messages are tagged request/response enums; the engines never see the
//! wire format.
//!
//! ## Frame Format (V1)
//! ```text
//! ┌──────────┬──────────┬─────────────────────────────┐
//! │ Len (4)  │ Crc (4)  │   Payload (bincode)         │
//! └──────────┴──────────┴─────────────────────────────┘
//! ```
//!
//! - `Len`: payload length in bytes, big-endian, capped at 16 MB
//! - `Crc`: CRC32 of the payload
//! - `Payload`: one bincode-serialized `Request` or `Response`
//!
//! A connection opens with `Request::Hello { project, instance }`; the
//! (project, instance) pair is the namespace every subsequent request on
//! that connection is addressed to.

mod codec;
mod request;
mod response;

pub use codec::{
    decode_request, decode_response, encode_request, encode_response, read_request,
    read_response, write_request, write_response, HEADER_SIZE, MAX_PAYLOAD_SIZE,
};
pub use request::Request;
pub use response::{CellEntry, ErrorKind, Response, RowBlock};
