//! Protocol codec
//!
//! Encoding and decoding functions for the wire protocol: length-prefixed
//! frames carrying a CRC32-checksummed bincode payload. Corrupted or
//! oversized frames are rejected with protocol errors before any
//! deserialization is attempted.

use std::io::{Read, Write};

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Result, TabletError};

use super::{Request, Response};

/// Header size: 4 bytes payload length + 4 bytes CRC32
pub const HEADER_SIZE: usize = 8;

/// Maximum payload size (16 MB)
pub const MAX_PAYLOAD_SIZE: u32 = 16 * 1024 * 1024;

// =============================================================================
// Frame helpers
// =============================================================================

fn encode_frame<T: Serialize>(message: &T) -> Result<Vec<u8>> {
    let payload = bincode::serialize(message)
        .map_err(|e| TabletError::Protocol(format!("encode failed: {}", e)))?;
    if payload.len() > MAX_PAYLOAD_SIZE as usize {
        return Err(TabletError::Protocol(format!(
            "payload too large: {} bytes (max {})",
            payload.len(),
            MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = Vec::with_capacity(HEADER_SIZE + payload.len());
    frame.extend_from_slice(&(payload.len() as u32).to_be_bytes());
    frame.extend_from_slice(&crc32fast::hash(&payload).to_be_bytes());
    frame.extend_from_slice(&payload);
    Ok(frame)
}

fn decode_frame<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    if bytes.len() < HEADER_SIZE {
        return Err(TabletError::Protocol(format!(
            "incomplete header: expected {} bytes, got {}",
            HEADER_SIZE,
            bytes.len()
        )));
    }

    let payload_len = u32::from_be_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]) as usize;
    let expected_crc = u32::from_be_bytes([bytes[4], bytes[5], bytes[6], bytes[7]]);

    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(TabletError::Protocol(format!(
            "payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }
    if bytes.len() < HEADER_SIZE + payload_len {
        return Err(TabletError::Protocol(format!(
            "incomplete payload: expected {} bytes, got {}",
            HEADER_SIZE + payload_len,
            bytes.len()
        )));
    }

    let payload = &bytes[HEADER_SIZE..HEADER_SIZE + payload_len];
    let actual_crc = crc32fast::hash(payload);
    if actual_crc != expected_crc {
        return Err(TabletError::Protocol(format!(
            "checksum mismatch: expected 0x{:08x}, got 0x{:08x}",
            expected_crc, actual_crc
        )));
    }

    bincode::deserialize(payload)
        .map_err(|e| TabletError::Protocol(format!("decode failed: {}", e)))
}

fn read_frame<R: Read, T: DeserializeOwned>(reader: &mut R) -> Result<T> {
    let mut header = [0u8; HEADER_SIZE];
    reader.read_exact(&mut header)?;

    let payload_len = u32::from_be_bytes([header[0], header[1], header[2], header[3]]) as usize;
    if payload_len > MAX_PAYLOAD_SIZE as usize {
        return Err(TabletError::Protocol(format!(
            "payload too large: {} bytes (max {})",
            payload_len, MAX_PAYLOAD_SIZE
        )));
    }

    let mut frame = vec![0u8; HEADER_SIZE + payload_len];
    frame[..HEADER_SIZE].copy_from_slice(&header);
    if payload_len > 0 {
        reader.read_exact(&mut frame[HEADER_SIZE..])?;
    }

    decode_frame(&frame)
}

// =============================================================================
// Request Encoding/Decoding
// =============================================================================

/// Encode a request into one wire frame
pub fn encode_request(request: &Request) -> Result<Vec<u8>> {
    encode_frame(request)
}

/// Decode a request from a complete frame
pub fn decode_request(bytes: &[u8]) -> Result<Request> {
    decode_frame(bytes)
}

/// Read a complete request from a stream
///
/// Blocks until a complete frame is received or an error occurs
pub fn read_request<R: Read>(reader: &mut R) -> Result<Request> {
    read_frame(reader)
}

/// Write a request to a stream
pub fn write_request<W: Write>(writer: &mut W, request: &Request) -> Result<()> {
    let frame = encode_request(request)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}

// =============================================================================
// Response Encoding/Decoding
// =============================================================================

/// Encode a response into one wire frame
pub fn encode_response(response: &Response) -> Result<Vec<u8>> {
    encode_frame(response)
}

/// Decode a response from a complete frame
pub fn decode_response(bytes: &[u8]) -> Result<Response> {
    decode_frame(bytes)
}

/// Read a complete response from a stream
pub fn read_response<R: Read>(reader: &mut R) -> Result<Response> {
    read_frame(reader)
}

/// Write a response to a stream
pub fn write_response<W: Write>(writer: &mut W, response: &Response) -> Result<()> {
    let frame = encode_response(response)?;
    writer.write_all(&frame)?;
    writer.flush()?;
    Ok(())
}
