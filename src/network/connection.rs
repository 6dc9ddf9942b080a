//! Connection Handler
//!
//! Handles individual client connections. The first request must be
//! `Hello`, naming the (project, instance) namespace; every later request
//! on the connection is executed against it.

use std::io::{BufReader, BufWriter};
use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{Result, TabletError};
use crate::protocol::{read_request, write_response, Request, Response};
use crate::service::Emulator;
use crate::store::InstanceKey;

/// Handles a single client connection
pub struct Connection {
    /// TCP stream reader (buffered for efficiency)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (buffered for efficiency)
    writer: BufWriter<TcpStream>,

    /// Reference to the emulator
    emulator: Arc<Emulator>,

    /// Peer address for logging
    peer_addr: String,

    /// Namespace set by the connection's Hello
    namespace: Option<InstanceKey>,
}

impl Connection {
    /// Create a new connection handler
    ///
    /// Sets up buffered I/O; call `set_timeouts` before `handle` to bound
    /// blocking reads/writes.
    pub fn new(stream: TcpStream, emulator: Arc<Emulator>) -> Result<Self> {
        let peer_addr = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());

        // Disable Nagle's algorithm for low latency
        stream.set_nodelay(true)?;

        let read_stream = stream.try_clone()?;
        let write_stream = stream;

        Ok(Self {
            reader: BufReader::new(read_stream),
            writer: BufWriter::new(write_stream),
            emulator,
            peer_addr,
            namespace: None,
        })
    }

    /// Configure connection timeouts
    pub fn set_timeouts(&mut self, read_ms: u64, write_ms: u64) -> Result<()> {
        let read_stream = self.reader.get_ref();
        let write_stream = self.writer.get_ref();

        if read_ms > 0 {
            read_stream.set_read_timeout(Some(Duration::from_millis(read_ms)))?;
        }
        if write_ms > 0 {
            write_stream.set_write_timeout(Some(Duration::from_millis(write_ms)))?;
        }

        Ok(())
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Reads requests in a loop and sends responses. Returns when the
    /// client disconnects or an unrecoverable error occurs.
    pub fn handle(&mut self) -> Result<()> {
        tracing::debug!("connection established from {}", self.peer_addr);

        loop {
            let request = match read_request(&mut self.reader) {
                Ok(request) => request,
                Err(TabletError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::UnexpectedEof
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::ConnectionAborted
                    ) =>
                {
                    tracing::debug!("client {} disconnected", self.peer_addr);
                    return Ok(());
                }
                Err(TabletError::Io(ref e))
                    if matches!(
                        e.kind(),
                        std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut
                    ) =>
                {
                    tracing::debug!("read timeout for client {}", self.peer_addr);
                    return Ok(());
                }
                Err(e) => {
                    tracing::warn!("error reading from {}: {}", self.peer_addr, e);
                    let _ = self.send_response(Response::error(&e));
                    return Err(e);
                }
            };

            tracing::trace!("received request from {}: {:?}", self.peer_addr, request);

            let response = self.dispatch(request);

            if let Err(e) = self.send_response(response) {
                // If the client disconnected before the response went out,
                // exit quietly instead of reporting a server error.
                if let TabletError::Io(ref io_err) = e {
                    if matches!(
                        io_err.kind(),
                        std::io::ErrorKind::ConnectionAborted
                            | std::io::ErrorKind::ConnectionReset
                            | std::io::ErrorKind::BrokenPipe
                    ) {
                        tracing::debug!(
                            "client {} disconnected before response could be sent: {}",
                            self.peer_addr,
                            e
                        );
                        return Ok(());
                    }
                }
                tracing::warn!("error writing to {}: {}", self.peer_addr, e);
                return Err(e);
            }
        }
    }

    /// Route one request: Hello binds the namespace, everything else goes
    /// to the emulator under the bound namespace.
    fn dispatch(&mut self, request: Request) -> Response {
        if let Request::Hello { project, instance } = request {
            return match InstanceKey::new(project, instance) {
                Ok(key) => {
                    tracing::debug!(namespace = %key, peer = %self.peer_addr, "namespace bound");
                    self.namespace = Some(key);
                    Response::Ok
                }
                Err(e) => Response::error(&e),
            };
        }

        match &self.namespace {
            Some(ns) => self.emulator.execute(ns, request),
            None => Response::error(&TabletError::Protocol(
                "first request must be hello".to_string(),
            )),
        }
    }

    /// Send a response to the client
    fn send_response(&mut self, response: Response) -> Result<()> {
        write_response(&mut self.writer, &response)?;
        Ok(())
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }
}
