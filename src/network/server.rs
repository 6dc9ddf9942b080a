//! TCP Server
//!
//! Accepts connections and dispatches them to a worker pool. Each worker
//! runs one connection at a time to completion; concurrency across
//! clients comes from the pool width. Shutdown releases the listener,
//! drains the pool, and leaves the emulator itself untouched (its state
//! dies with the process or with the owner dropping it).

use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;

use crossbeam::channel::{self, Receiver, Sender};

use crate::config::Config;
use crate::error::Result;
use crate::network::Connection;
use crate::service::Emulator;

/// TCP server frontend for the emulator
pub struct Server;

impl Server {
    /// Bind the listener and start serving. Returns once the acceptor and
    /// workers are running; the handle reports the bound endpoint address
    /// clients should dial (useful with a `:0` listen address).
    pub fn start(config: Config, emulator: Arc<Emulator>) -> Result<ServerHandle> {
        let listener = TcpListener::bind(&config.listen_addr)?;
        let local_addr = listener.local_addr()?;
        let shutdown = Arc::new(AtomicBool::new(false));

        let (sender, receiver): (Sender<TcpStream>, Receiver<TcpStream>) = channel::unbounded();

        let mut workers = Vec::with_capacity(config.worker_threads);
        for worker_id in 0..config.worker_threads {
            let receiver = receiver.clone();
            let emulator = emulator.clone();
            let config = config.clone();
            workers.push(
                std::thread::Builder::new()
                    .name(format!("tabletkv-worker-{}", worker_id))
                    .spawn(move || worker_loop(worker_id, receiver, emulator, config))?,
            );
        }

        let acceptor = {
            let shutdown = shutdown.clone();
            std::thread::Builder::new()
                .name("tabletkv-acceptor".to_string())
                .spawn(move || accept_loop(listener, sender, shutdown))?
        };

        tracing::info!(%local_addr, workers = config.worker_threads, "server listening");

        Ok(ServerHandle {
            local_addr,
            shutdown,
            acceptor: Some(acceptor),
            workers,
        })
    }
}

fn accept_loop(listener: TcpListener, sender: Sender<TcpStream>, shutdown: Arc<AtomicBool>) {
    loop {
        match listener.accept() {
            Ok((stream, _)) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                if sender.send(stream).is_err() {
                    break;
                }
            }
            Err(e) => {
                if shutdown.load(Ordering::SeqCst) {
                    break;
                }
                tracing::warn!("accept failed: {}", e);
            }
        }
    }
    // Dropping the sender here closes the channel; workers drain whatever
    // is queued and then exit.
    tracing::debug!("acceptor stopped");
}

fn worker_loop(
    worker_id: usize,
    receiver: Receiver<TcpStream>,
    emulator: Arc<Emulator>,
    config: Config,
) {
    for stream in receiver.iter() {
        let peer = stream
            .peer_addr()
            .map(|a| a.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        match Connection::new(stream, emulator.clone()) {
            Ok(mut connection) => {
                if let Err(e) =
                    connection.set_timeouts(config.read_timeout_ms, config.write_timeout_ms)
                {
                    tracing::warn!(worker_id, peer = %peer, "failed to set timeouts: {}", e);
                }
                if let Err(e) = connection.handle() {
                    tracing::warn!(worker_id, peer = %peer, "connection ended with error: {}", e);
                }
            }
            Err(e) => {
                tracing::warn!(worker_id, peer = %peer, "failed to set up connection: {}", e);
            }
        }
    }
    tracing::debug!(worker_id, "worker stopped");
}

/// Handle to a running server: the bound endpoint plus shutdown control.
pub struct ServerHandle {
    local_addr: SocketAddr,
    shutdown: Arc<AtomicBool>,
    acceptor: Option<JoinHandle<()>>,
    workers: Vec<JoinHandle<()>>,
}

impl ServerHandle {
    /// The address clients should dial.
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Stop accepting, wake the blocked acceptor, and drain the workers.
    /// Idempotent; connections already handed to workers finish their
    /// in-flight request loop before the pool drains.
    pub fn shutdown(&mut self) {
        if self.shutdown.swap(true, Ordering::SeqCst) {
            return;
        }
        // Wake the acceptor out of its blocking accept.
        let _ = TcpStream::connect(self.local_addr);
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
        tracing::info!("server stopped");
    }

    /// Block until the acceptor exits (for a foreground server binary).
    pub fn join(&mut self) {
        if let Some(acceptor) = self.acceptor.take() {
            let _ = acceptor.join();
        }
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.shutdown();
    }
}
