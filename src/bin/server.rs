//! tabletkv Server Binary
//!
//! Starts the TCP frontend for the emulator.

use std::sync::Arc;

use clap::Parser;
use tabletkv::network::Server;
use tabletkv::{Config, Emulator};
use tracing_subscriber::{fmt, EnvFilter};

/// tabletkv Server
#[derive(Parser, Debug)]
#[command(name = "tabletkv-server")]
#[command(about = "In-memory wide-column store emulator")]
#[command(version)]
struct Args {
    /// Listen address (host:port, port 0 picks a free one)
    #[arg(short, long, default_value = "127.0.0.1:9035")]
    listen: String,

    /// Connection worker threads
    #[arg(short, long, default_value = "8")]
    workers: usize,

    /// Connection write timeout in milliseconds (0 disables)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,tabletkv=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("tabletkv server v{}", tabletkv::VERSION);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .worker_threads(args.workers)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let emulator = Arc::new(Emulator::new());

    let mut handle = match Server::start(config, emulator) {
        Ok(handle) => handle,
        Err(e) => {
            tracing::error!("failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("emulator ready at {}", handle.local_addr());

    // Serve until the process is terminated.
    handle.join();
}
