//! authstore Server Binary
//!
//! Loads the snapshot, starts the checkpoint loop and serves TCP clients.

use std::sync::Arc;
use std::time::Duration;

use authstore::network::Server;
use authstore::{Config, Engine};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// authstore Server
#[derive(Parser, Debug)]
#[command(name = "authstore-server")]
#[command(about = "Concurrent user store with verified snapshot checkpoints")]
#[command(version)]
struct Args {
    /// Snapshot document (JSON); need not exist at startup
    #[arg(short, long)]
    dumpfile: String,

    /// Seconds between checkpoints
    #[arg(short, long, default_value = "60")]
    checkpoint_interval: u64,

    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:9080")]
    listen: String,

    /// Maximum in-flight connections (0 = unlimited)
    #[arg(short, long, default_value = "0")]
    max_connections: usize,

    /// Per-connection read timeout in milliseconds (0 = none)
    #[arg(long, default_value = "5000")]
    read_timeout_ms: u64,

    /// Per-connection write timeout in milliseconds (0 = none)
    #[arg(long, default_value = "5000")]
    write_timeout_ms: u64,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,authstore=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("authstore Server v{}", authstore::VERSION);
    tracing::info!("Dump file: {}", args.dumpfile);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .dump_file(&args.dumpfile)
        .checkpoint_interval(Duration::from_secs(args.checkpoint_interval))
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .read_timeout_ms(args.read_timeout_ms)
        .write_timeout_ms(args.write_timeout_ms)
        .build();

    let engine = match Engine::open(config.clone()) {
        Ok(e) => Arc::new(e),
        Err(e) => {
            tracing::error!("Failed to open engine: {}", e);
            std::process::exit(1);
        }
    };

    tracing::info!("Engine initialized successfully");

    let server = match Server::bind(config, Arc::clone(&engine)) {
        Ok(server) => Arc::new(server),
        Err(e) => {
            tracing::error!("Failed to bind: {}", e);
            std::process::exit(1);
        }
    };

    let signalled = Arc::clone(&server);
    if let Err(e) = ctrlc::set_handler(move || {
        tracing::info!("Received Ctrl+C, initiating shutdown...");
        signalled.shutdown();
    }) {
        tracing::warn!("Failed to install Ctrl+C handler: {}", e);
    }

    let served = server.run();

    if let Err(e) = engine.close() {
        tracing::error!("Final checkpoint failed: {}", e);
    }

    if let Err(e) = served {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
