//! sharedvars Server Binary
//!
//! Starts the TCP server for sharedvars.

use std::sync::Arc;

use clap::Parser;
use sharedvars::network::Server;
use sharedvars::{Config, VarStore};
use tracing_subscriber::{fmt, EnvFilter};

/// sharedvars Server
#[derive(Parser, Debug)]
#[command(name = "sharedvars-server")]
#[command(about = "Shared-variable server for connected clients")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:2812")]
    listen: String,

    /// Maximum allocated variable slots across all groups
    #[arg(long, default_value = "1000")]
    max_vars: usize,

    /// Maximum summed size of String/Array values in MB
    #[arg(long, default_value = "64")]
    max_var_mb: usize,

    /// Maximum Owned variables per connection
    #[arg(long, default_value = "50")]
    max_owned: usize,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "1024")]
    max_connections: usize,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,sharedvars=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("sharedvars Server v{}", sharedvars::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    let config = Config::builder()
        .listen_addr(&args.listen)
        .max_vars(args.max_vars)
        .max_var_bytes(args.max_var_mb * 1024 * 1024)
        .max_owned_per_connection(args.max_owned)
        .max_connections(args.max_connections)
        .build();

    tracing::info!(
        "Quotas: {} slots, {} bytes, {} owned per connection",
        config.max_vars,
        config.max_var_bytes,
        config.max_owned_per_connection
    );

    let store = Arc::new(VarStore::new(&config));

    let server = match Server::bind(config, Arc::clone(&store)) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        store.shutdown();
        std::process::exit(1);
    }

    store.shutdown();
}
