//! Agora Server Binary
//!
//! Starts the TCP marketplace server.

use std::sync::Arc;

use agora::network::Server;
use agora::{Config, Marketplace};
use clap::Parser;
use tracing_subscriber::{fmt, EnvFilter};

/// Agora Server
#[derive(Parser, Debug)]
#[command(name = "agora-server")]
#[command(about = "Classified-ads marketplace over an encrypted command protocol")]
#[command(version)]
struct Args {
    /// Listen address (host:port)
    #[arg(short, long, default_value = "127.0.0.1:7878")]
    listen: String,

    /// Maximum concurrent connections
    #[arg(short, long, default_value = "64")]
    max_connections: usize,

    /// RSA modulus size of the server keypair
    #[arg(short, long, default_value = "2048")]
    rsa_bits: usize,

    /// Domain offered by the marketplace (repeatable; defaults to the seed list)
    #[arg(short, long = "domain")]
    domains: Vec<String>,
}

fn main() {
    // Initialize tracing/logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,agora=debug"));

    fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_ids(true)
        .init();

    let args = Args::parse();

    tracing::info!("Agora Server v{}", agora::VERSION);
    tracing::info!("Listen address: {}", args.listen);

    // Build config from args
    let mut builder = Config::builder()
        .listen_addr(&args.listen)
        .max_connections(args.max_connections)
        .rsa_key_bits(args.rsa_bits);
    if !args.domains.is_empty() {
        builder = builder.domains(args.domains);
    }
    let config = builder.build();

    let market = Arc::new(Marketplace::from_config(&config));
    tracing::info!("Marketplace offering {} domains", market.domains().len());

    let mut server = match Server::new(config, market) {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Failed to start server: {}", e);
            std::process::exit(1);
        }
    };

    if let Err(e) = server.run() {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }

    tracing::info!("Server stopped");
}
