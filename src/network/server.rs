//! TCP Server
//!
//! Accepts connections and runs each one on its own thread.

use std::io::ErrorKind;
use std::net::{SocketAddr, TcpListener};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use crate::config::Config;
use crate::crypto::RsaKeyPair;
use crate::error::{AgoraError, Result};
use crate::market::Marketplace;
use crate::transport::TcpTransport;

use super::Connection;

/// How long the accept loop sleeps when no connection is waiting
const ACCEPT_POLL_MS: u64 = 10;

/// TCP server for the marketplace
pub struct Server {
    config: Config,
    market: Arc<Marketplace>,
    /// Server keypair, shared by every connection's responder
    keys: Arc<RsaKeyPair>,
    listener: Option<TcpListener>,
    shutdown: Arc<AtomicBool>,
    active: Arc<AtomicUsize>,
}

/// Stops a running [`Server`] from another thread
#[derive(Debug, Clone)]
pub struct ShutdownHandle(Arc<AtomicBool>);

impl ShutdownHandle {
    pub fn shutdown(&self) {
        self.0.store(true, Ordering::Relaxed);
    }
}

impl Server {
    /// Create a server, generating its RSA keypair
    pub fn new(config: Config, market: Arc<Marketplace>) -> Result<Self> {
        config.validate()?;
        tracing::debug!("Generating {}-bit server keypair", config.rsa_key_bits);
        let keys = Arc::new(RsaKeyPair::generate(config.rsa_key_bits)?);
        Ok(Self::with_keys(config, market, keys))
    }

    /// Create a server around an existing keypair
    pub fn with_keys(config: Config, market: Arc<Marketplace>, keys: Arc<RsaKeyPair>) -> Self {
        Self {
            config,
            market,
            keys,
            listener: None,
            shutdown: Arc::new(AtomicBool::new(false)),
            active: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Bind the listening socket; returns the bound address
    pub fn bind(&mut self) -> Result<SocketAddr> {
        let listener = TcpListener::bind(&self.config.listen_addr)?;
        listener.set_nonblocking(true)?;
        let addr = listener.local_addr()?;
        self.listener = Some(listener);
        tracing::info!("Listening on {}", addr);
        Ok(addr)
    }

    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.listener.as_ref().and_then(|l| l.local_addr().ok())
    }

    pub fn shutdown_handle(&self) -> ShutdownHandle {
        ShutdownHandle(Arc::clone(&self.shutdown))
    }

    /// Number of connections currently served
    pub fn active_connections(&self) -> usize {
        self.active.load(Ordering::Relaxed)
    }

    /// Start the server (blocking until shutdown)
    pub fn run(&mut self) -> Result<()> {
        if self.listener.is_none() {
            self.bind()?;
        }
        let listener = self
            .listener
            .as_ref()
            .ok_or_else(|| AgoraError::Config("server is not bound".to_string()))?;

        while !self.shutdown.load(Ordering::Relaxed) {
            match listener.accept() {
                Ok((stream, addr)) => {
                    if self.active.load(Ordering::Relaxed) >= self.config.max_connections {
                        tracing::warn!(
                            "Refusing {}: {} connections already open",
                            addr,
                            self.config.max_connections
                        );
                        continue;
                    }
                    if let Err(e) = self.spawn(stream) {
                        tracing::warn!("Failed to set up connection from {}: {}", addr, e);
                    }
                }
                Err(ref e) if e.kind() == ErrorKind::WouldBlock => {
                    thread::sleep(Duration::from_millis(ACCEPT_POLL_MS));
                }
                Err(e) => {
                    tracing::warn!("Accept failed: {}", e);
                }
            }
        }

        tracing::info!("Server shutting down");
        self.listener = None;
        Ok(())
    }

    /// Signal the server to shutdown gracefully
    pub fn shutdown(&self) {
        self.shutdown.store(true, Ordering::Relaxed);
    }

    fn spawn(&self, stream: std::net::TcpStream) -> Result<()> {
        // Accepted sockets inherit non-blocking mode from the listener
        stream.set_nonblocking(false)?;
        let mut transport = TcpTransport::new(stream, self.config.max_frame_size)?;
        transport.set_timeouts(self.config.read_timeout_ms, self.config.write_timeout_ms)?;

        let peer = transport.peer_addr().to_string();
        let connection = Connection::new(
            transport,
            peer,
            Arc::clone(&self.keys),
            Arc::clone(&self.market),
        );
        let guard = ActiveGuard::enter(Arc::clone(&self.active));

        thread::Builder::new()
            .name("agora-conn".to_string())
            .spawn(move || {
                let _guard = guard;
                let peer = connection.peer_addr().to_string();
                if let Err(e) = connection.handle() {
                    tracing::warn!("Connection {} ended with error: {}", peer, e);
                }
            })?;
        Ok(())
    }
}

/// Counts a connection as active for as long as it lives
struct ActiveGuard(Arc<AtomicUsize>);

impl ActiveGuard {
    fn enter(active: Arc<AtomicUsize>) -> Self {
        active.fetch_add(1, Ordering::Relaxed);
        Self(active)
    }
}

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::Relaxed);
    }
}
