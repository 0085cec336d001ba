//! Connection Handler
//!
//! Drives one client connection: handshake, then a strictly sequential
//! receive / dispatch / reply loop.

use std::sync::Arc;

use crate::channel::SecureChannel;
use crate::crypto::RsaKeyPair;
use crate::error::{AgoraError, Result};
use crate::handshake::Responder;
use crate::market::{MarketHandler, Marketplace};
use crate::session::ServerDispatcher;
use crate::transport::Transport;

/// Handles a single client connection
pub struct Connection<T: Transport> {
    transport: T,

    /// Peer address for logging
    peer_addr: String,

    keys: Arc<RsaKeyPair>,

    market: Arc<Marketplace>,
}

impl<T: Transport> Connection<T> {
    pub fn new(
        transport: T,
        peer_addr: impl Into<String>,
        keys: Arc<RsaKeyPair>,
        market: Arc<Marketplace>,
    ) -> Self {
        Self {
            transport,
            peer_addr: peer_addr.into(),
            keys,
            market,
        }
    }

    /// Get the peer address string
    pub fn peer_addr(&self) -> &str {
        &self.peer_addr
    }

    /// Handle the connection (blocking until closed)
    ///
    /// Returns `Ok` when the client goes away and `Err` when the session
    /// is torn down by a fatal error.
    pub fn handle(self) -> Result<()> {
        let Connection {
            transport,
            peer_addr,
            keys,
            market,
        } = self;
        tracing::debug!("Connection established from {}", peer_addr);

        let mut responder = Responder::new(keys);
        let mut channel = match SecureChannel::accept(transport, &mut responder) {
            Ok(channel) => channel,
            Err(AgoraError::ConnectionClosed) => {
                tracing::debug!("Client {} left during key exchange", peer_addr);
                return Ok(());
            }
            Err(e) => return Err(e),
        };

        // Dropping the handler signs the account out
        let mut dispatcher = ServerDispatcher::new(MarketHandler::new(market));

        loop {
            let request = match channel.recv() {
                Ok(request) => request,
                Err(AgoraError::ConnectionClosed) => {
                    tracing::debug!("Client {} disconnected", peer_addr);
                    return Ok(());
                }
                Err(AgoraError::Timeout) => {
                    tracing::debug!("Read timeout for client {}", peer_addr);
                    return Ok(());
                }
                Err(e) if !e.is_fatal() => {
                    tracing::warn!("Bad envelope from {}: {}", peer_addr, e);
                    if let Some(refusal) = dispatcher.reject(&e) {
                        channel.send(&refusal)?;
                    }
                    continue;
                }
                Err(e) => {
                    tracing::warn!("Error reading from {}: {}", peer_addr, e);
                    return Err(e);
                }
            };

            tracing::trace!("Received {} from {}", request.command(), peer_addr);

            let replies = match dispatcher.dispatch(request) {
                Ok(replies) => replies,
                Err(e) => {
                    tracing::warn!("Dropping request from {}: {}", peer_addr, e);
                    continue;
                }
            };

            for reply in &replies {
                match channel.send(reply) {
                    Ok(()) => {}
                    Err(AgoraError::ConnectionClosed) => {
                        tracing::debug!(
                            "Client {} disconnected before {} could be sent",
                            peer_addr,
                            reply.command()
                        );
                        return Ok(());
                    }
                    Err(e) => {
                        tracing::warn!("Error writing to {}: {}", peer_addr, e);
                        return Err(e);
                    }
                }
            }
        }
    }
}
