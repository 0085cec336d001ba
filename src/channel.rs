//! Secure Channel
//!
//! A transport wrapped with an established session key. Every envelope is
//! encoded, AES-encrypted and framed on send; received frames are decrypted
//! before they reach the codec.
//!
//! - Decryption failure: channel `Failed` (tamper or desync), no resumption
//! - Peer gone: channel `Closed`
//! - Decode failure: reported, channel stays usable

use zeroize::Zeroize;

use crate::crypto::SessionCipher;
use crate::error::{AgoraError, Result};
use crate::handshake::{HandshakeState, Initiator, Responder};
use crate::protocol::{self, Request};
use crate::transport::Transport;

/// An encrypted request channel
pub struct SecureChannel<T: Transport> {
    transport: T,
    cipher: SessionCipher,
    state: HandshakeState,
}

impl<T: Transport> SecureChannel<T> {
    // =========================================================================
    // Establishment
    // =========================================================================

    /// Run the handshake as initiator over `transport`
    pub fn connect(mut transport: T, initiator: &mut Initiator) -> Result<Self> {
        match Self::initiate(&mut transport, initiator) {
            Ok(cipher) => {
                tracing::debug!("Session established (initiator)");
                Ok(Self::established(transport, cipher))
            }
            Err(e) => {
                initiator.abort();
                tracing::warn!("Key exchange failed: {}", e);
                Err(e)
            }
        }
    }

    /// Run the handshake as responder over `transport`
    pub fn accept(mut transport: T, responder: &mut Responder) -> Result<Self> {
        match Self::respond(&mut transport, responder) {
            Ok(cipher) => {
                tracing::debug!("Session established (responder)");
                Ok(Self::established(transport, cipher))
            }
            Err(e) => {
                responder.abort();
                tracing::warn!("Key exchange failed: {}", e);
                Err(e)
            }
        }
    }

    fn established(transport: T, cipher: SessionCipher) -> Self {
        Self {
            transport,
            cipher,
            state: HandshakeState::SessionEstablished,
        }
    }

    fn initiate(transport: &mut T, initiator: &mut Initiator) -> Result<SessionCipher> {
        let hello = initiator.hello()?;
        transport.send(&protocol::encode(&hello)?)?;

        let answer = protocol::decode(&transport.recv()?).map_err(handshake_error)?;
        initiator.finish(answer)
    }

    fn respond(transport: &mut T, responder: &mut Responder) -> Result<SessionCipher> {
        let hello = protocol::decode(&transport.recv()?).map_err(handshake_error)?;

        match responder.respond(hello) {
            Ok((answer, cipher)) => {
                transport.send(&protocol::encode(&answer)?)?;
                Ok(cipher)
            }
            Err(e) => {
                // Best effort: the peer may already be gone
                if let Ok(refusal) = protocol::encode(&Responder::refusal()) {
                    let _ = transport.send(&refusal);
                }
                Err(e)
            }
        }
    }

    // =========================================================================
    // Session Traffic
    // =========================================================================

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Encrypt and send one envelope
    pub fn send(&mut self, request: &Request) -> Result<()> {
        self.ensure_open()?;
        tracing::trace!("Sending {}", request.command());

        let plaintext = protocol::encode(request)?;
        let ciphertext = self.cipher.encrypt(&plaintext)?;
        self.transport.send(&ciphertext).map_err(|e| self.observe(e))
    }

    /// Receive and decrypt one envelope
    ///
    /// A decode error leaves the channel usable; any other error is terminal.
    pub fn recv(&mut self) -> Result<Request> {
        self.ensure_open()?;

        let ciphertext = self.transport.recv().map_err(|e| self.observe(e))?;
        let plaintext = match self.cipher.decrypt(&ciphertext) {
            Ok(plaintext) => plaintext,
            Err(e) => {
                self.end(HandshakeState::Failed);
                tracing::warn!("Decryption failed, tearing session down: {}", e);
                return Err(e);
            }
        };

        let request = protocol::decode(&plaintext)?;
        tracing::trace!("Received {}", request.command());
        Ok(request)
    }

    /// Close the channel and wipe the session key
    pub fn close(&mut self) {
        if self.state == HandshakeState::SessionEstablished {
            self.end(HandshakeState::Closed);
        }
    }

    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    fn ensure_open(&self) -> Result<()> {
        match self.state {
            HandshakeState::SessionEstablished => Ok(()),
            HandshakeState::Failed => Err(AgoraError::Crypto(
                "session failed, channel integrity lost".to_string(),
            )),
            _ => Err(AgoraError::ConnectionClosed),
        }
    }

    /// Enter a terminal state; the key is unusable from here on
    fn end(&mut self, state: HandshakeState) {
        self.state = state;
        self.cipher.zeroize();
    }

    /// Track transport errors that end the session
    fn observe(&mut self, error: AgoraError) -> AgoraError {
        match error {
            AgoraError::ConnectionClosed => self.end(HandshakeState::Closed),
            AgoraError::Timeout => {}
            _ if error.is_fatal() => self.end(HandshakeState::Failed),
            _ => {}
        }
        error
    }
}

/// Any decode problem during the handshake is fatal to it
fn handshake_error(error: AgoraError) -> AgoraError {
    match error {
        AgoraError::UnknownCommand(_) | AgoraError::MalformedPayload { .. } => {
            AgoraError::Handshake(error.to_string())
        }
        other => other,
    }
}
