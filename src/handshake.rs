//! Handshake Engine
//!
//! Establishes the session key of one connection:
//! 1. Initiator sends its RSA public key and a fresh IV
//!    (`REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_AND_SEND_IV`)
//! 2. Responder generates the AES session key, wraps it under that public
//!    key and answers with its own public key and the wrapped key
//!    (`REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_OK`)
//! 3. Initiator unwraps the session key; both sides hold the same
//!    [`SessionCipher`]
//!
//! ```text
//! Init ──hello──▶ KeySent ──OK──▶ KeyReceived ──unwrap──▶ SessionEstablished
//!   └──────────────────┴────────────────┴── any failure ──▶ Failed
//! ```
//!
//! A failed handshake is never retried here; the connection is torn down.

use std::sync::Arc;

use zeroize::Zeroize;

use crate::crypto::{
    parse_public_key, random_iv, random_session_key, wrap_session_key, RsaKeyPair,
    SessionCipher, IV_SIZE,
};
use crate::error::{AgoraError, Result};
use crate::protocol::{ErrorLogMessage, Failure, KeyExchange, KeyExchangeOk, Request};

/// Per-connection handshake / session state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandshakeState {
    Init,
    KeySent,
    KeyReceived,
    SessionEstablished,
    Closed,
    Failed,
}

impl HandshakeState {
    pub fn is_terminal(self) -> bool {
        matches!(self, HandshakeState::Closed | HandshakeState::Failed)
    }
}

// =============================================================================
// Initiator (client side)
// =============================================================================

/// The side that opens the key exchange
pub struct Initiator {
    state: HandshakeState,
    keys: RsaKeyPair,
    iv: [u8; IV_SIZE],
}

impl Initiator {
    /// Use an existing keypair with a fresh IV
    pub fn new(keys: RsaKeyPair) -> Self {
        Self {
            state: HandshakeState::Init,
            keys,
            iv: random_iv(),
        }
    }

    /// Generate a keypair with a `bits`-bit modulus
    pub fn generate(bits: usize) -> Result<Self> {
        Ok(Self::new(RsaKeyPair::generate(bits)?))
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Build the opening message (`Init → KeySent`)
    pub fn hello(&mut self) -> Result<Request> {
        if self.state != HandshakeState::Init {
            return Err(AgoraError::Handshake(format!(
                "cannot send key exchange in state {:?}",
                self.state
            )));
        }

        let public_key = match self.keys.public_key_der() {
            Ok(der) => der,
            Err(e) => {
                self.state = HandshakeState::Failed;
                return Err(e);
            }
        };

        self.state = HandshakeState::KeySent;
        Ok(Request::KeyExchange(KeyExchange {
            public_key,
            iv: self.iv.to_vec(),
        }))
    }

    /// Consume the responder's answer (`KeySent → SessionEstablished`)
    pub fn finish(&mut self, response: Request) -> Result<SessionCipher> {
        if self.state != HandshakeState::KeySent {
            return Err(AgoraError::Handshake(format!(
                "unexpected key exchange answer in state {:?}",
                self.state
            )));
        }

        match self.complete(response) {
            Ok(cipher) => {
                self.state = HandshakeState::SessionEstablished;
                Ok(cipher)
            }
            Err(e) => {
                self.state = HandshakeState::Failed;
                Err(e)
            }
        }
    }

    /// Mark the handshake failed (transport error while waiting)
    pub fn abort(&mut self) {
        if !self.state.is_terminal() && self.state != HandshakeState::SessionEstablished {
            self.state = HandshakeState::Failed;
        }
    }

    fn complete(&mut self, response: Request) -> Result<SessionCipher> {
        match response {
            Request::KeyExchangeOk(answer) => {
                self.state = HandshakeState::KeyReceived;
                // The responder key is not used further but must be well formed
                parse_public_key(&answer.public_key)?;
                let key = self.keys.unwrap_session_key(&answer.session_key)?;
                Ok(SessionCipher::new(key, self.iv))
            }
            Request::KeyExchangeKo(refusal) => Err(AgoraError::Handshake(format!(
                "peer refused the key exchange: {}",
                refusal.error
            ))),
            other => Err(AgoraError::Handshake(format!(
                "unexpected {} during key exchange",
                other.command()
            ))),
        }
    }
}

// =============================================================================
// Responder (server side)
// =============================================================================

/// The side that answers the key exchange and picks the session key
pub struct Responder {
    state: HandshakeState,
    keys: Arc<RsaKeyPair>,
}

impl Responder {
    /// `keys` is the server keypair, shared by all connections
    pub fn new(keys: Arc<RsaKeyPair>) -> Self {
        Self {
            state: HandshakeState::Init,
            keys,
        }
    }

    pub fn state(&self) -> HandshakeState {
        self.state
    }

    /// Answer the initiator's opening message
    ///
    /// Returns the reply to send in the clear and the session cipher to use
    /// for everything after it.
    pub fn respond(&mut self, hello: Request) -> Result<(Request, SessionCipher)> {
        if self.state != HandshakeState::Init {
            return Err(AgoraError::Handshake(format!(
                "unexpected key exchange in state {:?}",
                self.state
            )));
        }

        match self.answer(hello) {
            Ok(answer) => {
                self.state = HandshakeState::SessionEstablished;
                Ok(answer)
            }
            Err(e) => {
                self.state = HandshakeState::Failed;
                Err(e)
            }
        }
    }

    /// Mark the handshake failed (transport error while waiting)
    pub fn abort(&mut self) {
        if !self.state.is_terminal() && self.state != HandshakeState::SessionEstablished {
            self.state = HandshakeState::Failed;
        }
    }

    /// The KO sent before tearing down a failed handshake
    pub fn refusal() -> Request {
        Request::KeyExchangeKo(Failure::from(ErrorLogMessage::HandshakeFailed))
    }

    fn answer(&mut self, hello: Request) -> Result<(Request, SessionCipher)> {
        let exchange = match hello {
            Request::KeyExchange(exchange) => exchange,
            other => {
                return Err(AgoraError::Handshake(format!(
                    "expected key exchange, got {}",
                    other.command()
                )))
            }
        };
        self.state = HandshakeState::KeyReceived;

        let peer = parse_public_key(&exchange.public_key)?;
        let mut key = random_session_key();
        let cipher = SessionCipher::with_iv_bytes(key, &exchange.iv);
        let wrapped = wrap_session_key(&peer, &key);
        key.zeroize();

        let answer = KeyExchangeOk {
            public_key: self.keys.public_key_der()?,
            session_key: wrapped?,
        };
        Ok((Request::KeyExchangeOk(answer), cipher?))
    }
}
