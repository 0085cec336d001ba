//! # Agora
//!
//! A classified-ads marketplace speaking an encrypted command protocol:
//! - RSA key exchange establishing a per-connection AES-256 session key
//! - Typed JSON envelopes driven by one declarative command catalog
//! - Every request answered by exactly one OK/KO response
//! - In-memory marketplace backend and a threaded TCP server
//!
//! ## Architecture Overview
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │            ClientDispatcher      ServerDispatcher            │
//! │        (pending expectations)  (handler → OK / KO)          │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ Request
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                  Envelope Codec (JSON)                       │
//! │            {"command": NAME, "param": {...}}                 │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ bytes
//! ┌─────────────────────▼───────────────────────────────────────┐
//! │                    Secure Channel                            │
//! │        Handshake (RSA-OAEP) → SessionCipher (AES-CBC)        │
//! └─────────────────────┬───────────────────────────────────────┘
//!                       │ frames
//!          ┌────────────┴────────────┐
//!          ▼                         ▼
//!   ┌─────────────┐          ┌─────────────┐
//!   │     TCP     │          │  In-memory  │
//!   │ (len|bytes) │          │ (crossbeam) │
//!   └─────────────┘          └─────────────┘
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;

pub mod channel;
pub mod crypto;
pub mod handshake;
pub mod market;
pub mod network;
pub mod protocol;
pub mod session;
pub mod transport;

// =============================================================================
// Public API Re-exports
// =============================================================================

pub use channel::SecureChannel;
pub use config::Config;
pub use error::{AgoraError, Result};
pub use handshake::HandshakeState;
pub use market::Marketplace;
pub use protocol::{ErrorLogMessage, ProtocolCommand, Request};

// =============================================================================
// Version Info
// =============================================================================

/// Current version of Agora
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
