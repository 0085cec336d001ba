//! Error types for Agora
//!
//! Provides a unified error type for all protocol operations. Application
//! failures (wrong password, not owner, ...) are not errors at this level:
//! they travel as [`ErrorLogMessage`](crate::protocol::ErrorLogMessage)
//! values inside KO responses.

use thiserror::Error;

use crate::protocol::ProtocolCommand;

/// Result type alias using AgoraError
pub type Result<T> = std::result::Result<T, AgoraError>;

/// Unified error type for Agora operations
#[derive(Debug, Error)]
pub enum AgoraError {
    // -------------------------------------------------------------------------
    // I/O Errors
    // -------------------------------------------------------------------------
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed")]
    ConnectionClosed,

    #[error("Timed out waiting for the peer")]
    Timeout,

    #[error("Frame too large: {len} bytes (max {max})")]
    FrameTooLarge { len: usize, max: usize },

    // -------------------------------------------------------------------------
    // Protocol Errors
    // -------------------------------------------------------------------------
    #[error("Unknown command: {0}")]
    UnknownCommand(String),

    /// A received envelope does not match the shape its command declares
    #[error("Malformed payload{}: {reason}", command_suffix(.command))]
    MalformedPayload {
        command: Option<ProtocolCommand>,
        reason: String,
    },

    /// An internally built request does not match its declared shape
    #[error("Malformed request {command}: {reason}")]
    MalformedRequest {
        command: ProtocolCommand,
        reason: String,
    },

    #[error("Protocol violation: {0}")]
    ProtocolViolation(String),

    #[error("A {0} request is already awaiting its response")]
    AlreadyPending(ProtocolCommand),

    // -------------------------------------------------------------------------
    // Cryptographic Errors
    // -------------------------------------------------------------------------
    #[error("Crypto error: {0}")]
    Crypto(String),

    #[error("Handshake failed: {0}")]
    Handshake(String),

    // -------------------------------------------------------------------------
    // Serialization Errors
    // -------------------------------------------------------------------------
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    // -------------------------------------------------------------------------
    // Configuration Errors
    // -------------------------------------------------------------------------
    #[error("Configuration error: {0}")]
    Config(String),
}

impl AgoraError {
    /// Build a `MalformedPayload` error for a known command
    pub fn malformed(command: ProtocolCommand, reason: impl Into<String>) -> Self {
        AgoraError::MalformedPayload {
            command: Some(command),
            reason: reason.into(),
        }
    }

    /// Whether the connection must be torn down after this error
    ///
    /// Protocol errors only spoil the current exchange. Crypto and transport
    /// errors mean the channel can no longer be trusted or used.
    pub fn is_fatal(&self) -> bool {
        match self {
            AgoraError::UnknownCommand(_)
            | AgoraError::MalformedPayload { .. }
            | AgoraError::ProtocolViolation(_)
            | AgoraError::AlreadyPending(_) => false,
            AgoraError::Io(_)
            | AgoraError::ConnectionClosed
            | AgoraError::Timeout
            | AgoraError::FrameTooLarge { .. }
            | AgoraError::MalformedRequest { .. }
            | AgoraError::Crypto(_)
            | AgoraError::Handshake(_)
            | AgoraError::Serialization(_)
            | AgoraError::Config(_) => true,
        }
    }
}

fn command_suffix(command: &Option<ProtocolCommand>) -> String {
    match command {
        Some(command) => format!(" for {}", command),
        None => String::new(),
    }
}
