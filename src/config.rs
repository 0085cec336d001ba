//! Configuration for Agora
//!
//! Centralized configuration with sensible defaults, shared by the server
//! and the client.

use crate::error::{AgoraError, Result};

/// Categories a fresh marketplace starts with
pub const DEFAULT_DOMAINS: &[&str] = &[
    "Electronics",
    "Vehicles",
    "Housing",
    "Jobs",
    "Services",
    "Leisure",
];

/// Main configuration for an Agora endpoint
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Network Configuration
    // -------------------------------------------------------------------------
    /// TCP listen address (server) or server address (client)
    pub listen_addr: String,

    /// Max concurrent client connections
    pub max_connections: usize,

    /// Connection read timeout (milliseconds, 0 = none)
    pub read_timeout_ms: u64,

    /// Connection write timeout (milliseconds, 0 = none)
    pub write_timeout_ms: u64,

    /// Largest frame accepted from the peer (bytes)
    pub max_frame_size: usize,

    // -------------------------------------------------------------------------
    // Handshake Configuration
    // -------------------------------------------------------------------------
    /// RSA modulus size for generated keypairs
    pub rsa_key_bits: usize,

    // -------------------------------------------------------------------------
    // Marketplace Configuration
    // -------------------------------------------------------------------------
    /// Domains the marketplace is seeded with
    pub domains: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            listen_addr: "127.0.0.1:7878".to_string(),
            max_connections: 64,
            read_timeout_ms: 30_000,
            write_timeout_ms: 5_000,
            max_frame_size: 1024 * 1024, // 1 MiB
            rsa_key_bits: 2048,
            domains: DEFAULT_DOMAINS.iter().map(|d| d.to_string()).collect(),
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Check the values make a usable endpoint
    pub fn validate(&self) -> Result<()> {
        if self.listen_addr.trim().is_empty() {
            return Err(AgoraError::Config("listen address is empty".to_string()));
        }
        if self.rsa_key_bits < 1024 {
            return Err(AgoraError::Config(format!(
                "RSA key size {} is below the 1024-bit minimum",
                self.rsa_key_bits
            )));
        }
        if self.max_frame_size == 0 {
            return Err(AgoraError::Config("max frame size must be positive".to_string()));
        }
        if self.max_connections == 0 {
            return Err(AgoraError::Config("max connections must be positive".to_string()));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the TCP listen address
    pub fn listen_addr(mut self, addr: impl Into<String>) -> Self {
        self.config.listen_addr = addr.into();
        self
    }

    /// Set the maximum number of concurrent connections
    pub fn max_connections(mut self, count: usize) -> Self {
        self.config.max_connections = count;
        self
    }

    /// Set the read timeout (in milliseconds)
    pub fn read_timeout_ms(mut self, ms: u64) -> Self {
        self.config.read_timeout_ms = ms;
        self
    }

    /// Set the write timeout (in milliseconds)
    pub fn write_timeout_ms(mut self, ms: u64) -> Self {
        self.config.write_timeout_ms = ms;
        self
    }

    /// Set the largest accepted frame (in bytes)
    pub fn max_frame_size(mut self, bytes: usize) -> Self {
        self.config.max_frame_size = bytes;
        self
    }

    /// Set the RSA modulus size used for keypair generation
    pub fn rsa_key_bits(mut self, bits: usize) -> Self {
        self.config.rsa_key_bits = bits;
        self
    }

    /// Replace the seed domain list
    pub fn domains<I, S>(mut self, domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.domains = domains.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
