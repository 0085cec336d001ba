//! Parameter definitions
//!
//! One strongly typed struct per command payload, plus the value objects
//! they carry. Field names on the wire are PascalCase (`Mail`, `Pwd`, ...);
//! value objects nested inside arrays keep lowercase names.

use serde::{Deserialize, Serialize};

use super::ErrorLogMessage;

// =============================================================================
// Value Objects
// =============================================================================

/// A category of annonces
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Domain(String);

impl Domain {
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Domain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// A listing published by an account
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Annonce {
    pub domain: Domain,
    pub title: String,
    pub descriptif: String,
    pub price: i64,
    pub id: i64,
    /// Mail of the owning account
    pub owner: String,
}

/// Where a peer can be reached over UDP
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UdpCoordinate {
    pub addr: String,
    pub port: u16,
}

// =============================================================================
// Shared Payloads
// =============================================================================

/// Payload of commands that declare no field
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct NoParams {}

/// Payload of every `*_KO` response
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Failure {
    pub error: ErrorLogMessage,
}

impl From<ErrorLogMessage> for Failure {
    fn from(error: ErrorLogMessage) -> Self {
        Self { error }
    }
}

// =============================================================================
// Handshake
// =============================================================================

/// Initiator's public key and the session IV
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyExchange {
    /// SubjectPublicKeyInfo DER
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    #[serde(rename = "IV", with = "base64_bytes")]
    pub iv: Vec<u8>,
}

/// Responder's public key and the wrapped session key
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct KeyExchangeOk {
    #[serde(with = "base64_bytes")]
    pub public_key: Vec<u8>,
    /// AES key encrypted under the initiator's public key
    #[serde(with = "base64_bytes")]
    pub session_key: Vec<u8>,
}

// =============================================================================
// Accounts
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignUp {
    pub mail: String,
    pub name: String,
    pub pwd: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignIn {
    pub mail: String,
    pub pwd: String,
    /// Ask the server to follow SIGN_IN_OK with DOMAINS_LIST_OK
    pub send_domain_list: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct SignInOk {
    pub name: String,
}

// =============================================================================
// Domains and Annonces
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DomainsListOk {
    pub domains: Vec<Domain>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAnnonce {
    pub domain: Domain,
    pub title: String,
    pub descriptif: String,
    pub price: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CreateAnnonceOk {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UpdateAnnonce {
    pub title: String,
    pub descriptif: String,
    pub price: i64,
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RemoveAnnonce {
    pub id: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnonceFromDomain {
    pub domain: Domain,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct AnnonceFromDomainOk {
    pub annonces_from_domain: Vec<Annonce>,
}

// =============================================================================
// UDP Rendez-vous
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UdpServer {
    pub address: String,
    pub port: u16,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct RequestUdpCoordinates {
    pub mail: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UdpCoordinatesOk {
    pub mail: String,
    pub coord: UdpCoordinate,
}

// =============================================================================
// Byte Fields
// =============================================================================

/// Standard base64 inside JSON strings
pub(crate) mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let text = String::deserialize(deserializer)?;
        STANDARD.decode(text.as_bytes()).map_err(serde::de::Error::custom)
    }
}
