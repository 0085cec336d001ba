//! Error catalog
//!
//! The closed set of user-facing failure reasons carried by KO responses.
//! On the wire each reason is its human-readable text.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

macro_rules! error_log {
    ($( $(#[$meta:meta])* $variant:ident => $text:literal, )*) => {
        /// Failure reason attached to a KO response
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum ErrorLogMessage {
            $( $(#[$meta])* $variant, )*
        }

        impl ErrorLogMessage {
            /// Every catalog entry
            pub const ALL: &'static [ErrorLogMessage] = &[$(ErrorLogMessage::$variant),*];

            /// The text sent on the wire
            pub fn message(self) -> &'static str {
                match self {
                    $( ErrorLogMessage::$variant => $text, )*
                }
            }

            /// Look an entry up by its wire text
            pub fn from_message(text: &str) -> Option<Self> {
                match text {
                    $( $text => Some(ErrorLogMessage::$variant), )*
                    _ => None,
                }
            }
        }
    };
}

error_log! {
    // Accounts
    MailAlreadyTaken => "Mail already taken",
    InvalidMail => "Invalid mail address",
    EmptyField => "A required field is empty",
    InvalidCredentials => "Wrong mail or password",
    AlreadyConnected => "User already connected",
    NotConnected => "You must be signed in",

    // Domains and annonces
    UnknownDomain => "Unknown domain",
    EmptyDomain => "No annonce in that domain",
    InvalidPrice => "Invalid price",
    AnnonceNotFound => "Annonce not found",
    NotOwner => "Not owner of that annonce",

    // UDP rendez-vous
    InvalidAddress => "Invalid UDP address",
    UnknownUser => "Unknown user",
    UdpCoordinatesUnavailable => "No UDP coordinates for that user",

    // Protocol
    MalformedRequest => "Malformed request",
    HandshakeFailed => "Key exchange failed",
    /// Fallback when no specific entry applies
    NotRespondingToRequest => "Server not responding to request",
}

impl std::fmt::Display for ErrorLogMessage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.message())
    }
}

impl Serialize for ErrorLogMessage {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.message())
    }
}

impl<'de> Deserialize<'de> for ErrorLogMessage {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let text = String::deserialize(deserializer)?;
        ErrorLogMessage::from_message(&text)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown error message {:?}", text)))
    }
}
