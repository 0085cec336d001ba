//! Protocol Module
//!
//! Defines the command protocol spoken between marketplace clients and the
//! server once a session is established.
//!
//! ## Envelope
//! ```text
//! { "command": <ProtocolCommand name>, "param": { <field>: <value>, ... } }
//! ```
//!
//! ## Exchanges
//! - every request is answered by exactly one OK or KO response
//! - `SIGN_OUT` and `DOMAINS_LIST` cannot fail and only have an OK
//! - KO responses carry an `Error` field, the text of an [`ErrorLogMessage`]
//!
//! ## Command Groups
//! - Handshake: `REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_*` (sent in the clear)
//! - Accounts: `SIGN_UP`, `SIGN_IN`, `SIGN_OUT`
//! - Domains and annonces: `DOMAINS_LIST`, `CREATE_ANNONCE`,
//!   `UPDATE_ANNONCE`, `REMOVE_ANNONCE`, `ANNONCE_FROM_DOMAIN`
//! - UDP rendez-vous: `UDP_SERVER`, `REQUEST_UDP_COORDINATES`

mod command;
mod codec;
mod error_log;
mod params;

pub use command::{CommandRole, FieldKind, FieldSpec, Pairing, ProtocolCommand, Request};
pub use codec::{decode, encode, COMMAND_KEY, PARAM_KEY};
pub use error_log::ErrorLogMessage;
pub use params::{
    Annonce, AnnonceFromDomain, AnnonceFromDomainOk, CreateAnnonce, CreateAnnonceOk, Domain,
    DomainsListOk, Failure, KeyExchange, KeyExchangeOk, NoParams, RemoveAnnonce,
    RequestUdpCoordinates, SignIn, SignInOk, SignUp, UdpCoordinate, UdpCoordinatesOk, UdpServer,
    UpdateAnnonce,
};
