//! Command catalog
//!
//! The closed set of protocol operations. One `catalog!` entry per command
//! declares its wire name, role, payload type, wire fields and OK/KO
//! pairing; everything else (codec, dispatchers) is driven from here.

use serde_json::Value;

use super::params::*;
use super::ErrorLogMessage;

/// Which side of an exchange a command belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommandRole {
    /// Sent by the client, answered by the server
    Request,
    /// Positive answer to a request
    Success,
    /// Negative answer to a request, carries an `ErrorLogMessage`
    Failure,
}

/// Semantic type of a wire field
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Integer,
    Boolean,
    /// Standard base64 string
    Bytes,
    /// Integer in 0..=65535
    Port,
    /// Array of domain names
    Domains,
    /// Array of annonce objects
    Annonces,
    /// `{addr, port}` object
    Coordinate,
    /// Text of an `ErrorLogMessage`
    Error,
}

/// A field a command declares
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
}

/// The responses a request may be answered with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pairing {
    pub success: ProtocolCommand,
    /// `None` for requests that cannot fail
    pub failure: Option<ProtocolCommand>,
}

impl Pairing {
    /// Whether `command` answers this pairing's request
    pub fn answers(&self, command: ProtocolCommand) -> bool {
        self.success == command || self.failure == Some(command)
    }
}

macro_rules! catalog {
    (@pairing) => { None };
    (@pairing $ok:ident) => {
        Some(Pairing { success: ProtocolCommand::$ok, failure: None })
    };
    (@pairing $ok:ident $ko:ident) => {
        Some(Pairing { success: ProtocolCommand::$ok, failure: Some(ProtocolCommand::$ko) })
    };

    (@failure $error:ident) => { None };
    (@failure $error:ident $ok:ident) => { None };
    (@failure $error:ident $ok:ident $ko:ident) => {
        Some(Request::$ko(Failure::from($error)))
    };

    ($(
        $(#[$meta:meta])*
        $variant:ident($params:ty) = $wire:literal, $role:ident $([$ok:ident $($ko:ident)?])? {
            $($field:literal: $kind:ident),* $(,)?
        }
    )*) => {
        /// Identifier of a protocol operation
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum ProtocolCommand {
            $( $variant, )*
        }

        impl ProtocolCommand {
            /// Every command in the catalog
            pub const ALL: &'static [ProtocolCommand] = &[$(ProtocolCommand::$variant),*];

            /// Wire name (`SIGN_IN`, `SIGN_IN_OK`, ...)
            pub fn name(self) -> &'static str {
                match self {
                    $( ProtocolCommand::$variant => $wire, )*
                }
            }

            /// Look a command up by its wire name
            pub fn from_name(name: &str) -> Option<Self> {
                match name {
                    $( $wire => Some(ProtocolCommand::$variant), )*
                    _ => None,
                }
            }

            pub fn role(self) -> CommandRole {
                match self {
                    $( ProtocolCommand::$variant => CommandRole::$role, )*
                }
            }

            /// Fields the command carries, in wire order
            pub fn fields(self) -> &'static [FieldSpec] {
                match self {
                    $( ProtocolCommand::$variant => {
                        const FIELDS: &[FieldSpec] = &[
                            $( FieldSpec { name: $field, kind: FieldKind::$kind }, )*
                        ];
                        FIELDS
                    } )*
                }
            }

            /// Responses that answer this command, if it is a request
            pub fn pairing(self) -> Option<Pairing> {
                match self {
                    $( ProtocolCommand::$variant => catalog!(@pairing $($ok $($ko)?)?), )*
                }
            }
        }

        /// A protocol envelope: one variant per command, each with its own
        /// typed payload
        #[derive(Debug, Clone, PartialEq, Eq)]
        pub enum Request {
            $( $(#[$meta])* $variant($params), )*
        }

        impl Request {
            pub fn command(&self) -> ProtocolCommand {
                match self {
                    $( Request::$variant(_) => ProtocolCommand::$variant, )*
                }
            }

            /// The KO answering a `command` request, if it can fail
            pub fn failure(command: ProtocolCommand, error: ErrorLogMessage) -> Option<Request> {
                match command {
                    $( ProtocolCommand::$variant => catalog!(@failure error $($ok $($ko)?)?), )*
                }
            }

            pub(crate) fn to_params(&self) -> serde_json::Result<Value> {
                match self {
                    $( Request::$variant(params) => serde_json::to_value(params), )*
                }
            }

            pub(crate) fn from_params(command: ProtocolCommand, params: Value) -> serde_json::Result<Self> {
                match command {
                    $( ProtocolCommand::$variant => serde_json::from_value(params).map(Request::$variant), )*
                }
            }
        }
    };
}

catalog! {
    // -------------------------------------------------------------------------
    // Handshake (sent in the clear)
    // -------------------------------------------------------------------------
    /// Initiator's public key and session IV
    KeyExchange(KeyExchange) = "REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_AND_SEND_IV",
        Request [KeyExchangeOk KeyExchangeKo] { "PublicKey": Bytes, "IV": Bytes }
    /// Responder's public key and wrapped session key
    KeyExchangeOk(KeyExchangeOk) = "REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_OK",
        Success { "PublicKey": Bytes, "SessionKey": Bytes }
    KeyExchangeKo(Failure) = "REQUEST_EXCHANGE_SERVER_PUBLIC_KEY_KO",
        Failure { "Error": Error }

    // -------------------------------------------------------------------------
    // Accounts
    // -------------------------------------------------------------------------
    SignUp(SignUp) = "SIGN_UP",
        Request [SignUpOk SignUpKo] { "Mail": Text, "Name": Text, "Pwd": Text }
    SignUpOk(NoParams) = "SIGN_UP_OK", Success {}
    SignUpKo(Failure) = "SIGN_UP_KO", Failure { "Error": Error }

    SignIn(SignIn) = "SIGN_IN",
        Request [SignInOk SignInKo] { "Mail": Text, "Pwd": Text, "SendDomainList": Boolean }
    SignInOk(SignInOk) = "SIGN_IN_OK", Success { "Name": Text }
    SignInKo(Failure) = "SIGN_IN_KO", Failure { "Error": Error }

    SignOut(NoParams) = "SIGN_OUT", Request [SignOutOk] {}
    SignOutOk(NoParams) = "SIGN_OUT_OK", Success {}

    // -------------------------------------------------------------------------
    // Domains
    // -------------------------------------------------------------------------
    DomainsList(NoParams) = "DOMAINS_LIST", Request [DomainsListOk] {}
    DomainsListOk(DomainsListOk) = "DOMAINS_LIST_OK", Success { "Domains": Domains }

    // -------------------------------------------------------------------------
    // Annonces
    // -------------------------------------------------------------------------
    CreateAnnonce(CreateAnnonce) = "CREATE_ANNONCE",
        Request [CreateAnnonceOk CreateAnnonceKo] {
            "Domain": Text, "Title": Text, "Descriptif": Text, "Price": Integer
        }
    CreateAnnonceOk(CreateAnnonceOk) = "CREATE_ANNONCE_OK", Success { "Id": Integer }
    CreateAnnonceKo(Failure) = "CREATE_ANNONCE_KO", Failure { "Error": Error }

    UpdateAnnonce(UpdateAnnonce) = "UPDATE_ANNONCE",
        Request [UpdateAnnonceOk UpdateAnnonceKo] {
            "Title": Text, "Descriptif": Text, "Price": Integer, "Id": Integer
        }
    UpdateAnnonceOk(NoParams) = "UPDATE_ANNONCE_OK", Success {}
    UpdateAnnonceKo(Failure) = "UPDATE_ANNONCE_KO", Failure { "Error": Error }

    RemoveAnnonce(RemoveAnnonce) = "REMOVE_ANNONCE",
        Request [RemoveAnnonceOk RemoveAnnonceKo] { "Id": Integer }
    RemoveAnnonceOk(NoParams) = "REMOVE_ANNONCE_OK", Success {}
    RemoveAnnonceKo(Failure) = "REMOVE_ANNONCE_KO", Failure { "Error": Error }

    AnnonceFromDomain(AnnonceFromDomain) = "ANNONCE_FROM_DOMAIN",
        Request [AnnonceFromDomainOk AnnonceFromDomainKo] { "Domain": Text }
    AnnonceFromDomainOk(AnnonceFromDomainOk) = "ANNONCE_FROM_DOMAIN_OK",
        Success { "AnnoncesFromDomain": Annonces }
    AnnonceFromDomainKo(Failure) = "ANNONCE_FROM_DOMAIN_KO", Failure { "Error": Error }

    // -------------------------------------------------------------------------
    // UDP rendez-vous
    // -------------------------------------------------------------------------
    /// Register the sender's UDP coordinates
    UdpServer(UdpServer) = "UDP_SERVER",
        Request [UdpServerOk UdpServerKo] { "Address": Text, "Port": Port }
    UdpServerOk(NoParams) = "UDP_SERVER_OK", Success {}
    UdpServerKo(Failure) = "UDP_SERVER_KO", Failure { "Error": Error }

    /// Look up another account's UDP coordinates
    RequestUdpCoordinates(RequestUdpCoordinates) = "REQUEST_UDP_COORDINATES",
        Request [RequestUdpCoordinatesOk RequestUdpCoordinatesKo] { "Mail": Text }
    RequestUdpCoordinatesOk(UdpCoordinatesOk) = "REQUEST_UDP_COORDINATES_OK",
        Success { "Mail": Text, "Coord": Coordinate }
    RequestUdpCoordinatesKo(Failure) = "REQUEST_UDP_COORDINATES_KO", Failure { "Error": Error }
}

impl ProtocolCommand {
    /// The request a response answers
    pub fn request_for(self) -> Option<ProtocolCommand> {
        Self::ALL.iter().copied().find(|candidate| {
            candidate
                .pairing()
                .map_or(false, |pairing| pairing.answers(self))
        })
    }

    pub fn is_request(self) -> bool {
        self.role() == CommandRole::Request
    }

    pub fn is_response(self) -> bool {
        !self.is_request()
    }
}

impl std::fmt::Display for ProtocolCommand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

impl Request {
    /// A further request implied by `response` answering this request
    ///
    /// `SIGN_IN{SendDomainList: true}` answered by `SIGN_IN_OK` is followed
    /// by an unsolicited `DOMAINS_LIST_OK`.
    pub fn follow_up(&self, response: ProtocolCommand) -> Option<Request> {
        match (self, response) {
            (Request::SignIn(sign_in), ProtocolCommand::SignInOk) if sign_in.send_domain_list => {
                Some(Request::DomainsList(NoParams::default()))
            }
            _ => None,
        }
    }
}
