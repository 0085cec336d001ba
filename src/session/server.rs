//! Server-side dispatch
//!
//! Each handler returns an [`Outcome`]: `Ok` becomes the command's OK
//! response, `Err` its KO. A request therefore always gets exactly one
//! answer.

use crate::error::{AgoraError, Result};
use crate::protocol::{
    Annonce, AnnonceFromDomain, AnnonceFromDomainOk, CommandRole, CreateAnnonce,
    CreateAnnonceOk, Domain, DomainsListOk, ErrorLogMessage, Failure, NoParams,
    RemoveAnnonce, Request, RequestUdpCoordinates, SignIn, SignInOk, SignUp, UdpCoordinatesOk,
    UdpServer, UpdateAnnonce,
};

/// Result of a server handler: the OK payload or the KO reason
pub type Outcome<T> = std::result::Result<T, ErrorLogMessage>;

/// Reactions to client requests
pub trait ServerHandler {
    fn sign_up(&mut self, request: SignUp) -> Outcome<()>;

    fn sign_in(&mut self, request: SignIn) -> Outcome<SignInOk>;

    /// Cannot fail
    fn sign_out(&mut self);

    /// Cannot fail
    fn domains_list(&mut self) -> Vec<Domain>;

    /// Returns the id of the new annonce
    fn create_annonce(&mut self, request: CreateAnnonce) -> Outcome<i64>;

    fn update_annonce(&mut self, request: UpdateAnnonce) -> Outcome<()>;

    fn remove_annonce(&mut self, request: RemoveAnnonce) -> Outcome<()>;

    fn annonce_from_domain(&mut self, request: AnnonceFromDomain) -> Outcome<Vec<Annonce>>;

    fn udp_server(&mut self, request: UdpServer) -> Outcome<()>;

    fn request_udp_coordinates(
        &mut self,
        request: RequestUdpCoordinates,
    ) -> Outcome<UdpCoordinatesOk>;
}

/// Feeds requests of one connection to a handler
pub struct ServerDispatcher<H: ServerHandler> {
    handler: H,
}

impl<H: ServerHandler> ServerDispatcher<H> {
    pub fn new(handler: H) -> Self {
        Self { handler }
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    /// Handle one request and return what to send back
    ///
    /// The first element is the request's OK or KO; a follow-up declared by
    /// the catalog may come after it.
    pub fn dispatch(&mut self, request: Request) -> Result<Vec<Request>> {
        let command = request.command();
        if command.role() != CommandRole::Request {
            return Err(AgoraError::ProtocolViolation(format!(
                "server received response {}",
                command
            )));
        }

        tracing::trace!("Dispatching {}", command);
        let handler = &mut self.handler;
        let reply = match &request {
            Request::SignUp(params) => answer(
                handler
                    .sign_up(params.clone())
                    .map(|()| Request::SignUpOk(NoParams {})),
                Request::SignUpKo,
            ),
            Request::SignIn(params) => answer(
                handler.sign_in(params.clone()).map(Request::SignInOk),
                Request::SignInKo,
            ),
            Request::SignOut(_) => {
                handler.sign_out();
                Request::SignOutOk(NoParams {})
            }
            Request::DomainsList(_) => Request::DomainsListOk(DomainsListOk {
                domains: handler.domains_list(),
            }),
            Request::CreateAnnonce(params) => answer(
                handler
                    .create_annonce(params.clone())
                    .map(|id| Request::CreateAnnonceOk(CreateAnnonceOk { id })),
                Request::CreateAnnonceKo,
            ),
            Request::UpdateAnnonce(params) => answer(
                handler
                    .update_annonce(params.clone())
                    .map(|()| Request::UpdateAnnonceOk(NoParams {})),
                Request::UpdateAnnonceKo,
            ),
            Request::RemoveAnnonce(params) => answer(
                handler
                    .remove_annonce(params.clone())
                    .map(|()| Request::RemoveAnnonceOk(NoParams {})),
                Request::RemoveAnnonceKo,
            ),
            Request::AnnonceFromDomain(params) => answer(
                handler
                    .annonce_from_domain(params.clone())
                    .map(|annonces_from_domain| {
                        Request::AnnonceFromDomainOk(AnnonceFromDomainOk { annonces_from_domain })
                    }),
                Request::AnnonceFromDomainKo,
            ),
            Request::UdpServer(params) => answer(
                handler
                    .udp_server(params.clone())
                    .map(|()| Request::UdpServerOk(NoParams {})),
                Request::UdpServerKo,
            ),
            Request::RequestUdpCoordinates(params) => answer(
                handler
                    .request_udp_coordinates(params.clone())
                    .map(Request::RequestUdpCoordinatesOk),
                Request::RequestUdpCoordinatesKo,
            ),
            Request::KeyExchange(_) => {
                return Err(AgoraError::ProtocolViolation(
                    "key exchange on an established session".to_string(),
                ))
            }
            other => {
                return Err(AgoraError::ProtocolViolation(format!(
                    "{} has no server handler",
                    other.command()
                )))
            }
        };

        let follow_up = request.follow_up(reply.command());
        let mut replies = vec![reply];
        if let Some(Request::DomainsList(_)) = follow_up {
            replies.push(Request::DomainsListOk(DomainsListOk {
                domains: self.handler.domains_list(),
            }));
        }
        Ok(replies)
    }

    /// The KO to send for a request that could not be decoded, if any
    pub fn reject(&self, error: &AgoraError) -> Option<Request> {
        match error {
            AgoraError::MalformedPayload {
                command: Some(command),
                ..
            } if command.is_request() => {
                Request::failure(*command, ErrorLogMessage::MalformedRequest)
            }
            _ => None,
        }
    }
}

/// Turn a handler outcome into the request's OK or KO
fn answer(outcome: Outcome<Request>, failure: fn(Failure) -> Request) -> Request {
    match outcome {
        Ok(success) => success,
        Err(error) => failure(Failure::from(error)),
    }
}
