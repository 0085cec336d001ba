//! Client-side dispatch
//!
//! One outstanding request per command type. A response is delivered only
//! if the request it answers is outstanding; anything else is logged and
//! discarded.

use std::collections::HashMap;

use crate::error::{AgoraError, Result};
use crate::protocol::{
    Annonce, CommandRole, Domain, ErrorLogMessage, ProtocolCommand, Request,
    SignInOk, UdpCoordinatesOk,
};

/// Reactions to server responses
///
/// Every method defaults to logging the response at debug level.
pub trait ClientHandler {
    fn sign_up_ok(&mut self) {
        tracing::debug!("SIGN_UP_OK");
    }

    fn sign_up_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("SIGN_UP_KO: {}", error);
    }

    fn sign_in_ok(&mut self, answer: SignInOk) {
        tracing::debug!("SIGN_IN_OK for {}", answer.name);
    }

    fn sign_in_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("SIGN_IN_KO: {}", error);
    }

    fn sign_out_ok(&mut self) {
        tracing::debug!("SIGN_OUT_OK");
    }

    fn domains_list_ok(&mut self, domains: Vec<Domain>) {
        tracing::debug!("DOMAINS_LIST_OK with {} domains", domains.len());
    }

    fn create_annonce_ok(&mut self, id: i64) {
        tracing::debug!("CREATE_ANNONCE_OK id={}", id);
    }

    fn create_annonce_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("CREATE_ANNONCE_KO: {}", error);
    }

    fn update_annonce_ok(&mut self) {
        tracing::debug!("UPDATE_ANNONCE_OK");
    }

    fn update_annonce_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("UPDATE_ANNONCE_KO: {}", error);
    }

    fn remove_annonce_ok(&mut self) {
        tracing::debug!("REMOVE_ANNONCE_OK");
    }

    fn remove_annonce_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("REMOVE_ANNONCE_KO: {}", error);
    }

    fn annonce_from_domain_ok(&mut self, annonces: Vec<Annonce>) {
        tracing::debug!("ANNONCE_FROM_DOMAIN_OK with {} annonces", annonces.len());
    }

    fn annonce_from_domain_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("ANNONCE_FROM_DOMAIN_KO: {}", error);
    }

    fn udp_server_ok(&mut self) {
        tracing::debug!("UDP_SERVER_OK");
    }

    fn udp_server_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("UDP_SERVER_KO: {}", error);
    }

    fn request_udp_coordinates_ok(&mut self, answer: UdpCoordinatesOk) {
        tracing::debug!("REQUEST_UDP_COORDINATES_OK for {}", answer.mail);
    }

    fn request_udp_coordinates_ko(&mut self, error: ErrorLogMessage) {
        tracing::debug!("REQUEST_UDP_COORDINATES_KO: {}", error);
    }
}

/// What happened to a received response
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Delivery {
    /// Passed to the handler
    Delivered,
    /// No matching request was outstanding
    Discarded,
}

/// Tracks outstanding requests of one connection
#[derive(Debug, Default)]
pub struct ClientDispatcher {
    /// Keyed by request command; value is the request as sent
    pending: HashMap<ProtocolCommand, Request>,
}

impl ClientDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `request` as awaiting its OK/KO
    pub fn arm(&mut self, request: &Request) -> Result<()> {
        let command = request.command();
        if !command.is_request() {
            return Err(AgoraError::ProtocolViolation(format!(
                "client cannot send response {}",
                command
            )));
        }
        if command == ProtocolCommand::KeyExchange {
            return Err(AgoraError::ProtocolViolation(
                "key exchange is handled by the handshake".to_string(),
            ));
        }
        if self.pending.contains_key(&command) {
            return Err(AgoraError::AlreadyPending(command));
        }

        self.pending.insert(command, request.clone());
        Ok(())
    }

    /// Forget the expectation for `command` (the request never left)
    pub fn disarm(&mut self, command: ProtocolCommand) -> Option<Request> {
        self.pending.remove(&command)
    }

    pub fn is_pending(&self, command: ProtocolCommand) -> bool {
        self.pending.contains_key(&command)
    }

    pub fn has_pending(&self) -> bool {
        !self.pending.is_empty()
    }

    /// Drop every expectation (connection closed); returns what was waiting
    pub fn abort(&mut self) -> Vec<ProtocolCommand> {
        let mut aborted: Vec<ProtocolCommand> =
            self.pending.drain().map(|(command, _)| command).collect();
        aborted.sort();
        aborted
    }

    /// Route a received envelope to `handler`
    pub fn on_received<H: ClientHandler + ?Sized>(
        &mut self,
        response: Request,
        handler: &mut H,
    ) -> Result<Delivery> {
        let command = response.command();
        if command.role() == CommandRole::Request {
            return Err(AgoraError::ProtocolViolation(format!(
                "client received request {}",
                command
            )));
        }

        let answered = command.request_for().ok_or_else(|| {
            AgoraError::ProtocolViolation(format!("{} answers no request", command))
        })?;
        let request = match self.pending.remove(&answered) {
            Some(request) => request,
            None => {
                tracing::warn!("Discarding {}: no {} outstanding", command, answered);
                return Ok(Delivery::Discarded);
            }
        };

        if let Some(next) = request.follow_up(command) {
            self.pending.entry(next.command()).or_insert(next);
        }

        deliver(response, handler)?;
        Ok(Delivery::Delivered)
    }
}

fn deliver<H: ClientHandler + ?Sized>(response: Request, handler: &mut H) -> Result<()> {
    match response {
        Request::SignUpOk(_) => handler.sign_up_ok(),
        Request::SignUpKo(failure) => handler.sign_up_ko(failure.error),
        Request::SignInOk(answer) => handler.sign_in_ok(answer),
        Request::SignInKo(failure) => handler.sign_in_ko(failure.error),
        Request::SignOutOk(_) => handler.sign_out_ok(),
        Request::DomainsListOk(answer) => handler.domains_list_ok(answer.domains),
        Request::CreateAnnonceOk(answer) => handler.create_annonce_ok(answer.id),
        Request::CreateAnnonceKo(failure) => handler.create_annonce_ko(failure.error),
        Request::UpdateAnnonceOk(_) => handler.update_annonce_ok(),
        Request::UpdateAnnonceKo(failure) => handler.update_annonce_ko(failure.error),
        Request::RemoveAnnonceOk(_) => handler.remove_annonce_ok(),
        Request::RemoveAnnonceKo(failure) => handler.remove_annonce_ko(failure.error),
        Request::AnnonceFromDomainOk(answer) => {
            handler.annonce_from_domain_ok(answer.annonces_from_domain)
        }
        Request::AnnonceFromDomainKo(failure) => handler.annonce_from_domain_ko(failure.error),
        Request::UdpServerOk(_) => handler.udp_server_ok(),
        Request::UdpServerKo(failure) => handler.udp_server_ko(failure.error),
        Request::RequestUdpCoordinatesOk(answer) => handler.request_udp_coordinates_ok(answer),
        Request::RequestUdpCoordinatesKo(failure) => {
            handler.request_udp_coordinates_ko(failure.error)
        }
        other => {
            return Err(AgoraError::ProtocolViolation(format!(
                "{} is not delivered to client handlers",
                other.command()
            )))
        }
    }
    Ok(())
}
