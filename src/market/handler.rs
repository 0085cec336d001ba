//! Per-connection marketplace handler

use std::sync::Arc;

use crate::protocol::{
    Annonce, AnnonceFromDomain, CreateAnnonce, Domain, ErrorLogMessage, RemoveAnnonce,
    RequestUdpCoordinates, SignIn, SignInOk, SignUp, UdpCoordinatesOk, UdpServer,
    UpdateAnnonce,
};
use crate::session::{Outcome, ServerHandler};

use super::Marketplace;

/// Serves one connection against the shared marketplace
///
/// Signing out, or dropping the handler when the connection ends, takes the
/// account offline.
pub struct MarketHandler {
    market: Arc<Marketplace>,
    /// Mail of the signed-in account
    user: Option<String>,
}

impl MarketHandler {
    pub fn new(market: Arc<Marketplace>) -> Self {
        Self { market, user: None }
    }

    /// Mail of the signed-in account
    pub fn user(&self) -> Option<&str> {
        self.user.as_deref()
    }

    fn signed_in(&self) -> Outcome<&str> {
        self.user.as_deref().ok_or(ErrorLogMessage::NotConnected)
    }
}

impl ServerHandler for MarketHandler {
    fn sign_up(&mut self, request: SignUp) -> Outcome<()> {
        self.market.register(&request.mail, &request.name, &request.pwd)
    }

    fn sign_in(&mut self, request: SignIn) -> Outcome<SignInOk> {
        if self.user.is_some() {
            return Err(ErrorLogMessage::AlreadyConnected);
        }
        let name = self.market.authenticate(&request.mail, &request.pwd)?;
        tracing::debug!("{} signed in", request.mail);
        self.user = Some(request.mail);
        Ok(SignInOk { name })
    }

    fn sign_out(&mut self) {
        if let Some(mail) = self.user.take() {
            self.market.disconnect(&mail);
            tracing::debug!("{} signed out", mail);
        }
    }

    fn domains_list(&mut self) -> Vec<Domain> {
        self.market.domains()
    }

    fn create_annonce(&mut self, request: CreateAnnonce) -> Outcome<i64> {
        let owner = self.signed_in()?;
        self.market.create_annonce(owner, request)
    }

    fn update_annonce(&mut self, request: UpdateAnnonce) -> Outcome<()> {
        let owner = self.signed_in()?;
        self.market.update_annonce(owner, request)
    }

    fn remove_annonce(&mut self, request: RemoveAnnonce) -> Outcome<()> {
        let owner = self.signed_in()?;
        self.market.remove_annonce(owner, request.id)
    }

    fn annonce_from_domain(&mut self, request: AnnonceFromDomain) -> Outcome<Vec<Annonce>> {
        self.market.annonces_in(&request.domain)
    }

    fn udp_server(&mut self, request: UdpServer) -> Outcome<()> {
        let mail = self.signed_in()?;
        self.market.set_coordinates(mail, &request.address, request.port)
    }

    fn request_udp_coordinates(
        &mut self,
        request: RequestUdpCoordinates,
    ) -> Outcome<UdpCoordinatesOk> {
        self.signed_in()?;
        let coord = self.market.coordinates_of(&request.mail)?;
        Ok(UdpCoordinatesOk {
            mail: request.mail,
            coord,
        })
    }
}

impl Drop for MarketHandler {
    fn drop(&mut self) {
        self.sign_out();
    }
}
