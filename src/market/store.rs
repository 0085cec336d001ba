//! Marketplace store
//!
//! HashMap/BTreeMap state with one RwLock for concurrency. Annonces are
//! kept in id order so listings are stable.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::net::IpAddr;
use std::sync::atomic::{AtomicI64, Ordering};

use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use crate::config::Config;
use crate::protocol::{Annonce, CreateAnnonce, Domain, ErrorLogMessage, UdpCoordinate, UpdateAnnonce};
use crate::session::Outcome;

/// A registered account
struct Account {
    name: String,
    /// SHA-256 over mail and password
    pwd_digest: [u8; 32],
}

#[derive(Default)]
struct Inner {
    accounts: HashMap<String, Account>,
    /// Mails with a signed-in connection
    online: HashSet<String>,
    annonces: BTreeMap<i64, Annonce>,
    domains: Vec<Domain>,
    coordinates: HashMap<String, UdpCoordinate>,
}

/// Shared marketplace state
pub struct Marketplace {
    inner: RwLock<Inner>,
    next_id: AtomicI64,
}

impl Marketplace {
    /// Create a marketplace offering `domains`
    pub fn new<I, S>(domains: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let inner = Inner {
            domains: domains.into_iter().map(Domain::new).collect(),
            ..Inner::default()
        };
        Self {
            inner: RwLock::new(inner),
            next_id: AtomicI64::new(1),
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.domains.iter().cloned())
    }

    // =========================================================================
    // Accounts
    // =========================================================================

    pub fn register(&self, mail: &str, name: &str, pwd: &str) -> Outcome<()> {
        if mail.is_empty() || name.trim().is_empty() || pwd.is_empty() {
            return Err(ErrorLogMessage::EmptyField);
        }
        if !is_valid_mail(mail) {
            return Err(ErrorLogMessage::InvalidMail);
        }

        let mut inner = self.inner.write();
        if inner.accounts.contains_key(mail) {
            return Err(ErrorLogMessage::MailAlreadyTaken);
        }
        inner.accounts.insert(
            mail.to_string(),
            Account {
                name: name.to_string(),
                pwd_digest: digest(mail, pwd),
            },
        );
        tracing::debug!("Registered account {}", mail);
        Ok(())
    }

    /// Check credentials and mark the account online; returns its name
    pub fn authenticate(&self, mail: &str, pwd: &str) -> Outcome<String> {
        let mut inner = self.inner.write();
        let name = match inner.accounts.get(mail) {
            Some(account) if account.pwd_digest == digest(mail, pwd) => account.name.clone(),
            _ => return Err(ErrorLogMessage::InvalidCredentials),
        };
        if !inner.online.insert(mail.to_string()) {
            return Err(ErrorLogMessage::AlreadyConnected);
        }
        Ok(name)
    }

    /// Mark the account offline and forget its UDP coordinates
    pub fn disconnect(&self, mail: &str) {
        let mut inner = self.inner.write();
        inner.online.remove(mail);
        inner.coordinates.remove(mail);
    }

    pub fn is_online(&self, mail: &str) -> bool {
        self.inner.read().online.contains(mail)
    }

    // =========================================================================
    // Domains and Annonces
    // =========================================================================

    pub fn domains(&self) -> Vec<Domain> {
        self.inner.read().domains.clone()
    }

    /// Publish an annonce owned by `owner`; returns its id
    pub fn create_annonce(&self, owner: &str, request: CreateAnnonce) -> Outcome<i64> {
        check_listing(&request.title, request.price)?;

        let mut inner = self.inner.write();
        if !inner.domains.contains(&request.domain) {
            return Err(ErrorLogMessage::UnknownDomain);
        }

        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        inner.annonces.insert(
            id,
            Annonce {
                domain: request.domain,
                title: request.title,
                descriptif: request.descriptif,
                price: request.price,
                id,
                owner: owner.to_string(),
            },
        );
        Ok(id)
    }

    pub fn update_annonce(&self, owner: &str, request: UpdateAnnonce) -> Outcome<()> {
        let mut inner = self.inner.write();
        let annonce = inner
            .annonces
            .get_mut(&request.id)
            .ok_or(ErrorLogMessage::AnnonceNotFound)?;
        if annonce.owner != owner {
            return Err(ErrorLogMessage::NotOwner);
        }
        check_listing(&request.title, request.price)?;

        annonce.title = request.title;
        annonce.descriptif = request.descriptif;
        annonce.price = request.price;
        Ok(())
    }

    pub fn remove_annonce(&self, owner: &str, id: i64) -> Outcome<()> {
        let mut inner = self.inner.write();
        match inner.annonces.get(&id) {
            None => Err(ErrorLogMessage::AnnonceNotFound),
            Some(annonce) if annonce.owner != owner => Err(ErrorLogMessage::NotOwner),
            Some(_) => {
                inner.annonces.remove(&id);
                Ok(())
            }
        }
    }

    pub fn annonce(&self, id: i64) -> Option<Annonce> {
        self.inner.read().annonces.get(&id).cloned()
    }

    /// Annonces of `domain` in id order
    pub fn annonces_in(&self, domain: &Domain) -> Outcome<Vec<Annonce>> {
        let inner = self.inner.read();
        if !inner.domains.contains(domain) {
            return Err(ErrorLogMessage::UnknownDomain);
        }

        let annonces: Vec<Annonce> = inner
            .annonces
            .values()
            .filter(|annonce| &annonce.domain == domain)
            .cloned()
            .collect();
        if annonces.is_empty() {
            return Err(ErrorLogMessage::EmptyDomain);
        }
        Ok(annonces)
    }

    // =========================================================================
    // UDP Rendez-vous
    // =========================================================================

    pub fn set_coordinates(&self, mail: &str, addr: &str, port: u16) -> Outcome<()> {
        if addr.parse::<IpAddr>().is_err() || port == 0 {
            return Err(ErrorLogMessage::InvalidAddress);
        }
        self.inner.write().coordinates.insert(
            mail.to_string(),
            UdpCoordinate {
                addr: addr.to_string(),
                port,
            },
        );
        Ok(())
    }

    pub fn coordinates_of(&self, mail: &str) -> Outcome<UdpCoordinate> {
        let inner = self.inner.read();
        if !inner.accounts.contains_key(mail) {
            return Err(ErrorLogMessage::UnknownUser);
        }
        inner
            .coordinates
            .get(mail)
            .cloned()
            .ok_or(ErrorLogMessage::UdpCoordinatesUnavailable)
    }
}

impl Default for Marketplace {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

fn is_valid_mail(mail: &str) -> bool {
    match mail.split_once('@') {
        Some((local, host)) => !local.is_empty() && !host.is_empty() && !host.contains('@'),
        None => false,
    }
}

fn check_listing(title: &str, price: i64) -> Outcome<()> {
    if title.trim().is_empty() {
        return Err(ErrorLogMessage::EmptyField);
    }
    if price < 0 {
        return Err(ErrorLogMessage::InvalidPrice);
    }
    Ok(())
}

fn digest(mail: &str, pwd: &str) -> [u8; 32] {
    let mut hasher = Sha256::new();
    hasher.update(mail.as_bytes());
    hasher.update([0u8]);
    hasher.update(pwd.as_bytes());
    hasher.finalize().into()
}
