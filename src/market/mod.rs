//! Market Module
//!
//! In-memory marketplace backend speaking the server side of the protocol.
//!
//! ## Responsibilities
//! - Accounts: registration, authentication, who is online
//! - Annonces: create/update/remove by their owner, listing per domain
//! - UDP rendez-vous: coordinates of online accounts
//!
//! ## Concurrency
//! One [`Marketplace`] is shared by all connections behind a single
//! `RwLock`; each connection gets its own [`MarketHandler`] holding the
//! signed-in account.

mod handler;
mod store;

pub use handler::MarketHandler;
pub use store::Marketplace;
