//! Session Module
//!
//! Routes decoded envelopes to role-specific handlers.
//!
//! ## Roles
//! - Client: [`ClientDispatcher`] tracks outstanding requests and delivers
//!   their OK/KO answers to a [`ClientHandler`]
//! - Server: [`ServerDispatcher`] feeds requests to a [`ServerHandler`] and
//!   turns each handler outcome into exactly one OK or KO
//!
//! Both handler sets come from the same pairing table in the command
//! catalog. Handlers never see key material: everything reaching them has
//! already been decrypted by the secure channel.

mod client;
mod server;

pub use client::{ClientDispatcher, ClientHandler, Delivery};
pub use server::{Outcome, ServerDispatcher, ServerHandler};
