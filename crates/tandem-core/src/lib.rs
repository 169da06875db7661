//! Conversation/session core for Tandem.
//!
//! This crate defines the "ports" (document store, completion collaborator,
//! intent classifier, agent handler) and the logic built on them: pairing
//! keys, the optimistic read-modify-write loop, the message lifecycle, group
//! sessions, and the intent router. It depends only on `tandem-types` --
//! never on `tandem-infra` or any database/IO crate.

pub mod collaborator;
pub mod conversation;
pub mod deadline;
pub mod pairing;
pub mod routing;
pub mod session;
pub mod store;

#[cfg(test)]
pub(crate) mod testing;
