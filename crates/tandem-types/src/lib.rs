//! Shared domain types for Tandem.
//!
//! This crate contains the domain types used across the Tandem conversation
//! core: conversation keys, messages, group sessions, routing state, the
//! document-store contract, configuration, and the error taxonomy.
//!
//! Zero infrastructure dependencies -- only serde, uuid, chrono, thiserror.

pub mod collaborator;
pub mod config;
pub mod conversation;
pub mod error;
pub mod message;
pub mod outcome;
pub mod routing;
pub mod session;
pub mod store;
