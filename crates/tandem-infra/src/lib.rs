//! Infrastructure layer for Tandem.
//!
//! Contains implementations of the ports defined in `tandem-core`: the
//! SQLite-backed document store, the HTTP completion collaborator, and the
//! `config.toml` loader.

pub mod collaborator;
pub mod config;
pub mod sqlite;
