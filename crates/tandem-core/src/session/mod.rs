//! Multi-party group sessions with assistant turn-taking.

pub mod manager;
pub mod mention;

pub use manager::GroupSessionManager;
