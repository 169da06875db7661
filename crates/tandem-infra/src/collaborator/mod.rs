//! Completion collaborator adapters.

pub mod http;

pub use http::HttpCompletionCollaborator;
