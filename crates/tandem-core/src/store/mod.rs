//! Document-store port and the optimistic-concurrency merge loop.
//!
//! - `document` -- the `DocumentStore` trait implemented by infrastructure
//! - `memory` -- an in-process `DocumentStore` backed by `DashMap`
//! - `rmw` -- the bounded read-modify-write retry loop shared by every writer

pub mod document;
pub mod memory;
pub mod rmw;

pub use document::DocumentStore;
pub use memory::MemoryDocumentStore;
pub use rmw::{Mutation, RmwOutcome, read_modify_write};
