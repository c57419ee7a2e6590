//! Core types and traits for the urlvault alias store.
//!
//! This crate provides the store contract, the error vocabulary and the
//! request context shared by every store implementation.

pub mod alias;
pub mod context;
pub mod error;
pub mod repository;

pub use alias::Alias;
pub use context::RequestContext;
pub use error::{Operation, Result, StorageError, StorageFailure};
pub use repository::memory::InMemoryStore;
pub use repository::{UrlRecord, UrlStore};
