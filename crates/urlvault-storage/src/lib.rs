//! Storage backends for the urlvault alias store.

pub mod config;
pub mod postgres;

pub use config::StoreConfig;
pub use postgres::PostgresStore;
pub use urlvault_core::{
    Alias, InMemoryStore, Operation, RequestContext, Result, StorageError, StorageFailure,
    UrlRecord, UrlStore,
};
