pub mod memory;

use crate::alias::Alias;
use crate::context::RequestContext;
use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A stored alias to URL mapping.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlRecord {
    /// Surrogate key assigned by the store. Never reused.
    pub id: i64,
    pub alias: Alias,
    /// The target URL the alias points at.
    pub url: String,
}

/// Create, read and delete over alias to URL mappings.
///
/// Every call is a single atomic exchange with the backing engine, bounded by
/// the store's own timeout and by the caller's [`RequestContext`].
#[async_trait]
pub trait UrlStore: Send + Sync + 'static {
    /// Inserts a new mapping and returns its id.
    /// Returns `Err(UrlExists)` if the alias is already taken.
    async fn save_url(&self, ctx: &RequestContext, url: &str, alias: &Alias) -> Result<i64>;

    /// Returns the target URL for an exact alias match.
    /// Returns `Err(UrlNotFound)` if the alias does not exist.
    async fn get_url(&self, ctx: &RequestContext, alias: &Alias) -> Result<String>;

    /// Removes the mapping for an alias.
    /// Returns `Err(UrlNotFound)` if there was nothing to delete.
    async fn delete_url(&self, ctx: &RequestContext, alias: &Alias) -> Result<()>;
}
