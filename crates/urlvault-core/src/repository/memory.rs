use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::alias::Alias;
use crate::context::{RequestContext, DEFAULT_OPERATION_TIMEOUT};
use crate::error::{Operation, Result, StorageError};
use crate::repository::{UrlRecord, UrlStore};
use async_trait::async_trait;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tracing::trace;

#[derive(Debug, Default)]
struct Inner {
    records: DashMap<String, UrlRecord>,
    last_id: AtomicI64,
}

/// In-memory implementation of [`UrlStore`] using DashMap.
///
/// Mirrors the database-backed store: ids come from a monotonic counter and
/// are never reused, and a taken alias is rejected rather than overwritten.
/// Clones share the same records.
#[derive(Debug, Clone)]
pub struct InMemoryStore {
    inner: Arc<Inner>,
    operation_timeout: Duration,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::with_timeout(DEFAULT_OPERATION_TIMEOUT)
    }

    /// Creates a store whose calls are bounded by `operation_timeout`.
    pub fn with_timeout(operation_timeout: Duration) -> Self {
        Self {
            inner: Arc::default(),
            operation_timeout,
        }
    }

    pub fn operation_timeout(&self) -> Duration {
        self.operation_timeout
    }

    pub fn len(&self) -> usize {
        self.inner.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.records.is_empty()
    }

    /// Snapshot of the record stored under `alias`, if any.
    pub fn record(&self, alias: &Alias) -> Option<UrlRecord> {
        self.inner
            .records
            .get(alias.as_str())
            .map(|entry| entry.value().clone())
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl UrlStore for InMemoryStore {
    async fn save_url(&self, ctx: &RequestContext, url: &str, alias: &Alias) -> Result<i64> {
        let op = Operation::SaveUrl;
        ctx.run(op, self.operation_timeout, async {
            // The entry guard holds the shard lock, so check-and-insert is atomic.
            match self.inner.records.entry(alias.as_str().to_owned()) {
                Entry::Occupied(_) => Err(StorageError::UrlExists {
                    op,
                    alias: alias.to_string(),
                }),
                Entry::Vacant(vacant) => {
                    let id = self.inner.last_id.fetch_add(1, Ordering::Relaxed) + 1;
                    vacant.insert(UrlRecord {
                        id,
                        alias: alias.clone(),
                        url: url.to_owned(),
                    });
                    trace!(alias = %alias, id, "stored url in memory");
                    Ok(id)
                }
            }
        })
        .await
    }

    async fn get_url(&self, ctx: &RequestContext, alias: &Alias) -> Result<String> {
        let op = Operation::GetUrl;
        ctx.run(op, self.operation_timeout, async {
            self.inner
                .records
                .get(alias.as_str())
                .map(|entry| entry.url.clone())
                .ok_or_else(|| StorageError::UrlNotFound {
                    op,
                    alias: alias.to_string(),
                })
        })
        .await
    }

    async fn delete_url(&self, ctx: &RequestContext, alias: &Alias) -> Result<()> {
        let op = Operation::DeleteUrl;
        ctx.run(op, self.operation_timeout, async {
            match self.inner.records.remove(alias.as_str()) {
                Some(_) => Ok(()),
                None => Err(StorageError::UrlNotFound {
                    op,
                    alias: alias.to_string(),
                }),
            }
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StorageFailure;
    use tokio_util::sync::CancellationToken;

    fn alias(s: &str) -> Alias {
        Alias::new_unchecked(s)
    }

    fn ctx() -> RequestContext {
        RequestContext::background()
    }

    #[tokio::test]
    async fn save_and_get() {
        let store = InMemoryStore::new();

        let id = store
            .save_url(&ctx(), "https://example.com", &alias("ex1"))
            .await
            .unwrap();
        assert_eq!(id, 1);

        let url = store.get_url(&ctx(), &alias("ex1")).await.unwrap();
        assert_eq!(url, "https://example.com");
    }

    #[tokio::test]
    async fn get_nonexistent() {
        let store = InMemoryStore::new();

        let err = store.get_url(&ctx(), &alias("nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Operation::GetUrl);
    }

    #[tokio::test]
    async fn duplicate_alias_keeps_original_url() {
        let store = InMemoryStore::new();

        store
            .save_url(&ctx(), "https://example.com", &alias("ex1"))
            .await
            .unwrap();

        let err = store
            .save_url(&ctx(), "https://other.com", &alias("ex1"))
            .await
            .unwrap_err();
        assert!(err.is_url_exists());

        let url = store.get_url(&ctx(), &alias("ex1")).await.unwrap();
        assert_eq!(url, "https://example.com");
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn delete_existing() {
        let store = InMemoryStore::new();

        store
            .save_url(&ctx(), "https://example.com", &alias("ex1"))
            .await
            .unwrap();
        store.delete_url(&ctx(), &alias("ex1")).await.unwrap();

        let err = store.get_url(&ctx(), &alias("ex1")).await.unwrap_err();
        assert!(err.is_not_found());
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn delete_nonexistent_leaves_store_unchanged() {
        let store = InMemoryStore::new();
        store
            .save_url(&ctx(), "https://example.com", &alias("keep"))
            .await
            .unwrap();

        let err = store.delete_url(&ctx(), &alias("nope")).await.unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(err.operation(), Operation::DeleteUrl);
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn ids_are_not_reused_after_delete() {
        let store = InMemoryStore::new();

        let first = store
            .save_url(&ctx(), "https://example.com", &alias("ex1"))
            .await
            .unwrap();
        store.delete_url(&ctx(), &alias("ex1")).await.unwrap();
        let second = store
            .save_url(&ctx(), "https://example.com", &alias("ex1"))
            .await
            .unwrap();

        assert!(second > first);
        assert_eq!(store.record(&alias("ex1")).unwrap().id, second);
    }

    #[test]
    fn default_timeout_matches_database_store() {
        assert_eq!(InMemoryStore::new().operation_timeout(), DEFAULT_OPERATION_TIMEOUT);
        assert_eq!(
            InMemoryStore::with_timeout(Duration::from_millis(50)).operation_timeout(),
            Duration::from_millis(50)
        );
    }

    #[tokio::test]
    async fn zero_timeout_still_serves_immediate_calls() {
        let store = InMemoryStore::with_timeout(Duration::ZERO);
        let ctx = RequestContext::background();

        // Calls that complete on first poll still succeed under a zero budget.
        store
            .save_url(&ctx, "https://example.com", &alias("ex1"))
            .await
            .unwrap();
        assert_eq!(store.get_url(&ctx, &alias("ex1")).await.unwrap(), "https://example.com");
    }

    #[tokio::test]
    async fn cancelled_context_does_not_insert() {
        let store = InMemoryStore::new();
        let token = CancellationToken::new();
        token.cancel();

        let err = store
            .save_url(
                &RequestContext::with_cancellation(token),
                "https://example.com",
                &alias("ex1"),
            )
            .await
            .unwrap_err();

        assert_eq!(err.storage_failure(), Some(StorageFailure::Cancelled));
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn concurrent_saves_of_same_alias_admit_one_winner() {
        let store = InMemoryStore::new();
        let mut handles = vec![];

        for i in 0..16u64 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store
                    .save_url(
                        &RequestContext::background(),
                        &format!("https://example{}.com", i),
                        &Alias::new_unchecked("contended"),
                    )
                    .await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            match handle.await.unwrap() {
                Ok(_) => winners += 1,
                Err(err) => assert!(err.is_url_exists()),
            }
        }

        assert_eq!(winners, 1);
        assert_eq!(store.len(), 1);
    }
}
