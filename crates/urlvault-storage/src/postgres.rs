use async_trait::async_trait;
use sqlx::error::ErrorKind;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{Connection, PgPool};
use tracing::{debug, info, trace, warn};
use urlvault_core::{
    Alias, Operation, RequestContext, Result, StorageError, StorageFailure, UrlStore,
};

use crate::config::StoreConfig;

/// Idempotent schema for the `url` table and its alias index.
pub const SCHEMA: &str = include_str!("../ddl/postgres/url.sql");

/// PostgreSQL implementation of the store contract.
///
/// Alias uniqueness is enforced by the table's unique constraint; the store
/// only translates the engine's verdicts. Clones share the same pool.
#[derive(Debug, Clone)]
pub struct PostgresStore {
    pool: PgPool,
    config: StoreConfig,
}

impl PostgresStore {
    /// Opens a pool to `target`, checks that it answers and ensures the
    /// schema exists.
    ///
    /// On any failure the pool is closed before the error is returned, so a
    /// store is either fully ready or not built at all.
    pub async fn connect(target: &str, config: StoreConfig) -> Result<Self> {
        let op = Operation::Connect;

        let options = target
            .parse::<PgConnectOptions>()
            .map_err(|err| StorageError::Connection {
                op,
                message: format!("invalid connection target: {err}"),
            })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(config.connect_timeout)
            .connect_lazy_with(options);

        if let Err(message) = ping(&pool, &config).await {
            warn!(error = %message, "storage did not answer ping");
            pool.close().await;
            return Err(StorageError::Connection { op, message });
        }

        let store = Self::from_pool(pool, config);
        if let Err(err) = store.init_schema().await {
            warn!(error = %err, "schema initialization failed");
            store.close().await;
            return Err(err);
        }

        info!(
            max_connections = store.config.max_connections,
            "postgres store ready"
        );
        Ok(store)
    }

    /// Creates a store from an existing pool without touching the schema.
    pub fn from_pool(pool: PgPool, config: StoreConfig) -> Self {
        Self { pool, config }
    }

    /// Creates the `url` table and alias index if they are absent.
    ///
    /// Safe to call any number of times.
    pub async fn init_schema(&self) -> Result<()> {
        let op = Operation::InitSchema;
        let timeout = self.config.schema_timeout;

        match tokio::time::timeout(timeout, sqlx::raw_sql(SCHEMA).execute(&self.pool)).await {
            Ok(Ok(_)) => {
                debug!("schema is in place");
                Ok(())
            }
            Ok(Err(err)) => Err(StorageError::SchemaInit {
                op,
                message: err.to_string(),
            }),
            Err(_) => Err(StorageError::SchemaInit {
                op,
                message: format!("no response within {timeout:?}"),
            }),
        }
    }

    /// Returns a reference to the underlying pool.
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub fn config(&self) -> &StoreConfig {
        &self.config
    }

    /// Closes the pool, waiting for checked-out connections to be returned.
    pub async fn close(&self) {
        self.pool.close().await;
    }
}

async fn ping(pool: &PgPool, config: &StoreConfig) -> std::result::Result<(), String> {
    let timeout = config.connect_timeout;
    let attempt = async {
        let mut conn = pool.acquire().await?;
        conn.ping().await
    };

    match tokio::time::timeout(timeout, attempt).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(err.to_string()),
        Err(_) => Err(format!("no response within {timeout:?}")),
    }
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .is_some_and(|db| matches!(db.kind(), ErrorKind::UniqueViolation))
}

fn map_sqlx_error(op: Operation, err: sqlx::Error) -> StorageError {
    let message = err.to_string();

    let kind = match err {
        sqlx::Error::PoolTimedOut => StorageFailure::Timeout,
        sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_) => StorageFailure::Unavailable,
        sqlx::Error::ColumnIndexOutOfBounds { .. }
        | sqlx::Error::ColumnNotFound(_)
        | sqlx::Error::ColumnDecode { .. }
        | sqlx::Error::TypeNotFound { .. }
        | sqlx::Error::Decode(_)
        | sqlx::Error::RowNotFound => StorageFailure::InvalidData,
        _ => StorageFailure::Query,
    };

    StorageError::storage(op, kind, message)
}

fn log_failure(alias: &Alias, err: &StorageError) {
    match err {
        StorageError::Storage { .. } => warn!(alias = %alias, error = %err, "store call failed"),
        _ => debug!(alias = %alias, error = %err, "store call rejected"),
    }
}

#[async_trait]
impl UrlStore for PostgresStore {
    async fn save_url(&self, ctx: &RequestContext, url: &str, alias: &Alias) -> Result<i64> {
        let op = Operation::SaveUrl;
        trace!(alias = %alias, "saving url");

        let result = ctx
            .run(op, self.config.operation_timeout, async {
                sqlx::query_scalar::<_, i64>(
                    r#"
                    INSERT INTO url (url, alias)
                    VALUES ($1, $2)
                    RETURNING id
                    "#,
                )
                .bind(url)
                .bind(alias.as_str())
                .fetch_one(&self.pool)
                .await
                .map_err(|err| {
                    if is_unique_violation(&err) {
                        StorageError::UrlExists {
                            op,
                            alias: alias.to_string(),
                        }
                    } else {
                        map_sqlx_error(op, err)
                    }
                })
            })
            .await;

        match result {
            Ok(id) => {
                debug!(alias = %alias, id, "saved url");
                Ok(id)
            }
            Err(err) => {
                log_failure(alias, &err);
                Err(err)
            }
        }
    }

    async fn get_url(&self, ctx: &RequestContext, alias: &Alias) -> Result<String> {
        let op = Operation::GetUrl;
        trace!(alias = %alias, "looking up url");

        ctx.run(op, self.config.operation_timeout, async {
            let url = sqlx::query_scalar::<_, String>(
                r#"
                SELECT url
                FROM url
                WHERE alias = $1
                "#,
            )
            .bind(alias.as_str())
            .fetch_optional(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(op, err))?;

            url.ok_or_else(|| StorageError::UrlNotFound {
                op,
                alias: alias.to_string(),
            })
        })
        .await
        .inspect_err(|err| log_failure(alias, err))
    }

    async fn delete_url(&self, ctx: &RequestContext, alias: &Alias) -> Result<()> {
        let op = Operation::DeleteUrl;
        trace!(alias = %alias, "deleting url");

        ctx.run(op, self.config.operation_timeout, async {
            let result = sqlx::query(
                r#"
                DELETE FROM url
                WHERE alias = $1
                "#,
            )
            .bind(alias.as_str())
            .execute(&self.pool)
            .await
            .map_err(|err| map_sqlx_error(op, err))?;

            if result.rows_affected() == 0 {
                return Err(StorageError::UrlNotFound {
                    op,
                    alias: alias.to_string(),
                });
            }

            debug!(alias = %alias, "deleted url");
            Ok(())
        })
        .await
        .inspect_err(|err| log_failure(alias, err))
    }
}
