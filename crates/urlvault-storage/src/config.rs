use std::time::Duration;
use typed_builder::TypedBuilder;

pub use urlvault_core::context::DEFAULT_OPERATION_TIMEOUT;

pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
pub const DEFAULT_SCHEMA_TIMEOUT: Duration = Duration::from_secs(5);

/// Pool and timeout settings for [`PostgresStore`](crate::PostgresStore).
///
/// Fixed once the store is built.
#[derive(Debug, Clone, TypedBuilder)]
pub struct StoreConfig {
    #[builder(default = DEFAULT_MAX_CONNECTIONS)]
    pub max_connections: u32,
    /// Bound on establishing and pinging the first connection.
    #[builder(default = DEFAULT_CONNECT_TIMEOUT)]
    pub connect_timeout: Duration,
    /// Bound on the create-if-absent schema step.
    #[builder(default = DEFAULT_SCHEMA_TIMEOUT)]
    pub schema_timeout: Duration,
    /// Bound on each save, get and delete call.
    #[builder(default = DEFAULT_OPERATION_TIMEOUT)]
    pub operation_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::builder().build()
    }
}
