use clap::{Parser, Subcommand};
use std::time::Duration;
use urlvault_storage::StoreConfig;
use urlvault_telemetry::LogFormat;

pub const DATABASE_URL_ENV: &str = "URLVAULT_DATABASE_URL";
pub const LOG_FORMAT_ENV: &str = "URLVAULT_LOG_FORMAT";
pub const MAX_CONNECTIONS_ENV: &str = "URLVAULT_MAX_CONNECTIONS";
pub const CONNECT_TIMEOUT_ENV: &str = "URLVAULT_CONNECT_TIMEOUT_SECS";
pub const SCHEMA_TIMEOUT_ENV: &str = "URLVAULT_SCHEMA_TIMEOUT_SECS";
pub const OPERATION_TIMEOUT_ENV: &str = "URLVAULT_OPERATION_TIMEOUT_SECS";

#[derive(Debug, Parser)]
#[command(name = "urlvault", about = "Manage alias to URL mappings")]
pub struct CLI {
    #[arg(long, env = DATABASE_URL_ENV)]
    pub database_url: String,

    /// `text` or `json`.
    #[arg(long, env = LOG_FORMAT_ENV, default_value_t = LogFormat::Text)]
    pub log_format: LogFormat,

    #[arg(long, env = MAX_CONNECTIONS_ENV, default_value_t = 10)]
    pub max_connections: u32,

    #[arg(long, env = CONNECT_TIMEOUT_ENV, default_value_t = 10)]
    pub connect_timeout_secs: u64,

    #[arg(long, env = SCHEMA_TIMEOUT_ENV, default_value_t = 5)]
    pub schema_timeout_secs: u64,

    #[arg(long, env = OPERATION_TIMEOUT_ENV, default_value_t = 3)]
    pub operation_timeout_secs: u64,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Subcommand)]
pub enum Command {
    /// Create the url table and alias index if they are missing.
    Init,
    /// Store a new mapping and print its id.
    Save {
        #[arg(long)]
        url: String,
        /// Generated when omitted.
        #[arg(long)]
        alias: Option<String>,
    },
    /// Print the URL stored under an alias.
    Get { alias: String },
    /// Remove the mapping for an alias.
    Delete { alias: String },
}

impl CLI {
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig::builder()
            .max_connections(self.max_connections)
            .connect_timeout(Duration::from_secs(self.connect_timeout_secs))
            .schema_timeout(Duration::from_secs(self.schema_timeout_secs))
            .operation_timeout(Duration::from_secs(self.operation_timeout_secs))
            .build()
    }
}
