mod cli;
mod commands;

use crate::cli::CLI;
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use urlvault_storage::RequestContext;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = CLI::parse();

    urlvault_telemetry::init(config.log_format, urlvault_telemetry::DEFAULT_FILTER)?;

    let store_config = config.store_config();
    info!(
        log_format = %config.log_format,
        max_connections = store_config.max_connections,
        operation_timeout = ?store_config.operation_timeout,
        "opening url store"
    );

    let token = CancellationToken::new();
    let ctx = RequestContext::with_cancellation(token.clone());
    let interrupt = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            warn!("interrupted, cancelling in-flight request");
            token.cancel();
        }
    });

    let store = match commands::open_store(&config.database_url, store_config, &ctx).await {
        Ok(store) => store,
        Err(err) => {
            interrupt.abort();
            return Err(err);
        }
    };

    let outcome = commands::run(config.command, &store, &ctx).await;

    interrupt.abort();
    store.close().await;

    outcome
}
