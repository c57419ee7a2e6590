use anyhow::{anyhow, bail, Context};
use rand::distr::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};
use url::Url;
use urlvault_storage::{Alias, PostgresStore, RequestContext, StoreConfig, UrlStore};

use crate::cli::Command;

pub const GENERATED_ALIAS_LENGTH: usize = 6;
const GENERATED_ALIAS_ATTEMPTS: usize = 3;

/// Connects to the store unless the request is cancelled first.
pub async fn open_store(
    database_url: &str,
    config: StoreConfig,
    ctx: &RequestContext,
) -> anyhow::Result<PostgresStore> {
    tokio::select! {
        biased;
        _ = ctx.cancellation_token().cancelled() => {
            Err(anyhow!("cancelled while opening url store"))
        }
        store = PostgresStore::connect(database_url, config) => {
            store.context("failed to open url store")
        }
    }
}

pub async fn run(
    command: Command,
    store: &PostgresStore,
    ctx: &RequestContext,
) -> anyhow::Result<()> {
    match command {
        Command::Init => {
            store.init_schema().await?;
            println!("schema ready");
        }
        Command::Save { url, alias } => {
            let url = validate_url(&url)?;
            let id = match alias {
                Some(alias) => {
                    let alias = Alias::new(alias)?;
                    let id = store.save_url(ctx, &url, &alias).await?;
                    info!(alias = %alias, id, "saved url");
                    id
                }
                None => save_with_generated_alias(store, ctx, &url).await?,
            };
            println!("{id}");
        }
        Command::Get { alias } => {
            let alias = Alias::new(alias)?;
            let url = store.get_url(ctx, &alias).await?;
            println!("{url}");
        }
        Command::Delete { alias } => {
            let alias = Alias::new(alias)?;
            store.delete_url(ctx, &alias).await?;
            info!(alias = %alias, "deleted url");
        }
    }

    Ok(())
}

async fn save_with_generated_alias(
    store: &PostgresStore,
    ctx: &RequestContext,
    url: &str,
) -> anyhow::Result<i64> {
    for _ in 0..GENERATED_ALIAS_ATTEMPTS {
        let alias = generate_alias();
        match store.save_url(ctx, url, &alias).await {
            Ok(id) => {
                info!(alias = %alias, id, "saved url under generated alias");
                eprintln!("alias: {alias}");
                return Ok(id);
            }
            Err(err) if err.is_url_exists() => {
                debug!(alias = %alias, "generated alias already taken");
            }
            Err(err) => return Err(err.into()),
        }
    }

    bail!("could not find a free alias after {GENERATED_ALIAS_ATTEMPTS} attempts")
}

/// Checks that `raw` is an absolute http(s) URL.
pub fn validate_url(raw: &str) -> anyhow::Result<String> {
    let parsed = Url::parse(raw).with_context(|| format!("invalid url '{raw}'"))?;
    if !matches!(parsed.scheme(), "http" | "https") {
        bail!("unsupported url scheme '{}'", parsed.scheme());
    }
    Ok(raw.to_string())
}

pub fn generate_alias() -> Alias {
    let alias: String = rand::rng()
        .sample_iter(&Alphanumeric)
        .take(GENERATED_ALIAS_LENGTH)
        .map(char::from)
        .collect();
    Alias::new_unchecked(alias)
}
