//! Campaign Cache CLI
//!
//! Reads API resources through the persistent response cache and manages
//! cached entries from the command line.
//!
//! # Usage
//! - `campaign_cache fetch <path|url> [--refresh] [--ttl-ms N]`
//! - `campaign_cache invalidate <fragment>`
//! - `campaign_cache forget <path|url>`
//! - `campaign_cache keys`
//! - `campaign_cache stats`

use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use reqwest::Url;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use campaign_cache::cache::shared;
use campaign_cache::{CacheOptions, CachedFetcher, Config, RequestOptions, ResponseCache};

#[derive(Parser, Debug)]
#[command(name = "campaign_cache")]
#[command(about = "Cached reads and cache maintenance for the campaign analytics API", long_about = None)]
#[command(version)]
struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// GET a resource through the cache
    Fetch {
        /// API path (joined to API_BASE_URL) or absolute URL
        target: String,

        /// Skip the cache lookup and overwrite the entry
        #[arg(long)]
        refresh: bool,

        /// Lifetime of the stored entry in milliseconds
        #[arg(long)]
        ttl_ms: Option<u64>,
    },

    /// Remove every cached entry whose key contains a fragment
    Invalidate {
        /// Key fragment, usually a resource path
        fragment: String,
    },

    /// Remove the cached entry for one resource
    Forget {
        /// API path or absolute URL
        target: String,
    },

    /// List cached keys
    Keys,

    /// Print cache statistics for this process
    Stats,
}

fn resolve(fetcher: &CachedFetcher, target: &str) -> Result<Url> {
    if target.starts_with("http://") || target.starts_with("https://") {
        Ok(Url::parse(target)?)
    } else {
        Ok(fetcher.url(target, &[])?)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "campaign_cache=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();

    let config = Config::from_env();
    info!(
        "Configuration loaded: storage={}, default_ttl={}ms, api={}",
        config.storage_path.display(),
        config.default_ttl.as_millis(),
        config.api_base_url
    );

    let cache = ResponseCache::from_config(&config).context("opening cache storage")?;
    let fetcher = CachedFetcher::new(shared(cache), &config)?;

    match cli.command {
        Command::Fetch {
            target,
            refresh,
            ttl_ms,
        } => {
            let url = resolve(&fetcher, &target)?;
            let cancel = CancellationToken::new();
            let ctrl_c = tokio::spawn(cancel_on_ctrl_c(cancel.clone()));

            let mut options = CacheOptions::new().bypass_cache(refresh);
            if let Some(ms) = ttl_ms {
                options = options.ttl(Duration::from_millis(ms));
            }
            let result = fetcher
                .fetch(&url, &RequestOptions::new().with_cancel(cancel), options)
                .await;
            ctrl_c.abort();

            let response = result?;
            info!(from_cache = response.from_cache, key = %response.cache_key, "Fetched");
            println!("{}", serde_json::to_string_pretty(&response.body)?);
        }
        Command::Invalidate { fragment } => {
            let removed = fetcher.invalidate(fragment.as_str()).await;
            println!("removed {} entries", removed);
        }
        Command::Forget { target } => {
            let url = resolve(&fetcher, &target)?;
            let key = fetcher.key_for(&url);
            if fetcher.invalidate_key(&key).await {
                println!("removed {}", key);
            } else {
                println!("not cached: {}", key);
            }
        }
        Command::Keys => {
            for key in fetcher.cache().read().await.keys() {
                println!("{}", key);
            }
        }
        Command::Stats => {
            let stats = fetcher.cache().read().await.stats();
            println!("{}", serde_json::to_string_pretty(&stats)?);
            println!("hit rate: {:.1}%", stats.hit_rate() * 100.0);
        }
    }

    Ok(())
}

/// Cancels the in-flight request on Ctrl+C.
async fn cancel_on_ctrl_c(cancel: CancellationToken) {
    if signal::ctrl_c().await.is_ok() {
        warn!("Received Ctrl+C, aborting request");
        cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command, clap::Error> {
        Cli::try_parse_from(std::iter::once("campaign_cache").chain(args.iter().copied()))
            .map(|cli| cli.command)
    }

    #[test]
    fn test_parse_fetch() {
        let command = parse(&["fetch", "/mamaearth/campaign", "--refresh", "--ttl-ms", "500"])
            .unwrap();
        match command {
            Command::Fetch {
                target,
                refresh,
                ttl_ms,
            } => {
                assert_eq!(target, "/mamaearth/campaign");
                assert!(refresh);
                assert_eq!(ttl_ms, Some(500));
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_parse_maintenance_commands() {
        assert!(matches!(
            parse(&["invalidate", "/mamaearth/campaign"]).unwrap(),
            Command::Invalidate { fragment } if fragment == "/mamaearth/campaign"
        ));
        assert!(matches!(
            parse(&["forget", "/mamaearth/keywords"]).unwrap(),
            Command::Forget { target } if target == "/mamaearth/keywords"
        ));
        assert!(matches!(parse(&["keys"]).unwrap(), Command::Keys));
        assert!(matches!(parse(&["stats"]).unwrap(), Command::Stats));
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse(&[]).is_err());
        assert!(parse(&["fetch"]).is_err());
        assert!(parse(&["fetch", "/a", "/b"]).is_err());
        assert!(parse(&["fetch", "/a", "--ttl-ms", "soon"]).is_err());
        assert!(parse(&["explode"]).is_err());
    }

    #[test]
    fn test_cli_definition_is_valid() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
