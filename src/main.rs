use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

use feedmerge::config::Config;
use feedmerge::merge::{self, CacheStore};
use feedmerge::render::FeedMeta;
use feedmerge::scheduler;
use feedmerge::server::{create_router, AppState};
use feedmerge::util::validate_source_url;

#[derive(Parser)]
#[command(name = "feedmerge", version, about = "Merges remote feeds into one republished timeline")]
struct Args {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("failed to load configuration from '{}'", args.config.display()))?;

    // Drop malformed source URLs up front so every later refresh works from
    // a vetted list
    let mut sources = Vec::with_capacity(config.sources.len());
    for source in &config.sources {
        match validate_source_url(source) {
            Ok(_) => sources.push(source.clone()),
            Err(error) => tracing::warn!("skipping source '{source}': {error}"),
        }
    }
    if sources.is_empty() {
        tracing::warn!("no valid sources configured; serving an empty feed");
    }

    let client = reqwest::Client::builder()
        .user_agent(concat!("feedmerge/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("failed to build HTTP client")?;

    let store = CacheStore::new();

    // Eager first refresh so the server never starts with a cold cache
    tracing::info!("running initial refresh of {} sources", sources.len());
    store.replace(merge::refresh(&client, &sources).await).await;

    let _scheduler = scheduler::spawn(
        client,
        sources,
        store.clone(),
        Duration::from_secs(config.refresh_interval_minutes * 60),
    );

    let state = AppState {
        store,
        meta: FeedMeta {
            title: config.title.clone(),
            site_url: config.site_url.clone(),
            description: config.description.clone(),
        },
    };
    let router = create_router(state);

    let port = config.effective_port();
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port))
        .await
        .with_context(|| format!("failed to bind port {port}"))?;
    tracing::info!("listening on http://0.0.0.0:{port}");

    axum::serve(listener, router)
        .await
        .context("server error")?;

    Ok(())
}
