mod config;
mod error;
mod extract;
mod fetcher;
mod labels;
mod markup;
mod normalize;
mod player;
mod routes;
mod sniff;
#[cfg(test)]
mod testutil;

use anyhow::Context;
use reqwest::Client;
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::fetcher::StatusFetcher;
use crate::normalize::Normalizer;
use crate::routes::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // 1. Load .env before anything reads the environment
    dotenvy::dotenv().ok();

    // 2. Initialize Logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,habblive_radio=debug")),
        )
        .init();

    // 3. Load Config
    let config = Config::from_env()?;
    let labels = config.labels()?;
    if let Some(path) = &config.labels_file {
        info!("Label table loaded from {:?}", path);
    }

    // 4. Initialize HTTP Client
    let client = Client::builder()
        .timeout(Duration::from_secs(10))
        .build()?;

    let fetcher = StatusFetcher::new(
        client.clone(),
        config.candidates.clone(),
        config.timeout,
        config.user_agent.clone(),
        &labels,
    )
    .context("compiling status label patterns")?;
    for (i, url) in fetcher.candidates().iter().enumerate() {
        info!("Status candidate #{}: {}", i + 1, url);
    }
    let normalizer = Normalizer::new(config.fallbacks.clone(), &labels.online_phrases)
        .context("compiling online phrases")?;

    let state = AppState {
        client,
        fetcher: Arc::new(fetcher),
        normalizer: Arc::new(normalizer),
        avatar_api_url: config.avatar_api_url.clone(),
        page: Arc::new(player::render(&config)?),
    };

    // 5. Setup Router
    let app = routes::router(state);

    // 6. Start Server
    let addr: SocketAddr = format!("{}:{}", config.bind_address, config.port)
        .parse()
        .context("BIND_ADDRESS and PORT must form a socket address")?;
    info!("Radio player listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
