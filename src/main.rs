// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! mytt-proxy API server
//!
//! Local proxy in front of myTischtennis.de: player search, TTR lookups,
//! and automatic refresh of the stored auth credential.

use mytt_proxy::{
    config::Config,
    services::{token, MyttClient, PlayerEnricher, TokenManager, TokenStore},
    AppState,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging();

    // Load configuration from environment
    let config = Config::from_env()?;
    tracing::info!(port = config.port, upstream = %config.upstream_base_url, "Starting mytt-proxy");

    // Decode the persisted credential blob; a malformed blob degrades to
    // "no credential" instead of failing startup.
    let store = Arc::new(TokenStore::from_env(config.credential_file.clone()));

    let mytt = MyttClient::new(
        config.upstream_base_url.clone(),
        config.auth_base_url.clone(),
    )?;

    let tokens = Arc::new(TokenManager::new(store, mytt.clone()));
    let enricher = PlayerEnricher::new(mytt.clone(), tokens.clone());

    // Background expiry check; refresh failures are logged, never fatal.
    token::spawn_refresh_task(tokens.clone(), token::REFRESH_CHECK_INTERVAL);

    // Build shared state
    let state = Arc::new(AppState {
        config: config.clone(),
        tokens,
        mytt,
        enricher,
    });

    // Build router
    let app = mytt_proxy::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(listener, app).await?;
    Ok(())
}

/// Initialize structured logging.
fn init_logging() {
    let format = tracing_subscriber::fmt::layer().with_target(false);

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("mytt_proxy=debug".parse().unwrap())
                .add_directive("info".parse().unwrap()),
        )
        .with(format)
        .init();
}
