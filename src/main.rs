// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Storefront Auth API Server
//!
//! Serves registration, login, token refresh and account management for the
//! storefront. Run with `generate-key` to print a fresh field encryption key.

use std::net::SocketAddr;
use std::sync::Arc;
use storefront_auth::{
    config::Config,
    db::MemoryUserStore,
    services::{encryption, KvStore},
    AppState,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::args().nth(1).as_deref() == Some("generate-key") {
        println!("{}", encryption::generate_key());
        return Ok(());
    }

    // Initialize structured JSON logging
    init_logging()?;

    // Load and validate configuration; a bad key or secret is fatal here
    let config = Config::from_env().map_err(|e| {
        tracing::error!(error = %e, "Invalid configuration");
        e
    })?;
    tracing::info!(port = config.port, "Starting storefront auth API");

    // Shared key-value store for rate limits and consumed refresh tokens
    let kv = KvStore::connect(&config.redis_url, config.kv_timeout).await?;

    // TODO: swap in the relational user repository once its schema lands.
    let users = Arc::new(MemoryUserStore::new());
    tracing::warn!("Using in-memory user repository; accounts are lost on restart");

    let state = Arc::new(AppState::new(config.clone(), users, kv));

    // Build router
    let app = storefront_auth::routes::create_router(state);

    // Start server
    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!(address = %addr, "Server listening");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    tracing::info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}

/// Initialize structured JSON logging.
fn init_logging() -> anyhow::Result<()> {
    let format = tracing_subscriber::fmt::layer()
        .json()
        .with_target(false)
        .with_current_span(true)
        .flatten_event(true);

    tracing_subscriber::registry()
        .with(
            EnvFilter::from_default_env()
                .add_directive("storefront_auth=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .with(format)
        .init();
    Ok(())
}
