mod api_client;
mod config;
mod errors;
mod models;
mod routes;
mod state;
mod survey;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tower::ServiceBuilder;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::api_client::ApiClient;
use crate::config::Config;
use crate::routes::build_router;
use crate::state::AppState;
use crate::survey::session::Collaborators;

#[tokio::main]
async fn main() -> Result<()> {
    // Load configuration first (fails on missing required env vars)
    let config = Config::from_env()?;

    // Initialize structured logging
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new(format!("{}={}", env!("CARGO_PKG_NAME"), &config.rust_log))
        }))
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting survey service v{}", env!("CARGO_PKG_VERSION"));

    // One platform client serves every collaborator role
    let client = Arc::new(ApiClient::new(
        config.platform_api_url.clone(),
        Duration::from_secs(config.request_timeout_secs),
        config.submit_max_retries,
    )?);
    info!(
        "Platform API client initialized ({}, timeout {}s, {} submit attempts)",
        config.platform_api_url, config.request_timeout_secs, config.submit_max_retries
    );

    let collaborators = Collaborators {
        tests: client.clone(),
        submitter: client.clone(),
        subjects: Some(client),
    };
    let state = AppState::new(&config, collaborators);
    info!("Survey policy: {:?}", state.policy);

    // Abandoned sessions are swept in the background
    let sweeper = state.sessions.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(sweeper.idle_ttl().max(Duration::from_secs(60)) / 4);
        loop {
            interval.tick().await;
            sweeper.evict_idle().await;
        }
    });

    let app = build_router(state).layer(
        ServiceBuilder::new()
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive()),
    );

    let addr: SocketAddr = format!("0.0.0.0:{}", config.port).parse()?;
    info!("Listening on {addr}");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
