//! referral-gateway server entry point.
//!
//! Starts the Axum HTTP server with REST and WebSocket endpoints.

use std::sync::Arc;

use axum::Router;
use axum::routing::get;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use referral_gateway::api;
use referral_gateway::app_state::AppState;
use referral_gateway::config::GatewayConfig;
use referral_gateway::domain::{ClaimLedger, EventBus, Member, MemberDirectory, RewardClaim};
use referral_gateway::persistence::PostgresStore;
use referral_gateway::service::{ClaimService, NetworkService};
use referral_gateway::ws::handler::ws_handler;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    // Load configuration
    let config = GatewayConfig::from_env()?;
    tracing::info!(addr = %config.listen_addr, "starting referral-gateway");

    // Optional durable store
    let store = if config.persistence_enabled {
        let store = PostgresStore::connect(&config).await?;
        tracing::info!("postgres persistence enabled");
        Some(Arc::new(store))
    } else {
        tracing::info!("running without durable persistence");
        None
    };

    // Build domain layer
    let directory = Arc::new(MemberDirectory::new());
    let ledger = Arc::new(ClaimLedger::new());
    let event_bus = EventBus::new(config.event_bus_capacity);

    if let Some(store) = &store {
        rehydrate(store, &directory, &ledger).await?;
    }

    // Build service layer
    let claim_service = ClaimService::new(
        Arc::clone(&directory),
        ledger,
        event_bus.clone(),
        store.clone(),
        config.traversal_node_budget,
    );
    let network_service = Arc::new(NetworkService::new(
        directory,
        claim_service,
        event_bus.clone(),
        store,
        config.traversal_node_budget,
    ));

    // Build application state
    let app_state = AppState {
        network_service,
        event_bus,
    };

    // Build router
    let app = Router::new()
        .merge(api::build_router())
        .route("/ws", get(ws_handler))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(app_state);

    // Start server
    let listener = tokio::net::TcpListener::bind(config.listen_addr).await?;
    tracing::info!(addr = %config.listen_addr, "server listening");

    axum::serve(listener, app).await?;

    Ok(())
}

/// Loads the durable member and claim state into the in-memory stores.
async fn rehydrate(
    store: &PostgresStore,
    directory: &MemberDirectory,
    ledger: &ClaimLedger,
) -> anyhow::Result<()> {
    let mut members = 0usize;
    for row in store.load_members().await? {
        let member: Member = row.into();
        if let Err(e) = directory.insert(member).await {
            tracing::warn!(error = %e, "skipping member row during rehydration");
            continue;
        }
        members += 1;
    }

    let mut claims = 0usize;
    for row in store.load_claims(None).await? {
        match RewardClaim::try_from(row) {
            Ok(claim) => {
                if ledger.restore(claim).await {
                    claims += 1;
                }
            }
            Err(e) => tracing::warn!(error = %e, "skipping claim row during rehydration"),
        }
    }

    tracing::info!(members, claims, "state rehydrated from postgres");
    Ok(())
}
