//! Cluster observer - keeps a live, reconciled model of cluster state
//!
//! This binary fetches a cluster snapshot, subscribes to the change-event
//! feed, and serves the reconciled view (with orbit layout applied) over
//! HTTP for the 3D observatory frontend.

use anyhow::Result;
use observer_lib::{
    api::ApiClient,
    engine::{ClusterEngine, EngineOutputs},
    feed::{EventFeed, WsTransport},
    health::{components, HealthRegistry},
    state::ClusterStore,
    ObserverMetrics,
};
use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod api;
mod config;

const OBSERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing with JSON output and env filter
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with(fmt::layer().json())
        .init();

    info!(version = OBSERVER_VERSION, "Starting cluster-observer");

    // Load configuration
    let config = config::ObserverConfig::load()?;
    info!(
        backend = %config.backend_url,
        feed = %config.feed_url,
        "Observer configured"
    );

    // Initialize health registry
    let health_registry = HealthRegistry::new();
    health_registry.register(components::SNAPSHOT).await;
    health_registry.register(components::FEED).await;
    health_registry.register(components::STORE).await;

    // Initialize metrics
    let metrics = ObserverMetrics::new();

    // The store, its single writer, and the read-only HTTP surface
    let store = Arc::new(RwLock::new(ClusterStore::new()));
    let client = ApiClient::new(&config.backend_url)?;

    let (feed, feed_events) = EventFeed::new(config.feed_config(), Arc::new(WsTransport));
    let (engine, outputs) = ClusterEngine::new(Arc::clone(&store));
    let EngineOutputs {
        mut notifications,
        connected,
    } = outputs;

    // Presentation stand-in: surface change notifications in the log
    tokio::spawn(async move {
        while let Some(notification) = notifications.recv().await {
            info!(event = "cluster_change", "{notification}");
        }
    });

    // Track feed connectivity in the health registry
    {
        let health = health_registry.clone();
        let mut connected = connected.clone();
        tokio::spawn(async move {
            while connected.changed().await.is_ok() {
                if *connected.borrow() {
                    health.set_healthy(components::FEED).await;
                } else {
                    health
                        .set_degraded(components::FEED, "Feed disconnected, reconnecting")
                        .await;
                }
            }
        });
    }

    feed.open();

    let engine_handle = {
        let health = health_registry.clone();
        tokio::spawn(async move {
            let result = engine.run(&client, feed_events).await;
            if let Err(error) = &result {
                health
                    .set_unhealthy(components::SNAPSHOT, error.to_string())
                    .await;
            }
            result
        })
    };

    // Start the health/metrics/state server
    let app_state = Arc::new(api::AppState::new(
        health_registry.clone(),
        metrics.clone(),
        Arc::clone(&store),
        connected,
    ));
    let _api_handle = tokio::spawn(api::serve(config.api_port, app_state));

    health_registry.set_ready(true).await;

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            info!("Shutting down");
            feed.close();
        }
        result = engine_handle => {
            match result {
                Ok(Ok(())) => info!("Engine stopped"),
                Ok(Err(error)) => {
                    error!(error = %error, "Engine failed");
                    return Err(error);
                }
                Err(error) => error!(error = %error, "Engine task panicked"),
            }
        }
    }

    Ok(())
}
