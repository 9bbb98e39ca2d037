// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `mesh-router`: the Hybrid Router, deployed independently of
//! `mesh-orchestrator` because it owns a categorically different
//! resource (regional GPU/provider concurrency).
//!
//! Starts the axum HTTP server (inference, provider/debug/queue
//! surfaces) alongside one dispatch worker per configured region and
//! the background health-check sweep. All share one [`AppState`] and
//! stop together on `SIGINT`/`SIGTERM`.

mod api;
mod debug_log;
mod dispatch;
mod health_check;
mod metrics;
mod queues;
mod registry;
mod state;

use std::sync::Arc;

use tracing::info;

use inference_mesh_core::api::AuthService;
use inference_mesh_core::config::ConfigLoader;

use debug_log::{DebugLog, StartupStatus};
use metrics::Metrics;
use queues::RegionQueues;
use registry::ProviderRegistry;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ConfigLoader::new().load()?;
    info!(providers = config.providers.len(), "configuration loaded");

    let regions: Vec<String> = {
        let mut regions: Vec<String> = config.providers.iter().map(|p| p.region.clone()).collect();
        regions.sort();
        regions.dedup();
        regions
    };

    let registry = ProviderRegistry::from_settings(&config.providers, &regions);
    let queues = Arc::new(RegionQueues::new(&regions));
    let auth = AuthService::new(config.auth.clone());
    let debug_log = Arc::new(DebugLog::new());
    debug_log.set_startup(StartupStatus {
        started_at: chrono::Utc::now(),
        providers_configured: config.providers.len(),
        regions: regions.clone(),
    });

    let state = AppState {
        config: Arc::new(config),
        registry,
        queues: queues.clone(),
        auth: Arc::new(auth),
        http: reqwest::Client::new(),
        metrics: Arc::new(Metrics::new()),
        debug_log,
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut background = tokio::task::JoinSet::new();
    background.spawn(health_check::run(state.clone(), shutdown_rx.clone()));
    for region in &regions {
        let Some(receiver) = queues.take_receiver(region) else {
            continue;
        };
        info!(region, "starting region dispatch worker");
        background.spawn(dispatch::run_region_worker(
            state.clone(),
            region.clone(),
            receiver,
            shutdown_rx.clone(),
        ));
    }

    let app = api::router(state);
    let addr = std::env::var("MESH_ROUTER_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8081".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "mesh-router listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    info!("http server stopped, signalling background tasks");
    let _ = shutdown_tx.send(true);
    while background.join_next().await.is_some() {}
    info!("mesh-router shut down cleanly");

    Ok(())
}

/// Resolves once `SIGINT` (Ctrl-C) or, on Unix, `SIGTERM` is received.
async fn wait_for_shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
