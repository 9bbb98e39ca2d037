// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! `mesh-orchestrator`: Intake API, Outbox Publisher and Job Runner for
//! the multi-region inference orchestrator.
//!
//! Starts three things side by side: the axum HTTP server (Intake API,
//! admin, health, metrics), the outbox publisher task, and a fixed-size
//! pool of job runner workers. All three share one [`AppState`] and stop
//! together on `SIGINT`/`SIGTERM`.

mod api;
mod metrics;
mod outbox;
mod retry;
mod runner;
mod state;

use std::sync::Arc;

use dashmap::DashSet;
use tracing::{info, warn};

use inference_mesh_core::api::AuthService;
use inference_mesh_core::config::ConfigLoader;
use inference_mesh_core::database::Database;
use inference_mesh_core::queue::RedisWorkQueue;
use inference_mesh_core::router_client::RouterClient;
use inference_mesh_datasets::builtin::builtin_catalogs;
use inference_mesh_datasets::loader::CatalogLoader;

use metrics::Metrics;
use state::AppState;

/// Number of job runner workers popping the Work Queue concurrently.
/// Bounds request concurrency to the Hybrid Router independent of queue
/// depth (spec §7 "The job runner uses a fixed-size worker pool").
const JOB_RUNNER_WORKERS: usize = 4;

/// Optional directory of additional question catalog TOML files,
/// layered on top of the three built-in catalogs.
const CATALOG_DIR_ENV: &str = "MESH_CATALOG_DIR";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = ConfigLoader::new().load()?;
    info!("configuration loaded");

    let db = Database::connect(&config.database).await?;
    db.migrate().await?;
    info!("database connected and migrated");

    let queue = RedisWorkQueue::connect(&config.queue.url, &config.queue.jobs_queue_name).await?;
    info!(queue = %config.queue.jobs_queue_name, "work queue connected");

    let router = RouterClient::new(&config.hybrid_router)?;
    let auth = AuthService::new(config.auth.clone());

    let mut catalogs = builtin_catalogs();
    if let Ok(dir) = std::env::var(CATALOG_DIR_ENV) {
        match CatalogLoader::new().load_dir(std::path::Path::new(&dir)) {
            Ok(extra) => {
                info!(count = extra.len(), dir, "loaded additional question catalogs");
                catalogs.extend(extra);
            }
            Err(e) => warn!(error = %e, dir, "failed to load additional question catalogs"),
        }
    }
    info!(count = catalogs.len(), "question catalogs ready");

    let state = AppState {
        config: Arc::new(config),
        db,
        queue,
        router: Arc::new(router),
        auth: Arc::new(auth),
        catalogs: Arc::new(catalogs),
        metrics: Arc::new(Metrics::new()),
        cancellations: Arc::new(DashSet::new()),
    };

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);

    let mut background = tokio::task::JoinSet::new();
    background.spawn(outbox::run(state.clone(), shutdown_rx.clone()));
    for worker_id in 0..JOB_RUNNER_WORKERS {
        info!(worker_id, "starting job runner worker");
        background.spawn(runner::run_worker(state.clone(), shutdown_rx.clone()));
    }

    let app = api::router(state);
    let addr = std::env::var("MESH_ORCHESTRATOR_BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!(addr, "mesh-orchestrator listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(wait_for_shutdown_signal())
        .await?;

    info!("http server stopped, signalling background tasks");
    let _ = shutdown_tx.send(true);
    while background.join_next().await.is_some() {}
    info!("mesh-orchestrator shut down cleanly");

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
