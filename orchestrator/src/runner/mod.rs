// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The Job Runner: a pool of worker tasks popping envelopes off the
//! Work Queue and dispatching them through the multi-region fan-out in
//! [`fanout`].

pub mod fanout;

use std::time::Duration;

use tracing::{error, info, warn};

use inference_mesh_core::domain::{JobSpec, JobStatus};

use crate::state::AppState;

/// How long a single `BRPOP` call blocks before the worker loop checks
/// for shutdown again.
const POP_TIMEOUT_SECS: f64 = 2.0;

/// Runs one worker's pop-dispatch-ack loop until `shutdown` fires.
pub async fn run_worker(state: AppState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            info!("job runner worker shutting down");
            return;
        }

        let envelope = tokio::select! {
            result = state.queue.pop(POP_TIMEOUT_SECS) => result,
            _ = shutdown.changed() => continue,
        };

        let envelope = match envelope {
            Ok(Some(envelope)) => envelope,
            Ok(None) => continue,
            Err(e) => {
                warn!(error = %e, "work queue pop failed");
                tokio::time::sleep(Duration::from_secs(1)).await;
                continue;
            }
        };

        if let Err(e) = dispatch(&state, envelope.clone()).await {
            error!(envelope_id = %envelope.envelope_id, job_id = %envelope.job_id, error = %e, "dispatch failed, re-entering retry queue");
            match state.queue.requeue_or_dead_letter(envelope).await {
                Ok(true) => {}
                Ok(false) => warn!("envelope exhausted retry budget, moved to dead-letter queue"),
                Err(e) => error!(error = %e, "failed to requeue envelope after dispatch failure"),
            }
        }
    }
}

/// Errors raised while dispatching a single envelope. Any error here
/// means the envelope was not successfully handed off and must be
/// requeued by the caller (spec §4.4 "Failure escalation").
#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// The database was unreachable or a query failed.
    #[error("database error: {0}")]
    Database(#[from] inference_mesh_core::database::DatabaseError),
    /// The stored raw spec failed to deserialize back into a `JobSpec`.
    #[error("stored jobspec is malformed: {0}")]
    MalformedSpec(#[from] serde_json::Error),
}

/// Dispatches envelope `E`, per spec §4.4 "Dispatch".
pub async fn dispatch(
    state: &AppState,
    envelope: inference_mesh_core::domain::WorkEnvelope,
) -> Result<(), DispatchError> {
    let job_id = envelope.job_id;

    let record = match state.db.jobs().get(&job_id).await {
        Ok(record) => record,
        Err(e) if e.is_not_found() => {
            warn!(job_id, "envelope references a missing job record, treating as poison");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    // Idempotent: a second consumer observing processing/completed/failed
    // must not re-dispatch.
    if record.status != JobStatus::Created && record.status != JobStatus::Queued {
        info!(job_id, status = %record.status, "envelope already dispatched, skipping");
        return Ok(());
    }

    let spec: JobSpec = serde_json::from_value(record.raw_spec.clone())?;

    state
        .db
        .jobs()
        .update_status(&job_id, JobStatus::Processing, None)
        .await?;
    info!(job_id, "job moved to processing");

    fanout::run_fanout(state, &record, &spec).await?;

    Ok(())
}

/// Re-exported for the barrier integration test, which exercises the
/// full fan-out without going through the queue.
pub use fanout::run_fanout;
