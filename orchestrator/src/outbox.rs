// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Outbox Publisher: polls the `outbox` table for unpublished rows,
//! pushes each payload to the Work Queue, then marks it published.
//! Runs as a background task alongside the Job Runner workers.

use std::time::Duration;

use tracing::{error, info, warn};

use inference_mesh_core::domain::{JobStatus, WorkEnvelope};

use crate::state::AppState;

/// How often the publisher polls for unpublished rows.
const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Max rows pulled per poll cycle.
const BATCH_SIZE: i64 = 50;

/// Runs the publisher loop until `shutdown` fires.
pub async fn run(state: AppState, mut shutdown: tokio::sync::watch::Receiver<bool>) {
    let mut interval = tokio::time::interval(POLL_INTERVAL);
    loop {
        tokio::select! {
            _ = interval.tick() => {}
            _ = shutdown.changed() => {
                info!("outbox publisher shutting down");
                return;
            }
        }

        if let Err(e) = publish_batch(&state).await {
            error!(error = %e, "outbox publish cycle failed");
        }
    }
}

/// Publishes one batch of pending outbox rows, returning how many were
/// pushed.
pub async fn publish_batch(state: &AppState) -> Result<usize, inference_mesh_core::database::DatabaseError> {
    let pending = state.db.outbox().fetch_pending(BATCH_SIZE).await?;
    let mut published = 0usize;

    for entry in pending {
        let envelope: WorkEnvelope = match serde_json::from_value(entry.payload.clone()) {
            Ok(envelope) => envelope,
            Err(e) => {
                warn!(outbox_id = entry.id, error = %e, "outbox row payload is malformed, skipping");
                continue;
            }
        };

        match state.queue.push(&envelope).await {
            Ok(()) => {
                state.db.outbox().mark_published(entry.id).await?;
                state
                    .db
                    .jobs()
                    .update_status(&entry.job_id, JobStatus::Queued, None)
                    .await?;
                state
                    .metrics
                    .outbox_published_total
                    .with_label_values(&["ok"])
                    .inc();
                published += 1;
            }
            Err(e) => {
                warn!(outbox_id = entry.id, error = %e, "failed to push envelope to work queue, will retry next cycle");
                state
                    .metrics
                    .outbox_published_total
                    .with_label_values(&["error"])
                    .inc();
            }
        }
    }

    Ok(published)
}

/// Republishes jobs stuck in `queued` whose outbox entry never reached
/// the work queue, per the `POST /api/v1/admin/republish-stuck-jobs`
/// operation (spec §4.9 "Republish stuck jobs").
pub async fn republish_stuck_jobs(
    state: &AppState,
    stuck_after_secs: i64,
    limit: i64,
) -> Result<usize, inference_mesh_core::database::DatabaseError> {
    let stuck = state.db.jobs().list_stuck(stuck_after_secs, limit).await?;
    let mut republished = 0usize;

    for job in stuck {
        let envelope = WorkEnvelope::new(uuid::Uuid::new_v4().to_string(), job.jobspec_id.clone());
        state.queue.push(&envelope).await?;
        republished += 1;
        info!(job_id = %job.jobspec_id, "republished stuck job");
    }

    Ok(republished)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_payload_does_not_panic_deserialization() {
        let bad = serde_json::json!({"not": "an envelope"});
        let result: Result<WorkEnvelope, _> = serde_json::from_value(bad);
        assert!(result.is_err());
    }
}
