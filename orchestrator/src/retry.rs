// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Retry Service: re-dispatches a single failed or timed-out
//! `(job, region, model, question)` tuple without disturbing the rest
//! of the job, per spec §4.8.

use thiserror::Error;
use tracing::info;

use inference_mesh_core::api::ApiError;
use inference_mesh_core::database::DatabaseError;
use inference_mesh_core::domain::{ExecutionRecord, MAX_RETRIES};
use inference_mesh_core::router_client::InferenceRequest;

use crate::state::AppState;

/// Errors surfaced by `POST /api/v1/executions/{id}/retry-question`.
#[derive(Debug, Error)]
pub enum RetryError {
    /// The execution id does not exist.
    #[error("execution not found: {0}")]
    NotFound(i64),
    /// The execution's status does not permit a retry (not failed or
    /// timed out). Maps to 400.
    #[error("execution {id} is not retriable in status {status}")]
    WrongStatus {
        /// Execution id.
        id: i64,
        /// Current status.
        status: String,
    },
    /// The execution has exhausted its retry budget. Maps to 429.
    #[error("execution {id} has exhausted its retry budget ({retry_count}/{max_retries})")]
    MaxRetriesExceeded {
        /// Execution id.
        id: i64,
        /// Current retry count.
        retry_count: u32,
        /// Retry ceiling.
        max_retries: u32,
    },
    /// Underlying database failure.
    #[error(transparent)]
    Database(#[from] DatabaseError),
}

impl From<RetryError> for ApiError {
    fn from(err: RetryError) -> Self {
        match err {
            RetryError::NotFound(id) => Self::NotFound(format!("execution {id} not found")),
            RetryError::WrongStatus { .. } => Self::BadRequest(err.to_string()),
            RetryError::MaxRetriesExceeded { .. } => Self::RateLimitExceeded {
                message: err.to_string(),
                retry_after_secs: 60,
            },
            RetryError::Database(e) => Self::from(e),
        }
    }
}

/// Re-dispatches execution `id`. Validates retriability, resets the
/// record to `running` via [`ExecutionRecord::begin_retry`], re-invokes
/// the router with the same tuple, and persists the outcome in place so
/// the dedup key is preserved.
pub async fn retry_question(state: &AppState, id: i64) -> Result<ExecutionRecord, RetryError> {
    let mut record = state.db.executions().get(id).await.map_err(|e| {
        if e.is_not_found() {
            RetryError::NotFound(id)
        } else {
            RetryError::Database(e)
        }
    })?;

    if !record.status.is_retriable() {
        return Err(RetryError::WrongStatus {
            id,
            status: record.status.to_string(),
        });
    }
    if record.retry_count >= record.max_retries.min(MAX_RETRIES) {
        return Err(RetryError::MaxRetriesExceeded {
            id,
            retry_count: record.retry_count,
            max_retries: record.max_retries.min(MAX_RETRIES),
        });
    }

    let previous_error = record.original_error.clone();
    record.begin_retry(previous_error);
    state.db.executions().update(&record).await?;
    info!(execution_id = id, retry_count = record.retry_count, "retry dispatched");

    let prompt = state
        .find_question_prompt(&record.question_id)
        .unwrap_or(&record.question_id)
        .to_string();

    let request = InferenceRequest {
        model: record.model_id.clone(),
        prompt,
        region_preference: record.region.clone(),
        temperature: 0.7,
        max_tokens: 1024,
        metadata: None,
    };

    match state.router.inference(&request).await {
        Ok(response) if response.success => {
            record.mark_completed(
                response.response,
                response.metadata,
                response.provider_used.unwrap_or_else(|| "unknown".to_string()),
            );
        }
        Ok(response) => {
            record.mark_failed(response.error.unwrap_or_else(|| "router reported failure".to_string()));
        }
        Err(e) => {
            record.mark_failed(e.to_string());
        }
    }

    state.db.executions().update(&record).await?;
    Ok(record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_mesh_core::domain::ExecutionRecord;

    #[test]
    fn test_not_retriable_after_exhausting_budget() {
        let mut record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        record.mark_failed("boom".to_string());
        for _ in 0..MAX_RETRIES {
            record.begin_retry(None);
            record.mark_failed("boom again".to_string());
        }
        assert!(!record.is_retriable());
    }
}
