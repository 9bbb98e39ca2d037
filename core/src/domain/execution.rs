//! The persisted Execution Record: one row per `(job, region, model,
//! question)` tuple.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::classification::ResponseClassification;

/// Status of a single Execution Record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    /// Row inserted, dispatch not yet invoked.
    Pending,
    /// Dispatched to the router; awaiting response.
    Running,
    /// Terminal success (including empty and refused responses).
    Completed,
    /// Terminal failure.
    Failed,
    /// Terminal: per-tuple deadline exceeded.
    Timeout,
    /// Terminal: job was cancelled before this tuple ran.
    Cancelled,
}

impl ExecutionStatus {
    /// `completed`, `failed`, `timeout` and `cancelled` are terminal;
    /// `UpdateExecution` refuses to overwrite them outside of a retry.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::Pending | Self::Running)
    }

    /// Retriable per spec §4.8 step 1: `failed`, `timeout`, or the
    /// `technical_error` alias used by older clients (mapped onto
    /// `Failed` at this layer; see [`ExecutionRecord::is_retriable`]).
    pub fn is_retriable(self) -> bool {
        matches!(self, Self::Failed | Self::Timeout)
    }

    /// Whether this status counts toward the success quorum.
    pub fn counts_as_success(self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for ExecutionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Timeout => "timeout",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// One entry in an Execution Record's append-only retry history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryAttempt {
    /// 1-based attempt number (matches the post-increment `retry_count`).
    pub attempt_n: u32,
    /// When this retry attempt was dispatched.
    pub started_at: DateTime<Utc>,
    /// The error message that triggered this retry, if any.
    pub previous_error: Option<String>,
}

/// Maximum number of times a single Execution Record may be retried via
/// [`crate::domain::execution::ExecutionRecord::retry_count`] before
/// `/executions/{id}/retry-question` must refuse with `MAX_RETRIES`.
pub const MAX_RETRIES: u32 = 3;

/// A single `(job, region, model, question)` execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionRecord {
    /// Serial primary key.
    pub id: i64,
    /// Owning job.
    pub job_id: String,
    /// Client-facing region identifier (opaque; never normalized here).
    pub region: String,
    /// Model identifier.
    pub model_id: String,
    /// Opaque question identifier.
    pub question_id: String,
    /// Current status.
    pub status: ExecutionStatus,
    /// Provider that served the (successful) request.
    pub provider_id: Option<String>,
    /// Raw response text. May be empty on a legitimate success.
    pub response_text: Option<String>,
    /// Router-attached metadata (model, region_context, temperature,
    /// max_tokens, extracted system prompt, ...).
    pub response_metadata: Option<serde_json::Value>,
    /// Dispatch time.
    pub started_at: DateTime<Utc>,
    /// Terminal time, if reached.
    pub completed_at: Option<DateTime<Utc>>,
    /// Wall-clock duration of the dispatch, if terminal.
    pub duration_ms: Option<i64>,
    /// Number of times this tuple has been retried via the Retry Service.
    pub retry_count: u32,
    /// Ceiling for `retry_count`; always [`MAX_RETRIES`].
    pub max_retries: u32,
    /// Timestamp of the most recent retry, if any.
    pub last_retry_at: Option<DateTime<Utc>>,
    /// Append-only retry history.
    pub retry_history: Vec<RetryAttempt>,
    /// The original error message from the first failing attempt.
    pub original_error: Option<String>,
    /// Response classification (§4.4.1).
    pub response_classification: Option<ResponseClassification>,
    /// Denormalized `response_classification == Substantive`.
    pub is_substantive: bool,
    /// Denormalized `response_classification == ContentRefusal`.
    pub is_content_refusal: bool,
    /// `response_text` character length, persisted for query convenience.
    pub response_length: Option<usize>,
}

impl ExecutionRecord {
    /// Builds a new `running` row at dispatch time, per spec §4.4 step
    /// (b).
    pub fn new_running(
        id: i64,
        job_id: impl Into<String>,
        region: impl Into<String>,
        model_id: impl Into<String>,
        question_id: impl Into<String>,
    ) -> Self {
        Self {
            id,
            job_id: job_id.into(),
            region: region.into(),
            model_id: model_id.into(),
            question_id: question_id.into(),
            status: ExecutionStatus::Running,
            provider_id: None,
            response_text: None,
            response_metadata: None,
            started_at: Utc::now(),
            completed_at: None,
            duration_ms: None,
            retry_count: 0,
            max_retries: MAX_RETRIES,
            last_retry_at: None,
            retry_history: Vec::new(),
            original_error: None,
            response_classification: None,
            is_substantive: false,
            is_content_refusal: false,
            response_length: None,
        }
    }

    /// The unique dedup key for this tuple.
    pub fn dedup_key(&self) -> (String, String, String, String) {
        (
            self.job_id.clone(),
            self.region.clone(),
            self.model_id.clone(),
            self.question_id.clone(),
        )
    }

    /// Whether this record may be retried right now, per spec §4.8 step
    /// 1.
    pub fn is_retriable(&self) -> bool {
        self.status.is_retriable() && self.retry_count < self.max_retries
    }

    /// Applies a successful router response, per spec §4.4 step (d).
    /// Empty text is explicitly not a failure (§9 open question).
    pub fn mark_completed(&mut self, text: String, metadata: serde_json::Value, provider_id: String) {
        let classification = crate::classification::classify_response(&text);
        self.status = ExecutionStatus::Completed;
        self.response_length = Some(text.chars().count());
        self.is_substantive = classification == ResponseClassification::Substantive;
        self.is_content_refusal = classification == ResponseClassification::ContentRefusal;
        self.response_classification = Some(classification);
        self.response_text = Some(text);
        self.response_metadata = Some(metadata);
        self.provider_id = Some(provider_id);
        let now = Utc::now();
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
    }

    /// Applies a failed router response, per spec §4.4 step (e).
    pub fn mark_failed(&mut self, error_message: String) {
        self.status = ExecutionStatus::Failed;
        if self.original_error.is_none() {
            self.original_error = Some(error_message.clone());
        }
        self.response_text = None;
        let now = Utc::now();
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
    }

    /// Applies a per-tuple timeout, per spec §4.4 step (f).
    pub fn mark_timeout(&mut self) {
        self.status = ExecutionStatus::Timeout;
        let now = Utc::now();
        self.duration_ms = Some((now - self.started_at).num_milliseconds());
        self.completed_at = Some(now);
    }

    /// Resets this record to `running` for a retry, per spec §4.8 step 3.
    /// Returns the new `retry_count` so callers can surface it without a
    /// second read.
    pub fn begin_retry(&mut self, previous_error: Option<String>) -> u32 {
        self.retry_count += 1;
        self.retry_history.push(RetryAttempt {
            attempt_n: self.retry_count,
            started_at: Utc::now(),
            previous_error,
        });
        self.last_retry_at = Some(Utc::now());
        self.status = ExecutionStatus::Running;
        self.retry_count
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_running() {
        let record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        assert_eq!(record.status, ExecutionStatus::Running);
        assert_eq!(record.retry_count, 0);
        assert_eq!(record.max_retries, MAX_RETRIES);
    }

    #[test]
    fn test_dedup_key() {
        let record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        assert_eq!(
            record.dedup_key(),
            (
                "job-1".to_string(),
                "US".to_string(),
                "m1".to_string(),
                "q1".to_string()
            )
        );
    }

    #[test]
    fn test_mark_completed_empty_text_is_not_a_failure() {
        let mut record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        record.mark_completed(String::new(), serde_json::json!({}), "provider-a".to_string());
        assert_eq!(record.status, ExecutionStatus::Completed);
        assert_eq!(record.response_text, Some(String::new()));
        assert_eq!(
            record.response_classification,
            Some(ResponseClassification::TechnicalFailure)
        );
    }

    #[test]
    fn test_mark_failed_preserves_first_error() {
        let mut record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        record.mark_failed("first".to_string());
        record.begin_retry(Some("first".to_string()));
        record.mark_failed("second".to_string());
        assert_eq!(record.original_error, Some("first".to_string()));
    }

    #[test]
    fn test_begin_retry_increments_and_appends_history() {
        let mut record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        record.mark_failed("boom".to_string());
        assert!(record.is_retriable());

        let n = record.begin_retry(Some("boom".to_string()));
        assert_eq!(n, 1);
        assert_eq!(record.retry_count, 1);
        assert_eq!(record.retry_history.len(), 1);
        assert_eq!(record.status, ExecutionStatus::Running);
    }

    #[test]
    fn test_not_retriable_after_max_retries() {
        let mut record = ExecutionRecord::new_running(1, "job-1", "US", "m1", "q1");
        record.mark_failed("boom".to_string());
        for _ in 0..MAX_RETRIES {
            record.begin_retry(None);
            record.mark_failed("boom again".to_string());
        }
        assert_eq!(record.retry_count, MAX_RETRIES);
        assert!(!record.is_retriable());
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(ExecutionStatus::Completed.is_terminal());
        assert!(ExecutionStatus::Failed.is_terminal());
        assert!(ExecutionStatus::Timeout.is_terminal());
        assert!(ExecutionStatus::Cancelled.is_terminal());
        assert!(!ExecutionStatus::Pending.is_terminal());
        assert!(!ExecutionStatus::Running.is_terminal());
    }
}
