//! The persisted Job Record and its status lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Status of a Job Record.
///
/// Lifecycle: `created` → `queued` (outbox published) → `processing`
/// (runner dequeued) → `completed`|`failed`|`cancelled`. This progression
/// is monotonic: a poller must never observe a job move backward.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Intake has persisted the job and its outbox entry; not yet
    /// published to the work queue.
    Created,
    /// The outbox publisher pushed the envelope to the work queue.
    Queued,
    /// A runner worker dequeued the envelope and is fanning out.
    Processing,
    /// Quorum met.
    Completed,
    /// Quorum not met.
    Failed,
    /// Cancelled via admin operation.
    Cancelled,
}

impl JobStatus {
    /// True for any status from which no further transition occurs.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed | Self::Cancelled)
    }

    /// Whether `self -> next` is a legal forward transition in the
    /// lifecycle above. Used to guard against regressions such as a
    /// stale worker re-marking a completed job as `processing`.
    pub fn can_transition_to(self, next: Self) -> bool {
        use JobStatus::{Cancelled, Completed, Created, Failed, Processing, Queued};
        matches!(
            (self, next),
            (Created, Queued)
                | (Created, Processing) // republish-stuck-jobs can skip straight to processing
                | (Queued, Processing)
                | (Processing, Completed)
                | (Processing, Failed)
                | (Processing, Cancelled)
                | (Created, Cancelled)
                | (Queued, Cancelled)
        )
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "created",
            Self::Queued => "queued",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
            Self::Cancelled => "cancelled",
        };
        write!(f, "{s}")
    }
}

/// A persisted Job Record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobRecord {
    /// Client-chosen JobSpec id; primary key.
    pub jobspec_id: String,
    /// Schema version of the stored spec.
    pub version: String,
    /// Current lifecycle status.
    pub status: JobStatus,
    /// The raw JobSpec as submitted, preserved for retries and audits.
    pub raw_spec: serde_json::Value,
    /// Row creation time.
    pub created_at: DateTime<Utc>,
    /// Last status-mutation time.
    pub updated_at: DateTime<Utc>,
    /// Time the job reached a terminal status, if any.
    pub completed_at: Option<DateTime<Utc>>,
}

impl JobRecord {
    /// Builds a new record in `created` status from a validated spec.
    pub fn new(raw_spec: serde_json::Value, jobspec_id: String, version: String) -> Self {
        let now = Utc::now();
        Self {
            jobspec_id,
            version,
            status: JobStatus::Created,
            raw_spec,
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(JobStatus::Processing.to_string(), "processing");
    }

    #[test]
    fn test_is_terminal() {
        assert!(JobStatus::Completed.is_terminal());
        assert!(JobStatus::Failed.is_terminal());
        assert!(JobStatus::Cancelled.is_terminal());
        assert!(!JobStatus::Processing.is_terminal());
    }

    #[test]
    fn test_legal_transitions() {
        assert!(JobStatus::Created.can_transition_to(JobStatus::Queued));
        assert!(JobStatus::Queued.can_transition_to(JobStatus::Processing));
        assert!(JobStatus::Processing.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_illegal_regression_rejected() {
        assert!(!JobStatus::Completed.can_transition_to(JobStatus::Processing));
        assert!(!JobStatus::Failed.can_transition_to(JobStatus::Queued));
        assert!(!JobStatus::Cancelled.can_transition_to(JobStatus::Completed));
    }

    #[test]
    fn test_new_record_starts_created() {
        let record = JobRecord::new(serde_json::json!({}), "job-1".to_string(), "v1".to_string());
        assert_eq!(record.status, JobStatus::Created);
        assert!(record.completed_at.is_none());
    }
}
