//! The Outbox Entry: half of the transactional-outbox pair written
//! alongside a Job Record at intake time.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A row in the outbox table. `InsertJob` writes one of these in the same
/// transaction as the Job Record; the Outbox Publisher polls for rows
/// where `published_at IS NULL`, pushes the payload to the Work Queue,
/// then stamps `published_at`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutboxEntry {
    /// Serial primary key.
    pub id: i64,
    /// The Job Record this entry publishes.
    pub job_id: String,
    /// The Work Envelope payload, stored pre-serialized so the publisher
    /// never has to reconstruct it from the Job Record.
    pub payload: serde_json::Value,
    /// Set by the publisher once the payload has been pushed to the
    /// Work Queue. `NULL` means "still pending".
    pub published_at: Option<DateTime<Utc>>,
}

impl OutboxEntry {
    /// Builds a pending entry for a newly-inserted job.
    pub fn new_pending(id: i64, job_id: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            id,
            job_id: job_id.into(),
            payload,
            published_at: None,
        }
    }

    /// Whether the publisher still needs to handle this row.
    pub fn is_pending(&self) -> bool {
        self.published_at.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_pending_entry() {
        let entry = OutboxEntry::new_pending(1, "job-1", serde_json::json!({"job_id": "job-1"}));
        assert!(entry.is_pending());
        assert!(entry.published_at.is_none());
    }

    #[test]
    fn test_published_entry_is_not_pending() {
        let mut entry = OutboxEntry::new_pending(1, "job-1", serde_json::json!({}));
        entry.published_at = Some(Utc::now());
        assert!(!entry.is_pending());
    }
}
