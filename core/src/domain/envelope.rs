//! The Work Envelope: the message shape carried on the Redis Work Queue.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A message on the `jobs`/`jobs:retry`/`jobs:dead` queues.
///
/// Invariant (spec §4.3): `job_id` must equal the owning Job Record's
/// `jobspec_id` exactly. The Job Runner uses this field as the sole key
/// to look up the record it dispatches; a mismatch here is a bug in the
/// publisher, not a recoverable runtime condition.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkEnvelope {
    /// Unique id of this envelope (distinct from `job_id`; a job requeued
    /// after retry gets a fresh envelope id but keeps the same `job_id`).
    pub envelope_id: String,
    /// The Job Record this envelope dispatches. Must equal the owning
    /// record's `jobspec_id`.
    pub job_id: String,
    /// Number of times this envelope has been retried at the queue level.
    /// Distinct from [`crate::domain::execution::ExecutionRecord::retry_count`],
    /// which tracks per-tuple retries inside the Job Runner.
    pub attempt_count: u32,
    /// When this envelope was pushed onto its current queue.
    pub enqueued_at: DateTime<Utc>,
}

/// Linear backoff schedule for envelope-level retries (spec §4.3), in
/// seconds. Index 0 applies after the first failed attempt.
pub const ENVELOPE_BACKOFF_SECS: [i64; 3] = [60, 120, 180];

/// Envelope-level attempts beyond which a message moves to `jobs:dead`
/// instead of `jobs:retry`.
pub const MAX_ENVELOPE_ATTEMPTS: u32 = 3;

impl WorkEnvelope {
    /// Builds the first envelope for a freshly-published job.
    pub fn new(envelope_id: impl Into<String>, job_id: impl Into<String>) -> Self {
        Self {
            envelope_id: envelope_id.into(),
            job_id: job_id.into(),
            attempt_count: 0,
            enqueued_at: Utc::now(),
        }
    }

    /// Whether this envelope has exhausted its retry budget and belongs
    /// on the dead-letter queue.
    pub fn is_exhausted(&self) -> bool {
        self.attempt_count >= MAX_ENVELOPE_ATTEMPTS
    }

    /// The backoff duration, in seconds, before this envelope becomes
    /// eligible for redelivery, given its current `attempt_count`.
    pub fn backoff_secs(&self) -> i64 {
        let idx = (self.attempt_count as usize).min(ENVELOPE_BACKOFF_SECS.len() - 1);
        ENVELOPE_BACKOFF_SECS[idx]
    }

    /// Produces the next envelope (same `envelope_id`, incremented
    /// `attempt_count`, fresh `enqueued_at`) to push onto `jobs:retry`.
    pub fn next_attempt(&self) -> Self {
        Self {
            envelope_id: self.envelope_id.clone(),
            job_id: self.job_id.clone(),
            attempt_count: self.attempt_count + 1,
            enqueued_at: Utc::now(),
        }
    }
}
