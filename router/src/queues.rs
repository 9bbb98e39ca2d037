// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Region Queues: bounded in-memory FIFOs per region, plus the global
//! cross-region retry queue, per spec §4.6.
//!
//! A region's dequeue priority is: (a) a due entry on the global retry
//! queue targeting this region, (b) a due entry on the region's own
//! local retry queue, (c) the region's main queue. In this
//! implementation every dispatch failure is re-enqueued onto the
//! global retry queue (spec §4.5 "Execution and response handling"
//! names only that queue); the per-region local retry queue exists for
//! the priority ordering spec §4.6 describes but has no producer yet,
//! so it is always empty in steady state — recorded as an open
//! question in the grounding ledger.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use parking_lot::Mutex;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

use inference_mesh_core::domain::RegionQueueState;
use inference_mesh_core::router_client::{InferenceRequest, InferenceResponse};

/// Depth of each region's bounded main FIFO, per spec §4.6 "Bounded-
/// capacity FIFO queues in memory".
pub const MAIN_QUEUE_CAPACITY: usize = 256;

/// A request waiting to be dispatched, carrying the channel its caller
/// is awaiting a response on.
pub struct QueuedInference {
    /// The inference request to dispatch.
    pub request: InferenceRequest,
    /// Retry attempt number; 0 for a first attempt.
    pub attempt: u32,
    /// Resolved when dispatch reaches a final outcome for this request.
    pub respond_to: oneshot::Sender<InferenceResponse>,
}

struct RetryEntry {
    region: String,
    eligible_at: DateTime<Utc>,
    item: QueuedInference,
}

/// Errors returned when a caller cannot be queued.
#[derive(Debug, Error)]
pub enum EnqueueError {
    /// No region worker is registered for the requested region.
    #[error("unknown region: {0}")]
    UnknownRegion(String),
    /// The region's main queue is at capacity, per spec §4.6 "return
    /// `QUEUE_FULL` ... do not block indefinitely".
    #[error("queue full for region: {0}")]
    QueueFull(String),
}

/// Shared across every region worker: a request failing dispatch is
/// re-queued here with its backoff eligibility time, independent of
/// which region it originated from.
pub struct GlobalRetryQueue {
    entries: Mutex<Vec<RetryEntry>>,
}

impl GlobalRetryQueue {
    fn new() -> Self {
        Self {
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Schedules `item` for retry in `region` once `eligible_at` has
    /// passed.
    pub fn push(&self, region: String, eligible_at: DateTime<Utc>, item: QueuedInference) {
        self.entries.lock().push(RetryEntry {
            region,
            eligible_at,
            item,
        });
    }

    /// Removes and returns the earliest-queued due entry targeting
    /// `region`, if any.
    pub fn take_due(&self, region: &str) -> Option<QueuedInference> {
        let mut entries = self.entries.lock();
        let now = Utc::now();
        let position = entries
            .iter()
            .position(|entry| entry.region == region && entry.eligible_at <= now)?;
        Some(entries.remove(position).item)
    }

    /// Total entries awaiting their backoff, across every region.
    pub fn len(&self) -> usize {
        self.entries.lock().len()
    }

    /// Whether the queue currently holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Owns every region's main queue and the completed/failed counters
/// backing `GET /queue/status`.
pub struct RegionQueues {
    senders: DashMap<String, mpsc::Sender<QueuedInference>>,
    receivers: DashMap<String, Mutex<Option<mpsc::Receiver<QueuedInference>>>>,
    local_retry: DashMap<String, Mutex<Vec<RetryEntry>>>,
    completed: DashMap<String, AtomicU64>,
    failed: DashMap<String, AtomicU64>,
    current_job: DashMap<String, Mutex<Option<String>>>,
    global_retry: Arc<GlobalRetryQueue>,
}

impl RegionQueues {
    /// Builds one bounded main queue per region in `regions`.
    pub fn new(regions: &[String]) -> Self {
        let senders = DashMap::new();
        let receivers = DashMap::new();
        let local_retry = DashMap::new();
        let completed = DashMap::new();
        let failed = DashMap::new();
        let current_job = DashMap::new();

        for region in regions {
            let (tx, rx) = mpsc::channel(MAIN_QUEUE_CAPACITY);
            senders.insert(region.clone(), tx);
            receivers.insert(region.clone(), Mutex::new(Some(rx)));
            local_retry.insert(region.clone(), Mutex::new(Vec::new()));
            completed.insert(region.clone(), AtomicU64::new(0));
            failed.insert(region.clone(), AtomicU64::new(0));
            current_job.insert(region.clone(), Mutex::new(None));
        }

        Self {
            senders,
            receivers,
            local_retry,
            completed,
            failed,
            current_job,
            global_retry: Arc::new(GlobalRetryQueue::new()),
        }
    }

    /// The shared global retry queue, for the dispatch loop to push
    /// failed requests onto.
    pub fn global_retry(&self) -> Arc<GlobalRetryQueue> {
        self.global_retry.clone()
    }

    /// Attempts to enqueue `item` onto `region`'s main queue without
    /// blocking.
    pub fn try_enqueue(&self, region: &str, item: QueuedInference) -> Result<(), EnqueueError> {
        let sender = self
            .senders
            .get(region)
            .ok_or_else(|| EnqueueError::UnknownRegion(region.to_string()))?;
        sender
            .try_send(item)
            .map_err(|_| EnqueueError::QueueFull(region.to_string()))
    }

    /// Takes ownership of `region`'s receiver, for its worker task to
    /// drain. Returns `None` if already taken or the region is
    /// unknown.
    pub fn take_receiver(&self, region: &str) -> Option<mpsc::Receiver<QueuedInference>> {
        self.receivers.get(region).and_then(|slot| slot.lock().take())
    }

    /// Removes and returns a due entry from `region`'s local retry
    /// queue, if any.
    pub fn take_due_local_retry(&self, region: &str) -> Option<QueuedInference> {
        let queue = self.local_retry.get(region)?;
        let mut entries = queue.lock();
        let now = Utc::now();
        let position = entries.iter().position(|entry| entry.eligible_at <= now)?;
        Some(entries.remove(position).item)
    }

    /// Records that `region` completed a tuple, for telemetry.
    pub fn record_completed(&self, region: &str) {
        if let Some(counter) = self.completed.get(region) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Records that `region` failed a tuple terminally, for telemetry.
    pub fn record_failed(&self, region: &str) {
        if let Some(counter) = self.failed.get(region) {
            counter.fetch_add(1, Ordering::Relaxed);
        }
    }

    /// Point-in-time snapshot for `GET /queue/status/{region}`.
    pub fn state(&self, region: &str) -> Option<RegionQueueState> {
        let sender = self.senders.get(region)?;
        let main_queue_depth = MAIN_QUEUE_CAPACITY - sender.capacity();
        let retry_queue_depth = self
            .global_retry
            .entries
            .lock()
            .iter()
            .filter(|e| e.region == region)
            .count()
            + self.local_retry.get(region).map(|q| q.lock().len()).unwrap_or(0);
        let current_job_id = self
            .current_job
            .get(region)
            .and_then(|slot| slot.lock().clone());
        Some(RegionQueueState {
            region: region.to_string(),
            main_queue_depth,
            retry_queue_depth,
            current_job_id,
            completed_count: self.completed.get(region).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0),
            failed_count: self.failed.get(region).map(|c| c.load(Ordering::Relaxed)).unwrap_or(0),
        })
    }

    /// Snapshots every region's state, for `GET /queue/status`.
    pub fn all_states(&self) -> Vec<RegionQueueState> {
        self.senders
            .iter()
            .filter_map(|entry| self.state(entry.key()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_request() -> InferenceRequest {
        InferenceRequest {
            model: "m1".to_string(),
            prompt: "hello".to_string(),
            region_preference: "US".to_string(),
            temperature: 0.7,
            max_tokens: 64,
            metadata: None,
        }
    }

    #[test]
    fn test_enqueue_unknown_region_errs() {
        let queues = RegionQueues::new(&["US".to_string()]);
        let (tx, _rx) = oneshot::channel();
        let item = QueuedInference {
            request: sample_request(),
            attempt: 0,
            respond_to: tx,
        };
        assert!(matches!(
            queues.try_enqueue("EU", item),
            Err(EnqueueError::UnknownRegion(_))
        ));
    }

    #[test]
    fn test_enqueue_full_queue_errs() {
        let queues = RegionQueues::new(&["US".to_string()]);
        for _ in 0..MAIN_QUEUE_CAPACITY {
            let (tx, _rx) = oneshot::channel();
            queues
                .try_enqueue(
                    "US",
                    QueuedInference {
                        request: sample_request(),
                        attempt: 0,
                        respond_to: tx,
                    },
                )
                .unwrap();
        }
        let (tx, _rx) = oneshot::channel();
        let overflow = QueuedInference {
            request: sample_request(),
            attempt: 0,
            respond_to: tx,
        };
        assert!(matches!(
            queues.try_enqueue("US", overflow),
            Err(EnqueueError::QueueFull(_))
        ));
    }

    #[test]
    fn test_global_retry_take_due_respects_eligibility() {
        let retry = GlobalRetryQueue::new();
        let (tx, _rx) = oneshot::channel();
        let item = QueuedInference {
            request: sample_request(),
            attempt: 1,
            respond_to: tx,
        };
        retry.push("US".to_string(), Utc::now() + chrono::Duration::seconds(60), item);
        assert!(retry.take_due("US").is_none());
        assert_eq!(retry.len(), 1);
    }

    #[test]
    fn test_global_retry_take_due_returns_past_due_entry() {
        let retry = GlobalRetryQueue::new();
        let (tx, _rx) = oneshot::channel();
        let item = QueuedInference {
            request: sample_request(),
            attempt: 1,
            respond_to: tx,
        };
        retry.push("US".to_string(), Utc::now() - chrono::Duration::seconds(1), item);
        assert!(retry.take_due("US").is_some());
        assert!(retry.is_empty());
    }

    #[test]
    fn test_state_reports_depth_and_counters() {
        let queues = RegionQueues::new(&["US".to_string()]);
        queues.record_completed("US");
        queues.record_completed("US");
        queues.record_failed("US");
        let state = queues.state("US").unwrap();
        assert_eq!(state.completed_count, 2);
        assert_eq!(state.failed_count, 1);
        assert!(state.is_idle());
    }
}
