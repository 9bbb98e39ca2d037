//! Lightweight, serializable snapshot of a region's queue state.
//!
//! The FIFO mechanics themselves live in `router::queues`; this type is
//! what the debug endpoints (`GET /queue/status`, `/queue/status/{region}`)
//! report and what the Job Runner reads before deciding whether to wait
//! on a region's cross-region retry queue.

use serde::{Deserialize, Serialize};

/// A point-in-time view of one region's queue.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RegionQueueState {
    /// Client-facing region identifier.
    pub region: String,
    /// Number of items waiting on the region's main FIFO.
    pub main_queue_depth: usize,
    /// Number of items waiting on the global cross-region retry queue
    /// that are eligible to run in this region.
    pub retry_queue_depth: usize,
    /// The job currently being serviced by this region's worker, if any.
    pub current_job_id: Option<String>,
    /// Running count of tuples this region has completed successfully.
    pub completed_count: u64,
    /// Running count of tuples this region has failed terminally.
    pub failed_count: u64,
}

impl RegionQueueState {
    /// An empty state for a region that has not yet processed anything.
    pub fn new(region: impl Into<String>) -> Self {
        Self {
            region: region.into(),
            ..Default::default()
        }
    }

    /// Total backlog across both queues.
    pub fn total_depth(&self) -> usize {
        self.main_queue_depth + self.retry_queue_depth
    }

    /// Whether this region is currently idle.
    pub fn is_idle(&self) -> bool {
        self.current_job_id.is_none() && self.total_depth() == 0
    }
}
