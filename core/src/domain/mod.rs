//! Core data model: the types that flow between intake, the outbox,
//! the work queue, the job runner and the hybrid router.

pub mod envelope;
pub mod execution;
pub mod job;
pub mod jobspec;
pub mod outbox;
pub mod provider;
pub mod region_queue;

pub use envelope::{WorkEnvelope, ENVELOPE_BACKOFF_SECS, MAX_ENVELOPE_ATTEMPTS};
pub use execution::{ExecutionRecord, ExecutionStatus, RetryAttempt, MAX_RETRIES};
pub use job::{JobRecord, JobStatus};
pub use jobspec::{
    BenchmarkDescriptor, JobConstraints, JobMetadata, JobSpec, JobSpecValidationError,
    SCHEMA_VERSION,
};
pub use outbox::OutboxEntry;
pub use provider::{Provider, ProviderType};
pub use region_queue::RegionQueueState;
