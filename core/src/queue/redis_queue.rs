//! Redis-backed Work Queue implementation.

use chrono::Utc;
use redis::aio::ConnectionManager;
use redis::AsyncCommands;

use crate::domain::WorkEnvelope;
use crate::queue::error::{QueueError, QueueResult};

/// A Work Queue backed by three Redis keys derived from a configured
/// base name (default `jobs`): `{name}`, `{name}:retry`, `{name}:dead`.
#[derive(Clone)]
pub struct RedisWorkQueue {
    conn: ConnectionManager,
    main_key: String,
    retry_key: String,
    dead_key: String,
}

impl RedisWorkQueue {
    /// Connects to `redis_url` and names the three sub-queues after
    /// `queue_name`.
    pub async fn connect(redis_url: &str, queue_name: &str) -> QueueResult<Self> {
        let client = redis::Client::open(redis_url)?;
        let conn = client.get_connection_manager().await?;
        Ok(Self {
            conn,
            main_key: queue_name.to_string(),
            retry_key: format!("{queue_name}:retry"),
            dead_key: format!("{queue_name}:dead"),
        })
    }

    /// Pushes an envelope onto the main FIFO.
    pub async fn push(&self, envelope: &WorkEnvelope) -> QueueResult<()> {
        let payload = serde_json::to_string(envelope)
            .map_err(|e| QueueError::MalformedEnvelope(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.main_key, payload).await?;
        Ok(())
    }

    /// Blocks for up to `timeout_secs` waiting for the next envelope on
    /// the main FIFO. Returns `None` on timeout.
    pub async fn pop(&self, timeout_secs: f64) -> QueueResult<Option<WorkEnvelope>> {
        let mut conn = self.conn.clone();
        let result: Option<(String, String)> =
            conn.brpop(&self.main_key, timeout_secs).await?;
        match result {
            Some((_, payload)) => {
                let envelope = serde_json::from_str(&payload)
                    .map_err(|e| QueueError::MalformedEnvelope(e.to_string()))?;
                Ok(Some(envelope))
            }
            None => Ok(None),
        }
    }

    /// Schedules `envelope` for redelivery after its linear backoff
    /// window (spec §4.3), or moves it to the dead-letter queue if it
    /// has exhausted its retry budget.
    pub async fn requeue_or_dead_letter(&self, envelope: WorkEnvelope) -> QueueResult<bool> {
        let next = envelope.next_attempt();
        if next.is_exhausted() {
            self.push_dead(&next).await?;
            return Ok(false);
        }

        let eligible_at = Utc::now().timestamp() + next.backoff_secs();
        let payload = serde_json::to_string(&next)
            .map_err(|e| QueueError::MalformedEnvelope(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.zadd::<_, _, _, ()>(&self.retry_key, payload, eligible_at)
            .await?;
        Ok(true)
    }

    /// Moves every due entry from `jobs:retry` onto `jobs`. Intended to
    /// be called on a short interval by a background migrator task.
    /// Returns the number of entries migrated.
    pub async fn migrate_due_retries(&self) -> QueueResult<usize> {
        let mut conn = self.conn.clone();
        let now = Utc::now().timestamp();

        let due: Vec<String> = conn
            .zrangebyscore(&self.retry_key, i64::MIN, now)
            .await?;

        for payload in &due {
            conn.lpush::<_, _, ()>(&self.main_key, payload).await?;
            conn.zrem::<_, _, ()>(&self.retry_key, payload).await?;
        }

        Ok(due.len())
    }

    /// Pushes an envelope directly onto the dead-letter queue.
    pub async fn push_dead(&self, envelope: &WorkEnvelope) -> QueueResult<()> {
        let payload = serde_json::to_string(envelope)
            .map_err(|e| QueueError::MalformedEnvelope(e.to_string()))?;
        let mut conn = self.conn.clone();
        conn.lpush::<_, _, ()>(&self.dead_key, payload).await?;
        Ok(())
    }

    /// Current depth of the main FIFO, for `/metrics` and debug
    /// endpoints.
    pub async fn main_queue_depth(&self) -> QueueResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(&self.main_key).await?)
    }

    /// Current depth of the dead-letter queue.
    pub async fn dead_letter_depth(&self) -> QueueResult<i64> {
        let mut conn = self.conn.clone();
        Ok(conn.llen(&self.dead_key).await?)
    }
}
