// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Outbox Entry repository: the transactional-outbox half of intake.

use chrono::Utc;
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::error::DatabaseResult;
use crate::domain::OutboxEntry;

/// Persists and polls Outbox Entries.
pub struct OutboxRepository {
    pool: PgPool,
}

impl OutboxRepository {
    /// Builds a repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts an outbox row inside an already-open transaction, so the
    /// Job Record and its outbox entry commit atomically. See spec §4.2
    /// "Transactional outbox".
    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        job_id: &str,
        payload: &serde_json::Value,
    ) -> DatabaseResult<i64> {
        let row = sqlx::query!(
            r#"
            INSERT INTO outbox (job_id, payload, published_at)
            VALUES ($1, $2, NULL)
            RETURNING id
            "#,
            job_id,
            payload,
        )
        .fetch_one(&mut **tx)
        .await?;

        Ok(row.id)
    }

    /// Fetches a batch of unpublished rows for the Outbox Publisher's
    /// poll loop, oldest first.
    pub async fn fetch_pending(&self, limit: i64) -> DatabaseResult<Vec<OutboxEntry>> {
        let rows = sqlx::query!(
            r#"
            SELECT id, job_id, payload, published_at
            FROM outbox
            WHERE published_at IS NULL
            ORDER BY id ASC
            LIMIT $1
            "#,
            limit
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| OutboxEntry {
                id: row.id,
                job_id: row.job_id,
                payload: row.payload,
                published_at: row.published_at,
            })
            .collect())
    }

    /// Marks a row published after it has been pushed to the Work Queue.
    pub async fn mark_published(&self, id: i64) -> DatabaseResult<()> {
        sqlx::query!(
            r#"
            UPDATE outbox SET published_at = $1 WHERE id = $2
            "#,
            Utc::now(),
            id,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_pending_before_publish() {
        let entry = OutboxEntry::new_pending(1, "job-1", serde_json::json!({}));
        assert!(entry.is_pending());
    }
}
