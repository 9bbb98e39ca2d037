// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Job Record repository.

use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres, Transaction};

use crate::database::error::DatabaseResult;
use crate::domain::{JobRecord, JobStatus};

/// Persists and queries Job Records.
pub struct JobRepository {
    pool: PgPool,
}

impl JobRepository {
    /// Builds a repository over an existing pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Inserts a new Job Record. Idempotent on `jobspec_id`: a conflict
    /// returns the already-stored row instead of erroring, per spec
    /// §4.1 "Submit" step 4.
    pub async fn insert(&self, record: &JobRecord) -> DatabaseResult<JobRecord> {
        let status = record.status.to_string();
        let row = sqlx::query!(
            r#"
            INSERT INTO jobs (jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (jobspec_id) DO UPDATE SET jobspec_id = jobs.jobspec_id
            RETURNING jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at
            "#,
            record.jobspec_id,
            record.version,
            status,
            record.raw_spec,
            record.created_at,
            record.updated_at,
            record.completed_at,
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_record(
            row.jobspec_id,
            row.version,
            row.status,
            row.raw_spec,
            row.created_at,
            row.updated_at,
            row.completed_at,
        ))
    }

    /// Inserts a new Job Record inside an already-open transaction, so
    /// intake can commit the Job Record and its Outbox Entry atomically
    /// (spec §4.1 "Submit" step 4). Idempotent the same way as
    /// [`Self::insert`].
    pub async fn insert_in_tx(
        &self,
        tx: &mut Transaction<'_, Postgres>,
        record: &JobRecord,
    ) -> DatabaseResult<JobRecord> {
        let status = record.status.to_string();
        let row = sqlx::query!(
            r#"
            INSERT INTO jobs (jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (jobspec_id) DO UPDATE SET jobspec_id = jobs.jobspec_id
            RETURNING jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at
            "#,
            record.jobspec_id,
            record.version,
            status,
            record.raw_spec,
            record.created_at,
            record.updated_at,
            record.completed_at,
        )
        .fetch_one(&mut **tx)
        .await?;

        Ok(row_to_record(
            row.jobspec_id,
            row.version,
            row.status,
            row.raw_spec,
            row.created_at,
            row.updated_at,
            row.completed_at,
        ))
    }

    /// Whether `jobspec_id` was already inserted before this call, used
    /// by intake to distinguish a fresh submission from an idempotent
    /// replay.
    pub async fn exists(&self, jobspec_id: &str) -> DatabaseResult<bool> {
        let row = sqlx::query!(
            r#"SELECT EXISTS(SELECT 1 FROM jobs WHERE jobspec_id = $1) as "exists!""#,
            jobspec_id
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(row.exists)
    }

    /// Fetches a Job Record by its `jobspec_id`.
    pub async fn get(&self, jobspec_id: &str) -> DatabaseResult<JobRecord> {
        let row = sqlx::query!(
            r#"
            SELECT jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at
            FROM jobs WHERE jobspec_id = $1
            "#,
            jobspec_id
        )
        .fetch_one(&self.pool)
        .await?;

        Ok(row_to_record(
            row.jobspec_id,
            row.version,
            row.status,
            row.raw_spec,
            row.created_at,
            row.updated_at,
            row.completed_at,
        ))
    }

    /// Transitions a job's status. Callers must have already validated
    /// the transition via [`JobStatus::can_transition_to`]; this method
    /// does not re-check it, since doing so atomically would require a
    /// read-modify-write this single `UPDATE` avoids.
    pub async fn update_status(
        &self,
        jobspec_id: &str,
        status: JobStatus,
        completed_at: Option<DateTime<Utc>>,
    ) -> DatabaseResult<()> {
        sqlx::query!(
            r#"
            UPDATE jobs
            SET status = $1, updated_at = $2, completed_at = COALESCE($3, completed_at)
            WHERE jobspec_id = $4
            "#,
            status.to_string(),
            Utc::now(),
            completed_at,
            jobspec_id,
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Lists jobs in `created` status whose outbox entry was published
    /// more than `stuck_after_secs` ago without the job ever reaching
    /// `processing` — candidates for `POST /admin/republish-stuck-jobs`.
    pub async fn list_stuck(&self, stuck_after_secs: i64, limit: i64) -> DatabaseResult<Vec<JobRecord>> {
        let rows = sqlx::query!(
            r#"
            SELECT jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at
            FROM jobs
            WHERE status = 'queued' AND updated_at < NOW() - ($1 || ' seconds')::interval
            ORDER BY created_at ASC
            LIMIT $2
            "#,
            stuck_after_secs.to_string(),
            limit,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row_to_record(
                    row.jobspec_id,
                    row.version,
                    row.status,
                    row.raw_spec,
                    row.created_at,
                    row.updated_at,
                    row.completed_at,
                )
            })
            .collect())
    }

    /// Lists jobs by status, newest first.
    pub async fn list_by_status(&self, status: JobStatus, limit: i64) -> DatabaseResult<Vec<JobRecord>> {
        let rows = sqlx::query!(
            r#"
            SELECT jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at
            FROM jobs
            WHERE status = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#,
            status.to_string(),
            limit,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row_to_record(
                    row.jobspec_id,
                    row.version,
                    row.status,
                    row.raw_spec,
                    row.created_at,
                    row.updated_at,
                    row.completed_at,
                )
            })
            .collect())
    }
    /// Lists the most recently created jobs regardless of status, for
    /// `GET /api/v1/jobs?limit=N`.
    pub async fn list_recent(&self, limit: i64) -> DatabaseResult<Vec<JobRecord>> {
        let rows = sqlx::query!(
            r#"
            SELECT jobspec_id, version, status, raw_spec, created_at, updated_at, completed_at
            FROM jobs
            ORDER BY created_at DESC
            LIMIT $1
            "#,
            limit,
        )
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|row| {
                row_to_record(
                    row.jobspec_id,
                    row.version,
                    row.status,
                    row.raw_spec,
                    row.created_at,
                    row.updated_at,
                    row.completed_at,
                )
            })
            .collect())
    }
}

fn row_to_record(
    jobspec_id: String,
    version: String,
    status: String,
    raw_spec: serde_json::Value,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    completed_at: Option<DateTime<Utc>>,
) -> JobRecord {
    let status = match status.as_str() {
        "created" => JobStatus::Created,
        "queued" => JobStatus::Queued,
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        _ => JobStatus::Cancelled,
    };
    JobRecord {
        jobspec_id,
        version,
        status,
        raw_spec,
        created_at,
        updated_at,
        completed_at,
    }
}
