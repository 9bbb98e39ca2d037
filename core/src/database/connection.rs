// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Database connection and pool management.

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

use crate::config::DatabaseSettings;
use crate::database::error::{DatabaseError, DatabaseResult};
use crate::database::repositories::{ExecutionRepository, JobRepository, OutboxRepository};

/// The Execution Store: a connection pool plus its repositories.
#[derive(Clone)]
pub struct Database {
    pool: PgPool,
    jobs: Arc<JobRepository>,
    outbox: Arc<OutboxRepository>,
    executions: Arc<ExecutionRepository>,
}

impl Database {
    /// Opens a connection pool against `settings` and wires up
    /// repositories. See spec §4.7: `DB_TIMEOUT_MS` (here
    /// `settings.timeout_ms`) is always set explicitly rather than left
    /// at the driver default.
    pub async fn connect(settings: &DatabaseSettings) -> DatabaseResult<Self> {
        info!(pool_size = settings.pool_size, "connecting to database");

        let pool = PgPoolOptions::new()
            .max_connections(settings.pool_size)
            .acquire_timeout(Duration::from_millis(settings.timeout_ms))
            .connect(&settings.url)
            .await
            .map_err(|e| DatabaseError::ConnectionError(e.to_string()))?;

        info!("database connected");

        Ok(Self {
            jobs: Arc::new(JobRepository::new(pool.clone())),
            outbox: Arc::new(OutboxRepository::new(pool.clone())),
            executions: Arc::new(ExecutionRepository::new(pool.clone())),
            pool,
        })
    }

    /// Runs pending migrations.
    pub async fn migrate(&self) -> DatabaseResult<()> {
        info!("running database migrations");
        sqlx::migrate!("./migrations").run(&self.pool).await?;
        info!("database migrations complete");
        Ok(())
    }

    /// The underlying connection pool, for callers that need a
    /// transaction spanning multiple repositories (e.g. intake's
    /// insert-job-and-outbox-entry).
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Job Record repository.
    pub fn jobs(&self) -> &JobRepository {
        &self.jobs
    }

    /// Outbox Entry repository.
    pub fn outbox(&self) -> &OutboxRepository {
        &self.outbox
    }

    /// Execution Record repository.
    pub fn executions(&self) -> &ExecutionRepository {
        &self.executions
    }

    /// Liveness check used by the `/health` endpoint.
    pub async fn health_check(&self) -> DatabaseResult<bool> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(true)
    }

    /// Closes the pool, draining in-flight queries first.
    pub async fn close(&self) {
        debug!("closing database connection");
        self.pool.close().await;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_database_is_clone() {
        fn assert_clone<T: Clone>() {}
        assert_clone::<Database>();
    }
}
