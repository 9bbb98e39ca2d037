// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! # Execution Store (PostgreSQL)
//!
//! Persists Job Records, Outbox Entries and Execution Records behind a
//! repository-per-aggregate layer.
//!
//! ```text
//! ┌──────────────┐  ┌────────────────┐  ┌─────────────────────┐
//! │ Intake API    │  │ Outbox         │  │ Job Runner           │
//! │ (writes jobs  │  │ Publisher      │  │ (writes executions,  │
//! │  + outbox atomically)│ (reads outbox)│  updates job status) │
//! └──────┬────────┘  └───────┬────────┘  └──────────┬──────────┘
//!        │                   │                       │
//!        ▼                   ▼                       ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │   JobRepository   │  OutboxRepository  │ ExecutionRepository │
//! └─────────────────────────────────────────────────────────────┘
//!                             │
//!                             ▼
//!                   PostgreSQL (sqlx connection pool)
//! ```
//!
//! # Examples
//!
//! ```rust,no_run
//! use inference_mesh_core::config::DatabaseSettings;
//! use inference_mesh_core::database::Database;
//!
//! # async fn example() -> anyhow::Result<()> {
//! let settings = DatabaseSettings::default();
//! let db = Database::connect(&settings).await?;
//! db.migrate().await?;
//! # Ok(())
//! # }
//! ```

pub mod connection;
pub mod error;
pub mod repositories;

pub use connection::Database;
pub use error::{DatabaseError, DatabaseResult};
pub use repositories::{ExecutionRepository, JobRepository, OutboxRepository};
