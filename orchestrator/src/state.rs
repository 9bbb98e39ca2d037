// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! Shared application state handed to every axum handler.

use std::sync::Arc;

use inference_mesh_core::config::Config;
use inference_mesh_core::database::Database;
use inference_mesh_core::queue::RedisWorkQueue;
use inference_mesh_core::router_client::RouterClient;
use inference_mesh_core::api::AuthService;
use inference_mesh_datasets::schema::QuestionCatalog;

use crate::metrics::Metrics;

/// Everything a handler or background task needs, cloned cheaply via
/// `Arc`.
#[derive(Clone)]
pub struct AppState {
    /// Full configuration, for sections individual handlers still need
    /// to read directly (e.g. `security.trusted_keys`).
    pub config: Arc<Config>,
    /// Execution Store.
    pub db: Database,
    /// Work Queue.
    pub queue: RedisWorkQueue,
    /// HTTP client to the Hybrid Router.
    pub router: Arc<RouterClient>,
    /// Bearer-token RBAC.
    pub auth: Arc<AuthService>,
    /// Question catalogs loaded at startup.
    pub catalogs: Arc<Vec<QuestionCatalog>>,
    /// Prometheus counters and histograms.
    pub metrics: Arc<Metrics>,
    /// Cooperative cancellation signals, keyed by job id. A job runner
    /// task checks this between tuples; the admin cancel handler sets
    /// it.
    pub cancellations: Arc<dashmap::DashSet<String>>,
}

impl AppState {
    /// Marks `job_id` cancelled, for the job runner's in-flight region
    /// tasks to observe between tuples.
    pub fn request_cancellation(&self, job_id: &str) {
        self.cancellations.insert(job_id.to_string());
    }

    /// Whether `job_id` has a pending cancellation request.
    pub fn is_cancelled(&self, job_id: &str) -> bool {
        self.cancellations.contains(job_id)
    }

    /// Clears a job's cancellation flag once the runner has observed it
    /// and moved the job to `cancelled`.
    pub fn clear_cancellation(&self, job_id: &str) {
        self.cancellations.remove(job_id);
    }

    /// Looks up a question's prompt text across every loaded catalog, in
    /// load order. Used by the job runner and retry service to turn a
    /// `question_id` back into the text sent to the Hybrid Router.
    pub fn find_question_prompt(&self, question_id: &str) -> Option<&str> {
        find_question_prompt(&self.catalogs, question_id)
    }
}

/// Free-function form of [`AppState::find_question_prompt`], usable
/// without constructing a full `AppState`.
fn find_question_prompt<'a>(catalogs: &'a [QuestionCatalog], question_id: &str) -> Option<&'a str> {
    catalogs
        .iter()
        .find_map(|catalog| catalog.find(question_id))
        .map(|question| question.prompt_text.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use inference_mesh_datasets::schema::Question;

    fn sample_catalog() -> QuestionCatalog {
        let mut catalog = QuestionCatalog::new("test-catalog", "v1");
        catalog.add_question(Question::new("q1", "What is 2+2?").with_category("math"));
        catalog
    }

    #[test]
    fn test_find_question_prompt_matches_by_id() {
        let catalogs = vec![sample_catalog()];
        assert_eq!(find_question_prompt(&catalogs, "q1"), Some("What is 2+2?"));
    }

    #[test]
    fn test_find_question_prompt_falls_through_when_missing() {
        let catalogs = vec![sample_catalog()];
        assert_eq!(find_question_prompt(&catalogs, "missing"), None);
    }
}
