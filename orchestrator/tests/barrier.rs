// Licensed under the Apache License, Version 2.0 <LICENSE-APACHE or
// https://www.apache.org/licenses/LICENSE-2.0> or the MIT license
// <LICENSE-MIT or https://opensource.org/licenses/MIT>, at your
// option. This file may not be copied, modified, or distributed
// except according to those terms.

//! The completion-before-status barrier must hold even when one region
//! is dramatically slower than another: a job may not reach a terminal
//! status until every region's fan-out task has returned. Drives the
//! real `mesh-orchestrator` binary over HTTP rather than calling its
//! internals directly, the same black-box style as `cli/tests/
//! integration_tests.rs` drives the `mesh` binary.
//!
//! Requires a live Postgres instance reachable at `DATABASE_URL` and a
//! Redis instance reachable at `REDIS_URL`; ignored by default like the
//! rest of this workspace's infra-backed tests. Run with:
//!
//! ```text
//! DATABASE_URL=postgres://... REDIS_URL=redis://... \
//!     cargo test -p mesh-orchestrator --test barrier -- --ignored
//! ```

use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// How much slower the EU region's provider responds than US, per spec
/// §9's barrier test requirement.
const EU_EXTRA_LATENCY: Duration = Duration::from_secs(35);

const ADMIN_TOKEN: &str = "barrier-test-admin-token";
const BIND_ADDR: &str = "127.0.0.1:18099";

struct Orchestrator {
    child: tokio::process::Child,
    base_url: String,
}

impl Orchestrator {
    async fn spawn(router_base_url: &str) -> Self {
        let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
        let redis_url = std::env::var("REDIS_URL").expect("REDIS_URL must be set");

        let mut child = tokio::process::Command::new(env!("CARGO_BIN_EXE_mesh-orchestrator"))
            .env("MESH_DATABASE__URL", database_url)
            .env("MESH_QUEUE__URL", redis_url)
            .env("MESH_QUEUE__JOBS_QUEUE_NAME", "barrier-test-jobs")
            .env("MESH_HYBRID_ROUTER__BASE_URL", router_base_url)
            .env("MESH_SECURITY__SIGNATURE_BYPASS", "true")
            .env("MESH_AUTH__ADMIN_TOKENS", ADMIN_TOKEN)
            .env("MESH_AUTH__VIEWER_TOKENS", ADMIN_TOKEN)
            .env("MESH_ORCHESTRATOR_BIND_ADDR", BIND_ADDR)
            .env("RUST_LOG", "info")
            .kill_on_drop(true)
            .spawn()
            .expect("spawn mesh-orchestrator");

        let base_url = format!("http://{BIND_ADDR}");
        let client = reqwest::Client::new();
        let deadline = tokio::time::Instant::now() + Duration::from_secs(15);
        loop {
            if let Ok(Some(status)) = child.try_wait() {
                panic!("mesh-orchestrator exited early with {status}");
            }
            if client
                .get(format!("{base_url}/api/v1/health"))
                .send()
                .await
                .map(|r| r.status().is_success())
                .unwrap_or(false)
            {
                break;
            }
            if tokio::time::Instant::now() > deadline {
                let _ = child.kill().await;
                panic!("mesh-orchestrator did not become healthy in time");
            }
            tokio::time::sleep(Duration::from_millis(200)).await;
        }

        Self { child, base_url }
    }
}

impl Drop for Orchestrator {
    fn drop(&mut self) {
        let _ = self.child.start_kill();
    }
}

fn test_jobspec(id: &str) -> serde_json::Value {
    json!({
        "id": id,
        "version": "v1",
        "benchmark": {
            "name": "barrier-probe",
            "container_image": "example/barrier:latest",
            "resource_hints": {},
            "input_hash": "deadbeef",
        },
        "constraints": {
            "regions": ["US", "EU"],
            "min_regions": 2,
            "min_success_rate": 1.0,
        },
        "questions": ["q1"],
        "models": ["m1"],
        "metadata": {
            "creator": "barrier-test",
            "wallet_address": null,
            "timestamp": chrono::Utc::now().to_rfc3339(),
            "nonce": "n1",
        },
        "signature": "",
        "public_key": "",
    })
}

#[tokio::test]
#[ignore] // requires DATABASE_URL and REDIS_URL; takes >35s
async fn barrier_waits_for_slowest_region_before_completing() {
    let router = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/inference"))
        .and(body_string_contains("\"region_preference\":\"US\""))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "response": "US answered quickly.",
            "provider_used": "us-provider",
            "metadata": {},
        })))
        .mount(&router)
        .await;

    Mock::given(method("POST"))
        .and(path("/inference"))
        .and(body_string_contains("\"region_preference\":\"EU\""))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(json!({
                    "success": true,
                    "response": "EU answered slowly.",
                    "provider_used": "eu-provider",
                    "metadata": {},
                }))
                .set_delay(EU_EXTRA_LATENCY),
        )
        .mount(&router)
        .await;

    let orchestrator = Orchestrator::spawn(&router.uri()).await;
    let client = reqwest::Client::new();

    let job_id = "barrier-test-job";
    let submit = client
        .post(format!("{}/api/v1/jobs", orchestrator.base_url))
        .bearer_auth(ADMIN_TOKEN)
        .json(&test_jobspec(job_id))
        .send()
        .await
        .expect("submit job");
    assert_eq!(submit.status(), reqwest::StatusCode::ACCEPTED);

    let job_url = format!("{}/api/v1/jobs/{job_id}", orchestrator.base_url);

    // Give the outbox publisher and a job runner worker enough time to
    // pick the envelope up and dispatch the fast US tuple, but nowhere
    // near enough for the deliberately slow EU tuple.
    tokio::time::sleep(Duration::from_secs(8)).await;
    let mid_flight: serde_json::Value = client
        .get(&job_url)
        .bearer_auth(ADMIN_TOKEN)
        .send()
        .await
        .expect("fetch job mid-flight")
        .json()
        .await
        .expect("parse job body");
    assert_eq!(
        mid_flight["status"], "processing",
        "job must not reach a terminal status before the EU region's tuple returns"
    );

    let deadline = tokio::time::Instant::now() + EU_EXTRA_LATENCY + Duration::from_secs(15);
    let final_status = loop {
        let body: serde_json::Value = client
            .get(&job_url)
            .bearer_auth(ADMIN_TOKEN)
            .send()
            .await
            .expect("fetch job")
            .json()
            .await
            .expect("parse job body");
        let status = body["status"].as_str().unwrap_or_default().to_string();
        if status == "completed" || status == "failed" {
            break status;
        }
        if tokio::time::Instant::now() > deadline {
            panic!("job did not reach a terminal status in time, last seen: {status}");
        }
        tokio::time::sleep(Duration::from_secs(2)).await;
    };

    assert_eq!(final_status, "completed", "both regions succeeded, so the job should complete");

    let executions: serde_json::Value = client
        .get(format!("{job_url}/executions"))
        .bearer_auth(ADMIN_TOKEN)
        .send()
        .await
        .expect("fetch executions")
        .json()
        .await
        .expect("parse executions body");
    let executions = executions.as_array().expect("executions is a list");
    assert_eq!(executions.len(), 2, "one execution row per region");
    assert!(executions.iter().all(|e| e["status"] == "completed"));
}
