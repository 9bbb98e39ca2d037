use crate::client::IntakeClient;
use crate::output::{display_value, OutputFormat};
use anyhow::Result;
use clap::Subcommand;
use serde_json::json;

#[derive(Subcommand)]
pub enum AdminCommands {
    /// Republish jobs stuck without outbox/queue progress past a
    /// staleness threshold (spec §4.2).
    RepublishStuckJobs {
        /// Intake API base URL (default: MESH_API_URL or http://localhost:8080).
        #[arg(long)]
        api_url: Option<String>,
        /// Bearer token; must resolve to an admin role.
        #[arg(long)]
        token: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },

    /// Cancel a job, per the cancellation semantics in spec §4.4.
    Cancel {
        /// Job id to cancel.
        job_id: String,
        /// Intake API base URL (default: MESH_API_URL or http://localhost:8080).
        #[arg(long)]
        api_url: Option<String>,
        /// Bearer token; must resolve to operator or admin.
        #[arg(long)]
        token: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
        format: OutputFormat,
    },
}

pub async fn execute(cmd: AdminCommands, _verbose: bool) -> Result<()> {
    match cmd {
        AdminCommands::RepublishStuckJobs {
            api_url,
            token,
            format,
        } => {
            let client = IntakeClient::new(api_url, token);
            let response = client
                .post("/api/v1/admin/republish-stuck-jobs", &json!({}))
                .await?;
            display_value(&response, format)
        }
        AdminCommands::Cancel {
            job_id,
            api_url,
            token,
            format,
        } => {
            let client = IntakeClient::new(api_url, token);
            let response = client
                .post(&format!("/api/v1/admin/jobs/{job_id}/cancel"), &json!({}))
                .await?;
            display_value(&response, format)
        }
    }
}
