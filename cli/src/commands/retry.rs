use crate::client::IntakeClient;
use crate::output::{display_value, OutputFormat};
use anyhow::Result;
use clap::Args;
use serde_json::json;

#[derive(Args)]
pub struct RetryArgs {
    /// Execution id to retry.
    pub execution_id: String,

    /// Region of the tuple being retried.
    #[arg(long)]
    pub region: String,

    /// Index of the question within the job's question list.
    #[arg(long)]
    pub question_index: u32,

    /// Intake API base URL (default: MESH_API_URL or http://localhost:8080).
    #[arg(long)]
    pub api_url: Option<String>,

    /// Bearer token for the intake API (default: MESH_TOKEN).
    #[arg(long)]
    pub token: Option<String>,

    /// Output format.
    #[arg(long, value_enum, default_value_t = OutputFormat::Pretty)]
    pub format: OutputFormat,
}

pub async fn execute(args: RetryArgs, _verbose: bool) -> Result<()> {
    let body = json!({
        "region": args.region,
        "question_index": args.question_index,
    });

    let client = IntakeClient::new(args.api_url, args.token);
    let response = client
        .post(
            &format!("/api/v1/executions/{}/retry-question", args.execution_id),
            &body,
        )
        .await?;
    display_value(&response, args.format)
}
