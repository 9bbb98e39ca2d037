use crate::client::IntakeClient;
use crate::output::{display_value, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct SubmitArgs {
    /// Path to a signed JobSpec JSON file.
    pub jobspec: PathBuf,

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

pub async fn execute(args: SubmitArgs, _verbose: bool) -> Result<()> {
    let content = std::fs::read_to_string(&args.jobspec)
        .with_context(|| format!("failed to read {}", args.jobspec.display()))?;
    let jobspec: serde_json::Value =
        serde_json::from_str(&content).context("jobspec file is not valid JSON")?;

    let client = IntakeClient::new(args.api_url, args.token);
    let response = client.post("/api/v1/jobs", &jobspec).await?;
    display_value(&response, args.format)
}
