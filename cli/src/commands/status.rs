use crate::client::IntakeClient;
use crate::output::{display_value, OutputFormat};
use anyhow::Result;
use clap::Args;

#[derive(Args)]
pub struct StatusArgs {
    /// Job id to query.
    pub job_id: String,

    /// Include `executions` (all) or `latest` execution per tuple.
    #[arg(long)]
    pub include: Option<String>,

    /// Maximum executions returned when `--include` is set.
    #[arg(long, default_value_t = 50)]
    pub exec_limit: u32,

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

pub async fn execute(args: StatusArgs, _verbose: bool) -> Result<()> {
    let mut path = format!("/api/v1/jobs/{}?exec_limit={}", args.job_id, args.exec_limit);
    if let Some(include) = &args.include {
        path.push_str(&format!("&include={include}"));
    }

    let client = IntakeClient::new(args.api_url, args.token);
    let response = client.get(&path).await?;
    display_value(&response, args.format)
}
