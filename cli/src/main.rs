use clap::{Parser, Subcommand};
use std::process;

mod client;
mod commands;
mod error;
mod output;

use commands::{admin, config, retry, status, submit};

/// Operator CLI for the inference mesh intake API.
#[derive(Parser)]
#[command(name = "mesh")]
#[command(author = "Inference Mesh Contributors")]
#[command(version)]
#[command(about = "Submit jobs to and inspect the multi-region inference orchestrator", long_about = None)]
#[command(propagate_version = true)]
#[command(arg_required_else_help = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Enable verbose output.
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Submit a signed JobSpec to the intake API.
    Submit(submit::SubmitArgs),

    /// Query a job's status and, optionally, its executions.
    Status(status::StatusArgs),

    /// Retry one (region, question) tuple of a job.
    Retry(retry::RetryArgs),

    /// Admin operations gated by admin/operator tokens.
    #[command(subcommand)]
    Admin(admin::AdminCommands),

    /// Configuration management commands.
    #[command(subcommand)]
    Config(config::ConfigCommands),

    /// Generate shell completions.
    Completions {
        /// The shell to generate completions for.
        #[arg(value_enum)]
        shell: clap_complete::Shell,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let result = match cli.command {
        Commands::Submit(args) => submit::execute(args, cli.verbose).await,
        Commands::Status(args) => status::execute(args, cli.verbose).await,
        Commands::Retry(args) => retry::execute(args, cli.verbose).await,
        Commands::Admin(cmd) => admin::execute(cmd, cli.verbose).await,
        Commands::Config(cmd) => config::execute(cmd, cli.verbose).await,
        Commands::Completions { shell } => {
            generate_completions(shell);
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("Error: {e}");
        if cli.verbose {
            eprintln!("\nCaused by:");
            for cause in e.chain().skip(1) {
                eprintln!("  {cause}");
            }
        }
        process::exit(1);
    }
}

fn generate_completions(shell: clap_complete::Shell) {
    use clap::CommandFactory;
    use clap_complete::generate;
    use std::io;

    let mut cmd = Cli::command();
    let bin_name = cmd.get_name().to_string();
    generate(shell, &mut cmd, bin_name, &mut io::stdout());
}
