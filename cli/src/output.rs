//! Output formatting for intake API responses.
//!
//! Commands fetch raw JSON from the intake API and hand it here for
//! display; the CLI does not depend on the orchestrator's response
//! types, only on the wire shape described in the HTTP contract.

use anyhow::Result;
use colored::*;
use serde_json::Value;

/// Output format options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// Human-readable pretty output with colors.
    #[default]
    Pretty,
    /// Compact JSON output.
    Json,
    /// Pretty-printed JSON output.
    JsonPretty,
}

/// Displays a JSON value in the requested format.
pub fn display_value(value: &Value, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Pretty => display_pretty(value),
        OutputFormat::Json => {
            println!("{}", serde_json::to_string(value)?);
            Ok(())
        }
        OutputFormat::JsonPretty => {
            println!("{}", serde_json::to_string_pretty(value)?);
            Ok(())
        }
    }
}

fn display_pretty(value: &Value) -> Result<()> {
    println!("{}", "─".repeat(72).dimmed());
    match value {
        Value::Object(map) => {
            for (key, val) in map {
                println!("{} {}", format!("{key}:").bright_cyan(), format_scalar(val));
            }
        }
        other => println!("{other}"),
    }
    println!("{}", "─".repeat(72).dimmed());
    Ok(())
}

fn format_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".dimmed().to_string(),
        other => other.to_string(),
    }
}

/// Displays an error in a user-friendly way.
pub fn display_error(error: &str, suggestion: Option<&str>) {
    eprintln!();
    eprintln!("{} {}", "Error:".red().bold(), error.red());
    if let Some(hint) = suggestion {
        eprintln!();
        eprintln!("{} {}", "Hint:".yellow().bold(), hint.yellow());
    }
    eprintln!();
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_display_json() {
        let value = json!({"id": "job-1", "status": "completed"});
        assert!(display_value(&value, OutputFormat::Json).is_ok());
    }

    #[test]
    fn test_display_pretty() {
        let value = json!({"id": "job-1", "status": "completed"});
        assert!(display_value(&value, OutputFormat::Pretty).is_ok());
    }

    #[test]
    fn test_format_scalar_string() {
        assert_eq!(format_scalar(&json!("completed")), "completed");
    }
}
