use colored::Colorize;
use thiserror::Error;

/// CLI-specific errors with contextual messages and suggestions.
#[derive(Debug, Error)]
pub enum CliError {
    /// The intake API rejected the request.
    #[error("intake API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// A referenced job or execution does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Configuration was missing or invalid.
    #[error("configuration error: {message}")]
    ConfigurationError { message: String, suggestion: String },

    /// A required file was missing.
    #[error("file not found: {0}")]
    FileNotFound(String),

    /// User-supplied input failed validation before being sent.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl CliError {
    /// Prints the error with a suggestion line, when one applies.
    pub fn print_error(&self) {
        eprintln!("\n{} {}", "Error:".red().bold(), self);
        if let Self::ConfigurationError { suggestion, .. } = self {
            eprintln!("\n{} {}", "Hint:".yellow().bold(), suggestion);
        }
    }
}

/// Exit codes for different error scenarios.
pub mod exit_codes {
    /// Successful execution.
    pub const SUCCESS: i32 = 0;
    /// General error.
    pub const ERROR: i32 = 1;
    /// Configuration error.
    pub const CONFIG_ERROR: i32 = 3;
    /// Invalid input.
    pub const INVALID_INPUT: i32 = 4;
    /// The intake API returned an error response.
    pub const API_ERROR: i32 = 5;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_display() {
        let err = CliError::ApiError {
            status: 404,
            message: "job not found".to_string(),
        };
        assert_eq!(err.to_string(), "intake API error (404): job not found");
    }

    #[test]
    fn test_not_found_display() {
        let err = CliError::NotFound("job-123".to_string());
        assert_eq!(err.to_string(), "not found: job-123");
    }
}
