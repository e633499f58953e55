//! CLI error handling with user-friendly messages.
//!
//! Centralizes error handling for the CLI, providing consistent formatting
//! and appropriate exit codes.

use std::fmt;
use std::path::PathBuf;
use std::process;
use mapoverlay::config::ConfigFileError;
use mapoverlay::engine::EngineError;
use mapoverlay::icon::IconError;

/// CLI-specific errors with user-friendly messages.
#[derive(Debug)]
pub enum CliError {
    /// Failed to initialize logging
    LoggingInit(String),
    /// Configuration error
    Config(String),
    /// Failed to create the overlay engine
    EngineCreation(EngineError),
    /// Failed to create the async runtime
    Runtime(std::io::Error),
    /// Failed to read a replay script
    ScriptRead { path: PathBuf, error: std::io::Error },
    /// A replay script line is not a valid command
    Script { line: usize, message: String },
    /// Disk icon cache operation failed
    Cache(IconError),
}

impl CliError {
    /// Exit the process with an appropriate error message and code.
    pub fn exit(&self) -> ! {
        eprintln!("Error: {}", self);

        if let CliError::Script { .. } = self {
            eprintln!();
            eprintln!("Each script line must be a JSON object such as:");
            eprintln!(r#"  {{"command": "marker.upsert", "payload": {{"id": "m1", "position": {{"lat": 1.0, "lng": 2.0}}}}}}"#);
            eprintln!("Blank lines and lines starting with '#' are ignored.");
        }

        process::exit(1)
    }
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::LoggingInit(msg) => write!(f, "Failed to initialize logging: {}", msg),
            CliError::Config(msg) => write!(f, "Configuration error: {}", msg),
            CliError::EngineCreation(e) => write!(f, "Failed to create overlay engine: {}", e),
            CliError::Runtime(e) => write!(f, "Failed to start async runtime: {}", e),
            CliError::ScriptRead { path, error } => {
                write!(f, "Failed to read script '{}': {}", path.display(), error)
            }
            CliError::Script { line, message } => {
                write!(f, "Invalid script line {}: {}", line, message)
            }
            CliError::Cache(e) => write!(f, "Icon cache error: {}", e),
        }
    }
}

impl std::error::Error for CliError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            CliError::EngineCreation(e) => Some(e),
            CliError::Runtime(e) => Some(e),
            CliError::ScriptRead { error, .. } => Some(error),
            CliError::Cache(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigFileError> for CliError {
    fn from(e: ConfigFileError) -> Self {
        CliError::Config(e.to_string())
    }
}

impl From<EngineError> for CliError {
    fn from(e: EngineError) -> Self {
        CliError::EngineCreation(e)
    }
}

impl From<IconError> for CliError {
    fn from(e: IconError) -> Self {
        CliError::Cache(e)
    }
}
