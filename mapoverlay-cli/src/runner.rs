//! CLI runner for common setup.
//!
//! Encapsulates config loading and logging initialization so command
//! handlers start from a ready environment.

use crate::error::CliError;
use mapoverlay::config::ConfigFile;
use mapoverlay::engine::EngineConfig;
use mapoverlay::logging::{init_logging_at, LoggingGuard};
use tracing::info;

/// Runner that manages CLI lifecycle.
pub struct CliRunner {
    /// Logging guard - keeps logging active while runner exists
    #[allow(dead_code)]
    logging_guard: LoggingGuard,
    /// Loaded configuration file
    config: ConfigFile,
}

impl CliRunner {
    /// Create a new CLI runner with optional debug logging.
    ///
    /// Logs go to the file named in the config. Stdout logging is only
    /// enabled in debug mode so command output stays readable.
    pub fn with_debug(debug_mode: bool) -> Result<Self, CliError> {
        let config = ConfigFile::load()?;

        let logging_guard = init_logging_at(&config.logging.file, debug_mode, debug_mode)
            .map_err(|e| CliError::LoggingInit(e.to_string()))?;

        Ok(Self {
            logging_guard,
            config,
        })
    }

    /// Get the loaded configuration.
    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    /// Engine settings derived from the loaded configuration.
    pub fn engine_config(&self) -> EngineConfig {
        EngineConfig::from(&self.config)
    }

    /// Log startup information for a command.
    pub fn log_startup(&self, command: &str) {
        info!("mapoverlay v{}", mapoverlay::VERSION);
        info!(
            command = command,
            log_file = %self.config.logging.file.display(),
            "mapoverlay CLI starting"
        );
    }
}
