//! Configuration file support.
//!
//! User settings live in `~/.mapoverlay/config.ini`. Missing files and
//! missing keys fall back to defaults; [`ConfigFile`] converts into an
//! [`EngineConfig`](crate::engine::EngineConfig) with `From`.
//!
//! # Example
//!
//! ```ignore
//! use mapoverlay::config::ConfigFile;
//! use mapoverlay::engine::EngineConfig;
//!
//! let file = ConfigFile::load()?;
//! let engine_config = EngineConfig::from(&file);
//! ```

mod defaults;
mod file;
mod parser;
mod settings;
mod size;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    AnimationSettings, ClusteringSettings, ConfigFile, IconSettings, LoggingSettings,
};
pub use size::{display_size, format_size, parse_size, SizeParseError};
