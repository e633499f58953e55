//! CLI command implementations.
//!
//! Each subcommand has its own module with argument definitions and handlers.
//!
//! # Command Modules
//!
//! - [`cache`] - Disk icon cache management (stats, clear, prune)
//! - [`config`] - Configuration management (init, show, path)
//! - [`replay`] - Replay a command script against a headless surface

pub mod cache;
pub mod config;
pub mod replay;
