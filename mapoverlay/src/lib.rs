//! mapoverlay - overlay state and icon caching for native map views
//!
//! This library keeps the authoritative state of everything a host draws on
//! top of a map it does not render itself: markers, polylines, tile layers
//! and a heatmap. It resolves marker icons through a bounded memory and disk
//! cache, groups markers into clusters on request and animates markers with
//! bounce and pulse effects.
//!
//! # High-Level API
//!
//! Most hosts feed decoded commands to a [`dispatch::CommandDispatcher`]:
//!
//! ```ignore
//! use mapoverlay::dispatch::CommandDispatcher;
//! use mapoverlay::engine::{EngineConfig, OverlayEngine};
//! use mapoverlay::surface::RecordingSurface;
//! use serde_json::json;
//!
//! let engine = OverlayEngine::new(EngineConfig::default(), RecordingSurface::new())?;
//! let mut dispatcher = CommandDispatcher::new(engine);
//! dispatcher.dispatch(
//!     "marker.upsert",
//!     json!({"id": "m1", "position": {"lat": 10.0, "lng": 20.0}}),
//! );
//! ```

pub mod animation;
pub mod cluster;
pub mod config;
pub mod dispatch;
pub mod engine;
pub mod geo;
pub mod icon;
pub mod logging;
pub mod registry;
pub mod surface;

/// Version of the mapoverlay library and CLI.
///
/// This is synchronized across all components in the workspace.
/// The version is defined in `Cargo.toml` and injected at compile time.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
