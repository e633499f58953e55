//! The overlay engine: one owner for every piece of overlay state.
//!
//! [`OverlayEngine`] wires the registry, the cluster engine, the animation
//! scheduler and the icon cache to a single [`MapSurface`](crate::surface::MapSurface).
//! All mutation goes through `&mut OverlayEngine`; background icon fetches
//! report back through [`OverlayEngine::poll_icons`] or
//! [`OverlayEngine::wait_icons`].
//!
//! # Example
//!
//! ```ignore
//! use mapoverlay::engine::{EngineConfig, OverlayEngine};
//! use mapoverlay::geo::LatLng;
//! use mapoverlay::registry::MarkerEntity;
//! use mapoverlay::surface::RecordingSurface;
//!
//! let mut engine = OverlayEngine::new(EngineConfig::default(), RecordingSurface::new())?;
//! engine.upsert_marker(MarkerEntity::new("m1", LatLng::new(10.0, 20.0)));
//! engine.flush();
//! ```

mod config;
mod error;
mod events;
mod facade;

pub use config::EngineConfig;
pub use error::EngineError;
pub use events::EngineEvent;
pub use facade::{CameraState, OverlayEngine};
