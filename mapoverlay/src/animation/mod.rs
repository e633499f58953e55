//! Marker animations driven by a periodic tick.
//!
//! Each marker can run one bounce and one pulse track at the same time.
//! Tracks advance only when [`AnimationScheduler::tick`] is called.

mod easing;
mod scheduler;
mod types;

pub use easing::{bounce_offset, progress};
pub use scheduler::{AnimationScheduler, MarkerLookup};
pub use types::{
    AnimationConfig, AnimationEvent, BounceParams, Effect, PulseParams, RepeatMode, TickReport,
    DEFAULT_BOUNCE_DURATION, DEFAULT_BOUNCE_HEIGHT_POINTS, DEFAULT_PULSE_COLOR,
    DEFAULT_PULSE_DURATION, DEFAULT_PULSE_MAX_RADIUS_METERS,
};
