//! Animation parameters, repeat modes and events.

use std::fmt;
use std::time::Duration;

use crate::geo::Argb;

/// Default bounce cycle length.
pub const DEFAULT_BOUNCE_DURATION: Duration = Duration::from_millis(700);

/// Default bounce height in points.
pub const DEFAULT_BOUNCE_HEIGHT_POINTS: f32 = 20.0;

/// Default pulse cycle length.
pub const DEFAULT_PULSE_DURATION: Duration = Duration::from_millis(1500);

/// Default pulse radius at the end of a cycle.
pub const DEFAULT_PULSE_MAX_RADIUS_METERS: f64 = 60.0;

/// Default pulse fill (translucent indigo).
pub const DEFAULT_PULSE_COLOR: Argb = Argb(0x553F_51B5);

/// Which effect a track drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Effect {
    Bounce,
    Pulse,
}

impl fmt::Display for Effect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Effect::Bounce => f.write_str("bounce"),
            Effect::Pulse => f.write_str("pulse"),
        }
    }
}

/// How many cycles a track runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RepeatMode {
    /// Runs until stopped
    Infinite,
    /// Runs exactly this many cycles (at least one)
    Times(u32),
}

impl RepeatMode {
    /// Maps the host's repeat count: `0` means forever.
    pub fn from_count(count: u32) -> Self {
        if count == 0 {
            RepeatMode::Infinite
        } else {
            RepeatMode::Times(count)
        }
    }

    /// The mode after one more cycle finished, or `None` when done.
    pub(super) fn after_cycle(self) -> Option<RepeatMode> {
        match self {
            RepeatMode::Infinite => Some(RepeatMode::Infinite),
            RepeatMode::Times(n) if n > 1 => Some(RepeatMode::Times(n - 1)),
            RepeatMode::Times(_) => None,
        }
    }
}

/// Bounce settings.
#[derive(Debug, Clone, PartialEq)]
pub struct BounceParams {
    pub duration: Duration,
    pub height_points: f32,
    pub repeat: RepeatMode,
}

impl Default for BounceParams {
    fn default() -> Self {
        Self {
            duration: DEFAULT_BOUNCE_DURATION,
            height_points: DEFAULT_BOUNCE_HEIGHT_POINTS,
            repeat: RepeatMode::Times(1),
        }
    }
}

/// Pulse settings. The base alpha is the alpha channel of `color`.
#[derive(Debug, Clone, PartialEq)]
pub struct PulseParams {
    pub duration: Duration,
    pub max_radius_meters: f64,
    pub color: Argb,
    pub repeat: RepeatMode,
}

impl Default for PulseParams {
    fn default() -> Self {
        Self {
            duration: DEFAULT_PULSE_DURATION,
            max_radius_meters: DEFAULT_PULSE_MAX_RADIUS_METERS,
            color: DEFAULT_PULSE_COLOR,
            repeat: RepeatMode::Infinite,
        }
    }
}

/// Scheduler-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct AnimationConfig {
    /// Used when a start command omits a field
    pub bounce: BounceParams,
    /// Used when a start command omits a field
    pub pulse: PulseParams,
    /// Pixels per point for bounce heights
    pub device_scale: f32,
}

impl Default for AnimationConfig {
    fn default() -> Self {
        Self {
            bounce: BounceParams::default(),
            pulse: PulseParams::default(),
            device_scale: 1.0,
        }
    }
}

/// Something that happened during a tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationEvent {
    /// A cycle reached `t = 1` and the track restarted
    CycleFinished { id: String, effect: Effect },
    /// The final cycle finished and the track was removed
    Completed { id: String, effect: Effect },
    /// The marker disappeared and the track was dropped
    Dropped { id: String, effect: Effect },
}

/// Summary of one tick.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TickReport {
    pub events: Vec<AnimationEvent>,
    /// Tracks still running after the tick
    pub active: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_repeat_from_count() {
        assert_eq!(RepeatMode::from_count(0), RepeatMode::Infinite);
        assert_eq!(RepeatMode::from_count(3), RepeatMode::Times(3));
    }

    #[test]
    fn test_after_cycle() {
        assert_eq!(
            RepeatMode::Infinite.after_cycle(),
            Some(RepeatMode::Infinite)
        );
        assert_eq!(
            RepeatMode::Times(2).after_cycle(),
            Some(RepeatMode::Times(1))
        );
        assert_eq!(RepeatMode::Times(1).after_cycle(), None);
    }
}
