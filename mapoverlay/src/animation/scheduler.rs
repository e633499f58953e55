//! Frame-driven bounce and pulse scheduler.

use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

use super::easing::{bounce_offset, progress};
use super::types::{
    AnimationConfig, AnimationEvent, BounceParams, Effect, PulseParams, RepeatMode, TickReport,
};
use crate::geo::LatLng;
use crate::surface::{report, CircleVisual, MapSurface, SurfaceError};

/// Read access to live marker state, looked up by id every tick.
pub trait MarkerLookup {
    /// Current position, or `None` if the marker no longer exists.
    fn marker_position(&self, id: &str) -> Option<LatLng>;

    /// Whether the marker is drawn as a plain marker visual right now.
    fn is_rendered(&self, id: &str) -> bool;
}

#[derive(Debug)]
struct BounceTrack {
    params: BounceParams,
    start: Instant,
    remaining: RepeatMode,
}

#[derive(Debug)]
struct PulseTrack {
    params: PulseParams,
    start: Instant,
    remaining: RepeatMode,
    circle_attached: bool,
}

/// Owns every running animation track.
///
/// Tracks never hold references to markers; positions are fetched through
/// [`MarkerLookup`] on each tick so a moving marker is followed.
#[derive(Debug, Default)]
pub struct AnimationScheduler {
    config: AnimationConfig,
    bounces: BTreeMap<String, BounceTrack>,
    pulses: BTreeMap<String, PulseTrack>,
}

impl AnimationScheduler {
    pub fn new(config: AnimationConfig) -> Self {
        Self {
            config,
            bounces: BTreeMap::new(),
            pulses: BTreeMap::new(),
        }
    }

    pub fn config(&self) -> &AnimationConfig {
        &self.config
    }

    /// Starts (or restarts) a bounce on `id`.
    pub fn start_bounce(&mut self, id: &str, params: BounceParams, now: Instant) {
        debug!(id = id, duration_ms = params.duration.as_millis() as u64, repeat = ?params.repeat, "Bounce started");
        self.bounces.insert(
            id.to_string(),
            BounceTrack {
                remaining: params.repeat,
                params,
                start: now,
            },
        );
    }

    /// Starts (or restarts) a pulse on `id`. An existing circle is reused.
    pub fn start_pulse(&mut self, id: &str, params: PulseParams, now: Instant) {
        debug!(id = id, duration_ms = params.duration.as_millis() as u64, repeat = ?params.repeat, "Pulse started");
        let circle_attached = self
            .pulses
            .get(id)
            .map(|track| track.circle_attached)
            .unwrap_or(false);
        self.pulses.insert(
            id.to_string(),
            PulseTrack {
                remaining: params.repeat,
                params,
                start: now,
                circle_attached,
            },
        );
    }

    /// Stops a bounce and puts the marker back at rest.
    pub fn stop_bounce(
        &mut self,
        id: &str,
        markers: &dyn MarkerLookup,
        surface: &mut dyn MapSurface,
    ) -> bool {
        if self.bounces.remove(id).is_none() {
            return false;
        }
        if markers.is_rendered(id) {
            push_offset(surface, id, 0.0);
        }
        true
    }

    /// Stops a pulse and detaches its circle immediately.
    pub fn stop_pulse(&mut self, id: &str, surface: &mut dyn MapSurface) -> bool {
        match self.pulses.remove(id) {
            Some(track) => {
                detach_circle(surface, id, &track);
                true
            }
            None => false,
        }
    }

    /// Drops every track for a marker that is going away.
    ///
    /// The marker's own visual is being removed, so no offset reset is sent.
    pub fn cancel_all_for(&mut self, id: &str, surface: &mut dyn MapSurface) {
        self.bounces.remove(id);
        if let Some(track) = self.pulses.remove(id) {
            detach_circle(surface, id, &track);
        }
    }

    /// Drops every track on every marker.
    pub fn cancel_all(&mut self, surface: &mut dyn MapSurface) {
        self.bounces.clear();
        for (id, track) in std::mem::take(&mut self.pulses) {
            detach_circle(surface, &id, &track);
        }
    }

    pub fn is_bouncing(&self, id: &str) -> bool {
        self.bounces.contains_key(id)
    }

    pub fn is_pulsing(&self, id: &str) -> bool {
        self.pulses.contains_key(id)
    }

    pub fn active_tracks(&self) -> usize {
        self.bounces.len() + self.pulses.len()
    }

    /// Advances every track to `now` and pushes visual state to the surface.
    pub fn tick(
        &mut self,
        now: Instant,
        markers: &dyn MarkerLookup,
        surface: &mut dyn MapSurface,
    ) -> TickReport {
        let mut events = Vec::new();
        let height_scale = self.config.device_scale as f64;

        self.bounces.retain(|id, track| {
            if markers.marker_position(id).is_none() {
                events.push(AnimationEvent::Dropped {
                    id: id.clone(),
                    effect: Effect::Bounce,
                });
                return false;
            }

            let t = progress(track.start, now, track.params.duration);
            let height_px = track.params.height_points as f64 * height_scale;
            let rendered = markers.is_rendered(id);
            if rendered {
                push_offset(surface, id, bounce_offset(t, height_px) as f32);
            }
            if t < 1.0 {
                return true;
            }

            match track.remaining.after_cycle() {
                Some(next) => {
                    track.remaining = next;
                    track.start = now;
                    events.push(AnimationEvent::CycleFinished {
                        id: id.clone(),
                        effect: Effect::Bounce,
                    });
                    true
                }
                None => {
                    if rendered {
                        push_offset(surface, id, 0.0);
                    }
                    events.push(AnimationEvent::Completed {
                        id: id.clone(),
                        effect: Effect::Bounce,
                    });
                    false
                }
            }
        });

        self.pulses.retain(|id, track| {
            let Some(center) = markers.marker_position(id) else {
                detach_circle(surface, id, track);
                events.push(AnimationEvent::Dropped {
                    id: id.clone(),
                    effect: Effect::Pulse,
                });
                return false;
            };

            let t = progress(track.start, now, track.params.duration);
            let base_alpha = track.params.color.alpha() as f64;
            let circle = CircleVisual {
                id: id.clone(),
                center,
                radius_meters: track.params.max_radius_meters * t,
                fill: track
                    .params
                    .color
                    .with_alpha((base_alpha * (1.0 - t)).round() as u8),
            };
            if track.circle_attached {
                report(surface.update_circle(&circle), "update_circle", id);
            } else {
                track.circle_attached =
                    report(surface.attach_circle(&circle), "attach_circle", id);
            }
            if t < 1.0 {
                return true;
            }

            match track.remaining.after_cycle() {
                Some(next) => {
                    track.remaining = next;
                    track.start = now;
                    events.push(AnimationEvent::CycleFinished {
                        id: id.clone(),
                        effect: Effect::Pulse,
                    });
                    true
                }
                None => {
                    detach_circle(surface, id, track);
                    events.push(AnimationEvent::Completed {
                        id: id.clone(),
                        effect: Effect::Pulse,
                    });
                    false
                }
            }
        });

        TickReport {
            events,
            active: self.active_tracks(),
        }
    }
}

fn push_offset(surface: &mut dyn MapSurface, id: &str, offset_px: f32) {
    match surface.set_marker_offset(id, offset_px) {
        // Surfaces without offsets simply don't bounce
        Err(SurfaceError::Unsupported(_)) => {}
        result => {
            report(result, "set_marker_offset", id);
        }
    }
}

fn detach_circle(surface: &mut dyn MapSurface, id: &str, track: &PulseTrack) {
    if track.circle_attached {
        report(surface.detach_circle(id), "detach_circle", id);
    }
}
