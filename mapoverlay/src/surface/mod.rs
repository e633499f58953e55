//! The map surface the engine renders onto.
//!
//! The engine never draws anything itself. It pushes visual state through
//! the [`MapSurface`] trait, implemented by whatever native map view the
//! host embeds. [`RecordingSurface`] is a headless implementation.

mod recording;
mod r#trait;
mod visual;

pub use r#trait::{Capability, MapSurface, SurfaceError};
pub use recording::{RecordingSurface, SurfaceOp};
pub use visual::{CircleVisual, ClusterVisual};

use tracing::warn;

/// Logs a failed surface call. Returns `true` when the call succeeded.
///
/// Surface failures never propagate: the host sees a no-op.
pub(crate) fn report(result: Result<(), SurfaceError>, action: &'static str, id: &str) -> bool {
    match result {
        Ok(()) => true,
        Err(e) => {
            warn!(action = action, id = id, error = %e, "Map surface call failed");
            false
        }
    }
}
