//! Engine construction errors.

use thiserror::Error;

use crate::icon::IconError;

/// Errors raised while building an [`OverlayEngine`](super::OverlayEngine).
///
/// Once constructed, the engine never returns errors: failures are logged
/// and the operation becomes a no-op.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Failed to create icon cache: {0}")]
    IconCache(#[from] IconError),
}
