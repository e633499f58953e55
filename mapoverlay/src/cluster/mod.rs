//! Marker clustering.
//!
//! When enabled, nearby markers collapse into a single cluster visual. The
//! grouping is recomputed from scratch after any change to the item set or
//! camera zoom.

mod algorithm;
mod engine;
mod types;

pub use algorithm::{group_items, Group};
pub use engine::{ClusterEngine, CLUSTER_KEY_PREFIX};
pub use types::{
    cluster_icon_size, ClusterConfig, ClusterItem, DEFAULT_CLUSTER_DISTANCE_PX,
    DEFAULT_CLUSTER_ZOOM,
};
