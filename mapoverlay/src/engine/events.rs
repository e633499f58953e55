//! Events reported back to the host.

/// Something the user did on the map surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    /// A plain marker visual was tapped
    MarkerTap { id: String },
    /// A cluster visual was tapped; ids are the cluster members
    ClusterTap { ids: Vec<String> },
}
