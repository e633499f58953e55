//! Command names and results.

use std::fmt;
use std::str::FromStr;

/// Every command the dispatcher understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CommandName {
    MarkerUpsert,
    MarkerUpdate,
    MarkerRemove,
    MarkerClear,
    MarkerSetIconBytes,
    MarkerStartBounce,
    MarkerStopBounce,
    MarkerStartPulse,
    MarkerStopPulse,
    PolylineAdd,
    PolylineUpdatePoints,
    PolylineRemove,
    PolylineClear,
    TileAdd,
    TileRemove,
    TileClear,
    HeatmapSet,
    HeatmapClear,
    MapSetClusteringEnabled,
    MapTakeSnapshot,
    MapMoveCamera,
    MapAnimateCamera,
    MapDispose,
}

impl CommandName {
    pub const ALL: [CommandName; 23] = [
        CommandName::MarkerUpsert,
        CommandName::MarkerUpdate,
        CommandName::MarkerRemove,
        CommandName::MarkerClear,
        CommandName::MarkerSetIconBytes,
        CommandName::MarkerStartBounce,
        CommandName::MarkerStopBounce,
        CommandName::MarkerStartPulse,
        CommandName::MarkerStopPulse,
        CommandName::PolylineAdd,
        CommandName::PolylineUpdatePoints,
        CommandName::PolylineRemove,
        CommandName::PolylineClear,
        CommandName::TileAdd,
        CommandName::TileRemove,
        CommandName::TileClear,
        CommandName::HeatmapSet,
        CommandName::HeatmapClear,
        CommandName::MapSetClusteringEnabled,
        CommandName::MapTakeSnapshot,
        CommandName::MapMoveCamera,
        CommandName::MapAnimateCamera,
        CommandName::MapDispose,
    ];

    /// Canonical dotted name.
    pub fn as_str(self) -> &'static str {
        match self {
            CommandName::MarkerUpsert => "marker.upsert",
            CommandName::MarkerUpdate => "marker.update",
            CommandName::MarkerRemove => "marker.remove",
            CommandName::MarkerClear => "marker.clear",
            CommandName::MarkerSetIconBytes => "marker.setIconBytes",
            CommandName::MarkerStartBounce => "marker.startBounce",
            CommandName::MarkerStopBounce => "marker.stopBounce",
            CommandName::MarkerStartPulse => "marker.startPulse",
            CommandName::MarkerStopPulse => "marker.stopPulse",
            CommandName::PolylineAdd => "polyline.add",
            CommandName::PolylineUpdatePoints => "polyline.updatePoints",
            CommandName::PolylineRemove => "polyline.remove",
            CommandName::PolylineClear => "polyline.clear",
            CommandName::TileAdd => "tile.add",
            CommandName::TileRemove => "tile.remove",
            CommandName::TileClear => "tile.clear",
            CommandName::HeatmapSet => "heatmap.set",
            CommandName::HeatmapClear => "heatmap.clear",
            CommandName::MapSetClusteringEnabled => "map.setClusteringEnabled",
            CommandName::MapTakeSnapshot => "map.takeSnapshot",
            CommandName::MapMoveCamera => "map.moveCamera",
            CommandName::MapAnimateCamera => "map.animateCamera",
            CommandName::MapDispose => "map.dispose",
        }
    }

    /// Channel name used by older hosts, if the command had one.
    pub fn legacy_alias(self) -> Option<&'static str> {
        let alias = match self {
            CommandName::MarkerUpsert => "markers#add",
            CommandName::MarkerUpdate => "markers#update",
            CommandName::MarkerRemove => "markers#remove",
            CommandName::MarkerClear => "markers#clear",
            CommandName::PolylineAdd => "polylines#add",
            CommandName::PolylineUpdatePoints => "polylines#updatePoints",
            CommandName::PolylineRemove => "polylines#remove",
            CommandName::PolylineClear => "polylines#clear",
            CommandName::TileAdd => "tiles#add",
            CommandName::TileRemove => "tiles#remove",
            CommandName::TileClear => "tiles#clear",
            CommandName::HeatmapSet => "heatmap#set",
            CommandName::HeatmapClear => "heatmap#clear",
            CommandName::MapSetClusteringEnabled => "map#setClusteringEnabled",
            CommandName::MapTakeSnapshot => "map#takeSnapshot",
            CommandName::MapMoveCamera => "map#moveCamera",
            CommandName::MapAnimateCamera => "map#animateCamera",
            CommandName::MapDispose => "map#dispose",
            _ => return None,
        };
        Some(alias)
    }
}

impl fmt::Display for CommandName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned for names no command answers to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownCommand(pub String);

impl fmt::Display for UnknownCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown command '{}'", self.0)
    }
}

impl std::error::Error for UnknownCommand {}

impl FromStr for CommandName {
    type Err = UnknownCommand;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        CommandName::ALL
            .into_iter()
            .find(|name| name.as_str() == s || name.legacy_alias() == Some(s))
            .ok_or_else(|| UnknownCommand(s.to_string()))
    }
}

/// What a dispatched command produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandResult {
    /// Command handled (possibly as a logged no-op)
    Done,
    /// Encoded snapshot, or `None` when the surface could not take one
    Snapshot(Option<Vec<u8>>),
    /// No command has this name
    NotImplemented,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_canonical_names_round_trip() {
        for name in CommandName::ALL {
            assert_eq!(name.as_str().parse::<CommandName>(), Ok(name));
        }
    }

    #[test]
    fn test_legacy_aliases() {
        assert_eq!("markers#add".parse(), Ok(CommandName::MarkerUpsert));
        assert_eq!("tiles#clear".parse(), Ok(CommandName::TileClear));
        assert_eq!(
            "map#setClusteringEnabled".parse(),
            Ok(CommandName::MapSetClusteringEnabled)
        );
        assert_eq!(
            "map#animateCamera".parse(),
            Ok(CommandName::MapAnimateCamera)
        );
    }

    #[test]
    fn test_unknown_name() {
        assert_eq!(
            "map#setTrafficEnabled".parse::<CommandName>(),
            Err(UnknownCommand("map#setTrafficEnabled".into()))
        );
    }
}
