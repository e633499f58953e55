//! Coalesced pending surface changes.

use std::collections::{BTreeMap, BTreeSet};

/// What must happen to one marker at the next flush.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PendingMarker {
    /// Detach any old visual, then attach the current state
    Replace,
    /// Push the current state to the existing visual
    Update,
    /// Detach the visual
    Remove,
}

impl PendingMarker {
    /// Combines a queued change with a newer one for the same id.
    ///
    /// Replace and Remove always win. An Update after a Replace is already
    /// covered by the Replace.
    pub fn merge(self, newer: PendingMarker) -> PendingMarker {
        match (self, newer) {
            (PendingMarker::Replace, PendingMarker::Update) => PendingMarker::Replace,
            (_, newer) => newer,
        }
    }
}

/// Every change recorded since the last flush.
#[derive(Debug, Default)]
pub struct PendingChanges {
    pub(super) markers: BTreeMap<String, PendingMarker>,
    pub(super) polylines: BTreeSet<String>,
    pub(super) tile_overlays: BTreeSet<String>,
    pub(super) heatmap: bool,
}

impl PendingChanges {
    pub fn mark_marker(&mut self, id: &str, change: PendingMarker) {
        match self.markers.get_mut(id) {
            Some(existing) => *existing = existing.merge(change),
            None => {
                self.markers.insert(id.to_string(), change);
            }
        }
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
            && self.polylines.is_empty()
            && self.tile_overlays.is_empty()
            && !self.heatmap
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_rules() {
        use PendingMarker::*;
        assert_eq!(Replace.merge(Update), Replace);
        assert_eq!(Replace.merge(Remove), Remove);
        assert_eq!(Update.merge(Update), Update);
        assert_eq!(Update.merge(Replace), Replace);
        assert_eq!(Remove.merge(Replace), Replace);
        assert_eq!(Update.merge(Remove), Remove);
    }

    #[test]
    fn test_repeated_changes_collapse() {
        let mut pending = PendingChanges::default();
        pending.mark_marker("m1", PendingMarker::Replace);
        pending.mark_marker("m1", PendingMarker::Update);
        pending.mark_marker("m1", PendingMarker::Update);
        assert_eq!(pending.markers.len(), 1);
        assert_eq!(pending.markers["m1"], PendingMarker::Replace);
        assert!(!pending.is_empty());
    }
}
