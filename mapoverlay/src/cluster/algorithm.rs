//! Distance-based greedy grouping.
//!
//! Items are visited in ascending id order. Each unassigned item seeds a
//! group that absorbs every other unassigned item within `distance_px` of
//! the seed in world pixels at the current zoom. The result depends only on
//! the item set, never on insertion order.

use std::collections::{BTreeMap, HashSet};

use super::types::ClusterItem;
use crate::geo::{centroid, world_point, LatLng, WorldPoint};

/// One output group. A single member renders as a plain marker.
#[derive(Debug, Clone, PartialEq)]
pub struct Group {
    /// Member ids, ascending
    pub member_ids: Vec<String>,
    /// Centroid of member positions
    pub position: LatLng,
}

impl Group {
    pub fn is_singleton(&self) -> bool {
        self.member_ids.len() == 1
    }
}

pub fn group_items(
    items: &BTreeMap<String, ClusterItem>,
    zoom: f64,
    distance_px: f64,
) -> Vec<Group> {
    let projected: Vec<(&str, LatLng, WorldPoint)> = items
        .iter()
        .map(|(id, item)| {
            let position = item.state.entity.position;
            (id.as_str(), position, world_point(position, zoom))
        })
        .collect();

    let mut assigned: HashSet<&str> = HashSet::with_capacity(projected.len());
    let mut groups = Vec::new();

    for (seed_id, _, seed_point) in &projected {
        if assigned.contains(seed_id) {
            continue;
        }

        let mut member_ids = Vec::new();
        let mut positions = Vec::new();
        for (id, position, point) in &projected {
            if assigned.contains(id) {
                continue;
            }
            if id == seed_id || seed_point.distance_to(point) <= distance_px {
                assigned.insert(*id);
                member_ids.push(id.to_string());
                positions.push(*position);
            }
        }

        if let Some(position) = centroid(&positions) {
            groups.push(Group {
                member_ids,
                position,
            });
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{MarkerEntity, MarkerState};

    fn items(points: &[(&str, f64, f64)]) -> BTreeMap<String, ClusterItem> {
        points
            .iter()
            .map(|(id, lat, lng)| {
                let state = MarkerState::new(MarkerEntity::new(*id, LatLng::new(*lat, *lng)));
                (id.to_string(), ClusterItem::new(state))
            })
            .collect()
    }

    #[test]
    fn test_nearby_items_group() {
        let items = items(&[
            ("a", 10.0, 20.0),
            ("b", 10.0001, 20.0001),
            ("c", 10.0002, 20.0),
        ]);
        let groups = group_items(&items, 14.0, 100.0);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].member_ids, vec!["a", "b", "c"]);
    }

    #[test]
    fn test_distant_items_stay_apart() {
        let items = items(&[("a", 10.0, 20.0), ("b", -30.0, 100.0)]);
        let groups = group_items(&items, 14.0, 100.0);
        assert_eq!(groups.len(), 2);
        assert!(groups.iter().all(Group::is_singleton));
    }

    #[test]
    fn test_zoom_out_merges() {
        let items = items(&[("a", 10.0, 20.0), ("b", 10.5, 20.5)]);
        assert_eq!(group_items(&items, 14.0, 100.0).len(), 2);
        assert_eq!(group_items(&items, 2.0, 100.0).len(), 1);
    }

    #[test]
    fn test_centroid_position() {
        let items = items(&[("a", 0.0, 0.0), ("b", 0.0002, 0.0002)]);
        let groups = group_items(&items, 14.0, 100.0);
        assert_eq!(groups[0].position, LatLng::new(0.0001, 0.0001));
    }

    #[test]
    fn test_empty() {
        assert!(group_items(&BTreeMap::new(), 14.0, 100.0).is_empty());
    }
}
