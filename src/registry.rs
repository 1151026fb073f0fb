//! Per-group ownership of spatial indexes.
//!
//! The registry maps group (trip) ids to owned, immutable [`SpatialIndex`]
//! values. A membership change replaces the whole index for that group: the
//! new index becomes visible only after its build completes, so a reader
//! never observes a partially built structure. Indexes of different groups
//! never share points.

use crate::cluster::SpatialIndex;
use crate::error::Result;
use crate::types::{ClusterConfig, GeoPoint};
use rustc_hash::{FxHashMap, FxHasher};
use std::hash::{Hash, Hasher};

struct GroupEntry {
    index: SpatialIndex,
    /// Identity signature of the point set the index was built from, used
    /// to skip rebuilds on point-identity-equal input.
    signature: u64,
}

/// Owns one [`SpatialIndex`] per group.
pub struct IndexRegistry {
    groups: FxHashMap<String, GroupEntry>,
    config: ClusterConfig,
}

impl IndexRegistry {
    /// Creates a registry; fails on invalid clustering configuration.
    pub fn new(config: ClusterConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            groups: FxHashMap::default(),
            config,
        })
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// Replaces the index for `group_id` with one freshly built from
    /// `points`. An empty point set removes the group. Input whose identity
    /// signature (ids and coordinates) matches the current index skips the
    /// rebuild entirely.
    ///
    /// Returns whether the registry changed.
    pub fn upsert(&mut self, group_id: &str, points: Vec<GeoPoint>) -> Result<bool> {
        if points.is_empty() {
            return Ok(self.remove(group_id));
        }

        let signature = point_set_signature(&points);
        if let Some(entry) = self.groups.get(group_id)
            && entry.signature == signature
        {
            log::debug!("group '{}' unchanged by identity, skipping rebuild", group_id);
            return Ok(false);
        }

        let index = SpatialIndex::build(points, &self.config)?;
        if index.is_empty() {
            // Every point was unlocatable; a group with no indexable points
            // holds no index at all.
            return Ok(self.remove(group_id));
        }

        self.groups
            .insert(group_id.to_string(), GroupEntry { index, signature });
        Ok(true)
    }

    /// Drops the group's index. Returns whether it existed.
    pub fn remove(&mut self, group_id: &str) -> bool {
        self.groups.remove(group_id).is_some()
    }

    pub fn get(&self, group_id: &str) -> Option<&SpatialIndex> {
        self.groups.get(group_id).map(|entry| &entry.index)
    }

    /// Group ids in sorted order.
    pub fn group_ids(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.groups.keys().map(String::as_str).collect();
        ids.sort_unstable();
        ids
    }

    /// `(group_id, index)` pairs in sorted group order, the iteration order
    /// used for projection so output is deterministic.
    pub fn iter_sorted(&self) -> impl Iterator<Item = (&str, &SpatialIndex)> {
        let mut entries: Vec<(&str, &SpatialIndex)> = self
            .groups
            .iter()
            .map(|(id, entry)| (id.as_str(), &entry.index))
            .collect();
        entries.sort_unstable_by_key(|(id, _)| *id);
        entries.into_iter()
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn clear(&mut self) {
        self.groups.clear();
    }

    /// Rebuilds the whole registry from a flat item stream, partitioning by
    /// group id. Groups absent from the stream are dropped; groups whose
    /// point identity is unchanged keep their existing index.
    ///
    /// Returns the number of groups that were actually rebuilt or removed.
    pub fn rebuild<I>(&mut self, items: I) -> Result<usize>
    where
        I: IntoIterator<Item = GeoPoint>,
    {
        let mut by_group: FxHashMap<String, Vec<GeoPoint>> = FxHashMap::default();
        for item in items {
            by_group
                .entry(item.group_id.clone())
                .or_default()
                .push(item);
        }

        let mut changed = 0;
        let stale: Vec<String> = self
            .groups
            .keys()
            .filter(|id| !by_group.contains_key(*id))
            .cloned()
            .collect();
        for id in stale {
            self.remove(&id);
            changed += 1;
        }

        for (group_id, points) in by_group {
            if self.upsert(&group_id, points)? {
                changed += 1;
            }
        }
        Ok(changed)
    }

    /// Summary counters over all indexes.
    pub fn stats(&self) -> RegistryStats {
        RegistryStats {
            group_count: self.groups.len(),
            total_points: self.groups.values().map(|e| e.index.num_points()).sum(),
        }
    }
}

/// Statistics over the registry's indexes.
#[derive(Debug, Clone)]
pub struct RegistryStats {
    pub group_count: usize,
    pub total_points: usize,
}

/// Order-independent hash of the point set's identity: ids plus exact
/// coordinate bits. Timestamps are excluded on purpose; they do not affect
/// clustering structure.
fn point_set_signature(points: &[GeoPoint]) -> u64 {
    let mut entries: Vec<(&str, u64, u64)> = points
        .iter()
        .map(|p| (p.id.as_str(), p.latitude.to_bits(), p.longitude.to_bits()))
        .collect();
    entries.sort_unstable();

    let mut hasher = FxHasher::default();
    entries.len().hash(&mut hasher);
    for entry in entries {
        entry.hash(&mut hasher);
    }
    hasher.finish()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn point(id: &str, lat: f64, lon: f64, group: &str) -> GeoPoint {
        GeoPoint::new(id, lat, lon, group)
    }

    fn registry() -> IndexRegistry {
        IndexRegistry::new(ClusterConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        assert!(IndexRegistry::new(ClusterConfig::default().with_min_points(0)).is_err());
    }

    #[test]
    fn test_upsert_and_get() {
        let mut reg = registry();
        assert!(
            reg.upsert("trip-a", vec![point("a", 1.0, 1.0, "trip-a")])
                .unwrap()
        );
        assert_eq!(reg.len(), 1);
        assert_eq!(reg.get("trip-a").unwrap().num_points(), 1);
        assert!(reg.get("trip-b").is_none());
    }

    #[test]
    fn test_empty_points_removes_group() {
        let mut reg = registry();
        reg.upsert("trip-a", vec![point("a", 1.0, 1.0, "trip-a")])
            .unwrap();
        assert!(reg.upsert("trip-a", Vec::new()).unwrap());
        assert!(reg.is_empty());

        // Removing a group that never existed is not a change.
        assert!(!reg.upsert("ghost", Vec::new()).unwrap());
    }

    #[test]
    fn test_all_unlocatable_points_removes_group() {
        let mut reg = registry();
        reg.upsert("trip-a", vec![point("a", 1.0, 1.0, "trip-a")])
            .unwrap();
        reg.upsert("trip-a", vec![point("a", 99.0, 1.0, "trip-a")])
            .unwrap();
        assert!(reg.get("trip-a").is_none());
    }

    #[test]
    fn test_identity_equal_input_skips_rebuild() {
        let mut reg = registry();
        let points = vec![
            point("a", 1.0, 1.0, "trip-a"),
            point("b", 2.0, 2.0, "trip-a"),
        ];
        assert!(reg.upsert("trip-a", points.clone()).unwrap());

        // Same identity, different order: no rebuild.
        let mut reordered = points.clone();
        reordered.reverse();
        assert!(!reg.upsert("trip-a", reordered).unwrap());

        // A coordinate change is a membership change.
        let mut moved = points.clone();
        moved[0].latitude = 1.5;
        assert!(reg.upsert("trip-a", moved).unwrap());

        // So is an addition.
        let mut grown = points;
        grown.push(point("c", 3.0, 3.0, "trip-a"));
        assert!(reg.upsert("trip-a", grown).unwrap());
    }

    #[test]
    fn test_rebuild_partitions_and_drops() {
        let mut reg = registry();
        reg.rebuild(vec![
            point("a", 1.0, 1.0, "trip-a"),
            point("b", 2.0, 2.0, "trip-b"),
            point("c", 3.0, 3.0, "trip-b"),
        ])
        .unwrap();
        assert_eq!(reg.len(), 2);
        assert_eq!(reg.get("trip-b").unwrap().num_points(), 2);

        // trip-a vanished from the stream: its index is dropped.
        let changed = reg
            .rebuild(vec![
                point("b", 2.0, 2.0, "trip-b"),
                point("c", 3.0, 3.0, "trip-b"),
            ])
            .unwrap();
        assert_eq!(changed, 1);
        assert!(reg.get("trip-a").is_none());
        assert!(reg.get("trip-b").is_some());

        // Unchanged stream: nothing happens.
        let changed = reg
            .rebuild(vec![
                point("c", 3.0, 3.0, "trip-b"),
                point("b", 2.0, 2.0, "trip-b"),
            ])
            .unwrap();
        assert_eq!(changed, 0);
    }

    #[test]
    fn test_groups_never_share_an_index() {
        let mut reg = registry();
        // Geographically coincident points in different groups.
        reg.rebuild(vec![
            point("a", 10.0, 10.0, "trip-a"),
            point("b", 10.0, 10.0, "trip-b"),
        ])
        .unwrap();

        assert_eq!(reg.get("trip-a").unwrap().num_points(), 1);
        assert_eq!(reg.get("trip-b").unwrap().num_points(), 1);
    }

    #[test]
    fn test_group_ids_sorted() {
        let mut reg = registry();
        reg.upsert("zebra", vec![point("z", 1.0, 1.0, "zebra")])
            .unwrap();
        reg.upsert("alpha", vec![point("a", 1.0, 1.0, "alpha")])
            .unwrap();
        assert_eq!(reg.group_ids(), vec!["alpha", "zebra"]);
    }

    #[test]
    fn test_stats() {
        let mut reg = registry();
        reg.rebuild(vec![
            point("a", 1.0, 1.0, "trip-a"),
            point("b", 2.0, 2.0, "trip-b"),
            point("c", 3.0, 3.0, "trip-b"),
        ])
        .unwrap();

        let stats = reg.stats();
        assert_eq!(stats.group_count, 2);
        assert_eq!(stats.total_points, 3);
    }

    #[test]
    fn test_signature_order_independence() {
        let a = vec![
            point("a", 1.0, 1.0, "g"),
            point("b", 2.0, 2.0, "g"),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(point_set_signature(&a), point_set_signature(&b));

        let mut c = a.clone();
        c[0].longitude = 1.000001;
        assert_ne!(point_set_signature(&a), point_set_signature(&c));
    }
}
