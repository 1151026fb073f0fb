//! Viewport projection: per-group cluster queries merged into one flat list
//! of draw-ready records.
//!
//! Every group's index is queried independently and the results are
//! concatenated; clusters never merge across group boundaries, even for
//! geographically coincident points. The composite id embeds the owning
//! group, so a caller can route a marker tap back to the right per-group
//! index without any global lookup table.

use crate::error::{Result, TrailmarkError};
use crate::registry::IndexRegistry;
use crate::types::{DrawRecord, GeoPoint, Viewport};

/// Builds the composite id for an aggregate: `"{group_id}-{local_id}"`.
pub fn composite_id(group_id: &str, local_id: usize) -> String {
    format!("{}-{}", group_id, local_id)
}

/// Splits a composite id back into `(group_id, local_id)`.
///
/// Group ids may themselves contain `-`, so the split happens at the last
/// separator; the trailing segment must be a numeric local id. Leaf record
/// ids (bare item ids) normally fail this parse, which is how callers tell
/// the two kinds apart.
pub fn split_composite_id(composite: &str) -> Option<(&str, usize)> {
    let (group, local) = composite.rsplit_once('-')?;
    if group.is_empty() {
        return None;
    }
    local.parse().ok().map(|local| (group, local))
}

/// Projects the registry onto a viewport: queries every group's index and
/// maps each visible node to a [`DrawRecord`].
///
/// Aggregates get a composite id and carry their first leaf as a
/// representative; leaves reuse the item's own id. Output order is
/// deterministic (groups sorted, nodes ordered per index).
pub fn project(registry: &IndexRegistry, viewport: &Viewport) -> Vec<DrawRecord> {
    let mut records = Vec::new();
    for (group_id, index) in registry.iter_sorted() {
        for node in index.query(viewport.bounds(), viewport.zoom) {
            let representative = index.representative(node.id()).cloned();
            if node.is_cluster() {
                records.push(DrawRecord {
                    composite_id: composite_id(group_id, node.id()),
                    latitude: node.latitude(),
                    longitude: node.longitude(),
                    is_cluster: true,
                    count: node.point_count(),
                    point: representative,
                });
            } else {
                let composite_id = representative
                    .as_ref()
                    .map(|p| p.id.clone())
                    .unwrap_or_else(|| composite_id(group_id, node.id()));
                records.push(DrawRecord {
                    composite_id,
                    latitude: node.latitude(),
                    longitude: node.longitude(),
                    is_cluster: false,
                    count: 1,
                    point: representative,
                });
            }
        }
    }
    records
}

/// Resolves a cluster's composite id and returns the zoom a map should
/// animate to for the cluster to split.
///
/// # Errors
///
/// `InvalidInput` for unparseable composite ids, `GroupNotFound` when the
/// group has no index (e.g. the trip was emptied since the record was
/// issued), `ClusterNotFound` for stale local ids.
pub fn expansion_zoom(registry: &IndexRegistry, composite: &str) -> Result<u8> {
    let (group_id, local_id) = split_composite_id(composite).ok_or_else(|| {
        TrailmarkError::InvalidInput(format!("not a cluster composite id: '{}'", composite))
    })?;
    let index = registry
        .get(group_id)
        .ok_or_else(|| TrailmarkError::GroupNotFound(group_id.to_string()))?;
    index.expansion_zoom(local_id)
}

/// Resolves a cluster's composite id to up to `limit` of its original
/// points, e.g. to pick thumbnails or attribute a tap to a trip.
pub fn leaves(registry: &IndexRegistry, composite: &str, limit: usize) -> Result<Vec<GeoPoint>> {
    let (group_id, local_id) = split_composite_id(composite).ok_or_else(|| {
        TrailmarkError::InvalidInput(format!("not a cluster composite id: '{}'", composite))
    })?;
    let index = registry
        .get(group_id)
        .ok_or_else(|| TrailmarkError::GroupNotFound(group_id.to_string()))?;
    Ok(index
        .leaves(local_id, limit)?
        .into_iter()
        .cloned()
        .collect())
}
