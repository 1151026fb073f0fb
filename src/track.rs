//! Zoom-dependent simplification of a group's chronological track.
//!
//! Path rendering needs a strictly ordered polyline, not an unordered
//! spatial aggregate, so this is a separate, streaming algorithm from the
//! marker clustering: one greedy left-to-right pass over the points in
//! capture order, merging each point into the first running cluster whose
//! centroid lies within a fixed angular threshold. The threshold is
//! deliberately not scaled by zoom or latitude, unlike the marker radius;
//! Euclidean distance in degrees is an accepted approximation at this
//! granularity.

use crate::types::{GeoPoint, PathSegment, TrackConfig};
use crate::validation::is_locatable;
use geo::{Distance, Euclidean, Point};
use rustc_hash::FxHashMap;

struct RunningCluster {
    centroid: Point,
    count: usize,
}

/// Simplifies one group's points into polyline vertices as
/// `(latitude, longitude)` pairs.
///
/// Points are taken in chronological order; a missing timestamp counts as
/// 0, so such points sort first (ties keep input order, the sort is
/// stable). At `zoom >= individual_zoom` every point passes through
/// one-to-one. Below that cutoff, each point either joins the first running
/// cluster within `proximity_deg` of its incrementally updated centroid or
/// starts a new one; output is one vertex per cluster, in the order the
/// clusters were first created.
pub fn simplify_track(points: &[GeoPoint], zoom: f64, config: &TrackConfig) -> Vec<(f64, f64)> {
    let mut ordered: Vec<&GeoPoint> = points.iter().filter(|p| is_locatable(p)).collect();
    ordered.sort_by_key(|p| p.timestamp.unwrap_or(0));

    if zoom >= config.individual_zoom as f64 {
        return ordered.iter().map(|p| (p.latitude, p.longitude)).collect();
    }

    let mut clusters: Vec<RunningCluster> = Vec::new();
    for point in ordered {
        let position = point.position();
        match clusters
            .iter_mut()
            .find(|c| Euclidean.distance(c.centroid, position) <= config.proximity_deg)
        {
            Some(cluster) => {
                // Running mean keeps the centroid exact without re-summing.
                cluster.count += 1;
                let n = cluster.count as f64;
                cluster.centroid = cluster.centroid + (position - cluster.centroid) / n;
            }
            None => clusters.push(RunningCluster {
                centroid: position,
                count: 1,
            }),
        }
    }

    clusters
        .into_iter()
        .map(|c| (c.centroid.y(), c.centroid.x()))
        .collect()
}

/// Builds one [`PathSegment`] per group from a flat item stream, in sorted
/// group order. Groups whose simplified track has fewer than two vertices
/// produce no segment; a line needs at least two.
pub fn track_segments(items: &[GeoPoint], zoom: f64, config: &TrackConfig) -> Vec<PathSegment> {
    let mut by_group: FxHashMap<&str, Vec<GeoPoint>> = FxHashMap::default();
    for item in items {
        by_group
            .entry(item.group_id.as_str())
            .or_default()
            .push(item.clone());
    }

    let mut group_ids: Vec<&str> = by_group.keys().copied().collect();
    group_ids.sort_unstable();

    let mut segments = Vec::new();
    for group_id in group_ids {
        let coordinates = simplify_track(&by_group[group_id], zoom, config);
        if coordinates.len() < 2 {
            continue;
        }
        segments.push(PathSegment {
            group_id: group_id.to_string(),
            coordinates,
        });
    }
    segments
}
