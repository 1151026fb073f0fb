//! Hierarchical marker clustering for one group of geotagged items.
//!
//! A [`SpatialIndex`] is an immutable multi-resolution clustering built once
//! per point set and configuration. Conceptually, at each integer zoom level
//! from `max_zoom` down to 0, nodes whose projected screen distance falls
//! below the configured pixel radius merge into an aggregate positioned at
//! the point-count weighted centroid of its constituents. Each zoom level
//! keeps its visible node set in an R-tree over web-mercator coordinates, so
//! viewport queries never scan linearly.
//!
//! Node ids are arena indices: stable within one build, meaningless after a
//! rebuild.

use crate::error::{Result, TrailmarkError};
use crate::types::{ClusterConfig, GeoPoint};
use crate::validation::filter_locatable;
use rstar::{AABB, Point as RstarPoint, RTree};
use rustc_hash::FxHashSet;
use smallvec::SmallVec;

/// Pixel extent of one map tile; pairs with pixel radii supplied by callers.
const TILE_EXTENT: f64 = 256.0;

/// Projects longitude to web-mercator world x in [0, 1].
#[inline]
fn lon_to_x(lon: f64) -> f64 {
    lon / 360.0 + 0.5
}

/// Projects latitude to web-mercator world y in [0, 1]; clamped at the
/// poles where the projection diverges.
#[inline]
fn lat_to_y(lat: f64) -> f64 {
    let sin = (lat * std::f64::consts::PI / 180.0).sin();
    let y = 0.5 - 0.25 * ((1.0 + sin) / (1.0 - sin)).ln() / std::f64::consts::PI;
    y.clamp(0.0, 1.0)
}

/// Wraps a longitude into [-180, 180].
#[inline]
fn wrap_lon(lon: f64) -> f64 {
    let wrapped = (lon + 180.0).rem_euclid(360.0) - 180.0;
    if wrapped == -180.0 && lon > 0.0 { 180.0 } else { wrapped }
}

/// Rounds a fractional zoom to the nearest integer, clamped to [0, max].
/// Fractional zoom is unsupported by design: a half-step in zoom never
/// changes which aggregates exist.
pub(crate) fn clamp_zoom(zoom: f64, max_zoom: u8) -> u8 {
    if !zoom.is_finite() {
        return 0;
    }
    zoom.round().clamp(0.0, max_zoom as f64) as u8
}

/// An entry in a per-zoom R-tree: projected world coordinates plus the
/// arena id of the node it stands for.
#[derive(Debug, Clone, PartialEq)]
struct TreeEntry {
    x: f64,
    y: f64,
    node: usize,
}

impl RstarPoint for TreeEntry {
    type Scalar = f64;
    const DIMENSIONS: usize = 2;

    fn generate(mut generator: impl FnMut(usize) -> Self::Scalar) -> Self {
        Self {
            x: generator(0),
            y: generator(1),
            node: usize::MAX,
        }
    }

    fn nth(&self, index: usize) -> Self::Scalar {
        match index {
            0 => self.x,
            1 => self.y,
            _ => unreachable!(),
        }
    }

    fn nth_mut(&mut self, index: usize) -> &mut Self::Scalar {
        match index {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => unreachable!(),
        }
    }
}

#[derive(Debug, Clone)]
enum NodeKind {
    /// Wraps exactly one original point (index into the point arena).
    Leaf { point: usize },
    /// Aggregate of `min_points` or more constituents.
    Cluster {
        children: SmallVec<[usize; 4]>,
        expansion_zoom: u8,
    },
}

/// A node of the clustering forest: either a leaf wrapping one item or an
/// aggregate representing all items merged beneath it.
#[derive(Debug, Clone)]
pub struct ClusterNode {
    id: usize,
    latitude: f64,
    longitude: f64,
    x: f64,
    y: f64,
    count: usize,
    kind: NodeKind,
}

impl ClusterNode {
    /// Index-local id, stable only within one build.
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Number of original points represented (1 for leaves).
    pub fn point_count(&self) -> usize {
        self.count
    }

    pub fn is_cluster(&self) -> bool {
        matches!(self.kind, NodeKind::Cluster { .. })
    }
}

/// Visible node set of one zoom level plus its lookup tree.
struct Level {
    visible: Vec<usize>,
    tree: RTree<TreeEntry>,
}

/// Immutable hierarchical clustering over one group's points.
///
/// Built wholesale, never mutated; a membership or configuration change for
/// the group replaces the entire index (see [`crate::registry`]).
pub struct SpatialIndex {
    points: Vec<GeoPoint>,
    nodes: Vec<ClusterNode>,
    /// Indexed by zoom level, 0 ..= max_zoom. Empty for an empty index.
    levels: Vec<Level>,
    config: ClusterConfig,
}

impl SpatialIndex {
    /// Builds the clustering for `points` under `config`.
    ///
    /// Points with invalid coordinates are excluded, never indexed. An empty
    /// (or fully excluded) input yields an index that answers every query
    /// with no results; it is not an error. Invalid configuration is.
    pub fn build(points: Vec<GeoPoint>, config: &ClusterConfig) -> Result<Self> {
        config.validate()?;

        let mut points = filter_locatable(points);
        // Arena order must not depend on caller iteration order: identical
        // point sets always produce identical structures.
        points.sort_by(|a, b| {
            a.id.cmp(&b.id)
                .then_with(|| a.latitude.total_cmp(&b.latitude))
                .then_with(|| a.longitude.total_cmp(&b.longitude))
        });

        let mut nodes: Vec<ClusterNode> = points
            .iter()
            .enumerate()
            .map(|(i, p)| ClusterNode {
                id: i,
                latitude: p.latitude,
                longitude: p.longitude,
                x: lon_to_x(p.longitude),
                y: lat_to_y(p.latitude),
                count: 1,
                kind: NodeKind::Leaf { point: i },
            })
            .collect();

        if nodes.is_empty() {
            return Ok(Self {
                points,
                nodes,
                levels: Vec::new(),
                config: *config,
            });
        }

        let mut current: Vec<usize> = (0..nodes.len()).collect();
        let leaf_tree = Self::tree_over(&nodes, &current);

        // Zoom levels are clustered coarse-ward: level z merges the visible
        // set of level z+1 (leaves above max_zoom).
        let mut reversed: Vec<Level> = Vec::with_capacity(config.max_zoom as usize + 1);
        for zoom in (0..=config.max_zoom).rev() {
            let radius = config.radius_px / (TILE_EXTENT * f64::powi(2.0, zoom as i32));
            let next = {
                let search_tree = reversed.last().map(|l| &l.tree).unwrap_or(&leaf_tree);
                Self::merge_level(&mut nodes, &current, search_tree, radius, config.min_points, zoom)
            };
            let tree = Self::tree_over(&nodes, &next);
            current = next.clone();
            reversed.push(Level { visible: next, tree });
        }
        reversed.reverse();

        Ok(Self {
            points,
            nodes,
            levels: reversed,
            config: *config,
        })
    }

    fn tree_over(nodes: &[ClusterNode], ids: &[usize]) -> RTree<TreeEntry> {
        RTree::bulk_load(
            ids.iter()
                .map(|&id| TreeEntry {
                    x: nodes[id].x,
                    y: nodes[id].y,
                    node: id,
                })
                .collect(),
        )
    }

    /// One agglomeration pass: merges nodes of `current` whose projected
    /// distance is below `radius`, provided the combined point count reaches
    /// `min_points`. Nodes that stay unmerged pass through unchanged.
    fn merge_level(
        nodes: &mut Vec<ClusterNode>,
        current: &[usize],
        tree: &RTree<TreeEntry>,
        radius: f64,
        min_points: usize,
        zoom: u8,
    ) -> Vec<usize> {
        let mut processed: FxHashSet<usize> =
            FxHashSet::with_capacity_and_hasher(current.len(), Default::default());
        let mut next = Vec::with_capacity(current.len());

        for &nid in current {
            if processed.contains(&nid) {
                continue;
            }
            processed.insert(nid);

            let probe = TreeEntry {
                x: nodes[nid].x,
                y: nodes[nid].y,
                node: usize::MAX,
            };
            // R-tree result order is unspecified; sort by arena id so merge
            // composition depends only on point identity.
            let mut neighbors: Vec<usize> = tree
                .locate_within_distance(probe, radius * radius)
                .map(|entry| entry.node)
                .filter(|&other| other != nid && !processed.contains(&other))
                .collect();
            neighbors.sort_unstable();

            let total: usize =
                nodes[nid].count + neighbors.iter().map(|&n| nodes[n].count).sum::<usize>();
            if neighbors.is_empty() || total < min_points {
                next.push(nid);
                continue;
            }

            let mut children: SmallVec<[usize; 4]> = SmallVec::with_capacity(1 + neighbors.len());
            children.push(nid);
            children.extend(neighbors);

            // Point-count weighted centroid: repeated merges keep a true
            // running centroid over the original points.
            let mut lat_sum = 0.0;
            let mut lon_sum = 0.0;
            for &child in &children {
                processed.insert(child);
                let weight = nodes[child].count as f64;
                lat_sum += nodes[child].latitude * weight;
                lon_sum += nodes[child].longitude * weight;
            }
            let latitude = lat_sum / total as f64;
            let longitude = lon_sum / total as f64;

            let id = nodes.len();
            nodes.push(ClusterNode {
                id,
                latitude,
                longitude,
                x: lon_to_x(longitude),
                y: lat_to_y(latitude),
                count: total,
                kind: NodeKind::Cluster {
                    children,
                    // Children were distinct one level finer.
                    expansion_zoom: zoom + 1,
                },
            });
            next.push(id);
        }

        next
    }

    /// Every node visible at `zoom` whose position falls inside `bounds`
    /// `(west, south, east, north)`, in degrees. Zoom is rounded and clamped
    /// to `[0, max_zoom]`. Bounds crossing the antimeridian (west > east
    /// after wrapping) are handled as two envelope lookups. Results are
    /// ordered by node id, so identical inputs yield identical output.
    pub fn query(&self, bounds: (f64, f64, f64, f64), zoom: f64) -> Vec<&ClusterNode> {
        if self.levels.is_empty() {
            return Vec::new();
        }

        let (west, south, east, north) = bounds;
        if ![west, south, east, north].iter().all(|v| v.is_finite()) {
            log::warn!("rejecting viewport query with non-finite bounds");
            return Vec::new();
        }

        let level = &self.levels[clamp_zoom(zoom, self.config.max_zoom) as usize];

        let y_min = lat_to_y(north.min(90.0));
        let y_max = lat_to_y(south.max(-90.0));

        let mut ids: Vec<usize> = Vec::new();
        if east - west >= 360.0 {
            Self::collect_in_envelope(&level.tree, 0.0, y_min, 1.0, y_max, &mut ids);
        } else {
            let west = wrap_lon(west);
            let east = wrap_lon(east);
            if west <= east {
                Self::collect_in_envelope(
                    &level.tree,
                    lon_to_x(west),
                    y_min,
                    lon_to_x(east),
                    y_max,
                    &mut ids,
                );
            } else {
                Self::collect_in_envelope(&level.tree, lon_to_x(west), y_min, 1.0, y_max, &mut ids);
                Self::collect_in_envelope(&level.tree, 0.0, y_min, lon_to_x(east), y_max, &mut ids);
            }
        }

        ids.sort_unstable();
        ids.dedup();
        ids.into_iter().map(|id| &self.nodes[id]).collect()
    }

    fn collect_in_envelope(
        tree: &RTree<TreeEntry>,
        x_min: f64,
        y_min: f64,
        x_max: f64,
        y_max: f64,
        out: &mut Vec<usize>,
    ) {
        let envelope = AABB::from_corners(
            TreeEntry {
                x: x_min,
                y: y_min,
                node: usize::MAX,
            },
            TreeEntry {
                x: x_max,
                y: y_max,
                node: usize::MAX,
            },
        );
        out.extend(tree.locate_in_envelope(&envelope).map(|entry| entry.node));
    }

    /// Direct next-finer-zoom constituents of an aggregate.
    ///
    /// # Errors
    ///
    /// [`TrailmarkError::ClusterNotFound`] if `id` does not name an
    /// aggregate in this index (unknown, stale, or a leaf id).
    pub fn children(&self, id: usize) -> Result<Vec<&ClusterNode>> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Cluster { children, .. }) => {
                Ok(children.iter().map(|&c| &self.nodes[c]).collect())
            }
            _ => Err(TrailmarkError::ClusterNotFound { id }),
        }
    }

    /// Up to `limit` original points transitively contained in an aggregate,
    /// in depth-first creation order. `limit == 0` yields an empty vec.
    pub fn leaves(&self, id: usize, limit: usize) -> Result<Vec<&GeoPoint>> {
        if !matches!(
            self.nodes.get(id).map(|node| &node.kind),
            Some(NodeKind::Cluster { .. })
        ) {
            return Err(TrailmarkError::ClusterNotFound { id });
        }
        let mut out = Vec::new();
        if limit > 0 {
            self.collect_leaves(id, limit, &mut out);
        }
        Ok(out)
    }

    fn collect_leaves<'a>(&'a self, id: usize, limit: usize, out: &mut Vec<&'a GeoPoint>) {
        if out.len() >= limit {
            return;
        }
        match &self.nodes[id].kind {
            NodeKind::Leaf { point } => out.push(&self.points[*point]),
            NodeKind::Cluster { children, .. } => {
                for &child in children {
                    if out.len() >= limit {
                        break;
                    }
                    self.collect_leaves(child, limit, out);
                }
            }
        }
    }

    /// Lowest zoom at which the aggregate splits into its children. May be
    /// `max_zoom + 1` for aggregates that never split within the queryable
    /// range; callers clamp when animating.
    pub fn expansion_zoom(&self, id: usize) -> Result<u8> {
        match self.nodes.get(id).map(|node| &node.kind) {
            Some(NodeKind::Cluster { expansion_zoom, .. }) => Ok(*expansion_zoom),
            _ => Err(TrailmarkError::ClusterNotFound { id }),
        }
    }

    /// First original point beneath `id` in deterministic order: the item
    /// itself for leaves, the first contained leaf for aggregates. `None`
    /// for unknown ids.
    pub fn representative(&self, id: usize) -> Option<&GeoPoint> {
        match self.nodes.get(id).map(|node| &node.kind)? {
            NodeKind::Leaf { point } => Some(&self.points[*point]),
            NodeKind::Cluster { .. } => {
                let mut out = Vec::with_capacity(1);
                self.collect_leaves(id, 1, &mut out);
                out.into_iter().next()
            }
        }
    }

    /// Number of points admitted to this index.
    pub fn num_points(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn config(&self) -> &ClusterConfig {
        &self.config
    }

    /// All nodes visible at `zoom` (the whole level, no viewport filter).
    pub fn nodes_at_zoom(&self, zoom: f64) -> Vec<&ClusterNode> {
        if self.levels.is_empty() {
            return Vec::new();
        }
        let level = &self.levels[clamp_zoom(zoom, self.config.max_zoom) as usize];
        level.visible.iter().map(|&id| &self.nodes[id]).collect()
    }
}
