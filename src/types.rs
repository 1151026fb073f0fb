//! Core types and configuration for trailmark.
//!
//! Input items, viewport descriptions, tuning knobs, and the draw-ready
//! output records consumed by a renderer. Configuration types are
//! serializable and loadable from JSON or other formats with minimal
//! ceremony.

use geo::Point;
use serde::{Deserialize, Serialize};

/// A geotagged item admitted to the engine.
///
/// `id` must be unique within its group; global uniqueness is recommended
/// since leaf draw records reuse it verbatim. Immutable once indexed: any
/// coordinate change is a membership change that triggers a rebuild of the
/// owning group's index.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub id: String,
    pub latitude: f64,
    pub longitude: f64,
    /// Owning group (trip). Clustering never crosses group boundaries.
    pub group_id: String,
    /// Capture time in milliseconds since the epoch. Items without a
    /// timestamp sort as 0, i.e. first, in track simplification.
    pub timestamp: Option<i64>,
}

impl GeoPoint {
    pub fn new<I, G>(id: I, latitude: f64, longitude: f64, group_id: G) -> Self
    where
        I: Into<String>,
        G: Into<String>,
    {
        Self {
            id: id.into(),
            latitude,
            longitude,
            group_id: group_id.into(),
            timestamp: None,
        }
    }

    pub fn with_timestamp(mut self, timestamp: i64) -> Self {
        self.timestamp = Some(timestamp);
        self
    }

    /// Builds a point from an item source tuple where coordinates may be
    /// absent. Unlocatable items (either coordinate missing) yield `None`
    /// and are thereby excluded from indexing entirely.
    pub fn with_location<I, G>(
        id: I,
        latitude: Option<f64>,
        longitude: Option<f64>,
        group_id: G,
        timestamp: Option<i64>,
    ) -> Option<Self>
    where
        I: Into<String>,
        G: Into<String>,
    {
        let (latitude, longitude) = (latitude?, longitude?);
        Some(Self {
            id: id.into(),
            latitude,
            longitude,
            group_id: group_id.into(),
            timestamp,
        })
    }

    /// Position as a `geo` point (x = longitude, y = latitude).
    pub fn position(&self) -> Point {
        Point::new(self.longitude, self.latitude)
    }
}

/// Geographic viewport with a fractional zoom level.
///
/// Bounds are in degrees; `west > east` means the viewport crosses the
/// antimeridian. Zoom is clamped and rounded by the index at query time.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub west: f64,
    pub south: f64,
    pub east: f64,
    pub north: f64,
    pub zoom: f64,
}

impl Viewport {
    pub fn new(west: f64, south: f64, east: f64, north: f64, zoom: f64) -> Self {
        Self {
            west,
            south,
            east,
            north,
            zoom,
        }
    }

    /// Builds a viewport from a map region given as center plus span,
    /// deriving zoom from the longitude span: `log2(360 / lon_delta)`,
    /// clamped to [0, 20]. This matches how map SDK regions translate to
    /// tile zoom levels.
    pub fn from_center_span(latitude: f64, longitude: f64, lat_delta: f64, lon_delta: f64) -> Self {
        let zoom = if lon_delta > 0.0 {
            (360.0 / lon_delta).log2().round().clamp(0.0, 20.0)
        } else {
            20.0
        };
        Self {
            west: longitude - lon_delta / 2.0,
            south: latitude - lat_delta / 2.0,
            east: longitude + lon_delta / 2.0,
            north: latitude + lat_delta / 2.0,
            zoom,
        }
    }

    /// Bounds tuple `(west, south, east, north)`.
    pub fn bounds(&self) -> (f64, f64, f64, f64) {
        (self.west, self.south, self.east, self.north)
    }
}

/// Marker clustering configuration.
///
/// # Example
///
/// ```rust
/// use trailmark::ClusterConfig;
///
/// let config = ClusterConfig::default();
/// assert_eq!(config.radius_px, 60.0);
///
/// // Load from JSON
/// let json = r#"{ "radius_px": 80.0, "min_points": 3 }"#;
/// let config: ClusterConfig = serde_json::from_str(json).unwrap();
/// assert_eq!(config.max_zoom, 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ClusterConfig {
    /// Cluster radius in screen pixels (scaled per zoom by the projection).
    #[serde(default = "ClusterConfig::default_radius_px")]
    pub radius_px: f64,

    /// Minimum number of constituent points to form an aggregate.
    #[serde(default = "ClusterConfig::default_min_points")]
    pub min_points: usize,

    /// Highest zoom level at which merging still happens.
    #[serde(default = "ClusterConfig::default_max_zoom")]
    pub max_zoom: u8,
}

impl ClusterConfig {
    const fn default_radius_px() -> f64 {
        60.0
    }

    const fn default_min_points() -> usize {
        2
    }

    const fn default_max_zoom() -> u8 {
        20
    }

    pub fn with_radius_px(mut self, radius_px: f64) -> Self {
        self.radius_px = radius_px;
        self
    }

    pub fn with_min_points(mut self, min_points: usize) -> Self {
        self.min_points = min_points;
        self
    }

    pub fn with_max_zoom(mut self, max_zoom: u8) -> Self {
        self.max_zoom = max_zoom;
        self
    }

    /// Checks the configured values against their documented constraints.
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TrailmarkError;

        if !self.radius_px.is_finite() || self.radius_px <= 0.0 {
            return Err(TrailmarkError::InvalidInput(format!(
                "cluster radius must be a positive finite pixel count, got: {}",
                self.radius_px
            )));
        }
        if self.min_points < 2 {
            return Err(TrailmarkError::InvalidInput(format!(
                "min_points must be at least 2, got: {}",
                self.min_points
            )));
        }
        if !(1..=24).contains(&self.max_zoom) {
            return Err(TrailmarkError::InvalidInput(format!(
                "max_zoom must be in [1, 24], got: {}",
                self.max_zoom
            )));
        }
        Ok(())
    }
}

impl Default for ClusterConfig {
    fn default() -> Self {
        Self {
            radius_px: Self::default_radius_px(),
            min_points: Self::default_min_points(),
            max_zoom: Self::default_max_zoom(),
        }
    }
}

/// Track simplification configuration.
///
/// Track thresholds are deliberately independent from marker-cluster
/// thresholds: the proximity radius is a fixed angular distance rather than
/// a pixel distance scaled by zoom.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrackConfig {
    /// Zoom level at and above which every point is emitted unchanged.
    #[serde(default = "TrackConfig::default_individual_zoom")]
    pub individual_zoom: u8,

    /// Merge radius in degrees for the low-zoom greedy clusterer.
    #[serde(default = "TrackConfig::default_proximity_deg")]
    pub proximity_deg: f64,
}

impl TrackConfig {
    const fn default_individual_zoom() -> u8 {
        10
    }

    const fn default_proximity_deg() -> f64 {
        0.01
    }

    pub fn with_individual_zoom(mut self, zoom: u8) -> Self {
        self.individual_zoom = zoom;
        self
    }

    pub fn with_proximity_deg(mut self, proximity_deg: f64) -> Self {
        self.proximity_deg = proximity_deg;
        self
    }

    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::TrailmarkError;

        if !self.proximity_deg.is_finite() || self.proximity_deg <= 0.0 {
            return Err(TrailmarkError::InvalidInput(format!(
                "track proximity must be a positive finite angular distance, got: {}",
                self.proximity_deg
            )));
        }
        Ok(())
    }
}

impl Default for TrackConfig {
    fn default() -> Self {
        Self {
            individual_zoom: Self::default_individual_zoom(),
            proximity_deg: Self::default_proximity_deg(),
        }
    }
}

/// A draw-ready marker for the renderer: either an aggregated cluster or an
/// individual item.
///
/// `composite_id` is `"{group_id}-{local_id}"` for clusters and the item's
/// own id for leaves. It is opaque to the renderer and stable only within
/// one index generation; after a rebuild, cluster ids may no longer resolve
/// (leaf ids, being item ids, survive).
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DrawRecord {
    pub composite_id: String,
    pub latitude: f64,
    pub longitude: f64,
    pub is_cluster: bool,
    /// Total number of original items this marker represents (1 for leaves).
    pub count: usize,
    /// The item itself for leaves; for clusters, the first contained leaf in
    /// deterministic order, usable as the marker's thumbnail.
    pub point: Option<GeoPoint>,
}

/// A simplified polyline for one group, ordered chronologically.
///
/// Coordinates are `(latitude, longitude)` pairs. Derived, never persisted;
/// groups that simplify to fewer than two vertices produce no segment.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PathSegment {
    pub group_id: String,
    pub coordinates: Vec<(f64, f64)>,
}
