//! Geospatial clustering engine for map-based trip organizers: per-trip
//! hierarchical marker clustering, viewport projection with composite ids,
//! debounced re-projection, and zoom-dependent track simplification.
//!
//! ```rust
//! use trailmark::{ClusterConfig, GeoPoint, IndexRegistry, Viewport, project};
//!
//! let mut registry = IndexRegistry::new(ClusterConfig::default())?;
//! registry.rebuild(vec![
//!     GeoPoint::new("photo-1", 48.8584, 2.2945, "paris-trip"),
//!     GeoPoint::new("photo-2", 48.8585, 2.2946, "paris-trip"),
//! ])?;
//!
//! let viewport = Viewport::new(-180.0, -90.0, 180.0, 90.0, 4.0);
//! let markers = project(&registry, &viewport);
//! assert_eq!(markers.len(), 1);
//! assert!(markers[0].is_cluster);
//! # Ok::<(), trailmark::TrailmarkError>(())
//! ```

pub mod cluster;
pub mod coalesce;
pub mod error;
pub mod project;
pub mod registry;
pub mod track;
pub mod types;
pub mod validation;

pub use error::{Result, TrailmarkError};

pub use cluster::{ClusterNode, SpatialIndex};

pub use coalesce::UpdateCoalescer;

pub use project::{composite_id, expansion_zoom, leaves, project, split_composite_id};

pub use registry::{IndexRegistry, RegistryStats};

pub use track::{simplify_track, track_segments};

pub use types::{ClusterConfig, DrawRecord, GeoPoint, PathSegment, TrackConfig, Viewport};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Common imports
pub mod prelude {

    pub use crate::{Result, TrailmarkError};

    pub use crate::{ClusterConfig, GeoPoint, TrackConfig, Viewport};

    pub use crate::{IndexRegistry, SpatialIndex, UpdateCoalescer};

    pub use crate::{DrawRecord, PathSegment, project, track_segments};

    pub use std::time::{Duration, Instant};
}
