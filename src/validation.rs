//! Validation for geographic coordinates.
//!
//! Points outside the valid latitude/longitude ranges are excluded before
//! indexing rather than reported as failures: a bad coordinate on one photo
//! must never break clustering for the whole trip.

use crate::error::{Result, TrailmarkError};
use crate::types::GeoPoint;
use geo::Point;

/// Validates a point has valid longitude and latitude.
///
/// Longitude: [-180.0, 180.0], Latitude: [-90.0, 90.0]
///
/// # Examples
///
/// ```
/// use trailmark::validation::validate_geographic_point;
/// use geo::Point;
///
/// let nyc = Point::new(-74.0060, 40.7128);
/// assert!(validate_geographic_point(&nyc).is_ok());
///
/// let invalid = Point::new(200.0, 40.0);
/// assert!(validate_geographic_point(&invalid).is_err());
/// ```
pub fn validate_geographic_point(point: &Point) -> Result<()> {
    let (x, y) = (point.x(), point.y());

    if !x.is_finite() {
        return Err(TrailmarkError::InvalidInput(format!(
            "Longitude must be finite, got: {}",
            x
        )));
    }

    if !y.is_finite() {
        return Err(TrailmarkError::InvalidInput(format!(
            "Latitude must be finite, got: {}",
            y
        )));
    }

    if !(-180.0..=180.0).contains(&x) {
        return Err(TrailmarkError::InvalidInput(format!(
            "Longitude out of range [-180.0, 180.0]: {}",
            x
        )));
    }

    if !(-90.0..=90.0).contains(&y) {
        return Err(TrailmarkError::InvalidInput(format!(
            "Latitude out of range [-90.0, 90.0]: {}",
            y
        )));
    }

    Ok(())
}

/// Whether a point carries coordinates an index will accept.
pub fn is_locatable(point: &GeoPoint) -> bool {
    validate_geographic_point(&point.position()).is_ok()
}

/// Drops points with invalid coordinates, logging how many were excluded.
/// Never fails: an empty result is a legal input for an index build.
pub fn filter_locatable(points: Vec<GeoPoint>) -> Vec<GeoPoint> {
    let before = points.len();
    let points: Vec<GeoPoint> = points.into_iter().filter(is_locatable).collect();
    let excluded = before - points.len();
    if excluded > 0 {
        log::debug!("excluded {} point(s) with invalid coordinates", excluded);
    }
    points
}
