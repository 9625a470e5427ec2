//! Proximity matcher — decides whether an incident position lies within a
//! corridor distance of a route polyline.
//!
//! Pure functions of `(position, route geometry, corridor)`; no hidden
//! state, so the alert decision is deterministic and independently
//! testable.

use crate::geo::{GeoPoint, point_segment_distance_m};
use crate::route::Route;

/// Geometry was malformed; the caller treats this as "no match".
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProximityError {
    /// A coordinate was non-finite or out of WGS-84 bounds.
    #[error("invalid coordinate ({lat}, {lon})")]
    InvalidCoordinate {
        /// Offending latitude.
        lat: f64,
        /// Offending longitude.
        lon: f64,
    },
    /// The route polyline has no points.
    #[error("route polyline is empty")]
    EmptyRoute,
    /// The corridor threshold was non-finite or not positive.
    #[error("invalid corridor distance {0}")]
    InvalidCorridor(f64),
}

/// Minimum distance in meters from `position` to any segment of the
/// polyline.
///
/// A single-point polyline reduces to point distance.
pub fn route_distance_m(position: GeoPoint, polyline: &[GeoPoint]) -> Result<f64, ProximityError> {
    if polyline.is_empty() {
        return Err(ProximityError::EmptyRoute);
    }
    for p in polyline.iter().chain(std::iter::once(&position)) {
        if !p.is_valid() {
            return Err(ProximityError::InvalidCoordinate { lat: p.lat, lon: p.lon });
        }
    }

    let mut min = f64::INFINITY;
    if polyline.len() == 1 {
        min = point_segment_distance_m(position, polyline[0], polyline[0]);
    } else {
        for seg in polyline.windows(2) {
            let d = point_segment_distance_m(position, seg[0], seg[1]);
            if d < min {
                min = d;
            }
        }
    }
    Ok(min)
}

/// Whether `position` lies within `corridor_m` meters of any segment of
/// `route`.
///
/// Boolean by design: a match against multiple segments is still just a
/// match — the distance value only matters for optional alert content.
pub fn incident_near_route(
    position: GeoPoint,
    route: &Route,
    corridor_m: f64,
) -> Result<bool, ProximityError> {
    if !corridor_m.is_finite() || corridor_m <= 0.0 {
        return Err(ProximityError::InvalidCorridor(corridor_m));
    }
    Ok(route_distance_m(position, &route.polyline)? <= corridor_m)
}
