//! Route types owned by a navigating session.

use serde::{Deserialize, Serialize};

use crate::geo::GeoPoint;

/// Routing preferences supplied when navigation starts.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct RouteOptions {
    /// Prefer routes that stay off highways.
    pub avoid_highways: bool,
    /// Prefer routes without tolls.
    pub avoid_tolls: bool,
}

/// A computed route: ordered polyline plus endpoints and options.
///
/// Replaced wholesale on recalculation — never mutated in place.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Route {
    /// Unique route identifier.
    pub id: String,
    /// Start point.
    pub origin: GeoPoint,
    /// End point.
    pub destination: GeoPoint,
    /// Ordered geometry, origin first, destination last.
    pub polyline: Vec<GeoPoint>,
    /// Preferences this route was computed with.
    pub options: RouteOptions,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn options_default_off() {
        let opts = RouteOptions::default();
        assert!(!opts.avoid_highways);
        assert!(!opts.avoid_tolls);
    }

    #[test]
    fn options_deserialize_missing_fields() {
        let opts: RouteOptions = serde_json::from_str("{}").unwrap();
        assert_eq!(opts, RouteOptions::default());
    }

    #[test]
    fn route_wire_format() {
        let route = Route {
            id: "route_1".into(),
            origin: GeoPoint::new(48.85, 2.35),
            destination: GeoPoint::new(48.86, 2.35),
            polyline: vec![GeoPoint::new(48.85, 2.35), GeoPoint::new(48.86, 2.35)],
            options: RouteOptions {
                avoid_highways: true,
                avoid_tolls: false,
            },
        };
        let v: serde_json::Value = serde_json::to_value(&route).unwrap();
        assert_eq!(v["id"], "route_1");
        assert_eq!(v["polyline"].as_array().unwrap().len(), 2);
        assert_eq!(v["options"]["avoidHighways"], true);
    }
}
