//! Great-circle navigation math for the probe's geometry.
//!
//! Positions are decimal-degree lat/lon on a spherical earth and distances
//! are nautical miles. Segment intersection works directly in degree space
//! as a planar approximation, which holds at separation-minima scale (tens
//! of nautical miles) but is not meaningful near the poles or across the
//! antimeridian.

use serde::{Deserialize, Serialize};

/// Mean earth radius in nautical miles.
pub const EARTH_RADIUS_NM: f64 = 3440.065;

/// A position in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLon {
    pub lat: f64,
    pub lon: f64,
}

impl LatLon {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }
}

/// Great-circle distance between two points in nautical miles.
///
/// Standard haversine formula on the spherical earth model.
pub fn distance_nm(from: LatLon, to: LatLon) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dphi = (to.lat - from.lat).to_radians();
    let dlambda = (to.lon - from.lon).to_radians();

    let a = (dphi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (dlambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_NM * a.sqrt().atan2((1.0 - a).sqrt())
}

/// Initial great-circle bearing from `from` to `to`.
///
/// Returns degrees in [0, 360), 0 = north, 90 = east.
pub fn bearing_deg(from: LatLon, to: LatLon) -> f64 {
    let phi1 = from.lat.to_radians();
    let phi2 = to.lat.to_radians();
    let dlambda = (to.lon - from.lon).to_radians();

    let y = dlambda.sin() * phi2.cos();
    let x = phi1.cos() * phi2.sin() - phi1.sin() * phi2.cos() * dlambda.cos();

    (y.atan2(x).to_degrees() + 360.0) % 360.0
}

/// Point reached from `from` after travelling `dist_nm` on initial bearing
/// `brg_deg` (direct spherical solution).
pub fn destination_point(from: LatLon, dist_nm: f64, brg_deg: f64) -> LatLon {
    let phi1 = from.lat.to_radians();
    let lambda1 = from.lon.to_radians();
    let theta = brg_deg.to_radians();
    let delta = dist_nm / EARTH_RADIUS_NM;

    let phi2 = (phi1.sin() * delta.cos() + phi1.cos() * delta.sin() * theta.cos()).asin();
    let lambda2 = lambda1
        + (theta.sin() * delta.sin() * phi1.cos()).atan2(delta.cos() - phi1.sin() * phi2.sin());

    LatLon::new(phi2.to_degrees(), lambda2.to_degrees())
}

/// Intersection of segments (p1, p2) and (p3, p4) in planar degree space.
///
/// Parametric line solution; both parameters must land in [0, 1] for the
/// segments themselves to cross. Near-parallel segments (vanishing
/// denominator), which includes collinear overlap, count as no intersection.
pub fn segment_intersection(p1: LatLon, p2: LatLon, p3: LatLon, p4: LatLon) -> Option<LatLon> {
    let denom = (p4.lon - p3.lon) * (p2.lat - p1.lat) - (p4.lat - p3.lat) * (p2.lon - p1.lon);
    if denom.abs() < 1e-4 {
        return None;
    }

    let ua =
        ((p4.lat - p3.lat) * (p1.lon - p3.lon) - (p4.lon - p3.lon) * (p1.lat - p3.lat)) / denom;
    let ub =
        ((p2.lat - p1.lat) * (p1.lon - p3.lon) - (p2.lon - p1.lon) * (p1.lat - p3.lat)) / denom;

    if (0.0..=1.0).contains(&ua) && (0.0..=1.0).contains(&ub) {
        Some(LatLon::new(
            p1.lat + ua * (p2.lat - p1.lat),
            p1.lon + ua * (p2.lon - p1.lon),
        ))
    } else {
        None
    }
}

/// Check if a point is inside a polygon of degree-space vertices.
/// Uses ray casting algorithm; works with open or closed rings.
pub fn polygon_contains(polygon: &[LatLon], point: LatLon) -> bool {
    let n = polygon.len();
    if n < 3 {
        return false;
    }

    let mut inside = false;
    let mut j = n - 1;
    for i in 0..n {
        let yi = polygon[i].lat;
        let xi = polygon[i].lon;
        let yj = polygon[j].lat;
        let xj = polygon[j].lon;

        if ((yi > point.lat) != (yj > point.lat))
            && (point.lon < (xj - xi) * (point.lat - yi) / (yj - yi) + xi)
        {
            inside = !inside;
        }
        j = i;
    }

    inside
}
