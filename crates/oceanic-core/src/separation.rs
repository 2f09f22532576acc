//! Separation standards applied between a pair of flights.
//!
//! Each lookup walks its rule rows top to bottom and returns the first
//! match, so better-equipped pairings take the smaller minima. Levels are
//! flight levels (hundreds of feet); lateral and longitudinal distances are
//! nautical miles.

use chrono::Duration;

use crate::models::{FlightRecord, Region, RoutePoint, TrackClass};
use crate::nav::{self, LatLon};

/// Vertical separation minimum in feet for a pair.
///
/// Decided on the higher of the two cleared-or-requested levels. The
/// reduced 1000 ft minimum applies in the RVSM band only when both
/// aircraft are RVSM approved.
pub fn vertical_minimum_ft(a: &FlightRecord, b: &FlightRecord) -> u32 {
    let max_level = a.decision_level().max(b.decision_level());

    if max_level > 600 {
        return 5000;
    }
    if max_level > 450 {
        return 4000;
    }
    if (290..=410).contains(&max_level) && a.rvsm_approved && b.rvsm_approved {
        return 1000;
    }
    2000
}

/// Actual vertical separation in feet between the decision levels.
pub fn vertical_actual_ft(a: &FlightRecord, b: &FlightRecord) -> u32 {
    a.decision_level().abs_diff(b.decision_level()) * 100
}

/// Lateral separation minimum in nautical miles for a pair.
///
/// Falls back to the region default when neither aircraft carries an RNP
/// approval; the region comes from either record, Pacific when both are
/// silent.
pub fn lateral_minimum_nm(a: &FlightRecord, b: &FlightRecord) -> f64 {
    if a.rnp4 && b.rnp4 {
        return 23.0;
    }
    if a.rnp10 && b.rnp10 {
        return 50.0;
    }
    if (a.rnp4 && b.rnp10) || (a.rnp10 && b.rnp4) {
        return 50.0;
    }

    let a_rnp = a.rnp4 || a.rnp10;
    let b_rnp = b.rnp4 || b.rnp10;
    if a_rnp != b_rnp {
        return 75.0;
    }

    match a.region.or(b.region).unwrap_or(Region::Pacific) {
        Region::NorthAtlantic => 60.0,
        Region::Pacific => 100.0,
    }
}

/// Longitudinal time separation minimum for a pair.
///
/// Same-direction turbojet pairs qualify for the Mach number technique
/// minimum; reciprocal traffic keeps the tighter passing minimum until the
/// pair has crossed.
pub fn longitudinal_time_minimum(
    a: &FlightRecord,
    b: &FlightRecord,
    track: TrackClass,
) -> Duration {
    match track {
        TrackClass::Same if a.is_jet && b.is_jet => Duration::minutes(5),
        TrackClass::Same => Duration::minutes(15),
        TrackClass::Reciprocal => Duration::minutes(10),
        TrackClass::Crossing => Duration::minutes(15),
    }
}

/// Longitudinal distance separation minimum in nautical miles.
pub fn longitudinal_distance_minimum_nm(a: &FlightRecord, b: &FlightRecord) -> f64 {
    if a.rnp4 && b.rnp4 {
        return 30.0;
    }
    if a.has_datalink && b.has_datalink && a.rnp10 && b.rnp10 {
        return 50.0;
    }
    if a.has_dme && b.has_dme {
        return 20.0;
    }
    50.0
}

/// Angle between the coarse tracks of two routes, degrees in [0, 180].
///
/// Coarse track is the bearing from a route's first fix to its last. A
/// route with fewer than two points gets the crossing fallback of 90;
/// eligibility filtering keeps such records out of the probe, this just
/// keeps the function total.
pub fn track_angle_deg(route_a: &[RoutePoint], route_b: &[RoutePoint]) -> f64 {
    let (Some((a_first, a_last)), Some((b_first, b_last))) =
        (route_ends(route_a), route_ends(route_b))
    else {
        return 90.0;
    };

    let track_a = nav::bearing_deg(a_first, a_last);
    let track_b = nav::bearing_deg(b_first, b_last);

    let mut angle = (track_a - track_b).abs();
    if angle > 180.0 {
        angle = 360.0 - angle;
    }
    angle
}

/// Classify a track angle against the configured cutoffs.
///
/// Below `same_max_deg` is same-direction, above `reciprocal_min_deg` is
/// reciprocal, anything between (both bounds inclusive) is crossing.
pub fn classify_track(angle_deg: f64, same_max_deg: f64, reciprocal_min_deg: f64) -> TrackClass {
    let mut normalized = (angle_deg % 360.0).abs();
    if normalized > 180.0 {
        normalized = 360.0 - normalized;
    }

    if normalized < same_max_deg {
        TrackClass::Same
    } else if normalized > reciprocal_min_deg {
        TrackClass::Reciprocal
    } else {
        TrackClass::Crossing
    }
}

fn route_ends(route: &[RoutePoint]) -> Option<(LatLon, LatLon)> {
    if route.len() < 2 {
        return None;
    }
    match (route.first(), route.last()) {
        (Some(first), Some(last)) => Some((first.pos, last.pos)),
        _ => None,
    }
}
