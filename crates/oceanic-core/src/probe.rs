//! The pairwise conflict probe.
//!
//! Every probe cycle runs a staged filter pipeline over each unordered pair
//! of eligible flight records: temporal overlap, vertical separation, padded
//! bounding boxes, then the expensive lateral geometry. Pairs surviving all
//! stages become [`ConflictRecord`]s. The probe is pure with respect to the
//! store; results depend only on its contents, the configuration, and `now`.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::models::{ConflictRecord, RoutePoint, Severity, TrackClass};
use crate::nav::{self, LatLon};
use crate::separation;
use crate::store::{RecordStore, StoredRecord};

/// Bounding-box pad in degrees (roughly 30 nm) applied before the detailed
/// lateral stage.
const BBOX_PAD_DEG: f64 = 0.5;

/// Cap sampling step for the protected-airspace polygon, degrees.
const CAP_STEP_DEG: f64 = 15.0;

/// Two boundary points closer than this count as one, nautical miles.
const DUP_POINT_NM: f64 = 0.01;

/// Operative-interval fallback when a route has no final time over fix.
const OPEN_ENDED_HOURS: i64 = 24;

/// Probe tunables.
///
/// Defaults match the operational configuration; partial updates merge over
/// the current values via [`ConfigUpdate`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ProbeConfig {
    /// Scheduler period for the periodic probe
    pub check_interval_ms: u64,
    /// Advisory ceiling: a loss of separation further out is not reported
    pub advisory_threshold_hours: i64,
    /// Imminent ceiling, minutes
    pub imminent_threshold_minutes: i64,
    /// Actual ceiling, minutes, strictly less than
    pub actual_threshold_minutes: i64,
    /// Same-direction upper bound, exclusive, degrees
    pub same_track_max_angle_deg: f64,
    /// Reciprocal lower bound, exclusive, degrees
    pub reciprocal_min_angle_deg: f64,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            check_interval_ms: 5000,
            advisory_threshold_hours: 2,
            imminent_threshold_minutes: 30,
            actual_threshold_minutes: 1,
            same_track_max_angle_deg: 45.0,
            reciprocal_min_angle_deg: 135.0,
        }
    }
}

/// Partial configuration update, one optional field per tunable.
///
/// Unknown wire fields are ignored rather than rejected.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigUpdate {
    pub check_interval_ms: Option<u64>,
    pub advisory_threshold_hours: Option<i64>,
    pub imminent_threshold_minutes: Option<i64>,
    pub actual_threshold_minutes: Option<i64>,
    pub same_track_max_angle_deg: Option<f64>,
    pub reciprocal_min_angle_deg: Option<f64>,
}

impl ProbeConfig {
    /// Merge a partial update; `None` fields keep their current values.
    pub fn apply(&mut self, update: &ConfigUpdate) {
        if let Some(v) = update.check_interval_ms {
            self.check_interval_ms = v;
        }
        if let Some(v) = update.advisory_threshold_hours {
            self.advisory_threshold_hours = v;
        }
        if let Some(v) = update.imminent_threshold_minutes {
            self.imminent_threshold_minutes = v;
        }
        if let Some(v) = update.actual_threshold_minutes {
            self.actual_threshold_minutes = v;
        }
        if let Some(v) = update.same_track_max_angle_deg {
            self.same_track_max_angle_deg = v;
        }
        if let Some(v) = update.reciprocal_min_angle_deg {
            self.reciprocal_min_angle_deg = v;
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct BoundingBox {
    min_lat: f64,
    max_lat: f64,
    min_lon: f64,
    max_lon: f64,
}

impl BoundingBox {
    /// Padded box over a route. `None` for an empty route.
    fn padded(route: &[RoutePoint]) -> Option<Self> {
        let first = route.first()?;
        let mut bb = BoundingBox {
            min_lat: first.pos.lat,
            max_lat: first.pos.lat,
            min_lon: first.pos.lon,
            max_lon: first.pos.lon,
        };
        for point in &route[1..] {
            bb.min_lat = bb.min_lat.min(point.pos.lat);
            bb.max_lat = bb.max_lat.max(point.pos.lat);
            bb.min_lon = bb.min_lon.min(point.pos.lon);
            bb.max_lon = bb.max_lon.max(point.pos.lon);
        }
        bb.min_lat -= BBOX_PAD_DEG;
        bb.max_lat += BBOX_PAD_DEG;
        bb.min_lon -= BBOX_PAD_DEG;
        bb.max_lon += BBOX_PAD_DEG;
        Some(bb)
    }

    fn overlaps(&self, other: &BoundingBox) -> bool {
        !(self.max_lon < other.min_lon
            || self.min_lon > other.max_lon
            || self.max_lat < other.min_lat
            || self.min_lat > other.max_lat)
    }
}

/// One timed window where a leg of the second route runs inside the
/// protected airspace of a leg of the first.
#[derive(Debug, Clone, Copy)]
struct ConflictSegment {
    start: LatLon,
    end: LatLon,
    start_time: DateTime<Utc>,
    end_time: DateTime<Utc>,
    /// Time window of the capsule-owning leg, when that leg is timed
    zone_window: Option<(DateTime<Utc>, DateTime<Utc>)>,
}

/// Capsule-shaped protected airspace around one route leg.
///
/// Semicircular caps of `radius_nm` around each endpoint, sampled every
/// 15 degrees, joined into a closed ring of 27 vertices.
fn protected_airspace(p1: LatLon, p2: LatLon, radius_nm: f64) -> Vec<LatLon> {
    let track = nav::bearing_deg(p1, p2);
    let steps = (180.0 / CAP_STEP_DEG) as i32;
    let mut polygon = Vec::with_capacity(2 * (steps as usize + 1) + 1);

    for step in 0..=steps {
        let heading = track - 90.0 - f64::from(step) * CAP_STEP_DEG;
        polygon.push(nav::destination_point(p1, radius_nm, heading));
    }
    for step in 0..=steps {
        let heading = track + 90.0 - f64::from(step) * CAP_STEP_DEG;
        polygon.push(nav::destination_point(p2, radius_nm, heading));
    }

    let first = polygon[0];
    polygon.push(first);
    polygon
}

/// Boundary points where a leg enters or leaves the polygon.
///
/// Edge crossings come first; a leg endpoint sitting inside the polygon also
/// bounds the transit window, which covers legs that start, end, or run
/// entirely within protected airspace. Points within 0.01 nm of an earlier
/// one are dropped as duplicates.
fn leg_boundary_points(
    polygon: &[LatLon],
    leg_start: LatLon,
    leg_end: LatLon,
    t1: DateTime<Utc>,
    t2: DateTime<Utc>,
) -> Vec<(DateTime<Utc>, LatLon)> {
    let mut points: Vec<(DateTime<Utc>, LatLon)> = Vec::new();

    for edge in polygon.windows(2) {
        if let Some(hit) = nav::segment_intersection(edge[0], edge[1], leg_start, leg_end) {
            let time = interpolate_time(leg_start, leg_end, t1, t2, hit);
            push_unique(&mut points, time, hit);
        }
    }

    if nav::polygon_contains(polygon, leg_start) {
        push_unique(&mut points, t1, leg_start);
    }
    if nav::polygon_contains(polygon, leg_end) {
        push_unique(&mut points, t2, leg_end);
    }

    points
}

fn push_unique(points: &mut Vec<(DateTime<Utc>, LatLon)>, time: DateTime<Utc>, pos: LatLon) {
    if points
        .iter()
        .all(|(_, seen)| nav::distance_nm(*seen, pos) >= DUP_POINT_NM)
    {
        points.push((time, pos));
    }
}

/// Time at `point` along a leg, linear in along-leg distance between the
/// endpoint times.
fn interpolate_time(
    from: LatLon,
    to: LatLon,
    t1: DateTime<Utc>,
    t2: DateTime<Utc>,
    point: LatLon,
) -> DateTime<Utc> {
    let total_nm = nav::distance_nm(from, to);
    let ratio = if total_nm > 0.0 {
        nav::distance_nm(from, point) / total_nm
    } else {
        0.0
    };
    let span_ms = (t2 - t1).num_milliseconds() as f64;
    t1 + Duration::milliseconds((ratio * span_ms) as i64)
}

/// All timed windows where a leg of `route_b` runs inside the protected
/// airspace of a leg of `route_a` at the pair's lateral minimum. Untimed
/// legs of `route_b` have no predictable window and are skipped.
fn conflict_segments(
    route_a: &[RoutePoint],
    route_b: &[RoutePoint],
    lateral_nm: f64,
) -> Vec<ConflictSegment> {
    let mut segments = Vec::new();

    for leg_a in route_a.windows(2) {
        let polygon = protected_airspace(leg_a[0].pos, leg_a[1].pos, lateral_nm);
        let zone_window = match (leg_a[0].eto, leg_a[1].eto) {
            (Some(z1), Some(z2)) => Some((z1.min(z2), z1.max(z2))),
            _ => None,
        };

        for leg_b in route_b.windows(2) {
            let (Some(t1), Some(t2)) = (leg_b[0].eto, leg_b[1].eto) else {
                continue;
            };

            let mut points = leg_boundary_points(&polygon, leg_b[0].pos, leg_b[1].pos, t1, t2);
            if points.len() < 2 {
                continue;
            }
            points.sort_by_key(|(time, _)| *time);

            let (start_time, start) = points[0];
            let (end_time, end) = points[points.len() - 1];
            segments.push(ConflictSegment {
                start,
                end,
                start_time,
                end_time,
                zone_window,
            });
        }
    }

    segments
}

/// Interval a record is operationally relevant: departure (or the epoch
/// when unknown) through the final time over fix (or a day out when the
/// route end is untimed).
fn operative_interval(stored: &StoredRecord, now: DateTime<Utc>) -> (DateTime<Utc>, DateTime<Utc>) {
    let start = stored.record.atd.unwrap_or(DateTime::UNIX_EPOCH);
    let end = stored
        .route
        .last()
        .and_then(|p| p.eto)
        .unwrap_or_else(|| now + Duration::hours(OPEN_ENDED_HOURS));
    (start, end)
}

fn intervals_overlap(a: (DateTime<Utc>, DateTime<Utc>), b: (DateTime<Utc>, DateTime<Utc>)) -> bool {
    !(a.0 > b.1 || b.0 > a.1)
}

/// Severity from how far the predicted start of the loss of separation sits
/// from now, in either direction. Beyond the advisory ceiling the conflict
/// is not reportable.
fn classify_severity(
    earliest_los: DateTime<Utc>,
    now: DateTime<Utc>,
    config: &ProbeConfig,
) -> Option<Severity> {
    let until = (earliest_los - now).abs();
    if until < Duration::minutes(config.actual_threshold_minutes) {
        Some(Severity::Actual)
    } else if until <= Duration::minutes(config.imminent_threshold_minutes) {
        Some(Severity::Imminent)
    } else if until <= Duration::hours(config.advisory_threshold_hours) {
        Some(Severity::Advisory)
    } else {
        None
    }
}

/// Run the full filter pipeline for one pair.
///
/// Protected-airspace capsules are built from `a`'s legs and walked by
/// `b`'s, and the callsigns land in the output in that order. Returns
/// `None` as soon as any stage clears the pair.
pub fn check_pair(
    a: &StoredRecord,
    b: &StoredRecord,
    config: &ProbeConfig,
    now: DateTime<Utc>,
) -> Option<ConflictRecord> {
    if !intervals_overlap(operative_interval(a, now), operative_interval(b, now)) {
        return None;
    }

    let vertical_sep_ft = separation::vertical_minimum_ft(&a.record, &b.record);
    let vertical_act_ft = separation::vertical_actual_ft(&a.record, &b.record);
    if vertical_act_ft >= vertical_sep_ft {
        return None;
    }

    let bb_a = BoundingBox::padded(&a.route)?;
    let bb_b = BoundingBox::padded(&b.route)?;
    if !bb_a.overlaps(&bb_b) {
        return None;
    }

    let lat_sep_nm = separation::lateral_minimum_nm(&a.record, &b.record);
    let mut segments = conflict_segments(&a.route, &b.route, lat_sep_nm);
    if segments.is_empty() {
        return None;
    }
    segments.sort_by_key(|s| s.start_time);
    let first = segments[0];

    let trk_angle_deg = separation::track_angle_deg(&a.route, &b.route);
    let track = separation::classify_track(
        trk_angle_deg,
        config.same_track_max_angle_deg,
        config.reciprocal_min_angle_deg,
    );

    let time_minimum = separation::longitudinal_time_minimum(&a.record, &b.record, track);
    let time_actual = first.end_time - first.start_time;
    let distance_minimum = separation::longitudinal_distance_minimum_nm(&a.record, &b.record);
    let distance_actual = nav::distance_nm(first.start, first.end);

    // Reciprocal traffic sharing the zone during the capsule leg's own
    // window passes head-on inside it; the transit-length criteria cannot
    // see that, so the overlap itself counts as a loss of separation.
    let passing = track == TrackClass::Reciprocal
        && first
            .zone_window
            .map_or(false, |(z1, z2)| first.start_time <= z2 && z1 <= first.end_time);

    let loss_of_separation =
        time_actual < time_minimum || distance_actual < distance_minimum || passing;
    if !loss_of_separation {
        return None;
    }

    let severity = classify_severity(first.start_time, now, config)?;

    Some(ConflictRecord {
        intruder_callsign: a.record.callsign.clone(),
        active_callsign: b.record.callsign.clone(),
        severity,
        conflict_type: track,
        earliest_los: first.start_time,
        latest_los: first.end_time,
        lat_sep_nm,
        vertical_sep_ft,
        vertical_act_ft,
        trk_angle_deg,
        long_time_act_s: time_actual.num_seconds(),
        long_dist_act_nm: distance_actual,
    })
}

/// Probe every unordered pair of eligible records once.
pub fn probe_all(store: &RecordStore, config: &ProbeConfig, now: DateTime<Utc>) -> Vec<ConflictRecord> {
    let active = store.active_records();
    let mut conflicts = Vec::new();

    for i in 0..active.len() {
        for j in (i + 1)..active.len() {
            if let Some(conflict) = check_pair(active[i], active[j], config, now) {
                conflicts.push(conflict);
            }
        }
    }

    conflicts
}
