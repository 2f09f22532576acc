//! Core data models for the oceanic conflict probe.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::nav::LatLon;

/// Lifecycle state of a flight data record.
///
/// Only `Active` records take part in conflict probing. The `STATE_`-prefixed
/// aliases cover feeds that forward the upstream enum strings unmodified.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum FlightState {
    /// Plan filed, not yet under control
    #[serde(alias = "STATE_PREACTIVE")]
    Preactive,
    /// Under control and flying its route
    #[serde(alias = "STATE_ACTIVE")]
    Active,
    /// Dropped from control
    #[serde(alias = "STATE_INACTIVE")]
    Inactive,
    /// Route completed
    #[serde(alias = "STATE_FINISHED")]
    Finished,
}

/// Oceanic control area, used for the lateral fallback minimum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Region {
    Pacific,
    NorthAtlantic,
}

/// A named route fix as delivered by the feed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Waypoint {
    #[serde(default)]
    pub name: String,
    pub lat: f64,
    pub lon: f64,
    /// Estimated time over the fix
    #[serde(default, alias = "eta")]
    pub eto: Option<DateTime<Utc>>,
}

/// One aircraft's flight data record as fed by the upstream system.
///
/// Field names follow the feed's camelCase wire form; the PascalCase aliases
/// accept records forwarded straight from the flight data processor without
/// renaming. Absent equipage flags mean the capability is not confirmed, so
/// the larger separation minima apply.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FlightRecord {
    #[serde(alias = "Callsign")]
    pub callsign: String,
    #[serde(alias = "State")]
    pub state: FlightState,
    /// Cleared flight level, hundreds of feet
    #[serde(default, alias = "CFL")]
    pub cfl: Option<u32>,
    /// Requested (filed) flight level, hundreds of feet
    #[serde(default, alias = "RFL")]
    pub rfl: Option<u32>,
    /// Route fixes in flight order; probing needs at least two
    #[serde(default, alias = "RouteWaypoints")]
    pub route_waypoints: Vec<Waypoint>,
    /// Actual time of departure
    #[serde(default, alias = "ATD")]
    pub atd: Option<DateTime<Utc>>,
    /// Filed ground speed in knots
    #[serde(default, alias = "GroundSpeed")]
    pub ground_speed: Option<f64>,
    #[serde(default, alias = "Mach")]
    pub mach: Option<f64>,
    #[serde(default, alias = "DepAirport")]
    pub dep_airport: Option<String>,
    #[serde(default, alias = "DesAirport")]
    pub des_airport: Option<String>,
    #[serde(default, alias = "AircraftType")]
    pub aircraft_type: Option<String>,
    #[serde(default)]
    pub rvsm_approved: bool,
    #[serde(default)]
    pub rnp4: bool,
    #[serde(default)]
    pub rnp10: bool,
    #[serde(default)]
    pub has_datalink: bool,
    #[serde(default)]
    pub has_dme: bool,
    #[serde(default)]
    pub is_jet: bool,
    #[serde(default)]
    pub region: Option<Region>,
}

impl FlightRecord {
    /// Flight level used for separation decisions: cleared level if set,
    /// otherwise the filed level, otherwise zero.
    pub fn decision_level(&self) -> u32 {
        self.cfl.or(self.rfl).unwrap_or(0)
    }
}

/// A route fix after ingestion: position as a [`LatLon`], with missing times
/// filled in from ground speed where possible.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoutePoint {
    pub name: String,
    pub pos: LatLon,
    pub eto: Option<DateTime<Utc>>,
}

/// Relative track geometry of a conflict pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TrackClass {
    Same,
    Crossing,
    Reciprocal,
}

/// How close the predicted loss of separation is.
///
/// Ordered by urgency: `Actual` sorts before `Imminent` sorts before
/// `Advisory`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    /// Loss of separation inside the actual threshold (default one minute)
    Actual,
    /// Within the imminent threshold (default 30 minutes)
    Imminent,
    /// Within the advisory threshold (default two hours)
    Advisory,
}

/// A predicted loss of separation between two flights.
///
/// Derived output, rebuilt from scratch on every probe cycle. Callsign order
/// follows the scan order of the cycle, not operational significance.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictRecord {
    pub intruder_callsign: String,
    pub active_callsign: String,
    pub severity: Severity,
    pub conflict_type: TrackClass,
    /// Predicted start of the loss of separation
    pub earliest_los: DateTime<Utc>,
    /// Predicted end of the loss of separation
    pub latest_los: DateTime<Utc>,
    /// Lateral separation minimum applied, nautical miles
    pub lat_sep_nm: f64,
    /// Vertical separation minimum applied, feet
    pub vertical_sep_ft: u32,
    /// Actual vertical separation, feet
    pub vertical_act_ft: u32,
    /// Angle between the two coarse tracks, degrees in [0, 180]
    pub trk_angle_deg: f64,
    /// Duration of the conflict window, seconds
    pub long_time_act_s: i64,
    /// Along-track length of the conflict window, nautical miles
    pub long_dist_act_nm: f64,
}
