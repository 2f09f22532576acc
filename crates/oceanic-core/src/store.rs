//! In-memory flight record store.
//!
//! Plain owned map, exclusively held by the engine task. The probe borrows
//! it read-only; there is no interior locking.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Duration, Utc};

use crate::models::{FlightRecord, FlightState, RoutePoint};
use crate::nav::{self, LatLon};

/// A record plus what ingestion derived from it.
#[derive(Debug, Clone)]
pub struct StoredRecord {
    pub record: FlightRecord,
    /// Canonical route: wire waypoints with missing times filled in where
    /// the filed ground speed allows.
    pub route: Vec<RoutePoint>,
    pub updated_at: DateTime<Utc>,
}

/// Flight records keyed by callsign.
#[derive(Debug, Default)]
pub struct RecordStore {
    records: HashMap<String, StoredRecord>,
}

impl RecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or wholesale-replace a record, re-deriving its route.
    pub fn upsert(&mut self, record: FlightRecord) {
        let route = derive_route(&record);
        self.records.insert(
            record.callsign.clone(),
            StoredRecord {
                record,
                route,
                updated_at: Utc::now(),
            },
        );
    }

    pub fn remove(&mut self, callsign: &str) {
        self.records.remove(callsign);
    }

    /// Sync against an authoritative snapshot: drop anything not in the
    /// batch, then upsert everything in it.
    pub fn bulk_replace(&mut self, records: Vec<FlightRecord>) {
        let keep: HashSet<String> = records.iter().map(|r| r.callsign.clone()).collect();
        self.records.retain(|callsign, _| keep.contains(callsign));
        for record in records {
            self.upsert(record);
        }
    }

    pub fn get(&self, callsign: &str) -> Option<&StoredRecord> {
        self.records.get(callsign)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Probe-eligible records: active state with at least a two-point
    /// route, sorted by callsign so scan order is stable across cycles.
    pub fn active_records(&self) -> Vec<&StoredRecord> {
        let mut active: Vec<&StoredRecord> = self
            .records
            .values()
            .filter(|s| s.record.state == FlightState::Active && s.route.len() >= 2)
            .collect();
        active.sort_by(|x, y| x.record.callsign.cmp(&y.record.callsign));
        active
    }
}

/// Build the canonical route for a record.
///
/// Copies the wire waypoints, deriving a missing time over fix from the
/// previous timed point plus leg distance at the filed ground speed. The
/// first fix falls back to the departure time. Legs that stay untimed
/// contribute no predictable window later, they are kept for geometry only.
fn derive_route(record: &FlightRecord) -> Vec<RoutePoint> {
    let speed_kt = record.ground_speed.filter(|gs| *gs > 0.0);
    let mut route: Vec<RoutePoint> = Vec::with_capacity(record.route_waypoints.len());

    for wp in &record.route_waypoints {
        let pos = LatLon::new(wp.lat, wp.lon);
        let mut eto = wp.eto;

        if eto.is_none() {
            if let Some(prev) = route.last() {
                if let (Some(prev_eto), Some(speed)) = (prev.eto, speed_kt) {
                    let hours = nav::distance_nm(prev.pos, pos) / speed;
                    eto = Some(prev_eto + Duration::milliseconds((hours * 3_600_000.0) as i64));
                }
            } else {
                eto = record.atd;
            }
        }

        route.push(RoutePoint {
            name: wp.name.clone(),
            pos,
            eto,
        });
    }

    route
}
