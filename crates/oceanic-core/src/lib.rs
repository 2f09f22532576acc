pub mod models;
pub mod nav;
pub mod probe;
pub mod report;
pub mod separation;
pub mod store;

pub use models::{
    ConflictRecord, FlightRecord, FlightState, Region, RoutePoint, Severity, TrackClass, Waypoint,
};
pub use nav::LatLon;
pub use probe::{check_pair, probe_all, ConfigUpdate, ProbeConfig};
pub use report::{ProbeReport, ReportSummary};
pub use store::{RecordStore, StoredRecord};
