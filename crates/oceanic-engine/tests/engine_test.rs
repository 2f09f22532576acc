//! Engine integration tests.
//!
//! Drives the engine task through its command handle and observes the
//! broadcast reports. Scheduler tests pause tokio's clock, so intervals
//! resolve through auto-advance instead of wall time.

use std::time::Duration as StdDuration;

use chrono::{DateTime, Duration, Utc};
use tokio::time::timeout;

use oceanic_core::{
    ConfigUpdate, FlightRecord, FlightState, ProbeConfig, Severity, TrackClass, Waypoint,
};
use oceanic_engine::{Engine, EngineError};

fn waypoint(lat: f64, lon: f64, eto: Option<DateTime<Utc>>) -> Waypoint {
    Waypoint {
        name: String::new(),
        lat,
        lon,
        eto,
    }
}

fn flight(callsign: &str, waypoints: Vec<Waypoint>) -> FlightRecord {
    FlightRecord {
        callsign: callsign.to_string(),
        state: FlightState::Active,
        cfl: Some(350),
        rfl: None,
        route_waypoints: waypoints,
        atd: None,
        ground_speed: None,
        mach: None,
        dep_airport: None,
        des_airport: None,
        aircraft_type: None,
        rvsm_approved: true,
        rnp4: false,
        rnp10: false,
        has_datalink: false,
        has_dme: false,
        is_jet: false,
        region: None,
    }
}

/// Head-on pair sharing the equatorial track right now; every probe sees
/// an actual reciprocal conflict.
fn reciprocal_pair() -> (FlightRecord, FlightRecord) {
    let now = Utc::now();
    let west_entry = waypoint(0.0, 0.0, Some(now));
    let east_entry = waypoint(0.0, 10.0, Some(now));
    let west_exit = waypoint(0.0, 0.0, Some(now + Duration::hours(2)));
    let east_exit = waypoint(0.0, 10.0, Some(now + Duration::hours(2)));

    let a = flight("NWA21", vec![west_entry, east_exit]);
    let b = flight("PAA5", vec![east_entry, west_exit]);
    (a, b)
}

/// RNP10 crossing pair whose loss of separation starts close to
/// `minutes_out` from now.
fn crossing_pair(minutes_out: i64) -> (FlightRecord, FlightRecord) {
    let now = Utc::now();
    let mut a = flight(
        "AAL1",
        vec![
            waypoint(0.0, 0.0, Some(now)),
            waypoint(0.0, 10.0, Some(now + Duration::hours(2))),
        ],
    );
    a.rnp10 = true;

    // The crossing leg reaches the capsule ~9 minutes after it starts.
    let leg_start = now + Duration::minutes(minutes_out - 9);
    let mut b = flight(
        "BAW2",
        vec![
            waypoint(2.0, 5.0, Some(leg_start)),
            waypoint(-2.0, 5.0, Some(leg_start + Duration::minutes(30))),
        ],
    );
    b.rnp10 = true;
    (a, b)
}

#[tokio::test]
async fn on_demand_probe_reports_conflict() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    let (a, b) = reciprocal_pair();
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("report should arrive")
        .unwrap();

    assert_eq!(report.counts(), (1, 0, 0));
    let conflict = &report.all[0];
    assert_eq!(conflict.severity, Severity::Actual);
    assert_eq!(conflict.conflict_type, TrackClass::Reciprocal);
    assert_eq!(conflict.intruder_callsign, "NWA21");
    assert_eq!(conflict.active_callsign, "PAA5");
}

#[tokio::test]
async fn remove_clears_pair_from_next_probe() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    let (a, b) = reciprocal_pair();
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.request_probe().await.unwrap();
    handle.remove("PAA5").await.unwrap();
    handle.request_probe().await.unwrap();

    let before = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("first report")
        .unwrap();
    assert_eq!(before.counts().0, 1);

    let after = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("second report")
        .unwrap();
    assert!(after.is_empty());
}

#[tokio::test]
async fn bulk_replace_is_authoritative() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    let (a, b) = reciprocal_pair();
    handle.bulk_replace(vec![a.clone(), b]).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("seeded report")
        .unwrap();
    assert_eq!(report.counts().0, 1);

    // The batch is the whole picture: records absent from it go away.
    handle.bulk_replace(vec![a]).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("post-sync report")
        .unwrap();
    assert!(report.is_empty());

    // An empty batch clears the store outright.
    handle.bulk_replace(Vec::new()).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("post-clear report")
        .unwrap();
    assert!(report.is_empty());
}

#[tokio::test(start_paused = true)]
async fn scheduler_emits_reports_periodically() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    let (a, b) = reciprocal_pair();
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.start().await.unwrap();

    let first = timeout(StdDuration::from_secs(30), reports.recv())
        .await
        .expect("scheduler should emit within the interval")
        .unwrap();
    assert_eq!(first.counts().0, 1);

    let second = timeout(StdDuration::from_secs(30), reports.recv())
        .await
        .expect("scheduler should keep emitting")
        .unwrap();
    assert!(second.generated_at >= first.generated_at);

    handle.stop().await.unwrap();
    while reports.try_recv().is_ok() {}

    let quiet = timeout(StdDuration::from_secs(60), reports.recv()).await;
    assert!(quiet.is_err(), "no reports should follow a stop");
}

#[tokio::test(start_paused = true)]
async fn start_twice_keeps_single_cadence() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    let (a, b) = reciprocal_pair();
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.start().await.unwrap();

    timeout(StdDuration::from_secs(30), reports.recv())
        .await
        .expect("first tick")
        .unwrap();

    let early = timeout(StdDuration::from_secs(2), reports.recv()).await;
    assert!(early.is_err());

    // A start while running must not reset the phase; the next tick stays
    // on the cadence already running.
    handle.start().await.unwrap();
    let on_schedule = timeout(StdDuration::from_secs(4), reports.recv()).await;
    assert!(on_schedule.is_ok(), "second start reset the cadence");
}

#[tokio::test]
async fn stop_before_start_is_harmless() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    handle.stop().await.unwrap();
    handle.stop().await.unwrap();

    let (a, b) = reciprocal_pair();
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("on-demand probe still works")
        .unwrap();
    assert_eq!(report.counts().0, 1);
}

#[tokio::test]
async fn set_config_tightens_advisory_window() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    // Loss of separation ~88 minutes out: advisory under the default two
    // hour ceiling, unreportable once the ceiling drops to one hour.
    let (a, b) = crossing_pair(88);
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("advisory report")
        .unwrap();
    assert_eq!(report.counts(), (0, 0, 1));

    let update = ConfigUpdate {
        advisory_threshold_hours: Some(1),
        ..ConfigUpdate::default()
    };
    handle.set_config(update).await.unwrap();
    handle.request_probe().await.unwrap();

    let report = timeout(StdDuration::from_secs(5), reports.recv())
        .await
        .expect("post-update report")
        .unwrap();
    assert!(report.is_empty());
}

#[tokio::test(start_paused = true)]
async fn set_config_rearms_running_scheduler() {
    let handle = Engine::spawn(ProbeConfig::default());
    let mut reports = handle.subscribe();

    let (a, b) = reciprocal_pair();
    handle.upsert(a).await.unwrap();
    handle.upsert(b).await.unwrap();
    handle.start().await.unwrap();

    timeout(StdDuration::from_secs(30), reports.recv())
        .await
        .expect("tick at the default period")
        .unwrap();

    let update = ConfigUpdate {
        check_interval_ms: Some(60_000),
        ..ConfigUpdate::default()
    };
    handle.set_config(update).await.unwrap();

    // The old cadence would fire five seconds out; the new one takes a
    // minute from the update.
    let early = timeout(StdDuration::from_secs(30), reports.recv()).await;
    assert!(early.is_err());

    timeout(StdDuration::from_secs(90), reports.recv())
        .await
        .expect("tick at the new period")
        .unwrap();
}

#[tokio::test]
async fn shutdown_closes_the_handle() {
    let handle = Engine::spawn(ProbeConfig::default());
    handle.shutdown().await.unwrap();

    // Let the engine task drain the command and exit.
    for _ in 0..10 {
        tokio::task::yield_now().await;
    }

    let err = handle.request_probe().await;
    assert!(matches!(err, Err(EngineError::Closed)));
}
