//! Oceanic conflict probe engine - standalone demo feed.
//!
//! Seeds the engine with a small central-Pacific traffic picture, runs one
//! probe on demand, then lets the scheduler take over:
//!
//! 1. NCA8 / UAL179: head-on at FL350 on the same track (actual conflict)
//! 2. ANZ26 / QFA15: RNP10 crossing pair at FL330 (imminent conflict)
//! 3. JAL61: clean traffic well to the north
//!
//! Usage:
//!   cargo run -p oceanic-engine -- --cycles 3

use anyhow::Result;
use chrono::{DateTime, Duration, Utc};
use clap::Parser;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use oceanic_core::{FlightRecord, FlightState, Region, Waypoint};
use oceanic_engine::{config, Engine};

/// Oceanic conflict probe demo feed
#[derive(Parser, Debug)]
#[command(author, version, about = "Run the conflict probe over a seeded oceanic traffic picture")]
struct Args {
    /// Probe scheduler period in milliseconds (overrides OCEANIC_CHECK_INTERVAL_MS)
    #[arg(long)]
    interval_ms: Option<u64>,

    /// Stop after this many probe reports (0 runs until Ctrl-C)
    #[arg(long, default_value_t = 0)]
    cycles: u32,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive("oceanic_engine=debug".parse()?)
            .add_directive("oceanic_core=debug".parse()?))
        .init();

    let args = Args::parse();

    let mut probe_config = config::from_env();
    if let Some(interval_ms) = args.interval_ms {
        probe_config.check_interval_ms = interval_ms;
    }

    tracing::info!(
        interval_ms = probe_config.check_interval_ms,
        "starting oceanic conflict probe engine"
    );

    let handle = Engine::spawn(probe_config);
    let mut reports = handle.subscribe();

    handle.bulk_replace(demo_traffic(Utc::now())).await?;
    handle.request_probe().await?;
    handle.start().await?;

    let mut seen = 0u32;
    loop {
        tokio::select! {
            report = reports.recv() => match report {
                Ok(report) => {
                    seen += 1;
                    let (actual, imminent, advisory) = report.counts();
                    tracing::info!(cycle = seen, actual, imminent, advisory, "probe report");
                    tracing::debug!(payload = %serde_json::to_string(&report)?, "report json");
                    for conflict in &report.all {
                        tracing::info!(
                            severity = ?conflict.severity,
                            kind = ?conflict.conflict_type,
                            intruder = %conflict.intruder_callsign,
                            active = %conflict.active_callsign,
                            earliest_los = %conflict.earliest_los,
                            "conflict"
                        );
                    }
                    if args.cycles > 0 && seen >= args.cycles {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "report subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutting down");
                break;
            }
        }
    }

    handle.shutdown().await?;
    Ok(())
}

/// Five flights northeast of Hawaii. Times are relative to `now` so the
/// picture conflicts the same way whenever the demo runs.
fn demo_traffic(now: DateTime<Utc>) -> Vec<FlightRecord> {
    // Head-on pair sharing a track at FL350, overlapping from the start.
    let nca8 = flight(
        "NCA8",
        (30.0, -150.0),
        (30.0, -140.0),
        now,
        now + Duration::hours(2),
        350,
    );
    let ual179 = flight(
        "UAL179",
        (30.0, -140.0),
        (30.0, -150.0),
        now,
        now + Duration::hours(2),
        350,
    );

    // RNP10 crossing pair at FL330; the southbound flight enters the
    // eastbound flight's protected airspace roughly 20 minutes out.
    let mut anz26 = flight(
        "ANZ26",
        (32.0, -145.0),
        (24.0, -145.0),
        now - Duration::minutes(5),
        now + Duration::minutes(55),
        330,
    );
    anz26.rnp10 = true;
    let mut qfa15 = flight(
        "QFA15",
        (28.0, -152.0),
        (28.0, -138.0),
        now - Duration::minutes(20),
        now + Duration::minutes(80),
        330,
    );
    qfa15.rnp10 = true;

    // Clean traffic well clear of everyone.
    let jal61 = flight(
        "JAL61",
        (40.0, -155.0),
        (44.0, -150.0),
        now,
        now + Duration::hours(1),
        390,
    );

    vec![nca8, ual179, anz26, qfa15, jal61]
}

fn flight(
    callsign: &str,
    from: (f64, f64),
    to: (f64, f64),
    dep: DateTime<Utc>,
    arr: DateTime<Utc>,
    level: u32,
) -> FlightRecord {
    FlightRecord {
        callsign: callsign.to_string(),
        state: FlightState::Active,
        cfl: Some(level),
        rfl: Some(level),
        route_waypoints: vec![
            Waypoint {
                name: "ENTRY".to_string(),
                lat: from.0,
                lon: from.1,
                eto: Some(dep),
            },
            Waypoint {
                name: "EXIT".to_string(),
                lat: to.0,
                lon: to.1,
                eto: Some(arr),
            },
        ],
        atd: Some(dep),
        ground_speed: None,
        mach: Some(0.82),
        dep_airport: None,
        des_airport: None,
        aircraft_type: Some("B789".to_string()),
        rvsm_approved: true,
        rnp4: false,
        rnp10: false,
        has_datalink: false,
        has_dme: false,
        is_jet: true,
        region: Some(Region::Pacific),
    }
}
