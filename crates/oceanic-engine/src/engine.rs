//! The probe engine task.
//!
//! One task owns the record store and configuration outright. Commands
//! arrive on an mpsc channel, probe cycles run inline on the same task
//! (either on the scheduler tick or on demand), and each cycle's report
//! goes out on a broadcast channel. Slow subscribers lag and skip cycles
//! rather than stalling the engine.

use std::time::Duration;

use chrono::Utc;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc};
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};

use oceanic_core::{probe, ConfigUpdate, FlightRecord, ProbeConfig, ProbeReport, RecordStore};

/// Capacity of the inbound command queue.
const COMMAND_QUEUE: usize = 256;

/// Probe reports a subscriber can fall behind before dropping cycles.
const REPORT_QUEUE: usize = 16;

/// Commands accepted by the engine task.
#[derive(Debug)]
pub enum EngineCommand {
    /// Insert or replace one flight record
    Upsert(FlightRecord),
    /// Drop the record with this callsign
    Remove(String),
    /// Replace the whole store with an authoritative batch
    BulkReplace(Vec<FlightRecord>),
    /// Run a probe cycle now
    RequestProbe,
    /// Merge a partial configuration update
    SetConfig(ConfigUpdate),
    /// Arm the periodic scheduler
    Start,
    /// Disarm the periodic scheduler
    Stop,
    /// Drain and terminate the engine task
    Shutdown,
}

#[derive(Debug, Error)]
pub enum EngineError {
    /// The engine task has terminated and commands have nowhere to go.
    #[error("engine is no longer running")]
    Closed,
}

/// Cloneable sending side of the engine.
#[derive(Debug, Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineCommand>,
    reports: broadcast::Sender<ProbeReport>,
}

impl EngineHandle {
    pub async fn upsert(&self, record: FlightRecord) -> Result<(), EngineError> {
        self.send(EngineCommand::Upsert(record)).await
    }

    pub async fn remove(&self, callsign: &str) -> Result<(), EngineError> {
        self.send(EngineCommand::Remove(callsign.to_string())).await
    }

    pub async fn bulk_replace(&self, records: Vec<FlightRecord>) -> Result<(), EngineError> {
        self.send(EngineCommand::BulkReplace(records)).await
    }

    pub async fn request_probe(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::RequestProbe).await
    }

    pub async fn set_config(&self, update: ConfigUpdate) -> Result<(), EngineError> {
        self.send(EngineCommand::SetConfig(update)).await
    }

    pub async fn start(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Start).await
    }

    pub async fn stop(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Stop).await
    }

    pub async fn shutdown(&self) -> Result<(), EngineError> {
        self.send(EngineCommand::Shutdown).await
    }

    /// New subscription to per-cycle probe reports.
    pub fn subscribe(&self) -> broadcast::Receiver<ProbeReport> {
        self.reports.subscribe()
    }

    async fn send(&self, cmd: EngineCommand) -> Result<(), EngineError> {
        self.tx.send(cmd).await.map_err(|_| EngineError::Closed)
    }
}

/// The engine task state. Single owner, no locks.
pub struct Engine {
    rx: mpsc::Receiver<EngineCommand>,
    reports: broadcast::Sender<ProbeReport>,
    store: RecordStore,
    config: ProbeConfig,
    ticker: Option<Interval>,
}

impl Engine {
    /// Spawn the engine task with the scheduler disarmed. Probing begins
    /// once a `Start` command arrives or a probe is requested.
    pub fn spawn(config: ProbeConfig) -> EngineHandle {
        let (tx, rx) = mpsc::channel(COMMAND_QUEUE);
        let (reports, _) = broadcast::channel(REPORT_QUEUE);

        let engine = Engine {
            rx,
            reports: reports.clone(),
            store: RecordStore::new(),
            config,
            ticker: None,
        };
        tokio::spawn(engine.run());

        EngineHandle { tx, reports }
    }

    async fn run(mut self) {
        tracing::info!(
            interval_ms = self.config.check_interval_ms,
            "conflict probe engine ready"
        );

        loop {
            tokio::select! {
                cmd = self.rx.recv() => {
                    let Some(cmd) = cmd else { break };
                    if !self.handle_command(cmd) {
                        break;
                    }
                }
                _ = tick(&mut self.ticker) => {
                    self.run_probe();
                }
            }
        }

        tracing::info!("conflict probe engine stopped");
    }

    /// Apply one command. Returns false when the engine should terminate.
    fn handle_command(&mut self, cmd: EngineCommand) -> bool {
        match cmd {
            EngineCommand::Upsert(record) => {
                tracing::debug!(callsign = %record.callsign, "record upserted");
                self.store.upsert(record);
            }
            EngineCommand::Remove(callsign) => {
                tracing::debug!(%callsign, "record removed");
                self.store.remove(&callsign);
            }
            EngineCommand::BulkReplace(records) => {
                tracing::info!(count = records.len(), "record store synced from batch");
                self.store.bulk_replace(records);
            }
            EngineCommand::RequestProbe => self.run_probe(),
            EngineCommand::SetConfig(update) => self.apply_config(update),
            EngineCommand::Start => self.start_scheduler(),
            EngineCommand::Stop => self.stop_scheduler(),
            EngineCommand::Shutdown => return false,
        }
        true
    }

    fn apply_config(&mut self, update: ConfigUpdate) {
        self.config.apply(&update);
        // Re-arm a running scheduler so a new period takes effect now
        // rather than after one more tick at the old period.
        if update.check_interval_ms.is_some() && self.ticker.is_some() {
            self.ticker = Some(make_ticker(self.config.check_interval_ms));
        }
        tracing::info!(
            interval_ms = self.config.check_interval_ms,
            advisory_hours = self.config.advisory_threshold_hours,
            imminent_minutes = self.config.imminent_threshold_minutes,
            actual_minutes = self.config.actual_threshold_minutes,
            "probe configuration updated"
        );
    }

    fn start_scheduler(&mut self) {
        if self.ticker.is_some() {
            return;
        }
        self.ticker = Some(make_ticker(self.config.check_interval_ms));
        tracing::info!(
            interval_ms = self.config.check_interval_ms,
            "probe scheduler started"
        );
    }

    fn stop_scheduler(&mut self) {
        if self.ticker.take().is_some() {
            tracing::info!("probe scheduler stopped");
        }
    }

    fn run_probe(&mut self) {
        let now = Utc::now();
        let conflicts = probe::probe_all(&self.store, &self.config, now);
        let report = ProbeReport::new(conflicts, now);

        let (actual, imminent, advisory) = report.counts();
        if actual + imminent > 0 {
            tracing::warn!(actual, imminent, advisory, "probe found close conflicts");
        } else {
            tracing::debug!(advisory, records = self.store.len(), "probe cycle clean");
        }

        // No subscribers is fine; reports are fire and forget.
        let _ = self.reports.send(report);
    }
}

/// Resolves on the next scheduler tick; pends forever while the scheduler
/// is disarmed so the command branch stays responsive.
async fn tick(ticker: &mut Option<Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

/// First tick one full period out, and late cycles delay rather than
/// burst-fire, which coalesces probes that outrun the interval.
fn make_ticker(interval_ms: u64) -> Interval {
    let period = Duration::from_millis(interval_ms.max(1));
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}
