//! Front-end replication loop.
//!
//! Periodically asks every local registrar for all of its registrations and
//! merges them into the front-end store. Unreachable registrars are skipped
//! for the cycle; nothing already replicated is ever removed by a failed
//! poll.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use futures_util::future::join_all;
use serde::Serialize;
use tokio::sync::{RwLock, watch};
use tokio::task::JoinHandle;

use crate::client::DiscoveryService;
use crate::domain::{RegistrarAddress, RegistrationEntry, RegistrationStore, Role, Topic};
use crate::error::RegistrarError;

/// Shortest accepted replication period.
pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

/// Sender name the front-end uses when polling registrars.
pub const REPLICATION_SENDER: &str = "front-end";

/// Outcome of one replication cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Registrars answered successfully.
    pub polled: usize,
    /// Registrars skipped because of an error.
    pub skipped: usize,
    /// Entries that were new to the front-end store.
    pub merged: usize,
}

/// Running totals exposed through the admin API.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ReplicationStats {
    /// Completed cycles.
    pub cycles: u64,
    /// When the last cycle finished.
    pub last_cycle_at: Option<DateTime<Utc>>,
    /// Report of the last cycle.
    pub last_cycle: CycleReport,
    /// Entries merged since start.
    pub total_merged: u64,
    /// Registrars polled each cycle.
    pub registrars: usize,
}

/// Shared read access to [`ReplicationStats`].
#[derive(Debug, Clone, Default)]
pub struct ReplicationMonitor(Arc<RwLock<ReplicationStats>>);

impl ReplicationMonitor {
    /// Returns a copy of the current stats.
    pub async fn snapshot(&self) -> ReplicationStats {
        self.0.read().await.clone()
    }

    async fn record(&self, report: CycleReport) {
        let mut stats = self.0.write().await;
        stats.cycles += 1;
        stats.last_cycle_at = Some(Utc::now());
        stats.last_cycle = report;
        stats.total_merged += report.merged as u64;
    }
}

/// Keeps the front-end store representative of every local registrar.
#[derive(Debug)]
pub struct ReplicationLoop {
    store: Arc<RegistrationStore>,
    registrars: Vec<RegistrarAddress>,
    discovery: DiscoveryService,
    interval: Duration,
    monitor: ReplicationMonitor,
}

impl ReplicationLoop {
    /// Creates a loop merging `registrars` into `store` every `interval`,
    /// raised to at least [`MIN_INTERVAL`].
    #[must_use]
    pub fn new(
        store: Arc<RegistrationStore>,
        registrars: Vec<RegistrarAddress>,
        discovery: DiscoveryService,
        interval: Duration,
    ) -> Self {
        Self {
            store,
            registrars,
            discovery,
            interval: interval.max(MIN_INTERVAL),
            monitor: ReplicationMonitor::default(),
        }
    }

    /// Period between cycles.
    #[must_use]
    pub const fn interval(&self) -> Duration {
        self.interval
    }

    /// Stats handle that stays valid after [`Self::start`].
    #[must_use]
    pub fn monitor(&self) -> ReplicationMonitor {
        self.monitor.clone()
    }

    /// Polls every registrar once, concurrently, and merges the results.
    pub async fn run_cycle(&self) -> CycleReport {
        let polls = self.registrars.iter().map(|address| self.poll(address));
        let results = join_all(polls).await;

        let mut report = CycleReport::default();
        for (address, result) in self.registrars.iter().zip(results) {
            match result {
                Ok(entries) => {
                    report.polled += 1;
                    for entry in entries {
                        if self.store.add(entry).await {
                            report.merged += 1;
                        }
                    }
                }
                Err(e) => {
                    report.skipped += 1;
                    tracing::warn!(registrar = %address, error = %e, "replication poll failed, skipping");
                }
            }
        }

        self.monitor.record(report).await;
        tracing::info!(
            polled = report.polled,
            skipped = report.skipped,
            merged = report.merged,
            "replication cycle complete"
        );
        report
    }

    async fn poll(
        &self,
        address: &RegistrarAddress,
    ) -> Result<Vec<RegistrationEntry>, RegistrarError> {
        let mut entries = Vec::new();
        for role in Role::ALL {
            let found = self
                .discovery
                .find_topic(address, REPLICATION_SENDER, Topic::any(), role)
                .await?;
            entries.extend(found);
        }
        Ok(entries)
    }

    /// Spawns the loop. The first cycle runs immediately.
    #[must_use]
    pub fn start(self) -> ReplicationHandle {
        let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
        let monitor = self.monitor();
        let interval = self.interval;

        let task = tokio::spawn(async move {
            {
                let mut stats = self.monitor.0.write().await;
                stats.registrars = self.registrars.len();
            }
            tracing::info!(
                registrars = self.registrars.len(),
                interval_ms = interval.as_millis() as u64,
                "replication loop started"
            );

            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    _ = ticker.tick() => {
                        self.run_cycle().await;
                    }
                    _ = shutdown_rx.changed() => {
                        break;
                    }
                }
            }
            tracing::info!("replication loop stopped");
        });

        ReplicationHandle {
            shutdown: shutdown_tx,
            task,
            monitor,
        }
    }
}

/// Handle to a running [`ReplicationLoop`].
#[derive(Debug)]
pub struct ReplicationHandle {
    shutdown: watch::Sender<bool>,
    task: JoinHandle<()>,
    monitor: ReplicationMonitor,
}

impl ReplicationHandle {
    /// Current stats of the running loop.
    pub async fn stats(&self) -> ReplicationStats {
        self.monitor.snapshot().await
    }

    /// Stats handle for sharing with other tasks.
    #[must_use]
    pub fn monitor(&self) -> ReplicationMonitor {
        self.monitor.clone()
    }

    /// Signals shutdown and waits for the task. An in-flight cycle finishes
    /// first.
    pub async fn stop(self) {
        let _ = self.shutdown.send(true);
        if let Err(e) = self.task.await {
            tracing::error!(error = %e, "replication task failed");
        }
    }
}
