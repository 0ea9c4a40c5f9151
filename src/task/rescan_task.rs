//! Background task that periodically rescans the watchlist.

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::sync::atomic::Ordering;
use std::time::Duration;

use log::debug;
use log::info;
use tokio::time::MissedTickBehavior;

use crate::service::UpdateSummary;
use crate::service::WatchlistService;

/// Task that runs a rescan cycle every poll interval.
pub struct RescanTask {
    service: Arc<WatchlistService>,
    poll_interval: Duration,
    running: AtomicBool,
}

impl RescanTask {
    /// Creates a new rescan task with the given interval.
    pub fn new(service: Arc<WatchlistService>, poll_interval: Duration) -> Arc<Self> {
        info!("Initializing RescanTask with poll interval {poll_interval:?}");
        Arc::new(Self {
            service,
            poll_interval,
            running: AtomicBool::new(false),
        })
    }

    /// Starts the rescan loop. The first cycle runs immediately.
    pub fn start(self: Arc<Self>) -> anyhow::Result<()> {
        if !self.running.swap(true, Ordering::SeqCst) {
            info!("Starting RescanTask loop.");
            self.spawn_loop();
        }
        Ok(())
    }

    /// Stops the rescan loop after the cycle in flight, if any.
    pub fn stop(self: Arc<Self>) -> anyhow::Result<()> {
        info!("Stopping RescanTask loop.");
        self.running.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Runs a single rescan cycle.
    pub async fn run_once(&self) -> UpdateSummary {
        debug!("Running products update.");
        self.service.update().await
    }

    fn spawn_loop(self: Arc<Self>) {
        let mut interval = tokio::time::interval(self.poll_interval);
        // A cycle longer than the interval delays the next one instead of
        // queueing a burst.
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::spawn(async move {
            loop {
                interval.tick().await;
                if !self.is_running() {
                    info!("Stopping rescan loop.");
                    break;
                }
                self.run_once().await;
            }
        });
    }
}
