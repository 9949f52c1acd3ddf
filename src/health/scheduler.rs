// src/health/scheduler.rs
use crate::health::coordinator::{SweepCoordinator, SweepReport, SweepTrigger};
use crate::status::StatusTable;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Duration, Instant, MissedTickBehavior};
use tracing::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Stopped,
    Running,
    Sweeping,
}

/// Drives the coordinator: once at start, then every `interval`, plus on
/// demand through [`Scheduler::trigger_now`].
pub struct Scheduler {
    coordinator: Arc<SweepCoordinator>,
    interval: Duration,
    running: AtomicBool,
    shutdown_tx: watch::Sender<bool>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(coordinator: Arc<SweepCoordinator>, interval: Duration) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            coordinator,
            interval,
            running: AtomicBool::new(false),
            shutdown_tx,
            task: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn table(&self) -> &StatusTable {
        self.coordinator.table()
    }

    pub fn coordinator(&self) -> &Arc<SweepCoordinator> {
        &self.coordinator
    }

    pub fn state(&self) -> SchedulerState {
        if !self.running.load(Ordering::SeqCst) {
            SchedulerState::Stopped
        } else if self.coordinator.is_sweeping() {
            SchedulerState::Sweeping
        } else {
            SchedulerState::Running
        }
    }

    /// Sweep once, then arm the timer. Returns after the first sweep is done.
    ///
    /// A second call while running does nothing and returns `None`. If
    /// [`Scheduler::stop`] lands during the first sweep the timer is never
    /// armed.
    pub async fn start(&self) -> Option<SweepReport> {
        if self
            .running
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return None;
        }

        self.shutdown_tx.send_replace(false);
        let started = Instant::now();

        info!(interval = ?self.interval, "Starting scheduler");
        let report = self.coordinator.run_sweep(SweepTrigger::Startup).await;

        let mut task = self.task.lock().await;
        if !self.running.load(Ordering::SeqCst) || task.is_some() {
            return Some(report);
        }

        let Some(first_tick) = started.checked_add(self.interval) else {
            warn!(interval = ?self.interval, "Interval out of range, timer not armed");
            return Some(report);
        };

        let coordinator = self.coordinator.clone();
        let shutdown_rx = self.shutdown_tx.subscribe();
        let period = self.interval;

        *task = Some(tokio::spawn(async move {
            run_timer(coordinator, first_tick, period, shutdown_rx).await;
        }));

        Some(report)
    }

    /// Run an extra sweep now. Waits for any sweep already in flight.
    pub async fn trigger_now(&self) -> SweepReport {
        info!("Manual sweep requested");
        self.coordinator.run_sweep(SweepTrigger::Manual).await
    }

    /// Disarm the timer. A timer sweep in flight is allowed to finish.
    pub async fn stop(&self) {
        if !self.running.swap(false, Ordering::SeqCst) {
            return;
        }

        let handle = self.task.lock().await.take();
        if let Some(handle) = handle {
            let _ = self.shutdown_tx.send(true);
            if let Err(e) = handle.await {
                error!("Scheduler task join error: {}", e);
            }
        }
        info!("Scheduler stopped");
    }
}

async fn run_timer(
    coordinator: Arc<SweepCoordinator>,
    first_tick: Instant,
    period: Duration,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut interval = interval_at(first_tick, period);
    interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = interval.tick() => {
                coordinator.run_sweep(SweepTrigger::Timer).await;
            }
            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
        }
    }
}
