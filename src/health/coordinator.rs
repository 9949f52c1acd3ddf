// src/health/coordinator.rs
use crate::health::prober::{Probe, ProbeOutcome};
use crate::metrics::{MetricsCollector, Timer};
use crate::registry::{Endpoint, EndpointRegistry};
use crate::status::{Status, StatusTable};
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::{debug, error, info, warn};

/// What caused a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepTrigger {
    Startup,
    Timer,
    Manual,
}

impl SweepTrigger {
    pub fn as_str(&self) -> &'static str {
        match self {
            SweepTrigger::Startup => "startup",
            SweepTrigger::Timer => "timer",
            SweepTrigger::Manual => "manual",
        }
    }
}

impl fmt::Display for SweepTrigger {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct SweepReport {
    pub trigger: SweepTrigger,
    /// `(endpoint id, status)` in registry order.
    pub results: Vec<(String, Status)>,
    pub ok: usize,
    pub down: usize,
    pub elapsed: Duration,
}

/// Runs sweeps over the registry and owns the writes to the status table.
pub struct SweepCoordinator {
    registry: EndpointRegistry,
    table: StatusTable,
    prober: Arc<dyn Probe>,
    metrics: Option<Arc<MetricsCollector>>,
    sweep_lock: Mutex<()>,
    sweeping: AtomicBool,
    completed: AtomicU64,
}

impl SweepCoordinator {
    pub fn new(
        registry: EndpointRegistry,
        table: StatusTable,
        prober: Arc<dyn Probe>,
        metrics: Option<Arc<MetricsCollector>>,
    ) -> Self {
        Self {
            registry,
            table,
            prober,
            metrics,
            sweep_lock: Mutex::new(()),
            sweeping: AtomicBool::new(false),
            completed: AtomicU64::new(0),
        }
    }

    pub fn table(&self) -> &StatusTable {
        &self.table
    }

    pub fn registry(&self) -> &EndpointRegistry {
        &self.registry
    }

    pub fn is_sweeping(&self) -> bool {
        self.sweeping.load(Ordering::SeqCst)
    }

    pub fn completed_sweeps(&self) -> u64 {
        self.completed.load(Ordering::SeqCst)
    }

    /// Probe every endpoint once and record the results.
    ///
    /// Waits for any sweep already in flight; never fails.
    pub async fn run_sweep(&self, trigger: SweepTrigger) -> SweepReport {
        let _guard = self.sweep_lock.lock().await;
        let _in_flight = InFlight::enter(&self.sweeping);

        let timer = Timer::new();
        debug!(%trigger, endpoints = self.registry.len(), "Sweep started");

        let results = self.probe_all().await;

        // Written only once every probe is back, so a sweep never leaves
        // entries from two different runs behind.
        for (endpoint, status) in &results {
            self.table.set(endpoint, *status);
        }

        let ok = results.iter().filter(|(_, status)| status.is_ok()).count();
        let down = results.len() - ok;
        let elapsed = timer.elapsed();

        if let Some(metrics) = &self.metrics {
            metrics.record_sweep(trigger.as_str(), ok, results.len(), elapsed);
        }

        info!(
            %trigger,
            ok,
            down,
            elapsed_ms = elapsed.as_millis() as u64,
            "Sweep complete"
        );

        self.completed.fetch_add(1, Ordering::SeqCst);

        SweepReport {
            trigger,
            results,
            ok,
            down,
            elapsed,
        }
    }

    async fn probe_all(&self) -> Vec<(String, Status)> {
        let endpoints = self.registry.all();
        let mut tasks = Vec::with_capacity(endpoints.len());

        for endpoint in endpoints {
            let prober = self.prober.clone();
            let endpoint = endpoint.clone();
            tasks.push(tokio::spawn(async move {
                let timer = Timer::new();
                let outcome = prober.probe(&endpoint).await;
                (outcome, timer.elapsed())
            }));
        }

        let joined = futures::future::join_all(tasks).await;

        endpoints
            .iter()
            .zip(joined)
            .map(|(endpoint, result)| {
                let status = match result {
                    Ok((outcome, elapsed)) => self.record_outcome(endpoint, &outcome, elapsed),
                    Err(e) => {
                        error!(endpoint = %endpoint.id, "Probe task failed: {}", e);
                        Status::Down
                    }
                };
                (endpoint.id.clone(), status)
            })
            .collect()
    }

    fn record_outcome(&self, endpoint: &Endpoint, outcome: &ProbeOutcome, elapsed: Duration) -> Status {
        let status = outcome.status();

        match outcome {
            ProbeOutcome::Responded(code) => {
                debug!(endpoint = %endpoint.id, status = %code, "Endpoint responded");
            }
            ProbeOutcome::TimedOut => {
                warn!(endpoint = %endpoint.id, "Endpoint timed out");
            }
            ProbeOutcome::Failed(reason) => {
                warn!(endpoint = %endpoint.id, %reason, "Endpoint unreachable");
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.record_probe(&endpoint.id, status, elapsed);
        }

        status
    }
}

/// Clears the sweeping flag even if the sweep future is dropped early.
struct InFlight<'a>(&'a AtomicBool);

impl<'a> InFlight<'a> {
    fn enter(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}
