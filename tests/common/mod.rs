// tests/common/mod.rs
#![allow(dead_code)]

use async_trait::async_trait;
use health_pinger::health::{Probe, ProbeOutcome, SweepCoordinator};
use health_pinger::registry::{Endpoint, EndpointRegistry};
use health_pinger::status::StatusTable;
use reqwest::StatusCode;
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::{mpsc, Semaphore};

/// Scripted prober: answers from a table, counts calls and can hold every
/// probe until the test hands out permits.
pub struct ScriptedProber {
    outcomes: Mutex<HashMap<String, ProbeOutcome>>,
    default: ProbeOutcome,
    gate: Option<Arc<Semaphore>>,
    entered: mpsc::UnboundedSender<String>,
    panic_on: Option<String>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl ScriptedProber {
    pub fn responding() -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(None, None)
    }

    pub fn gated(gate: Arc<Semaphore>) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(Some(gate), None)
    }

    pub fn panicking_on(endpoint: &str) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        Self::build(None, Some(endpoint.to_string()))
    }

    fn build(
        gate: Option<Arc<Semaphore>>,
        panic_on: Option<String>,
    ) -> (Arc<Self>, mpsc::UnboundedReceiver<String>) {
        let (entered, rx) = mpsc::unbounded_channel();
        let prober = Arc::new(Self {
            outcomes: Mutex::new(HashMap::new()),
            default: ProbeOutcome::Responded(StatusCode::OK),
            gate,
            entered,
            panic_on,
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        });
        (prober, rx)
    }

    pub fn set_outcome(&self, endpoint: &str, outcome: ProbeOutcome) {
        self.outcomes
            .lock()
            .unwrap()
            .insert(endpoint.to_string(), outcome);
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Probe for ScriptedProber {
    async fn probe(&self, endpoint: &Endpoint) -> ProbeOutcome {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _ = self.entered.send(endpoint.id.clone());

        if let Some(gate) = &self.gate {
            gate.acquire().await.unwrap().forget();
        }

        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        if self.panic_on.as_deref() == Some(endpoint.id.as_str()) {
            panic!("probe exploded for {}", endpoint.id);
        }

        self.outcomes
            .lock()
            .unwrap()
            .get(&endpoint.id)
            .cloned()
            .unwrap_or_else(|| self.default.clone())
    }
}

pub fn registry(ids: &[&str]) -> EndpointRegistry {
    EndpointRegistry::new(
        ids.iter()
            .map(|id| Endpoint::new(*id, "/health").unwrap())
            .collect(),
    )
}

pub fn coordinator(ids: &[&str], prober: Arc<dyn Probe>) -> Arc<SweepCoordinator> {
    Arc::new(SweepCoordinator::new(
        registry(ids),
        StatusTable::new(),
        prober,
        None,
    ))
}

/// Give spawned tasks a chance to run without moving a paused clock.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}
