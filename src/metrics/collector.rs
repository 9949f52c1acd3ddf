// src/metrics/collector.rs
use prometheus::{
    Encoder, Histogram, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, IntGaugeVec, Opts,
    Registry, TextEncoder,
};
use std::sync::Arc;
use std::time::{Duration, Instant};
use anyhow::Result;

use crate::status::Status;

pub struct MetricsRegistry {
    registry: Registry,
    collector: Arc<MetricsCollector>,
}

impl MetricsRegistry {
    pub fn new() -> Result<Self> {
        let registry = Registry::new();
        let collector = Arc::new(MetricsCollector::new(&registry)?);

        Ok(Self {
            registry,
            collector,
        })
    }

    pub fn collector(&self) -> Arc<MetricsCollector> {
        self.collector.clone()
    }

    pub fn gather(&self) -> Result<Vec<u8>> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(buffer)
    }
}

pub struct MetricsCollector {
    // Probe metrics
    pub probes_total: IntCounterVec,
    pub probe_duration_seconds: HistogramVec,
    pub endpoint_up: IntGaugeVec,

    // Sweep metrics
    pub sweeps_total: IntCounterVec,
    pub sweep_duration_seconds: Histogram,
    pub endpoints_ok: IntGauge,
    pub endpoints_total: IntGauge,
}

impl MetricsCollector {
    pub fn new(registry: &Registry) -> Result<Self> {
        let probes_total = IntCounterVec::new(
            Opts::new("pinger_probes_total", "Total number of probes"),
            &["endpoint", "status"],
        )?;
        registry.register(Box::new(probes_total.clone()))?;

        let probe_duration_seconds = HistogramVec::new(
            HistogramOpts::new("pinger_probe_duration_seconds", "Probe duration in seconds"),
            &["endpoint"],
        )?;
        registry.register(Box::new(probe_duration_seconds.clone()))?;

        let endpoint_up = IntGaugeVec::new(
            Opts::new(
                "pinger_endpoint_up",
                "Last observed endpoint status (1=ok, 0=down)",
            ),
            &["endpoint"],
        )?;
        registry.register(Box::new(endpoint_up.clone()))?;

        let sweeps_total = IntCounterVec::new(
            Opts::new("pinger_sweeps_total", "Completed sweeps"),
            &["trigger"],
        )?;
        registry.register(Box::new(sweeps_total.clone()))?;

        let sweep_duration_seconds = Histogram::with_opts(HistogramOpts::new(
            "pinger_sweep_duration_seconds",
            "Sweep duration in seconds",
        ))?;
        registry.register(Box::new(sweep_duration_seconds.clone()))?;

        let endpoints_ok =
            IntGauge::new("pinger_endpoints_ok", "Endpoints ok after the last sweep")?;
        registry.register(Box::new(endpoints_ok.clone()))?;

        let endpoints_total = IntGauge::new("pinger_endpoints_total", "Configured endpoints")?;
        registry.register(Box::new(endpoints_total.clone()))?;

        Ok(Self {
            probes_total,
            probe_duration_seconds,
            endpoint_up,
            sweeps_total,
            sweep_duration_seconds,
            endpoints_ok,
            endpoints_total,
        })
    }

    pub fn record_probe(&self, endpoint: &str, status: Status, duration: Duration) {
        self.probes_total
            .with_label_values(&[endpoint, status.as_str()])
            .inc();

        self.probe_duration_seconds
            .with_label_values(&[endpoint])
            .observe(duration.as_secs_f64());

        self.endpoint_up
            .with_label_values(&[endpoint])
            .set(if status.is_ok() { 1 } else { 0 });
    }

    pub fn record_sweep(&self, trigger: &str, ok: usize, total: usize, duration: Duration) {
        self.sweeps_total.with_label_values(&[trigger]).inc();
        self.sweep_duration_seconds.observe(duration.as_secs_f64());
        self.endpoints_ok.set(ok as i64);
        self.endpoints_total.set(total as i64);
    }
}

// Helper for timing operations
pub struct Timer {
    start: Instant,
}

impl Timer {
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    pub fn elapsed(&self) -> Duration {
        self.start.elapsed()
    }
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}
