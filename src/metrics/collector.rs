//! Metrics collection and registry.

use prometheus::{Encoder, Gauge, IntCounter, Registry, TextEncoder};
use thiserror::Error;

/// Errors that can occur during metrics operations.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("prometheus error: {0}")]
    Prometheus(#[from] prometheus::Error),
}

/// Prometheus registry for controller events.
pub struct MetricsRegistry {
    registry: Registry,

    // Switch metrics
    switches_total: IntCounter,
    switches_dropped: IntCounter,
    switch_aborts: IntCounter,

    // Device metrics
    lock_failures: IntCounter,
    zoom_factor: Gauge,

    // Capture metrics
    captures_total: IntCounter,
    capture_failures: IntCounter,
}

impl MetricsRegistry {
    /// Creates a registry with every controller metric registered.
    pub fn new() -> Result<Self, MetricsError> {
        let registry = Registry::new();

        let switches_total = IntCounter::new(
            "capture_session_switches_total",
            "Completed lens and position switches",
        )?;
        let switches_dropped = IntCounter::new(
            "capture_session_switches_dropped_total",
            "Switch requests dropped while another switch was running",
        )?;
        let switch_aborts = IntCounter::new(
            "capture_session_switch_aborts_total",
            "Switches that failed and were rolled back",
        )?;
        let lock_failures = IntCounter::new(
            "capture_session_lock_failures_total",
            "Device configuration lock acquisitions that failed",
        )?;
        let zoom_factor = Gauge::new(
            "capture_session_zoom_factor",
            "Current user-facing zoom factor",
        )?;
        let captures_total = IntCounter::new(
            "capture_session_captures_total",
            "Photos delivered to the persistence collaborator",
        )?;
        let capture_failures = IntCounter::new(
            "capture_session_capture_failures_total",
            "Captures reported as failed by the photo output",
        )?;

        registry.register(Box::new(switches_total.clone()))?;
        registry.register(Box::new(switches_dropped.clone()))?;
        registry.register(Box::new(switch_aborts.clone()))?;
        registry.register(Box::new(lock_failures.clone()))?;
        registry.register(Box::new(zoom_factor.clone()))?;
        registry.register(Box::new(captures_total.clone()))?;
        registry.register(Box::new(capture_failures.clone()))?;

        Ok(Self {
            registry,
            switches_total,
            switches_dropped,
            switch_aborts,
            lock_failures,
            zoom_factor,
            captures_total,
            capture_failures,
        })
    }

    /// Counts a completed switch.
    pub fn record_switch(&self) {
        self.switches_total.inc();
    }

    /// Counts a dropped switch request.
    pub fn record_dropped_switch(&self) {
        self.switches_dropped.inc();
    }

    /// Counts an aborted switch.
    pub fn record_abort(&self) {
        self.switch_aborts.inc();
    }

    /// Counts a failed configuration lock.
    pub fn record_lock_failure(&self) {
        self.lock_failures.inc();
    }

    /// Counts a delivered capture.
    pub fn record_capture(&self) {
        self.captures_total.inc();
    }

    /// Counts a failed capture.
    pub fn record_capture_failure(&self) {
        self.capture_failures.inc();
    }

    /// Sets the zoom gauge.
    pub fn set_zoom(&self, zoom: f64) {
        self.zoom_factor.set(zoom);
    }

    /// Completed switches so far.
    pub fn switches(&self) -> u64 {
        self.switches_total.get()
    }

    /// Dropped switch requests so far.
    pub fn dropped_switches(&self) -> u64 {
        self.switches_dropped.get()
    }

    /// Aborted switches so far.
    pub fn aborts(&self) -> u64 {
        self.switch_aborts.get()
    }

    /// Delivered captures so far.
    pub fn captures(&self) -> u64 {
        self.captures_total.get()
    }

    /// Returns the underlying Prometheus registry.
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Encodes all metrics in Prometheus text format.
    pub fn encode(&self) -> Result<String, MetricsError> {
        let encoder = TextEncoder::new();
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        encoder.encode(&metric_families, &mut buffer)?;
        Ok(String::from_utf8_lossy(&buffer).into_owned())
    }
}
