//! Prometheus metrics for the session controller.
//!
//! # Metrics Exposed
//!
//! - `capture_session_switches_total` - Completed lens/position switches
//! - `capture_session_switches_dropped_total` - Switch requests rejected by the configuring guard
//! - `capture_session_switch_aborts_total` - Switches that failed and were rolled back
//! - `capture_session_lock_failures_total` - Configuration lock acquisitions that failed
//! - `capture_session_captures_total` - Photos delivered to the persistence collaborator
//! - `capture_session_capture_failures_total` - Captures the output reported as failed
//! - `capture_session_zoom_factor` - Current user-facing zoom
//!
//! # Example
//!
//! ```
//! use capture_session::metrics::MetricsRegistry;
//!
//! let registry = MetricsRegistry::new().expect("Failed to create registry");
//! registry.record_switch();
//! registry.set_zoom(2.5);
//!
//! let text = registry.encode().unwrap();
//! assert!(text.contains("capture_session_switches_total 1"));
//! ```

mod collector;

pub use collector::{MetricsError, MetricsRegistry};
