//! Camera Capture Session Controller
//!
//! Drives a capture device's zoom, focus/exposure, white balance, lens and
//! position on behalf of a UI layer, keeping hardware configuration
//! race-free while a user pinches, taps and switches cameras.
//!
//! # Architecture
//!
//! ```text
//! UI events → CaptureCoordinator → zoom / focus / lens
//!                    ↓                    ↓
//!              StatePublisher    session transaction (worker)
//!                    ↓                    ↓
//!               CameraState       device configuration lock
//! ```
//!
//! # Design Principles
//!
//! - **Nested locking**: session transaction outermost, device lock innermost
//! - **Always unwound**: transactions commit and guards clear on every exit path
//! - **Single writer**: observable state is written only by the publisher task
//! - **Drop, don't queue**: overlapping switch requests are discarded
//!
//! # Example
//!
//! ```no_run
//! use capture_session::{
//!     capture::{CaptureCoordinator, DisplayPoint, HardwareParts, PhotoSink},
//!     config::ControllerConfig,
//!     device::mock::{MockDiscovery, MockPhotoOutput, MockSession},
//!     device::CameraPosition,
//! };
//! use std::sync::Arc;
//!
//! struct Discard;
//!
//! impl PhotoSink for Discard {
//!     fn deliver_captured_image(&self, _: Vec<u8>, _: u32, _: CameraPosition) {}
//! }
//!
//! # async fn demo() {
//! let coordinator = CaptureCoordinator::new(
//!     HardwareParts {
//!         session: Arc::new(MockSession::new()),
//!         discovery: Arc::new(MockDiscovery::standard()),
//!         photo_output: Arc::new(MockPhotoOutput::new()),
//!     },
//!     Arc::new(Discard),
//!     ControllerConfig::default(),
//!     tokio::runtime::Handle::current(),
//! )
//! .unwrap();
//!
//! coordinator.start().unwrap().await.unwrap().unwrap();
//! coordinator.on_pinch(1.5, true);
//! coordinator.on_single_tap(DisplayPoint { x: 120.0, y: 300.0 });
//! coordinator.on_capture();
//! # }
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod focus;
pub mod lens;
pub mod metrics;
pub mod session;
pub mod zoom;

// Re-export commonly used types at crate root
pub use capture::{CaptureCoordinator, DisplayPoint, FlashMode, HardwareParts, PhotoSink};
pub use config::{ControllerConfig, FileConfig};
pub use device::{CameraPosition, CaptureDevice, CaptureSession, DeviceDiscovery, LensType};
pub use error::ControllerError;
pub use metrics::MetricsRegistry;
pub use session::{CameraState, StateUpdate};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
