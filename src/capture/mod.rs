//! Top-level capture façade and still-photo settings.
//!
//! The [`CaptureCoordinator`] receives UI events, routes them to the zoom,
//! focus and lens controllers, and delivers captured photos to the
//! persistence collaborator through a [`PhotoSink`].

mod coordinator;
mod geometry;
mod settings;
mod sink;

pub use coordinator::{CaptureCoordinator, HardwareParts};
pub use geometry::{DisplayPoint, PreviewGeometry};
pub use settings::{
    CapturedPhoto, DeviceOrientation, FlashMode, PhotoSettings, QualityPrioritization,
};
pub use sink::PhotoSink;
