//! Tap-to-focus, white-balance lock and scheduled auto-reset.

mod controller;
mod state;

pub use controller::FocusExposureController;
pub use state::{FocusRequest, FocusState};
