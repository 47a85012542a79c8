//! Focus requests and per-device focus state.

use crate::device::{NormalizedPoint, WhiteBalanceGains};
use chrono::{DateTime, Utc};

/// Focus/exposure state the controller last drove a device into.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FocusState {
    /// Hardware adjusts focus, exposure and white balance on its own.
    ContinuousAuto,
    /// Focused and exposed at a tapped point.
    TapFocus { point: NormalizedPoint },
    /// Tapped point with white balance frozen at `gains`.
    LockedWhiteBalance {
        point: NormalizedPoint,
        gains: WhiteBalanceGains,
    },
}

impl FocusState {
    /// Point of interest, if any.
    pub fn point(&self) -> Option<NormalizedPoint> {
        match self {
            FocusState::ContinuousAuto => None,
            FocusState::TapFocus { point } | FocusState::LockedWhiteBalance { point, .. } => {
                Some(*point)
            }
        }
    }
}

/// A tap-to-focus request in device-normalized space.
#[derive(Debug, Clone, PartialEq)]
pub struct FocusRequest {
    /// Point of interest.
    pub point: NormalizedPoint,
    /// Freeze white balance at the gains chosen for this scene.
    pub lock_white_balance: bool,
    /// When the request was made.
    pub created_at: DateTime<Utc>,
}

impl FocusRequest {
    /// Creates a request stamped with the current time.
    pub fn new(point: NormalizedPoint, lock_white_balance: bool) -> Self {
        Self {
            point,
            lock_white_balance,
            created_at: Utc::now(),
        }
    }
}
