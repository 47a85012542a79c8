//! White-balance carry-over between lenses on the same assembly.
//!
//! Lenses on one assembly are colorimetrically comparable, so the outgoing
//! lens's gains are re-applied on the incoming one. Front and back sensors
//! are not, and position switches never carry gains.

use crate::device::{
    CaptureDevice, ConfigurationLock, WhiteBalanceGains, WhiteBalanceMode,
};

/// White-balance state captured from the outgoing device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WhiteBalanceSnapshot {
    /// Outgoing mode.
    pub mode: WhiteBalanceMode,
    /// Outgoing gains.
    pub gains: WhiteBalanceGains,
}

impl WhiteBalanceSnapshot {
    /// Reads the device's current white balance.
    pub fn capture(device: &dyn CaptureDevice) -> Self {
        Self {
            mode: device.white_balance_mode(),
            gains: device.white_balance_gains(),
        }
    }
}

/// What carry-over did on the incoming device.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CarryOver {
    /// Locked mode re-locked with the carried gains.
    Relocked(WhiteBalanceGains),
    /// Carried gains applied; continuous-auto must resume shortly after.
    ResumeAuto(WhiteBalanceGains),
    /// The incoming device cannot lock gains; left in continuous-auto.
    Unsupported,
}

/// Re-applies carried white balance on the incoming device.
///
/// Gains are clamped per channel to `[1.0, max_gain]` of the incoming
/// device. Auto mode is briefly locked at the carried gains so the preview
/// does not flash while the new sensor's auto white balance converges.
pub fn apply_carry_over(lock: &ConfigurationLock<'_>, snapshot: &WhiteBalanceSnapshot) -> CarryOver {
    match lock.lock_white_balance(snapshot.gains) {
        Some(gains) => match snapshot.mode {
            WhiteBalanceMode::Locked => CarryOver::Relocked(gains),
            WhiteBalanceMode::ContinuousAuto => CarryOver::ResumeAuto(gains),
        },
        None => {
            lock.set_white_balance_auto();
            CarryOver::Unsupported
        }
    }
}
