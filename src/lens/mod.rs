//! Lens and position selection and the switch protocol.

mod selector;
mod white_balance;

pub use selector::{ActiveCamera, LensSelector, SwitchEnv, SwitchOutcome, SwitchRequest};
pub use white_balance::{apply_carry_over, CarryOver, WhiteBalanceSnapshot};
