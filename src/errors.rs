#![warn(clippy::pedantic)]

use thiserror::Error;

use crate::electronics::HardwareError;

/// Outcome taxonomy of the rough-lock search. The variants are deliberately
/// split along the recovery policy: `NoSlope` is recoverable by the caller
/// (retry from different start conditions), everything else is terminal for
/// the current search attempt.
#[derive(Debug, Error)]
pub enum RoughLockError {
    /// The wiggle sequence was exhausted without any valid mode segment.
    /// This is an expected outcome meaning "laser not near a usable mode",
    /// not a hardware fault.
    #[error("no laser mode found within the wiggle sequence")]
    NoSlope,

    /// No mode offset in the priority list put both required currents inside
    /// the allowed range.
    #[error("no reachable mode for the requested frequencies")]
    NotReachable,

    /// The retry budget ran out after the temperature ramp was already
    /// reversed once; the target is likely unreachable from the current
    /// thermal operating point.
    #[error("temperature ramp exhausted in both directions")]
    TemperatureOutOfBounds,

    /// The fine lock engaged but the measured frequencies did not settle on
    /// the requested setpoint.
    #[error("fine lock check failed: worst deviation {worst_deviation:.3e} Hz from {target:.3e} Hz")]
    LockCheckFailed { target: f64, worst_deviation: f64 },

    #[error(transparent)]
    Hardware(#[from] HardwareError),
}

impl RoughLockError {
    /// True for failures that end the search attempt for good.
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        !matches!(self, RoughLockError::NoSlope)
    }
}
