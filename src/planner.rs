#![warn(clippy::pedantic)]

use crate::configs::RoughLockConfig;
use crate::errors::RoughLockError;
use crate::linefit::{find_current_for_frequency, LineFit};
use crate::logbook::Logbook;
use crate::util::in_range;

/// Which mode to go for, at what current, and which way to push the thermal
/// actuator to get there.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TargetPlan {
    /// Mode offset relative to the currently observed mode.
    pub delta_mode: i32,
    /// Mean of the two currents required to reach the target frequencies.
    pub target_current: f64,
    /// -1, 0 or +1.
    pub temp_ramp_direction: i32,
}

/// Extrapolates the observed mode across the mode ladder and picks the first
/// offset (in the configured priority order, offset 0 first) for which both
/// target frequencies are reachable within the allowed current window.
///
/// The ramp direction is the sign of the offset; for offset 0 it is the sign
/// of the current move from `start_current` to the planned target.
///
/// # Errors
/// `NotReachable` when no offset in the priority list satisfies the current
/// constraint. This is fatal to the search attempt.
pub fn determine_target_mode(
    fit: &LineFit,
    target_frequencies: (f64, f64),
    start_current: f64,
    cfg: &RoughLockConfig,
    logbook: &mut Logbook,
) -> Result<TargetPlan, RoughLockError> {
    for &delta_mode in &cfg.delta_modes {
        let mode_shift = fit.intercept - f64::from(delta_mode) * cfg.mode_frequency_spacing;
        let c0 = find_current_for_frequency(target_frequencies.0, fit.slope, mode_shift);
        let c1 = find_current_for_frequency(target_frequencies.1, fit.slope, mode_shift);

        if !(in_range(c0, cfg.target_currents) && in_range(c1, cfg.target_currents)) {
            continue;
        }

        logbook.status(format!(
            "target currents are {:.2} and {:.2}",
            c0.min(c1),
            c0.max(c1)
        ));
        let target_current = 0.5 * (c0 + c1);
        let temp_ramp_direction = if delta_mode == 0 {
            if target_current - start_current > 0.0 {
                1
            } else {
                -1
            }
        } else if delta_mode > 0 {
            1
        } else {
            -1
        };
        return Ok(TargetPlan {
            delta_mode,
            target_current,
            temp_ramp_direction,
        });
    }
    Err(RoughLockError::NotReachable)
}
