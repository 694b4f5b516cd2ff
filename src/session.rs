#![warn(clippy::pedantic)]

use crate::configs::{RoughLockConfig, SessionParams};
use crate::electronics::Electronics;
use crate::errors::RoughLockError;
use crate::logbook::Logbook;
use crate::search::{RoughLock, RoughLockOutcome};
use crate::util::settle_ms;

/// Largest acceptable deviation of the locked beat note from its setpoint.
pub const LOCK_TOLERANCE_HZ: f64 = 100.0e6;

/// One lock acquisition from cold: ramps the electronics up, runs the rough
/// search, engages the fine lock on both targets and verifies it, then tears
/// everything down and dumps the logbook. `run` is the usual entry point;
/// the individual phases are public so a caller can drive them by hand.
pub struct Session<E: Electronics> {
    electronics: E,
    params: SessionParams,
    rough_lock: RoughLock,
    cleaned_up: bool,
}

impl<E: Electronics> Session<E> {
    #[must_use]
    pub fn new(electronics: E, cfg: RoughLockConfig, params: SessionParams) -> Self {
        let debug = params.debug;
        Session {
            electronics,
            params,
            rough_lock: RoughLock::new(cfg, debug),
            cleaned_up: false,
        }
    }

    #[must_use]
    pub fn logbook(&self) -> &Logbook {
        &self.rough_lock.logbook
    }

    #[must_use]
    pub fn electronics(&self) -> &E {
        &self.electronics
    }

    /// Brings the rig into a defined starting state: lock disengaged, thermal
    /// setpoint at the start temperature, ramp armed, and the drive current
    /// swept once down to the lower limit and back to shake off hysteresis.
    ///
    /// # Errors
    /// Hardware faults only.
    pub fn prepare(&mut self) -> Result<(), RoughLockError> {
        let book = &mut self.rough_lock.logbook;
        book.status(format!(
            "prepare: vhbg={:.2} current={:.2}mA",
            self.params.start_temperature, self.params.start_current
        ));
        self.electronics.unlock()?;
        self.electronics
            .set_actuator_target_temperature(self.params.start_temperature)?;
        self.electronics.prepare_ramp_measurement()?;
        self.electronics
            .set_laser_current(self.params.start_current)?;
        settle_ms(self.params.prepare_settle_ms);
        self.electronics.wait_for_stable_temperatures()?;

        let lower_limit = self.rough_lock.config().current_limits.0;
        self.electronics.set_laser_current(lower_limit)?;
        settle_ms(self.params.sweep_settle_ms);
        self.electronics
            .set_laser_current(self.params.start_current)?;
        settle_ms(self.params.start_settle_ms);
        Ok(())
    }

    /// # Errors
    /// Everything [`RoughLock::run`] reports.
    pub fn do_rough_lock(&mut self) -> Result<RoughLockOutcome, RoughLockError> {
        let outcome = self.rough_lock.run(
            &mut self.electronics,
            self.params.target_frequencies,
            self.params.start_current,
        )?;
        // the scan ramp is no longer needed once the mode is in place
        self.electronics.stop_ramp()?;
        Ok(outcome)
    }

    /// Engages the fine lock on each target frequency in turn and checks
    /// that the measured beat note actually settled there.
    ///
    /// # Errors
    /// `LockCheckFailed` when the worst measured deviation exceeds
    /// [`LOCK_TOLERANCE_HZ`]; hardware faults untouched.
    pub fn do_lock(&mut self) -> Result<(), RoughLockError> {
        let targets = [
            self.params.target_frequencies.0,
            self.params.target_frequencies.1,
        ];
        for target in targets {
            self.rough_lock
                .logbook
                .status(format!("lock to {target:.3e}Hz"));
            self.electronics.lock(target)?;
            settle_ms(self.params.lock_settle_ms);

            let scan = self
                .electronics
                .measure_frequencies(self.params.start_current)?;
            let worst_deviation = scan
                .frequencies
                .iter()
                .map(|f| (f - target).abs())
                .fold(0.0, f64::max);
            if worst_deviation > LOCK_TOLERANCE_HZ {
                return Err(RoughLockError::LockCheckFailed {
                    target,
                    worst_deviation,
                });
            }
            self.rough_lock.logbook.status("lock checked");
        }
        Ok(())
    }

    /// Releases the hardware and dumps the logbook. Safe to call from any
    /// state; repeated calls do nothing.
    ///
    /// # Errors
    /// Hardware faults from the release; a failed logbook dump is only
    /// logged, never fatal.
    pub fn cleanup(&mut self) -> Result<(), RoughLockError> {
        if self.cleaned_up {
            return Ok(());
        }
        self.cleaned_up = true;
        self.electronics.cleanup()?;
        if let Err(msg) = self.rough_lock.logbook.dump(
            &self.params.data_folder,
            self.params.start_temperature,
            self.params.start_current,
        ) {
            log::warn!("logbook dump failed: {msg}");
        }
        Ok(())
    }

    /// The whole session: prepare, rough lock, fine lock, cleanup. The
    /// cleanup runs no matter how the earlier phases end; the first failure
    /// wins when both a phase and the cleanup report one.
    ///
    /// # Errors
    /// See the individual phases.
    pub fn run(&mut self) -> Result<RoughLockOutcome, RoughLockError> {
        let result = self
            .prepare()
            .and_then(|()| self.do_rough_lock())
            .and_then(|outcome| self.do_lock().map(|()| outcome));
        let cleanup = self.cleanup();
        let outcome = result?;
        cleanup?;
        Ok(outcome)
    }
}
