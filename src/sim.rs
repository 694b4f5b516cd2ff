#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]

use crate::electronics::{Electronics, HardwareError, Scan};
use crate::linefit::line;

/// Current below which the mode ladder of the simulated laser is anchored;
/// at the reference temperature the mode boundaries sit at
/// `ANCHOR_MA + k * mode_width_ma`.
pub const ANCHOR_MA: f64 = 105.0;

/// Parameters of the simulated rig. The defaults describe a laser whose
/// home mode covers roughly 1..4 GHz around 110 mA at 25 degrees.
#[derive(Debug, Clone)]
pub struct SimConfig {
    /// Mode slope, Hz per mA.
    pub slope: f64,
    /// Intercept of the home mode at the reference temperature, Hz.
    pub intercept: f64,
    pub mode_frequency_spacing: f64,
    /// Current width of one mode, mA.
    pub mode_width_ma: f64,
    /// How far the mode boundaries move per degree of actuator temperature.
    pub boundary_drift_ma_per_deg: f64,
    pub reference_temperature: f64,
    /// Thermal slew toward the setpoint per scan acquisition.
    pub thermal_rate_deg_per_scan: f64,
    pub scan_points: usize,
    pub scan_span_ma: f64,
    /// Beat notes beyond this read as zero, like a counter that cannot see
    /// the photodiode signal any more.
    pub max_counter_hz: f64,
}

impl Default for SimConfig {
    fn default() -> Self {
        SimConfig {
            slope: -2.0e8,
            intercept: 2.45e10,
            mode_frequency_spacing: 3.0e9,
            mode_width_ma: 15.0,
            boundary_drift_ma_per_deg: 2.0,
            reference_temperature: 25.0,
            thermal_rate_deg_per_scan: 0.5,
            scan_points: 128,
            scan_span_ma: 15.0,
            max_counter_hz: 7.0e9,
        }
    }
}

/// Software stand-in for the lab rigs: a sawtooth mode ladder whose
/// boundaries drift with the actuator temperature, a first-order thermal
/// response, and a counter with a finite frequency range. Used by the binary
/// and the integration tests; interchangeable with the hardware adapters.
#[derive(Debug)]
pub struct SimRig {
    cfg: SimConfig,
    laser_current: f64,
    vhbg_target: f64,
    vhbg_temperature: f64,
    ramp_armed: bool,
    locked: Option<f64>,
    cleaned_up: bool,
    /// Number of times the ramp actually went from disarmed to armed.
    pub arm_events: u32,
}

impl SimRig {
    #[must_use]
    pub fn new(cfg: SimConfig) -> Self {
        let temperature = cfg.reference_temperature;
        SimRig {
            cfg,
            laser_current: 0.0,
            vhbg_target: temperature,
            vhbg_temperature: temperature,
            ramp_armed: false,
            locked: None,
            cleaned_up: false,
            arm_events: 0,
        }
    }

    #[must_use]
    pub fn cleaned_up(&self) -> bool {
        self.cleaned_up
    }

    #[must_use]
    pub fn temperature(&self) -> f64 {
        self.vhbg_temperature
    }

    /// Beat frequency seen at `current` for the present actuator
    /// temperature. Within a mode the response is a straight line; across a
    /// boundary it wraps by one mode spacing.
    #[must_use]
    pub fn beat_frequency(&self, current: f64) -> f64 {
        let shift =
            self.cfg.boundary_drift_ma_per_deg * (self.vhbg_temperature - self.cfg.reference_temperature);
        #[allow(clippy::cast_possible_truncation)]
        let k = ((current - shift - ANCHOR_MA) / self.cfg.mode_width_ma).floor();
        let f = line(current, self.cfg.slope, self.cfg.intercept) + k * self.cfg.mode_frequency_spacing;
        if f.abs() > self.cfg.max_counter_hz {
            0.0
        } else {
            f
        }
    }

    fn slew_temperature(&mut self) {
        let diff = self.vhbg_target - self.vhbg_temperature;
        let step = self.cfg.thermal_rate_deg_per_scan;
        if diff.abs() <= step {
            self.vhbg_temperature = self.vhbg_target;
        } else {
            self.vhbg_temperature += step * diff.signum();
        }
    }
}

impl Electronics for SimRig {
    fn set_laser_current(&mut self, value: f64) -> Result<(), HardwareError> {
        if !value.is_finite() {
            return Err(HardwareError::Rejected {
                device: "current source",
                value,
            });
        }
        self.laser_current = value;
        Ok(())
    }

    fn set_actuator_target_temperature(&mut self, value: f64) -> Result<(), HardwareError> {
        if !value.is_finite() {
            return Err(HardwareError::Rejected {
                device: "thermal controller",
                value,
            });
        }
        self.vhbg_target = value;
        Ok(())
    }

    fn get_actuator_target_temperature(&mut self) -> Result<f64, HardwareError> {
        Ok(self.vhbg_target)
    }

    fn get_actuator_temperature(&mut self) -> Result<f64, HardwareError> {
        Ok(self.vhbg_temperature)
    }

    fn wait_for_stable_temperatures(&mut self) -> Result<(), HardwareError> {
        self.vhbg_temperature = self.vhbg_target;
        Ok(())
    }

    fn prepare_ramp_measurement(&mut self) -> Result<(), HardwareError> {
        if !self.ramp_armed {
            self.ramp_armed = true;
            self.arm_events += 1;
        }
        Ok(())
    }

    fn stop_ramp(&mut self) -> Result<(), HardwareError> {
        self.ramp_armed = false;
        Ok(())
    }

    fn measure_frequencies(&mut self, center_current: f64) -> Result<Scan, HardwareError> {
        self.slew_temperature();
        let n = self.cfg.scan_points;
        let span = self.cfg.scan_span_ma;
        let currents: Vec<f64> = (0..n)
            .map(|i| center_current - span / 2.0 + span * i as f64 / (n - 1) as f64)
            .collect();
        let frequencies: Vec<f64> = if let Some(setpoint) = self.locked {
            vec![setpoint; n]
        } else {
            currents.iter().map(|&c| self.beat_frequency(c)).collect()
        };
        Ok(Scan::new(currents, frequencies))
    }

    fn lock(&mut self, frequency: f64) -> Result<(), HardwareError> {
        self.locked = Some(frequency);
        Ok(())
    }

    fn unlock(&mut self) -> Result<(), HardwareError> {
        self.locked = None;
        Ok(())
    }

    fn cleanup(&mut self) -> Result<(), HardwareError> {
        if self.cleaned_up {
            return Err(HardwareError::Transport(
                "cleanup called more than once".into(),
            ));
        }
        self.cleaned_up = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configs::RoughLockConfig;
    use crate::errors::RoughLockError;
    use crate::search::{RoughLock, RoughLockOutcome};

    fn lock_cfg() -> RoughLockConfig {
        RoughLockConfig {
            excursion_settle_ms: 0,
            target_settle_ms: 0,
            wiggle_settle_ms: 0,
            ..RoughLockConfig::default()
        }
    }

    #[test]
    fn arming_is_idempotent() {
        let mut rig = SimRig::new(SimConfig::default());
        rig.prepare_ramp_measurement().unwrap();
        rig.prepare_ramp_measurement().unwrap();
        assert_eq!(rig.arm_events, 1);
        rig.stop_ramp().unwrap();
        rig.prepare_ramp_measurement().unwrap();
        assert_eq!(rig.arm_events, 2);
    }

    #[test]
    fn mode_ladder_wraps_at_boundaries() {
        let rig = SimRig::new(SimConfig::default());
        // within the home mode the response is the bare line
        assert!((rig.beat_frequency(110.0) - 2.5e9).abs() < 1.0);
        // one step across the upper boundary wraps up by one spacing
        let below = rig.beat_frequency(119.99);
        let above = rig.beat_frequency(120.01);
        assert!((above - below - 3.0e9).abs() < 1.0e7);
    }

    #[test]
    fn cleanup_twice_is_a_fault() {
        let mut rig = SimRig::new(SimConfig::default());
        rig.cleanup().unwrap();
        assert!(rig.cleanup().is_err());
    }

    #[test]
    fn rough_lock_converges_on_the_home_mode() {
        let mut rig = SimRig::new(SimConfig::default());
        let mut lock = RoughLock::new(lock_cfg(), false);
        let out = lock
            .run(&mut rig, (2.4e9, 4.4e9), 110.0)
            .expect("targets sit inside the home mode");
        assert_eq!(
            out,
            RoughLockOutcome {
                temp_changes: 0,
                wiggle_count: 0
            }
        );
    }

    #[test]
    fn rough_lock_hops_a_mode_with_the_temperature_ramp() {
        // one mode spacing above home: the targets need the neighboring mode,
        // so the loop ramps the actuator until the boundary drifts past the
        // operating point
        let cfg = SimConfig {
            intercept: 2.45e10 + 3.0e9,
            ..SimConfig::default()
        };
        let mut rig = SimRig::new(cfg);
        let mut lock = RoughLock::new(lock_cfg(), false);
        let out = lock
            .run(&mut rig, (2.4e9, 4.4e9), 110.0)
            .expect("ramp brings the neighboring mode in");
        assert!(out.temp_changes >= 1);
        // the ramp correction parked the setpoint near the reached temperature
        assert!(rig.vhbg_target < lock.config().max_temperature);
    }

    #[test]
    fn dead_counter_region_yields_no_slope() {
        // far outside the counter range everywhere: every wiggle candidate
        // reads zeros
        let cfg = SimConfig {
            intercept: 2.45e10 + 3.0e10,
            max_counter_hz: 7.0e9,
            ..SimConfig::default()
        };
        let mut rig = SimRig::new(cfg);
        let mut lock = RoughLock::new(lock_cfg(), false);
        let err = lock
            .run(&mut rig, (2.4e9, 4.4e9), 110.0)
            .expect_err("nothing visible anywhere");
        assert!(matches!(err, RoughLockError::NoSlope));
    }
}
