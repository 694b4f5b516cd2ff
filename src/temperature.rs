#![warn(clippy::pedantic)]

use crate::configs::RoughLockConfig;
use crate::electronics::{Electronics, HardwareError};
use crate::logbook::Logbook;

/// Size of the corrective setpoint nudge applied when a ramp stops, degrees
/// per unit of previous direction.
pub const RAMP_CORRECTION_DEG: f64 = 0.5;

/// Keeps track of which way the thermal actuator is being pushed. A nonzero
/// ramp drives the setpoint to the configured extreme; stopping the ramp
/// parks the setpoint slightly behind the temperature actually reached, to
/// take the remaining drift out of the system.
#[derive(Debug, Default)]
pub struct TemperatureRamper {
    direction: i32,
}

impl TemperatureRamper {
    #[must_use]
    pub fn new() -> Self {
        TemperatureRamper::default()
    }

    /// The direction recorded by the last `ramp` call.
    #[inline]
    #[must_use]
    pub fn direction(&self) -> i32 {
        self.direction
    }

    /// # Errors
    /// Propagates hardware faults from the setpoint accessors.
    pub fn ramp<E: Electronics>(
        &mut self,
        electronics: &mut E,
        direction: i32,
        cfg: &RoughLockConfig,
        logbook: &mut Logbook,
    ) -> Result<(), HardwareError> {
        logbook.status(format!("ramp temperature, direction {direction}"));

        if direction == 0 {
            if self.direction != 0 {
                let correction = -RAMP_CORRECTION_DEG * f64::from(self.direction);
                logbook.status(format!("correct {correction:.2}"));
                let target = electronics.get_actuator_temperature()? + correction;
                logbook.status(format!("vhbg={target:.2}"));
                electronics.set_actuator_target_temperature(target)?;
            }
        } else {
            let target = if direction > 0 {
                cfg.max_temperature
            } else {
                cfg.min_temperature
            };
            logbook.status(format!("vhbg={target:.2}"));
            electronics.set_actuator_target_temperature(target)?;
        }

        self.direction = direction;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electronics::Scan;

    /// Records every setpoint write; reports a fixed actual temperature.
    struct ThermalStub {
        temperature: f64,
        setpoints: Vec<f64>,
    }

    impl Electronics for ThermalStub {
        fn set_laser_current(&mut self, _value: f64) -> Result<(), HardwareError> {
            Ok(())
        }
        fn set_actuator_target_temperature(&mut self, value: f64) -> Result<(), HardwareError> {
            self.setpoints.push(value);
            Ok(())
        }
        fn get_actuator_target_temperature(&mut self) -> Result<f64, HardwareError> {
            Ok(*self.setpoints.last().unwrap_or(&self.temperature))
        }
        fn get_actuator_temperature(&mut self) -> Result<f64, HardwareError> {
            Ok(self.temperature)
        }
        fn wait_for_stable_temperatures(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
        fn prepare_ramp_measurement(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
        fn stop_ramp(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
        fn measure_frequencies(&mut self, _center_current: f64) -> Result<Scan, HardwareError> {
            Ok(Scan::new(Vec::new(), Vec::new()))
        }
        fn lock(&mut self, _frequency: f64) -> Result<(), HardwareError> {
            Ok(())
        }
        fn unlock(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
        fn cleanup(&mut self) -> Result<(), HardwareError> {
            Ok(())
        }
    }

    fn stub() -> ThermalStub {
        ThermalStub {
            temperature: 24.3,
            setpoints: Vec::new(),
        }
    }

    #[test]
    fn ramps_to_the_extremes() {
        let cfg = RoughLockConfig::default();
        let mut book = Logbook::new();
        let mut rig = stub();
        let mut ramper = TemperatureRamper::new();

        ramper.ramp(&mut rig, 1, &cfg, &mut book).unwrap();
        assert_eq!(ramper.direction(), 1);
        ramper.ramp(&mut rig, -1, &cfg, &mut book).unwrap();
        assert_eq!(ramper.direction(), -1);
        assert_eq!(rig.setpoints, vec![cfg.max_temperature, cfg.min_temperature]);
    }

    #[test]
    fn stopping_applies_one_corrective_nudge() {
        let cfg = RoughLockConfig::default();
        let mut book = Logbook::new();
        let mut rig = stub();
        let mut ramper = TemperatureRamper::new();

        ramper.ramp(&mut rig, 1, &cfg, &mut book).unwrap();
        ramper.ramp(&mut rig, 0, &cfg, &mut book).unwrap();
        assert_eq!(ramper.direction(), 0);
        // nudge is applied to the measured temperature, not the setpoint
        assert_eq!(rig.setpoints.len(), 2);
        assert!((rig.setpoints[1] - (24.3 - RAMP_CORRECTION_DEG)).abs() < 1.0e-12);

        // stopping an already stopped ramp writes nothing
        ramper.ramp(&mut rig, 0, &cfg, &mut book).unwrap();
        assert_eq!(rig.setpoints.len(), 2);
    }
}
