#![warn(clippy::pedantic)]

use crate::configs::RoughLockConfig;
use crate::electronics::{Electronics, Scan};
use crate::errors::RoughLockError;
use crate::logbook::Logbook;
use crate::segment::{find_mode, ModeSegment};
use crate::util::settle_ms;

/// Step between successive wiggle candidates, mA.
pub const WIGGLE_STEP_MA: f64 = 3.0;
/// Number of wiggle steps tried on each side of the start current.
pub const WIGGLE_STEPS: i32 = 9;

/// Result of the initial mode search: the scan that contained the mode, the
/// accepted segment, and the 0-based index of the wiggle candidate that hit.
#[derive(Debug)]
pub struct InitialMode {
    pub scan: Scan,
    pub segment: ModeSegment,
    pub wiggle_count: u32,
}

/// The bounded candidate sequence for the initial search: the start current
/// first, then alternating higher/lower values in 3 mA steps. A candidate is
/// emitted only if the scan excursion around it stays strictly inside the
/// hard current limits.
#[must_use]
pub fn wiggle_currents(start_current: f64, cfg: &RoughLockConfig) -> Vec<f64> {
    let margin = cfg.ramp_amplitude * cfg.current_mod_factor;
    let mut out = vec![start_current];
    for i in 1..=WIGGLE_STEPS {
        let high = start_current + f64::from(i) * WIGGLE_STEP_MA;
        let low = start_current - f64::from(i) * WIGGLE_STEP_MA;
        if high + margin < cfg.current_limits.1 {
            out.push(high);
        }
        if low - margin > cfg.current_limits.0 {
            out.push(low);
        }
    }
    out
}

/// Wiggles the drive current through the candidate sequence until a scan
/// shows a valid mode segment.
///
/// # Errors
/// `NoSlope` when the sequence is exhausted without a hit; this is a normal
/// outcome meaning the laser is not currently near a usable mode. Hardware
/// faults propagate untouched.
pub fn search_initial_mode<E: Electronics>(
    electronics: &mut E,
    start_current: f64,
    cfg: &RoughLockConfig,
    logbook: &mut Logbook,
) -> Result<InitialMode, RoughLockError> {
    for (n, &current) in wiggle_currents(start_current, cfg).iter().enumerate() {
        if n != 0 {
            logbook.status(format!("current={current:.2}mA"));
            electronics.set_laser_current(current)?;
            settle_ms(cfg.wiggle_settle_ms);
        }

        let scan = electronics.measure_frequencies(current)?;
        electronics.prepare_ramp_measurement()?;

        if let Some(segment) = find_mode(&scan, cfg.target_slope) {
            #[allow(clippy::cast_possible_truncation)]
            return Ok(InitialMode {
                scan,
                segment,
                wiggle_count: n as u32,
            });
        }

        logbook.status("no slope found");
        logbook.raw_scan(&scan);
    }
    Err(RoughLockError::NoSlope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::electronics::HardwareError;
    use crate::linefit::line;

    fn cfg() -> RoughLockConfig {
        RoughLockConfig {
            current_limits: (90.0, 150.0),
            ramp_amplitude: 5.0,
            current_mod_factor: 1.0,
            wiggle_settle_ms: 0,
            ..RoughLockConfig::default()
        }
    }

    #[test]
    fn wiggle_sequence_respects_bounds() {
        let seq = wiggle_currents(110.0, &cfg());
        // start first, then alternating high/low
        assert_eq!(seq[0], 110.0);
        assert_eq!(seq[1], 113.0);
        assert_eq!(seq[2], 107.0);
        // 110 + 27 = 137 keeps its excursion inside 150 and is emitted
        assert!(seq.contains(&137.0));
        // the sequence never reaches 140 at all
        assert!(!seq.contains(&140.0));
        // 110 - 15 = 95 would put 95 - 5 = 90 on the lower limit: excluded
        assert!(!seq.contains(&95.0));
        assert!(seq.contains(&98.0));
        assert_eq!(seq.len(), 1 + 9 + 4);
    }

    /// A rig that answers every scan with the same straight line.
    struct LineRig {
        slope: f64,
        intercept: f64,
        measure_calls: u32,
    }

    impl LineRig {
        fn scan(&self, center: f64) -> Scan {
            let n = 64;
            let span = 15.0;
            let currents: Vec<f64> = (0..n)
                .map(|i| center - span / 2.0 + span * f64::from(i) / f64::from(n - 1))
                .collect();
            let frequencies = currents
                .iter()
                .map(|&c| line(c, self.slope, self.intercept))
                .collect();
            Scan::new(currents, frequencies)
        }
    }

    impl Electronics for LineRig {
        fn set_laser_current(&mut self, _value: f64) -> Result<(), HardwareError> {
            Ok(())
        }
        fn set_actuator_target_temperature(&mut self, _value: f64) -> Result<(), HardwareError> {
            Ok(())
        }
        fn get_actuator_target_temperature(&mut self) -> Result<f64, HardwareError> {
            Ok(25.0)
        }
        fn get_actuator_temperature(&mut self) -> Result<f64, HardwareError> {
            Ok(25.0)
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
        fn measure_frequencies(&mut self, center_current: f64) -> Result<Scan, HardwareError> {
            self.measure_calls += 1;
            Ok(self.scan(center_current))
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

    #[test]
    fn first_candidate_hits_on_a_clean_mode() {
        let mut rig = LineRig {
            slope: -2.0e8,
            intercept: 5.0e10,
            measure_calls: 0,
        };
        let mut book = Logbook::new();
        let initial = search_initial_mode(&mut rig, 110.0, &cfg(), &mut book)
            .expect("mode should be found immediately");
        assert_eq!(initial.wiggle_count, 0);
        assert_eq!(rig.measure_calls, 1);
        assert!((initial.segment.fit.slope + 2.0e8).abs() / 2.0e8 < 1.0e-6);
    }

    #[test]
    fn exhausted_sequence_is_no_slope() {
        // a dead counter reads zero everywhere: the fit degenerates and no
        // candidate ever validates
        let mut rig = LineRig {
            slope: 0.0,
            intercept: 0.0,
            measure_calls: 0,
        };
        let mut book = Logbook::new();
        let err = search_initial_mode(&mut rig, 110.0, &cfg(), &mut book)
            .expect_err("nothing to find");
        assert!(matches!(err, RoughLockError::NoSlope));
        assert!(!err.is_terminal());
        assert_eq!(rig.measure_calls, 14);
    }
}
