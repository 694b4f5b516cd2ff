#![warn(clippy::pedantic)]

use crate::configs::RoughLockConfig;
use crate::electronics::{Electronics, Scan};
use crate::errors::RoughLockError;
use crate::logbook::Logbook;
use crate::planner::determine_target_mode;
use crate::scanner::search_initial_mode;
use crate::segment::{find_mode, ModeSegment};
use crate::temperature::TemperatureRamper;
use crate::util::{in_range, settle_ms};

/// Counters and flags of one search attempt. Owned by the loop, created at
/// entry and discarded at exit; nothing else ever touches it.
#[derive(Debug, Default)]
struct SearchState {
    temp_ramp_direction: i32,
    error_counter: u32,
    ramp_started: bool,
    direction_did_reverse: bool,
    temp_changes: u32,
    wiggle_count: u32,
}

/// What a successful search reports back: how often the thermal ramp had to
/// be (re)started and how many wiggle candidates the initial search used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoughLockOutcome {
    pub temp_changes: u32,
    pub wiggle_count: u32,
}

/// The rough-lock state machine. One instance per session; the logbook it
/// accumulates outlives the search so the session can dump it afterwards.
#[derive(Debug)]
pub struct RoughLock {
    cfg: RoughLockConfig,
    pub logbook: Logbook,
    ramper: TemperatureRamper,
    debug: bool,
}

impl RoughLock {
    #[must_use]
    pub fn new(cfg: RoughLockConfig, debug: bool) -> Self {
        RoughLock {
            cfg,
            logbook: Logbook::new(),
            ramper: TemperatureRamper::new(),
            debug,
        }
    }

    #[must_use]
    pub fn config(&self) -> &RoughLockConfig {
        &self.cfg
    }

    fn log_analysis(&mut self, scan: &Scan, segment: &ModeSegment) {
        let mut frequencies = scan.frequencies.clone();
        if segment.fit.mirrored {
            for f in &mut frequencies {
                *f = -*f;
            }
        }
        self.logbook.analyzed_scan(
            scan.currents.clone(),
            frequencies,
            segment.currents.clone(),
            segment.fit.slope,
            segment.fit.intercept,
        );
    }

    /// Runs the search until both target frequencies sit inside one mode.
    ///
    /// Alternates large current excursions (to provoke mode hops toward the
    /// target) with scans at the planned current; a temperature ramp is
    /// started, reversed or stopped depending on what the scans show. The
    /// ramp direction is reversed once after `reversal_threshold` consecutive
    /// scans without a mode; `abort_threshold` further misses end the search.
    ///
    /// # Errors
    /// `NoSlope` if no mode is found at all during the initial search,
    /// `NotReachable` if no planned mode fits the current window,
    /// `TemperatureOutOfBounds` once the retry budget is spent, and any
    /// hardware fault untouched.
    pub fn run<E: Electronics>(
        &mut self,
        electronics: &mut E,
        target_frequencies: (f64, f64),
        start_current: f64,
    ) -> Result<RoughLockOutcome, RoughLockError> {
        let target_frequency = 0.5 * (target_frequencies.0 + target_frequencies.1);

        let initial =
            search_initial_mode(electronics, start_current, &self.cfg, &mut self.logbook)?;
        if self.debug {
            self.log_analysis(&initial.scan, &initial.segment);
        }

        let plan = determine_target_mode(
            &initial.segment.fit,
            target_frequencies,
            start_current,
            &self.cfg,
            &mut self.logbook,
        )?;
        if plan.delta_mode != 0 {
            self.logbook.status(format!(
                "want to move {} modes {}",
                plan.delta_mode.abs(),
                if plan.delta_mode > 0 { "down" } else { "up" }
            ));
        }

        let mut state = SearchState {
            temp_ramp_direction: plan.temp_ramp_direction,
            wiggle_count: initial.wiggle_count,
            ..SearchState::default()
        };
        let mut target_current = plan.target_current;

        loop {
            // swing to the current-limit extreme opposite the ramp direction
            // to bias the next mode hop toward the target, then settle on the
            // planned current
            let excursion = if state.temp_ramp_direction < 0 {
                self.cfg.current_limits.1
            } else {
                self.cfg.current_limits.0
            };
            self.logbook.status(format!("current={excursion:.2}mA"));
            electronics.set_laser_current(excursion)?;
            settle_ms(self.cfg.excursion_settle_ms);
            self.logbook.status(format!("current={target_current:.2}mA"));
            electronics.set_laser_current(target_current)?;
            settle_ms(self.cfg.target_settle_ms);

            let scan = electronics.measure_frequencies(target_current)?;
            // pre-arm the next acquisition; some rigs take a while to get
            // ready, and arming twice is harmless
            electronics.prepare_ramp_measurement()?;

            let Some(segment) = find_mode(&scan, self.cfg.target_slope) else {
                if self.debug {
                    self.logbook.raw_scan(&scan);
                }
                // the beat note may be near zero or beyond the counter range;
                // push the temperature to move the mode boundaries
                if !state.ramp_started {
                    self.ramper.ramp(
                        electronics,
                        state.temp_ramp_direction,
                        &self.cfg,
                        &mut self.logbook,
                    )?;
                    state.ramp_started = true;
                }
                state.error_counter += 1;
                self.logbook
                    .status(format!("no laser mode found #{}", state.error_counter));

                if state.direction_did_reverse {
                    if state.error_counter == self.cfg.abort_threshold {
                        // both ramp directions are spent
                        return Err(RoughLockError::TemperatureOutOfBounds);
                    }
                } else if state.error_counter == self.cfg.reversal_threshold {
                    state.temp_ramp_direction = -state.temp_ramp_direction;
                    self.ramper.ramp(
                        electronics,
                        state.temp_ramp_direction,
                        &self.cfg,
                        &mut self.logbook,
                    )?;
                    state.direction_did_reverse = true;
                    state.error_counter = 0;
                    self.logbook
                        .status("searching for a laser mode in the other ramp direction");
                }
                continue;
            };

            state.error_counter = 0;
            state.direction_did_reverse = false;
            if self.debug {
                self.log_analysis(&scan, &segment);
            }

            // the scan may contain noise beyond the mode; extrapolate the fit
            // across the full scanned current range to get the ideal mode
            let fit = segment.fit;
            let mut envelope = (f64::INFINITY, f64::NEG_INFINITY);
            for &c in &scan.currents {
                let f = fit.at(c);
                envelope.0 = envelope.0.min(f);
                envelope.1 = envelope.1.max(f);
            }
            let mean_freq = 0.5 * (envelope.0 + envelope.1);
            let center_frequency = fit.at(target_current);

            if in_range(target_frequencies.0, envelope)
                && in_range(target_frequencies.1, envelope)
            {
                self.ramper
                    .ramp(electronics, 0, &self.cfg, &mut self.logbook)?;
                return Ok(RoughLockOutcome {
                    temp_changes: state.temp_changes,
                    wiggle_count: state.wiggle_count,
                });
            }

            let very_far_away = (center_frequency - target_frequency).abs()
                > self.cfg.very_far_factor * self.cfg.mode_frequency_spacing;

            if very_far_away {
                // a mode hop is needed; keep the mode boundaries moving
                if !state.ramp_started {
                    self.ramper.ramp(
                        electronics,
                        state.temp_ramp_direction,
                        &self.cfg,
                        &mut self.logbook,
                    )?;
                    state.ramp_started = true;
                    state.temp_changes += 1;
                } else if (mean_freq > 0.0 && state.temp_ramp_direction < 0)
                    || (mean_freq < 0.0 && state.temp_ramp_direction > 0)
                {
                    self.logbook.status("change temperature direction");
                    state.temp_ramp_direction = -state.temp_ramp_direction;
                    self.ramper.ramp(
                        electronics,
                        state.temp_ramp_direction,
                        &self.cfg,
                        &mut self.logbook,
                    )?;
                    state.temp_changes += 1;
                }
            } else {
                // close enough to reach by current alone: stop ramping and
                // retarget on the freshly fitted line
                self.ramper
                    .ramp(electronics, 0, &self.cfg, &mut self.logbook)?;
                target_current = fit.current_for_frequency(target_frequency);
            }
        }
    }
}
