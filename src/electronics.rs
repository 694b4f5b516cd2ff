#![warn(clippy::pedantic)]

use thiserror::Error;

/// Fault raised by a hardware adapter. The search core never catches these;
/// they unwind to the session so cleanup happens at a single point.
#[derive(Debug, Clone, Error)]
pub enum HardwareError {
    #[error("transport fault: {0}")]
    Transport(String),
    #[error("{device} rejected value {value}")]
    Rejected { device: &'static str, value: f64 },
}

/// One current-vs-frequency ramp measurement. The two series have equal
/// length and the currents are in ascending order. A scan is immutable once
/// captured; the segment search only ever borrows it.
#[derive(Debug, Clone)]
pub struct Scan {
    pub currents: Vec<f64>,
    pub frequencies: Vec<f64>,
}

impl Scan {
    #[must_use]
    pub fn new(currents: Vec<f64>, frequencies: Vec<f64>) -> Self {
        debug_assert_eq!(currents.len(), frequencies.len());
        Scan {
            currents,
            frequencies,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.currents.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.currents.is_empty()
    }
}

/// Capability interface over one optical/electronic rig. The core drives the
/// rough lock exclusively through this trait; the two lab rigs and the
/// simulated rig in [`crate::sim`] are interchangeable behind it.
///
/// All calls block until the underlying transport completes. The only fault
/// class an adapter retries internally is a transient stability check inside
/// `wait_for_stable_temperatures`, which blocks until stable or an operator
/// intervenes.
pub trait Electronics {
    fn set_laser_current(&mut self, value: f64) -> Result<(), HardwareError>;

    fn set_actuator_target_temperature(&mut self, value: f64) -> Result<(), HardwareError>;
    fn get_actuator_target_temperature(&mut self) -> Result<f64, HardwareError>;
    fn get_actuator_temperature(&mut self) -> Result<f64, HardwareError>;

    fn wait_for_stable_temperatures(&mut self) -> Result<(), HardwareError>;

    /// Arms the next ramp acquisition. Idempotent; arming an armed ramp is a
    /// no-op, so the core may call this speculatively.
    fn prepare_ramp_measurement(&mut self) -> Result<(), HardwareError>;
    fn stop_ramp(&mut self) -> Result<(), HardwareError>;

    /// Acquires one scan centered near `center_current`.
    fn measure_frequencies(&mut self, center_current: f64) -> Result<Scan, HardwareError>;

    /// Engage the fine PID stage at `frequency`. Outside the rough-lock core;
    /// exposed for the session hand-off only.
    fn lock(&mut self, frequency: f64) -> Result<(), HardwareError>;
    fn unlock(&mut self) -> Result<(), HardwareError>;

    /// Restores any temporary rig configuration. Must be called exactly once
    /// at session end.
    fn cleanup(&mut self) -> Result<(), HardwareError>;
}
