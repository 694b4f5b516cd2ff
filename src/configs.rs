#![allow(clippy::cast_sign_loss, clippy::cast_possible_truncation)]

use gethostname::gethostname;
use std::path::PathBuf;

use crate::sim::SimConfig;
use crate::util::{tomlget, tomlget_opt, tomlget_or};

/// Tuning of the rough-lock search itself. Everything here comes out of the
/// `[rough_lock]` section of the config file; the escalation thresholds and
/// the "very far away" factor are empirically tuned values carried over from
/// the lab and should not be re-derived.
#[derive(Debug, Clone)]
pub struct RoughLockConfig {
    /// Expected slope of a laser mode, Hz per mA. Always negative.
    pub target_slope: f64,
    /// Hard current bounds, mA.
    pub current_limits: (f64, f64),
    /// Allowed window for a planned target current, mA.
    pub target_currents: (f64, f64),
    /// Frequency period between adjacent modes, Hz.
    pub mode_frequency_spacing: f64,
    /// Priority-ordered mode offsets to try, starting at 0.
    pub delta_modes: Vec<i32>,
    /// Peak-to-peak excursion of the scan ramp, in scan units.
    pub ramp_amplitude: f64,
    /// Scan-to-current calibration factor, mA per scan unit.
    pub current_mod_factor: f64,
    /// Thermal ramp extremes, degrees C.
    pub min_temperature: f64,
    pub max_temperature: f64,
    /// A mode hop is needed once the operating point is further than this
    /// fraction of the mode spacing from the mean target frequency.
    pub very_far_factor: f64,
    /// Consecutive no-mode iterations before the ramp direction reverses.
    pub reversal_threshold: u32,
    /// Consecutive no-mode iterations after the reversal before giving up.
    pub abort_threshold: u32,
    /// Settling delays, milliseconds.
    pub excursion_settle_ms: u64,
    pub target_settle_ms: u64,
    pub wiggle_settle_ms: u64,
}

impl Default for RoughLockConfig {
    fn default() -> Self {
        RoughLockConfig {
            target_slope: -2.0e8,
            current_limits: (90.0, 150.0),
            target_currents: (100.0, 120.0),
            mode_frequency_spacing: 3.0e9,
            delta_modes: vec![0, 1, -1, 2, -2, 3, -3],
            ramp_amplitude: 5.0,
            current_mod_factor: 1.0,
            min_temperature: 18.0,
            max_temperature: 32.0,
            very_far_factor: 0.8,
            reversal_threshold: 7,
            abort_threshold: 25,
            excursion_settle_ms: 300,
            target_settle_ms: 700,
            wiggle_settle_ms: 500,
        }
    }
}

/// Session-level parameters: what to lock to, where to start, and the
/// housekeeping delays of the initial ramp-up.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// The two desired beat-note offset frequencies, sorted ascending.
    pub target_frequencies: (f64, f64),
    pub start_current: f64,
    pub start_temperature: f64,
    /// Record scan data into the logbook for offline replay.
    pub debug: bool,
    /// Where logbook dumps end up.
    pub data_folder: PathBuf,
    pub prepare_settle_ms: u64,
    pub sweep_settle_ms: u64,
    pub start_settle_ms: u64,
    pub lock_settle_ms: u64,
}

impl Default for SessionParams {
    fn default() -> Self {
        SessionParams {
            target_frequencies: (2.4e9, 4.4e9),
            start_current: 110.0,
            start_temperature: 25.0,
            debug: false,
            data_folder: PathBuf::from("data"),
            prepare_settle_ms: 5000,
            sweep_settle_ms: 500,
            start_settle_ms: 3000,
            lock_settle_ms: 1000,
        }
    }
}

fn float_pair(cfg: &toml::Value, sec: &str, key: &str, or: (f64, f64)) -> (f64, f64) {
    let parsed = cfg
        .get(sec)
        .and_then(|s| s.get(key))
        .and_then(toml::Value::as_array)
        .and_then(|arr| match arr.as_slice() {
            [a, b] => Some((a.as_float()?, b.as_float()?)),
            _ => None,
        });
    parsed.unwrap_or_else(|| {
        log::warn!("failed to read {sec}:{key} as a float pair; proceeding with default {or:?}");
        or
    })
}

fn int_list(cfg: &toml::Value, sec: &str, key: &str, or: &[i32]) -> Vec<i32> {
    let parsed = cfg
        .get(sec)
        .and_then(|s| s.get(key))
        .and_then(toml::Value::as_array)
        .and_then(|arr| {
            arr.iter()
                .map(|v| v.as_integer().map(|x| x as i32))
                .collect::<Option<Vec<i32>>>()
        });
    parsed.unwrap_or_else(|| {
        log::warn!("failed to read {sec}:{key} as an integer list; proceeding with default {or:?}");
        or.to_vec()
    })
}

/// # Errors
/// Returns a message when a mandatory key is missing or malformed.
pub fn rough_lock_from_config(cfg: &toml::Value) -> Result<RoughLockConfig, String> {
    let d = RoughLockConfig::default();
    let out = RoughLockConfig {
        target_slope: tomlget!(cfg, "rough_lock", "target_slope", as_float, f64),
        current_limits: float_pair(cfg, "rough_lock", "current_limits", d.current_limits),
        target_currents: float_pair(cfg, "rough_lock", "target_currents", d.target_currents),
        mode_frequency_spacing: tomlget!(
            cfg,
            "rough_lock",
            "mode_frequency_spacing",
            as_float,
            f64
        ),
        delta_modes: int_list(cfg, "rough_lock", "delta_modes", &d.delta_modes),
        ramp_amplitude: tomlget_or!(cfg, "rough_lock", "ramp_amplitude", as_float, f64, 5.0),
        current_mod_factor: tomlget_or!(
            cfg,
            "rough_lock",
            "current_mod_factor",
            as_float,
            f64,
            1.0
        ),
        min_temperature: tomlget!(cfg, "rough_lock", "min_temperature", as_float, f64),
        max_temperature: tomlget!(cfg, "rough_lock", "max_temperature", as_float, f64),
        very_far_factor: tomlget_or!(cfg, "rough_lock", "very_far_factor", as_float, f64, 0.8),
        reversal_threshold: tomlget_or!(cfg, "rough_lock", "reversal_threshold", as_integer, u32, 7),
        abort_threshold: tomlget_or!(cfg, "rough_lock", "abort_threshold", as_integer, u32, 25),
        excursion_settle_ms: tomlget_or!(
            cfg,
            "rough_lock",
            "excursion_settle_ms",
            as_integer,
            u64,
            300
        ),
        target_settle_ms: tomlget_or!(cfg, "rough_lock", "target_settle_ms", as_integer, u64, 700),
        wiggle_settle_ms: tomlget_or!(cfg, "rough_lock", "wiggle_settle_ms", as_integer, u64, 500),
    };
    if out.target_slope >= 0.0 {
        return Err("rough_lock:target_slope must be negative".into());
    }
    if out.delta_modes.first() != Some(&0) {
        return Err("rough_lock:delta_modes must start with offset 0".into());
    }
    Ok(out)
}

/// Session parameters, with per-host overrides for the start conditions the
/// way the rigs differ in the lab (a `[<hostname>]` section may override
/// `start_current` and `start_temperature`).
///
/// # Errors
/// Returns a message when a mandatory key is missing or malformed.
pub fn session_from_config(cfg: &toml::Value) -> Result<SessionParams, String> {
    let d = SessionParams::default();
    let targets = float_pair(cfg, "session", "target_frequencies", d.target_frequencies);
    let mut out = SessionParams {
        target_frequencies: (targets.0.min(targets.1), targets.0.max(targets.1)),
        start_current: tomlget!(cfg, "session", "start_current", as_float, f64),
        start_temperature: tomlget!(cfg, "session", "start_temperature", as_float, f64),
        debug: tomlget_or!(cfg, "session", "debug", as_bool, false),
        data_folder: PathBuf::from(tomlget_or!(cfg, "session", "data_folder", as_str, "data")),
        prepare_settle_ms: tomlget_or!(cfg, "session", "prepare_settle_ms", as_integer, u64, 5000),
        sweep_settle_ms: tomlget_or!(cfg, "session", "sweep_settle_ms", as_integer, u64, 500),
        start_settle_ms: tomlget_or!(cfg, "session", "start_settle_ms", as_integer, u64, 3000),
        lock_settle_ms: tomlget_or!(cfg, "session", "lock_settle_ms", as_integer, u64, 1000),
    };
    if let Ok(hostname) = gethostname().into_string() {
        if let Some(c) = tomlget_opt!(cfg, hostname.as_str(), "start_current", as_float, f64) {
            out.start_current = c;
        }
        if let Some(t) = tomlget_opt!(cfg, hostname.as_str(), "start_temperature", as_float, f64) {
            out.start_temperature = t;
        }
    }
    Ok(out)
}

/// Parameters of the simulated rig, `[sim]` section. Everything is optional;
/// the defaults describe a rig on which the default session converges.
#[must_use]
pub fn sim_from_config(cfg: &toml::Value) -> SimConfig {
    let d = SimConfig::default();
    SimConfig {
        slope: tomlget_or!(cfg, "sim", "slope", as_float, f64, d.slope),
        intercept: tomlget_or!(cfg, "sim", "intercept", as_float, f64, d.intercept),
        mode_frequency_spacing: tomlget_or!(
            cfg,
            "sim",
            "mode_frequency_spacing",
            as_float,
            f64,
            d.mode_frequency_spacing
        ),
        mode_width_ma: tomlget_or!(cfg, "sim", "mode_width_ma", as_float, f64, d.mode_width_ma),
        boundary_drift_ma_per_deg: tomlget_or!(
            cfg,
            "sim",
            "boundary_drift_ma_per_deg",
            as_float,
            f64,
            d.boundary_drift_ma_per_deg
        ),
        reference_temperature: tomlget_or!(
            cfg,
            "sim",
            "reference_temperature",
            as_float,
            f64,
            d.reference_temperature
        ),
        thermal_rate_deg_per_scan: tomlget_or!(
            cfg,
            "sim",
            "thermal_rate_deg_per_scan",
            as_float,
            f64,
            d.thermal_rate_deg_per_scan
        ),
        scan_points: tomlget_or!(cfg, "sim", "scan_points", as_integer, usize, 128),
        scan_span_ma: tomlget_or!(cfg, "sim", "scan_span_ma", as_float, f64, d.scan_span_ma),
        max_counter_hz: tomlget_or!(
            cfg,
            "sim",
            "max_counter_hz",
            as_float,
            f64,
            d.max_counter_hz
        ),
    }
}
