#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss)]

/// Result of a least-squares line fit `frequency = slope * current + intercept`.
///
/// The stored slope is always negative: physical laser modes tune downward in
/// frequency with increasing current. If the raw fit came out with a positive
/// slope, both parameters are negated and `mirrored` is set, and the caller
/// must negate the frequency series it carries forward.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineFit {
    pub slope: f64,
    pub intercept: f64,
    pub relative_error: f64,
    pub mirrored: bool,
}

impl LineFit {
    /// Frequency of the fitted mode at `current`.
    #[inline]
    #[must_use]
    pub fn at(&self, current: f64) -> f64 {
        line(current, self.slope, self.intercept)
    }

    /// Current needed to reach `frequency` on the fitted mode.
    #[inline]
    #[must_use]
    pub fn current_for_frequency(&self, frequency: f64) -> f64 {
        find_current_for_frequency(frequency, self.slope, self.intercept)
    }
}

#[inline]
#[must_use]
pub fn line(x: f64, m: f64, t: f64) -> f64 {
    m * x + t
}

#[inline]
#[must_use]
pub fn find_current_for_frequency(freq: f64, m: f64, t: f64) -> f64 {
    (freq - t) / m
}

/// Least-squares fit of a straight line with the parameter standard errors
/// taken from the fit covariance; `relative_error` is the mean of
/// `|m_err / m|` and `|t_err / t|`.
///
/// Returns `None` on degenerate input: fewer than 3 samples, fewer than 2
/// distinct current values, or a fit with `m == 0` / `t == 0` for which the
/// relative error is undefined. Callers treat this as "no mode here", never
/// as a hard failure.
#[must_use]
pub fn fit_line(currents: &[f64], frequencies: &[f64]) -> Option<LineFit> {
    let n = currents.len();
    if n < 3 || n != frequencies.len() {
        return None;
    }
    let nf = n as f64;

    let sx: f64 = currents.iter().sum();
    let sy: f64 = frequencies.iter().sum();
    let sxx: f64 = currents.iter().map(|x| x * x).sum();
    let sxy: f64 = currents.iter().zip(frequencies).map(|(x, y)| x * y).sum();

    let delta = nf * sxx - sx * sx;
    if delta.abs() <= f64::EPSILON * nf * sxx.abs().max(1.0) {
        return None;
    }

    let m = (nf * sxy - sx * sy) / delta;
    let t = (sxx * sy - sx * sxy) / delta;
    if m == 0.0 || t == 0.0 {
        return None;
    }

    // residual variance with 2 fitted parameters, as curve-fit covariance
    let ss_res: f64 = currents
        .iter()
        .zip(frequencies)
        .map(|(x, y)| {
            let r = y - line(*x, m, t);
            r * r
        })
        .sum();
    let s2 = ss_res / (nf - 2.0);
    let m_err = (nf * s2 / delta).sqrt();
    let t_err = (s2 * sxx / delta).sqrt();
    let relative_error = 0.5 * ((m_err / m).abs() + (t_err / t).abs());

    if m > 0.0 {
        Some(LineFit {
            slope: -m,
            intercept: -t,
            relative_error,
            mirrored: true,
        })
    } else {
        Some(LineFit {
            slope: m,
            intercept: t,
            relative_error,
            mirrored: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use rand::Rng;

    use super::*;

    fn series(slope: f64, intercept: f64, n: usize) -> (Vec<f64>, Vec<f64>) {
        let currents: Vec<f64> = (0..n).map(|i| 100.0 + i as f64 * 0.25).collect();
        let frequencies: Vec<f64> = currents.iter().map(|&c| line(c, slope, intercept)).collect();
        (currents, frequencies)
    }

    #[test]
    fn exact_negative_slope() {
        let (curr, freq) = series(-2.0e8, 5.0e10, 32);
        let fit = fit_line(&curr, &freq).expect("fit should succeed");
        assert!(!fit.mirrored);
        assert!((fit.slope + 2.0e8).abs() < 1.0);
        assert!((fit.intercept - 5.0e10).abs() < 1.0e3);
        assert!(fit.relative_error < 1.0e-10);
    }

    #[test]
    fn positive_slope_is_mirrored() {
        let (curr, freq) = series(3.0e8, -1.0e10, 32);
        let fit = fit_line(&curr, &freq).expect("fit should succeed");
        assert!(fit.mirrored);
        assert!((fit.slope + 3.0e8).abs() < 1.0);
        assert!((fit.intercept - 1.0e10).abs() < 1.0e3);
    }

    #[test]
    fn noisy_fit_has_small_relative_error() {
        let mut rng = rand::thread_rng();
        let (curr, mut freq) = series(-2.0e8, 5.0e10, 128);
        for f in &mut freq {
            *f += rng.gen_range(-1.0e6..1.0e6);
        }
        let fit = fit_line(&curr, &freq).expect("fit should succeed");
        assert!((fit.slope + 2.0e8).abs() / 2.0e8 < 0.01);
        assert!(fit.relative_error < 1.0e-2);
    }

    #[test]
    fn degenerate_inputs_fail_softly() {
        // fewer than 3 samples
        assert!(fit_line(&[100.0, 101.0], &[1.0, 2.0]).is_none());
        // single distinct current value
        let curr = vec![110.0; 8];
        let freq: Vec<f64> = (0..8).map(|i| f64::from(i)).collect();
        assert!(fit_line(&curr, &freq).is_none());
        // horizontal line through zero: m == 0 and t == 0
        let curr: Vec<f64> = (0..8).map(|i| 100.0 + f64::from(i)).collect();
        let freq = vec![0.0; 8];
        assert!(fit_line(&curr, &freq).is_none());
    }

    #[test]
    fn current_for_frequency_inverts_the_line() {
        let fit = LineFit {
            slope: -2.0e8,
            intercept: 5.0e10,
            relative_error: 0.0,
            mirrored: false,
        };
        let c = fit.current_for_frequency(2.4e9);
        assert!((fit.at(c) - 2.4e9).abs() < 1.0);
    }
}
