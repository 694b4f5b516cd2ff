#![warn(clippy::pedantic)]
#![allow(clippy::cast_precision_loss, clippy::cast_sign_loss)]

use std::ops::Range;

use crate::electronics::Scan;
use crate::linefit::{fit_line, LineFit};

/// Minimum number of samples for a fit to be statistically meaningful.
pub const MIN_SEGMENT_LEN: usize = 5;
/// Upper bound on the relative fit error for a segment to count as a mode.
pub const MAX_RELATIVE_ERROR: f64 = 1.0e-2;
/// Allowed relative deviation of the fitted slope from the expected one.
pub const SLOPE_TOLERANCE: f64 = 0.2;

/// Contiguous sub-range of a scan that fits a laser mode. `frequencies` is
/// already sign-corrected when the fit is mirrored.
#[derive(Debug, Clone)]
pub struct ModeSegment {
    pub currents: Vec<f64>,
    pub frequencies: Vec<f64>,
    pub fit: LineFit,
}

/// Candidate index ranges of a scan of length `len`, coarsest first: the
/// whole scan, then two contiguous halves, then three contiguous thirds.
/// Chunk sizes are `round(len / split)`; the last chunk of a split may be
/// shorter. Short segments are kept here and skipped by the caller.
#[must_use]
pub fn split_to_chunks(len: usize) -> Vec<Range<usize>> {
    let mut out = Vec::new();
    for split in 1..4usize {
        let size = ((len as f64 / split as f64).round() as usize).max(1);
        let mut start = 0;
        while start < len {
            let end = (start + size).min(len);
            out.push(start..end);
            start = end;
        }
    }
    out
}

/// Whether a fitted slope roughly matches the expected slope of a laser mode.
#[inline]
#[must_use]
pub fn is_good_slope(slope: f64, target_slope: f64) -> bool {
    ((target_slope - slope) / target_slope).abs() < SLOPE_TOLERANCE
}

/// Partitions `scan` into candidate segments and returns the first one whose
/// fit looks like a laser mode. Coarser segments are tried first, so the
/// whole-scan fit wins whenever it qualifies. Returns `None` when no segment
/// at any granularity qualifies, which is a normal per-iteration outcome.
#[must_use]
pub fn find_mode(scan: &Scan, target_slope: f64) -> Option<ModeSegment> {
    for range in split_to_chunks(scan.len()) {
        if range.len() < MIN_SEGMENT_LEN {
            continue;
        }
        let currents = &scan.currents[range.clone()];
        let frequencies = &scan.frequencies[range];
        let Some(fit) = fit_line(currents, frequencies) else {
            continue;
        };
        if !is_good_slope(fit.slope, target_slope) || fit.relative_error.abs() >= MAX_RELATIVE_ERROR
        {
            continue;
        }

        let mut frequencies = frequencies.to_vec();
        if fit.mirrored {
            for f in &mut frequencies {
                *f = -*f;
            }
        }
        return Some(ModeSegment {
            currents: currents.to_vec(),
            frequencies,
            fit,
        });
    }
    None
}
