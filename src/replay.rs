#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::BufReader;
use std::path::Path;

use crate::linefit::line;
use crate::logbook::{LogDump, LogEntry};
use crate::util::in_range;

/// # Errors
/// Returns a message if the file is missing or not a valid dump.
pub fn load(path: &Path) -> Result<LogDump, String> {
    let file =
        File::open(path).map_err(|e| format!("failed to open {}: {e}", path.display()))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|e| format!("failed to parse {}: {e}", path.display()))
}

fn bounds(values: &[f64]) -> (f64, f64) {
    values.iter().fold(
        (f64::INFINITY, f64::NEG_INFINITY),
        |(lo, hi), &v| (lo.min(v), hi.max(v)),
    )
}

/// Renders a dumped session log back into human-readable lines, re-deriving
/// from each analyzed scan whether the target frequencies sat inside the
/// fitted mode at that point. Useful when a session misbehaved in the lab and
/// only the JSON dump made it home.
#[must_use]
pub fn render(entries: &[LogEntry], target_frequencies: (f64, f64)) -> Vec<String> {
    entries
        .iter()
        .map(|entry| match entry {
            LogEntry::Status { message } => message.clone(),
            LogEntry::RawScan {
                currents,
                frequencies,
            } => {
                let (c_lo, c_hi) = bounds(currents);
                let (f_lo, f_hi) = bounds(frequencies);
                format!(
                    "raw scan: {} points, {c_lo:.2}..{c_hi:.2}mA, {f_lo:.3e}..{f_hi:.3e}Hz, no mode",
                    currents.len()
                )
            }
            LogEntry::AnalyzedScan {
                currents,
                slope,
                intercept,
                ..
            } => {
                let (c_lo, c_hi) = bounds(currents);
                let ends = (line(c_lo, *slope, *intercept), line(c_hi, *slope, *intercept));
                let envelope = (ends.0.min(ends.1), ends.0.max(ends.1));
                let verdict = if in_range(target_frequencies.0, envelope)
                    && in_range(target_frequencies.1, envelope)
                {
                    "targets inside"
                } else {
                    "targets outside"
                };
                format!(
                    "mode: slope {slope:.3e}, {:.3e}..{:.3e}Hz over {c_lo:.2}..{c_hi:.2}mA, {verdict}",
                    envelope.0, envelope.1
                )
            }
        })
        .collect()
}

/// Prints a dump to stdout, one line per entry.
pub fn replay(dump: &LogDump, target_frequencies: (f64, f64)) {
    println!(
        "session start: {:.2}mA at {:.2} degrees, {} entries",
        dump.start_current,
        dump.start_temperature,
        dump.log.len()
    );
    for rendered_line in render(&dump.log, target_frequencies) {
        println!("{rendered_line}");
    }
}
