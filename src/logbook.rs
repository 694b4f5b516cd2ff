#![warn(clippy::pedantic)]

use std::fs::File;
use std::io::BufWriter;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::electronics::Scan;

/// One entry of the append-only session log: either a human-readable status
/// line, a raw scan that yielded no mode, or an analyzed scan together with
/// the accepted fit. The search loop only ever appends; the log is consumed
/// offline by [`crate::replay`].
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LogEntry {
    Status {
        message: String,
    },
    RawScan {
        currents: Vec<f64>,
        frequencies: Vec<f64>,
    },
    AnalyzedScan {
        currents: Vec<f64>,
        frequencies: Vec<f64>,
        current_interval: Vec<f64>,
        slope: f64,
        intercept: f64,
    },
}

/// On-disk shape of a dumped session log.
#[derive(Debug, Serialize, Deserialize)]
pub struct LogDump {
    pub start_current: f64,
    pub start_temperature: f64,
    pub log: Vec<LogEntry>,
}

#[derive(Debug, Default)]
pub struct Logbook {
    entries: Vec<LogEntry>,
}

impl Logbook {
    #[must_use]
    pub fn new() -> Self {
        Logbook::default()
    }

    pub fn status(&mut self, message: impl Into<String>) {
        let message = message.into();
        log::info!("{message}");
        self.entries.push(LogEntry::Status { message });
    }

    pub fn raw_scan(&mut self, scan: &Scan) {
        self.entries.push(LogEntry::RawScan {
            currents: scan.currents.clone(),
            frequencies: scan.frequencies.clone(),
        });
    }

    pub fn analyzed_scan(
        &mut self,
        currents: Vec<f64>,
        frequencies: Vec<f64>,
        current_interval: Vec<f64>,
        slope: f64,
        intercept: f64,
    ) {
        self.entries.push(LogEntry::AnalyzedScan {
            currents,
            frequencies,
            current_interval,
            slope,
            intercept,
        });
    }

    #[must_use]
    pub fn entries(&self) -> &[LogEntry] {
        &self.entries
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Writes the whole log as JSON into `folder`, named after the start
    /// conditions like the lab tooling expects (`data-<temp>-<current>.json`).
    ///
    /// # Errors
    /// Returns a message if the folder cannot be created or the file cannot
    /// be written.
    pub fn dump(
        &self,
        folder: &Path,
        start_temperature: f64,
        start_current: f64,
    ) -> Result<PathBuf, String> {
        std::fs::create_dir_all(folder)
            .map_err(|e| format!("failed to create {}: {e}", folder.display()))?;
        let path = folder.join(format!("data-{start_temperature:.2}-{start_current:.2}.json"));
        let file = File::create(&path)
            .map_err(|e| format!("failed to create {}: {e}", path.display()))?;
        let dump = LogDump {
            start_current,
            start_temperature,
            log: self.entries.clone(),
        };
        serde_json::to_writer(BufWriter::new(file), &dump)
            .map_err(|e| format!("failed to write {}: {e}", path.display()))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_and_reload() {
        let mut book = Logbook::new();
        book.status("ramp temperature, direction 1");
        book.raw_scan(&Scan::new(vec![100.0, 101.0], vec![1.0e9, 0.8e9]));
        book.analyzed_scan(
            vec![100.0, 101.0, 102.0],
            vec![1.0e9, 0.8e9, 0.6e9],
            vec![100.0, 101.0],
            -2.0e8,
            2.1e10,
        );
        assert_eq!(book.len(), 3);

        let folder = std::env::temp_dir().join("roughlock-logbook-test");
        let path = book.dump(&folder, 25.0, 110.0).expect("dump should succeed");
        let text = std::fs::read_to_string(&path).expect("dump file readable");
        let reloaded: LogDump = serde_json::from_str(&text).expect("dump file parses");
        assert_eq!(reloaded.log.len(), 3);
        assert!((reloaded.start_current - 110.0).abs() < f64::EPSILON);
        match &reloaded.log[2] {
            LogEntry::AnalyzedScan { slope, .. } => assert!((slope + 2.0e8).abs() < 1.0),
            other => panic!("unexpected entry {other:?}"),
        }
        let _ = std::fs::remove_file(path);
    }
}
