//! Run counters and the end-of-run summary.
//!
//! Six success/failure pairs are kept for the whole run. They are the only
//! aggregate state reported to the operator.

use tracing::info;

use crate::logging::CONSOLE;

/// Success/failure pair for one kind of operation.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct Tally {
    pub success: u64,
    pub failed: u64,
}

impl Tally {
    pub fn record<T, E>(&mut self, result: &Result<T, E>) {
        match result {
            Ok(_) => self.success += 1,
            Err(_) => self.failed += 1,
        }
    }
}

/// Counters for one import run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Counters {
    pub session_upload: Tally,
    pub session_delete: Tally,
    pub documents: Tally,
    pub collections: Tally,
    pub shares: Tally,
    pub tags: Tally,
}

impl Counters {
    /// Rows in report order: label and tally.
    pub fn rows(&self) -> [(&'static str, Tally); 6] {
        [
            ("files added to session", self.session_upload),
            ("documents created", self.documents),
            ("collection links", self.collections),
            ("shares created", self.shares),
            ("tags applied", self.tags),
            ("files cleaned from session", self.session_delete),
        ]
    }

    /// Render the summary table.
    pub fn summary_lines(&self) -> Vec<String> {
        let mut lines = vec![
            "Import summary".to_string(),
            "==============".to_string(),
            format!("  {:<28} {:>8} {:>8}", "STEP", "OK", "FAILED"),
            format!("  {}", "-".repeat(46)),
        ];
        for (label, tally) in self.rows() {
            lines.push(format!(
                "  {:<28} {:>8} {:>8}",
                label, tally.success, tally.failed
            ));
        }
        lines
    }

    /// Write the summary to the console and the log file.
    pub fn report(&self) {
        for line in self.summary_lines() {
            info!(target: CONSOLE, "{}", line);
        }
    }
}
