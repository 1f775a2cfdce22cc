//! Per-row progress on stderr.
//!
//! stdout carries the operator log and the summary, so progress never goes
//! there. Two renderings exist: a counter line for people
//! (`[ 12/140   8%] docs/a.pdf`) and one JSON object per line for wrappers.

use std::io::Write;

use serde::Serialize;

/// Something worth telling the operator while a run is in flight.
#[derive(Clone, Debug, Serialize, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum ImportProgressEvent {
    /// Row `n` (1-based) of `total` is starting.
    Row { n: u64, total: u64, path: String },
    /// Every row has been processed.
    Finished { total: u64 },
}

pub trait ImportProgressReporter {
    fn report(&self, event: ImportProgressEvent);
}

/// `[ n/total pct%] path`, padded so consecutive lines align.
pub fn human_line(event: &ImportProgressEvent) -> String {
    match event {
        ImportProgressEvent::Row { n, total, path } => {
            let width = total.to_string().len();
            format!(
                "[{:>width$}/{} {:>3}%] {}",
                n,
                total,
                percent(*n, *total),
                path,
                width = width
            )
        }
        ImportProgressEvent::Finished { total } => format!("[{0}/{0} 100%] done", total),
    }
}

pub fn json_line(event: &ImportProgressEvent) -> Option<String> {
    serde_json::to_string(event).ok()
}

fn percent(n: u64, total: u64) -> u64 {
    if total == 0 {
        100
    } else {
        n * 100 / total
    }
}

fn emit(line: &str) {
    let mut err = std::io::stderr().lock();
    let _ = writeln!(err, "{}", line);
    let _ = err.flush();
}

pub struct HumanProgress;

impl ImportProgressReporter for HumanProgress {
    fn report(&self, event: ImportProgressEvent) {
        emit(&human_line(&event));
    }
}

pub struct JsonProgress;

impl ImportProgressReporter for JsonProgress {
    fn report(&self, event: ImportProgressEvent) {
        if let Some(line) = json_line(&event) {
            emit(&line);
        }
    }
}

pub struct NoProgress;

impl ImportProgressReporter for NoProgress {
    fn report(&self, _event: ImportProgressEvent) {}
}

/// `--progress` values.
#[derive(Clone, Copy, Debug, Eq, PartialEq, clap::ValueEnum)]
pub enum ProgressFormat {
    Off,
    Human,
    Json,
}

impl ProgressFormat {
    /// The requested format, or human output when nothing was requested and
    /// stderr is a terminal.
    pub fn pick(requested: Option<Self>, stderr_is_tty: bool) -> Self {
        match requested {
            Some(format) => format,
            None if stderr_is_tty => ProgressFormat::Human,
            None => ProgressFormat::Off,
        }
    }

    pub fn reporter(self) -> Box<dyn ImportProgressReporter> {
        match self {
            ProgressFormat::Off => Box::new(NoProgress),
            ProgressFormat::Human => Box::new(HumanProgress),
            ProgressFormat::Json => Box::new(JsonProgress),
        }
    }
}
