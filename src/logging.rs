//! Log file and console output.
//!
//! Every event goes to a per-run log file `docimport_<timestamp>.log` in the
//! log directory (INFO, or DEBUG with `--debug`). Only events logged with
//! target [`CONSOLE`] are echoed to stdout, so the terminal shows progress and
//! errors while the file keeps the full call trace.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::level_filters::LevelFilter;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, Layer};

/// Target for events that should also be shown on stdout.
pub const CONSOLE: &str = "console";

pub const LOG_PREFIX: &str = "docimport";

/// File name for a run started now.
pub fn log_file_name() -> String {
    format!(
        "{}_{}.log",
        LOG_PREFIX,
        chrono::Local::now().format("%Y%m%d%H%M%S")
    )
}

/// Create the log directory and install the global subscriber.
///
/// Returns the path of the log file for this run.
pub fn init(log_dir: &Path, debug: bool) -> Result<PathBuf> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Error creating log folder {}", log_dir.display()))?;

    let file_name = log_file_name();
    let stem = file_name.trim_end_matches(".log").to_string();
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(stem)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Error creating log file in {}", log_dir.display()))?;

    let file_level = if debug {
        LevelFilter::DEBUG
    } else {
        LevelFilter::INFO
    };

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(atty::is(atty::Stream::Stdout))
                .without_time()
                .with_writer(std::io::stdout)
                .with_filter(filter_fn(|meta| meta.target() == CONSOLE))
                .with_filter(file_level),
        )
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(appender)
                .with_filter(file_level),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    Ok(log_dir.join(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_file_name_has_prefix_and_timestamp() {
        let name = log_file_name();
        assert!(name.starts_with("docimport_"));
        assert!(name.ends_with(".log"));
        let stamp = &name["docimport_".len()..name.len() - ".log".len()];
        assert_eq!(stamp.len(), 14);
        assert!(stamp.chars().all(|c| c.is_ascii_digit()));
    }
}
