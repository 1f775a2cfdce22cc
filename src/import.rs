//! Import pipeline orchestration.
//!
//! Drives every row through the same sequence, strictly in input order:
//!
//! ```text
//! Pending ──ok──▶ Uploaded ──ok──▶ DocumentCreated ──▶ Enriched ──┐
//!    │               │                                            ├──▶ Cleaned ──▶ Done
//!    │ failed        └─failed──▶ CreateFailed ────────────────────┤
//!    └──────────────────────────▶ UploadFailed ───────────────────┘
//! ```
//!
//! Cleanup runs exactly once per row whatever happened before it. Row
//! failures are counted and logged, never propagated: a run always reaches
//! the end of its input.

use tracing::{debug, error, info};

use crate::logging::CONSOLE;
use crate::models::Row;
use crate::progress::{ImportProgressEvent, ImportProgressReporter, NoProgress};
use crate::provision;
use crate::staging;
use crate::stats::Counters;
use crate::tags::TagCache;
use crate::transport::Transport;

/// Where a row is in the pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowState {
    Pending,
    Uploaded,
    UploadFailed,
    DocumentCreated,
    CreateFailed,
    Enriched,
    Cleaned,
    Done,
}

/// How far a finished row got.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowOutcome {
    /// Uploaded, created and enriched (individual enrichment steps may
    /// still have failed).
    Imported,
    CreateFailed,
    UploadFailed,
}

/// State shared by every row of one run.
#[derive(Debug, Default)]
pub struct RunContext {
    pub counters: Counters,
    pub tags: TagCache,
}

/// Runs rows through the pipeline against one transport.
pub struct Importer<'a> {
    transport: &'a dyn Transport,
    progress: Box<dyn ImportProgressReporter>,
    ctx: RunContext,
}

impl<'a> Importer<'a> {
    pub fn new(transport: &'a dyn Transport) -> Self {
        Self {
            transport,
            progress: Box::new(NoProgress),
            ctx: RunContext::default(),
        }
    }

    pub fn with_progress(mut self, progress: Box<dyn ImportProgressReporter>) -> Self {
        self.progress = progress;
        self
    }

    pub fn counters(&self) -> &Counters {
        &self.ctx.counters
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    /// Process every row in order and return the run counters.
    pub fn run(&mut self, rows: Vec<Row>) -> &Counters {
        let total = rows.len() as u64;
        info!(target: CONSOLE, "Processing {} files", total);

        for (i, mut row) in rows.into_iter().enumerate() {
            self.progress.report(ImportProgressEvent::Row {
                n: i as u64 + 1,
                total,
                path: row.source_path.clone(),
            });
            self.process_row(&mut row);
        }

        self.progress
            .report(ImportProgressEvent::Finished { total });
        &self.ctx.counters
    }

    /// Take one row from `Pending` to `Done`.
    pub fn process_row(&mut self, row: &mut Row) -> RowOutcome {
        info!(target: CONSOLE, "Processing: {}", row.source_path);
        row.prepare();

        let mut outcome = RowOutcome::Imported;
        let mut state = RowState::Pending;

        while state != RowState::Done {
            let next = self.step(state, row);
            debug!("{}: {:?} -> {:?}", row.source_path, state, next);
            match next {
                RowState::UploadFailed => outcome = RowOutcome::UploadFailed,
                RowState::CreateFailed => outcome = RowOutcome::CreateFailed,
                _ => {}
            }
            state = next;
        }
        outcome
    }

    fn step(&mut self, state: RowState, row: &mut Row) -> RowState {
        let counters = &mut self.ctx.counters;
        match state {
            RowState::Pending => {
                let result = staging::upload(self.transport, row);
                counters.session_upload.record(&result);
                match result {
                    Ok(()) => RowState::Uploaded,
                    Err(e) => {
                        error!(
                            target: CONSOLE,
                            "Error adding {} to session: {}", row.source_path, e
                        );
                        RowState::UploadFailed
                    }
                }
            }
            RowState::Uploaded => {
                let result = provision::create(self.transport, row);
                counters.documents.record(&result);
                match result {
                    Ok(()) => RowState::DocumentCreated,
                    Err(e) => {
                        error!(
                            target: CONSOLE,
                            "Error creating document '{}' from {}: {}", row.title, row.source_path, e
                        );
                        RowState::CreateFailed
                    }
                }
            }
            RowState::DocumentCreated => {
                provision::enrich(self.transport, row, counters, &mut self.ctx.tags);
                RowState::Enriched
            }
            RowState::UploadFailed | RowState::CreateFailed | RowState::Enriched => {
                let result = staging::cleanup(self.transport, row);
                counters.session_delete.record(&result);
                if let Err(e) = result {
                    error!(
                        target: CONSOLE,
                        "Error removing {} from session: {}", row.staging_path, e
                    );
                }
                RowState::Cleaned
            }
            RowState::Cleaned | RowState::Done => RowState::Done,
        }
    }
}
