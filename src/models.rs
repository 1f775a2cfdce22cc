//! Core data models used throughout the importer.
//!
//! A [`Row`] is one document import unit. Its shares, collection links and
//! tags are joined onto it by the loader, so each pipeline step only ever
//! looks at the row it is given.

use std::path::Path;

/// Staging folder under the API user's session.
pub const STAGING_DIR: &str = "session";

/// A principal a document is shared with, plus its permissions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Share {
    pub urn: String,
    pub read: bool,
    pub modify_content: bool,
    pub modify_metadata: bool,
}

/// One document to import, joined with everything that hangs off it.
#[derive(Debug, Clone, Default)]
pub struct Row {
    pub source_path: String,
    pub title: String,
    pub status: String,
    pub description: String,
    pub review_date: String,
    pub versioning_enabled: bool,
    pub owner: Option<String>,

    pub shares: Vec<Share>,
    pub collections: Vec<i64>,
    pub tags: Vec<String>,

    // Populated while the row moves through the pipeline.
    pub file_name: String,
    pub staging_path: String,
    pub content_type: String,
    pub document_id: Option<String>,
    pub activity_stream_id: Option<String>,
}

impl Row {
    pub fn new(source_path: impl Into<String>) -> Self {
        Self {
            source_path: source_path.into(),
            ..Default::default()
        }
    }

    /// Derive the file name, staging path and (when blank) the title.
    pub fn prepare(&mut self) {
        let path = Path::new(&self.source_path);
        self.file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.source_path.clone());
        self.staging_path = format!("{}/{}", STAGING_DIR, self.file_name);

        if self.title.is_empty() {
            self.title = Path::new(&self.file_name)
                .file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_else(|| self.file_name.clone());
        }
    }
}

/// Parse a boolean the way the input files are written, defaulting to
/// `false` for anything unrecognised (including blanks).
pub fn parse_bool_or_false(value: &str) -> bool {
    matches!(value, "1" | "t" | "T" | "TRUE" | "true" | "True")
}
