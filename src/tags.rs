//! Tag name to tag id resolution with a run-wide cache.

use std::collections::HashMap;

use tracing::info;

use crate::library;
use crate::transport::Transport;
use crate::xmlmc::ApiError;

/// Cache of resolved tag ids, keyed by the tag name exactly as written in
/// the input. Entries are never evicted.
#[derive(Debug, Default)]
pub struct TagCache {
    ids: HashMap<String, i64>,
}

impl TagCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<i64> {
        self.ids.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Find or create the tag called `name` and return its id.
    ///
    /// A cached name costs no remote call. Otherwise the tag is looked up
    /// (case-insensitively) and created only when the lookup finds nothing,
    /// so each distinct name is created at most once per run. Failed
    /// lookups are not cached.
    pub fn resolve(&mut self, transport: &dyn Transport, name: &str) -> Result<i64, ApiError> {
        if let Some(id) = self.get(name) {
            info!("Tag Found In Cache: {}", id);
            return Ok(id);
        }

        let id = match library::find_tag_by_name(transport, name)? {
            Some(id) => id,
            None => library::create_tag(transport, name)?,
        };
        self.ids.insert(name.to_string(), id);
        Ok(id)
    }
}
