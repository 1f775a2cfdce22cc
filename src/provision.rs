//! Document provisioning: create the document record, then attach owner,
//! collections, shares and tags.
//!
//! Creation is the only step that can stop a row. Every enrichment call is
//! attempted on its own; a failure is logged and counted and the next one
//! runs regardless. Nothing is rolled back.

use tracing::{error, info};

use crate::library;
use crate::logging::CONSOLE;
use crate::models::Row;
use crate::stats::{Counters, Tally};
use crate::tags::TagCache;
use crate::transport::Transport;
use crate::xmlmc::ApiError;

/// Create the document from the staged file and record its identifiers on
/// the row.
pub fn create(transport: &dyn Transport, row: &mut Row) -> Result<(), ApiError> {
    let created = library::create_document(transport, row)?;
    info!("Document {} Created Successfully", created.document_id);
    row.document_id = Some(created.document_id);
    row.activity_stream_id = created.activity_stream_id;
    Ok(())
}

/// Attach owner, collections, shares and tags to a created document.
///
/// Does nothing for rows without a document id.
pub fn enrich(
    transport: &dyn Transport,
    row: &Row,
    counters: &mut Counters,
    tags: &mut TagCache,
) {
    let Some(document_id) = row.document_id.as_deref() else {
        return;
    };

    if let Some(owner) = row.owner.as_deref().filter(|o| !o.is_empty()) {
        match library::set_document_owner(transport, document_id, owner) {
            Ok(()) => info!("Document Owner Set Successfully"),
            Err(e) => error!(
                target: CONSOLE,
                "Setting owner {} on document {} ({}) failed: {}",
                owner,
                document_id,
                row.source_path,
                e
            ),
        }
    }

    for &collection_id in &row.collections {
        let result = library::add_document_to_collection(transport, document_id, collection_id);
        tally(
            &mut counters.collections,
            result,
            || format!("adding document {} to collection {}", document_id, collection_id),
            "Document Added to Collection Successfully",
        );
    }

    for share in &row.shares {
        let result = library::share_document(transport, document_id, share).map(|share_id| {
            if let Some(id) = share_id {
                info!("Share record: {}", id);
            }
        });
        tally(
            &mut counters.shares,
            result,
            || format!("sharing document {} with {}", document_id, share.urn),
            "Document Shared Successfully",
        );
    }

    for tag in &row.tags {
        let result = tags
            .resolve(transport, tag)
            .and_then(|tag_id| library::link_tag_to_document(transport, document_id, tag_id));
        tally(
            &mut counters.tags,
            result,
            || format!("tagging document {} with '{}'", document_id, tag),
            "Tag Linked Successfully",
        );
    }
}

fn tally(
    counter: &mut Tally,
    result: Result<(), ApiError>,
    what: impl FnOnce() -> String,
    success: &str,
) {
    counter.record(&result);
    match result {
        Ok(()) => info!("{}", success),
        Err(e) => error!(target: CONSOLE, "Error {}: {}", what(), e),
    }
}
