//! Typed Document Manager operations.
//!
//! Each function builds the parameters for one XMLMC method, invokes it
//! through a [`Transport`], and pulls the interesting values out of the
//! reply. Nothing here keeps state; retries, caching and bookkeeping belong
//! to the callers.
//!
//! Identifiers missing from an `ok` reply read as empty (documents) or `0`
//! (tags). A simulated transport produces exactly such replies, which keeps
//! dry runs on the same code path without ever yielding a usable id.

use tracing::info;

use crate::models::{Row, Share};
use crate::transport::Transport;
use crate::xmlmc::{ApiError, Method, Params};

pub const DOCUMENT_ADD: Method = Method::new("library", "documentAdd");
pub const DOCUMENT_CHANGE_OWNER: Method = Method::new("library", "documentChangeOwner");
pub const DOCUMENT_SHARE: Method = Method::new("library", "documentShare");
pub const ADD_TO_COLLECTION: Method =
    Method::new("apps/com.hornbill.docmanager/Collection", "addToCollection");
pub const TAG_GET_LIST: Method = Method::new("library", "tagGetList");
pub const TAG_CREATE: Method = Method::new("library", "tagCreate");
pub const TAG_LINK_OBJECT: Method = Method::new("library", "tagLinkObject");

/// Tag group all document tags live in.
pub const TAG_GROUP: &str = "urn:tagGroup:library";

const OWNER_REASON: &str = "Owner set during import process";

/// Identifiers returned by `documentAdd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreatedDocument {
    pub document_id: String,
    pub activity_stream_id: Option<String>,
}

/// Create a document from the row's staged file.
pub fn create_document(transport: &dyn Transport, row: &Row) -> Result<CreatedDocument, ApiError> {
    info!("Creating Document {}", row.title);
    let mut params = Params::new();
    params.set("title", row.title.as_str());
    if !row.description.is_empty() {
        params.set("description", row.description.as_str());
    }
    params.set("status", row.status.as_str());
    if !row.review_date.is_empty() {
        params.set("reviewDate", row.review_date.as_str());
    }
    if row.versioning_enabled {
        params.set("enableRevisionTracking", "true");
    }
    params.element("serverFile", |p| {
        p.set("fileName", row.file_name.as_str());
        p.set("fileSource", format!("/{}", row.staging_path));
        p.set("mimeType", row.content_type.as_str());
    });

    let resp = transport.invoke(&DOCUMENT_ADD, params)?;
    Ok(CreatedDocument {
        document_id: resp.params.get("documentId").unwrap_or_default().to_string(),
        activity_stream_id: resp.params.get("activityStreamId").map(str::to_string),
    })
}

pub fn set_document_owner(
    transport: &dyn Transport,
    document_id: &str,
    owner: &str,
) -> Result<(), ApiError> {
    info!("Setting Owner {} against Document {}", owner, document_id);
    let mut params = Params::new();
    params
        .set("documentId", document_id)
        .set("owner", format!("urn:sys:user:{}", owner))
        .set("reason", OWNER_REASON);
    transport.invoke(&DOCUMENT_CHANGE_OWNER, params)?;
    Ok(())
}

pub fn add_document_to_collection(
    transport: &dyn Transport,
    document_id: &str,
    collection_id: i64,
) -> Result<(), ApiError> {
    info!(
        "Adding Document {} to Collection {}",
        document_id, collection_id
    );
    let mut params = Params::new();
    params
        .set("collectionId", collection_id.to_string())
        .set("documentId", document_id);
    transport.invoke(&ADD_TO_COLLECTION, params)?;
    Ok(())
}

/// Share a document. Returns the share record id when the service reports one.
pub fn share_document(
    transport: &dyn Transport,
    document_id: &str,
    share: &Share,
) -> Result<Option<String>, ApiError> {
    info!("Sharing Document {} with {}", document_id, share.urn);
    let mut params = Params::new();
    params
        .set("documentId", document_id)
        .set("share", share.urn.as_str());
    params.element("permissions", |p| {
        p.set("read", share.read.to_string());
        p.set("modifyContent", share.modify_content.to_string());
        p.set("modifyMetaData", share.modify_metadata.to_string());
    });
    let resp = transport.invoke(&DOCUMENT_SHARE, params)?;
    Ok(resp.params.get("h_pk_id").map(str::to_string))
}

/// Look a tag up by name. Matching is case-insensitive.
pub fn find_tag_by_name(transport: &dyn Transport, name: &str) -> Result<Option<i64>, ApiError> {
    info!("Searching For Tag: {}", name);
    let mut params = Params::new();
    params
        .set("tagGroup", TAG_GROUP)
        .set("nameFilter", name.replace('\\', "\\\\"));
    let resp = transport.invoke(&TAG_GET_LIST, params)?;

    let wanted = name.to_lowercase();
    for tag in resp.params.elements("name") {
        if tag.get("text").map(str::to_lowercase).as_deref() != Some(wanted.as_str()) {
            continue;
        }
        let id = parse_tag_id(tag.get("tagId"))?;
        info!("Tag Found: {}", id);
        return Ok(Some(id));
    }
    info!("Tag Not Found");
    Ok(None)
}

pub fn create_tag(transport: &dyn Transport, name: &str) -> Result<i64, ApiError> {
    info!("Creating Tag: {}", name);
    let mut params = Params::new();
    params.set("tagGroup", TAG_GROUP);
    params.element("tag", |p| {
        p.set("text", name);
    });
    let resp = transport.invoke(&TAG_CREATE, params)?;
    let id = match resp.params.get("tagId") {
        Some(raw) => parse_tag_id(Some(raw))?,
        None => 0,
    };
    info!("Tag Created Successfully: {}", id);
    Ok(id)
}

pub fn link_tag_to_document(
    transport: &dyn Transport,
    document_id: &str,
    tag_id: i64,
) -> Result<(), ApiError> {
    info!("Linking Tag: {} to Document: {}", tag_id, document_id);
    let mut params = Params::new();
    params
        .set("tagGroup", TAG_GROUP)
        .set("tagID", tag_id.to_string())
        .set("objectRefUrn", format!("urn:lib:document:{}", document_id));
    transport.invoke(&TAG_LINK_OBJECT, params)?;
    Ok(())
}

fn parse_tag_id(raw: Option<&str>) -> Result<i64, ApiError> {
    let raw = raw.unwrap_or_default().trim();
    raw.parse::<i64>()
        .map_err(|_| ApiError::Decode(format!("tag id '{}' is not an integer", raw)))
}
