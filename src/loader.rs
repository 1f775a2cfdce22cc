//! CSV input loading.
//!
//! Four files describe an import. Every record is keyed by the source file
//! path in its first column:
//!
//! | File | Columns |
//! |------|---------|
//! | documents | `path,title,status,description,reviewDate,versioningEnabled,owner` |
//! | shares | `path,urn,read,modifyContent,modifyMetaData` |
//! | collections | `path,collectionId` |
//! | tags | `path,tagName` |
//!
//! Records whose first field is blank or a header label are skipped. Short
//! records are accepted; missing columns read as empty. The side files are
//! joined onto their document rows here, so the pipeline receives complete
//! [`Row`]s.

use std::collections::HashMap;
use std::io::Read;
use std::path::Path;

use anyhow::{Context, Result};

use crate::config::InputConfig;
use crate::models::{parse_bool_or_false, Row, Share};

/// First-column values treated as a header row.
const HEADER_LABELS: &[&str] = &["filepath", "path"];

/// Read all configured input files and return joined rows in input order.
pub fn load_rows(input: &InputConfig) -> Result<Vec<Row>> {
    let mut rows = read_documents(open(&input.documents)?)
        .with_context(|| format!("Failed to read {}", input.documents.display()))?;

    let shares = match &input.shares {
        Some(path) => read_shares(open(path)?)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => HashMap::new(),
    };
    let collections = match &input.collections {
        Some(path) => read_collections(open(path)?)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => HashMap::new(),
    };
    let tags = match &input.tags {
        Some(path) => read_tags(open(path)?)
            .with_context(|| format!("Failed to read {}", path.display()))?,
        None => HashMap::new(),
    };

    join(&mut rows, shares, collections, tags);
    Ok(rows)
}

fn open(path: &Path) -> Result<std::fs::File> {
    std::fs::File::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

/// Attach side-table entries to the rows with the same source path.
pub fn join(
    rows: &mut [Row],
    shares: HashMap<String, Vec<Share>>,
    collections: HashMap<String, Vec<i64>>,
    tags: HashMap<String, Vec<String>>,
) {
    for row in rows.iter_mut() {
        // The same path may appear twice in the main file; both rows get
        // the full set of side entries.
        let key = row.source_path.as_str();
        row.shares = shares.get(key).cloned().unwrap_or_default();
        row.collections = collections.get(key).cloned().unwrap_or_default();
        row.tags = tags.get(key).cloned().unwrap_or_default();
    }
}

pub fn read_documents(reader: impl Read) -> Result<Vec<Row>> {
    let mut rows = Vec::new();
    for record in records(reader)? {
        let mut row = Row::new(field(&record, 0));
        row.title = field(&record, 1).to_string();
        row.status = field(&record, 2).to_string();
        row.description = field(&record, 3).to_string();
        row.review_date = field(&record, 4).to_string();
        row.versioning_enabled = parse_bool_or_false(field(&record, 5));
        let owner = field(&record, 6);
        row.owner = (!owner.is_empty()).then(|| owner.to_string());
        rows.push(row);
    }
    Ok(rows)
}

pub fn read_shares(reader: impl Read) -> Result<HashMap<String, Vec<Share>>> {
    let mut shares: HashMap<String, Vec<Share>> = HashMap::new();
    for record in records(reader)? {
        let share = Share {
            urn: field(&record, 1).to_string(),
            read: parse_bool_or_false(field(&record, 2)),
            modify_content: parse_bool_or_false(field(&record, 3)),
            modify_metadata: parse_bool_or_false(field(&record, 4)),
        };
        shares
            .entry(field(&record, 0).to_string())
            .or_default()
            .push(share);
    }
    Ok(shares)
}

/// Non-integer collection ids are dropped without error.
pub fn read_collections(reader: impl Read) -> Result<HashMap<String, Vec<i64>>> {
    let mut collections: HashMap<String, Vec<i64>> = HashMap::new();
    for record in records(reader)? {
        if let Ok(id) = field(&record, 1).parse::<i64>() {
            collections
                .entry(field(&record, 0).to_string())
                .or_default()
                .push(id);
        }
    }
    Ok(collections)
}

pub fn read_tags(reader: impl Read) -> Result<HashMap<String, Vec<String>>> {
    let mut tags: HashMap<String, Vec<String>> = HashMap::new();
    for record in records(reader)? {
        tags.entry(field(&record, 0).to_string())
            .or_default()
            .push(field(&record, 1).to_string());
    }
    Ok(tags)
}

/// All data records: header rows and rows with a blank key removed.
fn records(reader: impl Read) -> Result<Vec<csv::StringRecord>> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut out = Vec::new();
    for record in csv_reader.records() {
        let record = record?;
        let key = field(&record, 0);
        if key.is_empty() || HEADER_LABELS.contains(&key.to_lowercase().as_str()) {
            continue;
        }
        out.push(record);
    }
    Ok(out)
}

fn field(record: &csv::StringRecord, index: usize) -> &str {
    record.get(index).unwrap_or_default()
}
