//! End-to-end pipeline tests against an in-memory transport.

use std::cell::{Cell, RefCell};
use std::fs;
use std::path::Path;

use docimport::config::InputConfig;
use docimport::import::{Importer, RowOutcome};
use docimport::loader;
use docimport::models::{Row, Share};
use docimport::stats::Tally;
use docimport::transport::{DryRunTransport, Transport};
use docimport::xmlmc::{ApiError, Method, Params, Response};
use tempfile::TempDir;

/// Records every call as a short trace line and answers like the service
/// would. Operations listed in `fail` return an error.
#[derive(Default)]
struct Recorder {
    trace: RefCell<Vec<String>>,
    fail: Vec<&'static str>,
    next_id: Cell<u32>,
}

impl Recorder {
    fn failing(fail: Vec<&'static str>) -> Self {
        Self {
            fail,
            ..Default::default()
        }
    }

    fn count(&self, op: &str) -> usize {
        self.trace
            .borrow()
            .iter()
            .filter(|l| l.split(' ').next() == Some(op))
            .count()
    }

    fn next(&self) -> u32 {
        let id = self.next_id.get() + 1;
        self.next_id.set(id);
        id
    }

    fn check(&self, op: &'static str) -> Result<(), ApiError> {
        if self.fail.contains(&op) {
            Err(ApiError::Method {
                method: op.to_string(),
                message: "refused".to_string(),
            })
        } else {
            Ok(())
        }
    }
}

impl Transport for Recorder {
    fn upload(&self, path: &str, _bytes: Vec<u8>, _content_type: &str) -> Result<(), ApiError> {
        self.trace.borrow_mut().push(format!("PUT {}", path));
        self.check("PUT")
    }

    fn delete(&self, path: &str) -> Result<(), ApiError> {
        self.trace.borrow_mut().push(format!("DELETE {}", path));
        self.check("DELETE")
    }

    fn invoke(&self, method: &Method, params: Params) -> Result<Response, ApiError> {
        self.trace
            .borrow_mut()
            .push(format!("{} {}", method.name, params.render()));
        self.check(method.name)?;

        let mut resp = Response::synthetic_ok();
        match method.name {
            "documentAdd" => {
                resp.params
                    .set("documentId", format!("DOC-{}", self.next()))
                    .set("activityStreamId", "urn:buzz:activityStream:1");
            }
            "tagCreate" => {
                resp.params.set("tagId", self.next().to_string());
            }
            _ => {}
        }
        Ok(resp)
    }
}

fn write_file(dir: &Path, name: &str, body: &[u8]) -> String {
    let path = dir.join(name);
    fs::write(&path, body).unwrap();
    path.to_string_lossy().to_string()
}

fn row(path: &str) -> Row {
    let mut row = Row::new(path);
    row.status = "published".to_string();
    row
}

#[test]
fn cleanup_runs_once_for_every_row() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.pdf", b"%PDF-1.4");
    let b = write_file(tmp.path(), "b.txt", b"hello");
    let missing = tmp.path().join("gone.pdf").to_string_lossy().to_string();

    let t = Recorder::default();
    let mut importer = Importer::new(&t);
    let counters = importer.run(vec![row(&a), row(&missing), row(&b)]).clone();

    assert_eq!(t.count("DELETE"), 3);
    assert_eq!(counters.session_delete, Tally { success: 3, failed: 0 });
}

#[test]
fn missing_file_fails_upload_and_run_continues() {
    let tmp = TempDir::new().unwrap();
    let missing = tmp.path().join("missing.pdf").to_string_lossy().to_string();
    let present = write_file(tmp.path(), "present.pdf", b"%PDF-1.7 content");

    let t = Recorder::default();
    let mut importer = Importer::new(&t);
    let counters = importer.run(vec![row(&missing), row(&present)]).clone();

    assert_eq!(counters.session_upload, Tally { success: 1, failed: 1 });
    assert_eq!(counters.documents, Tally { success: 1, failed: 0 });
    assert_eq!(counters.session_delete, Tally { success: 2, failed: 0 });
    assert_eq!(t.count("PUT"), 1);
    assert_eq!(t.count("documentAdd"), 1);
}

#[test]
fn upload_failure_never_creates_a_document() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.pdf", b"%PDF-1.4");

    let t = Recorder::failing(vec!["PUT"]);
    let mut importer = Importer::new(&t);
    let mut r = row(&a);
    r.tags = vec!["Finance".to_string()];
    let outcome = importer.process_row(&mut r);

    assert_eq!(outcome, RowOutcome::UploadFailed);
    assert_eq!(t.count("documentAdd"), 0);
    assert_eq!(t.count("tagGetList"), 0);
    assert_eq!(t.count("DELETE"), 1);
    assert_eq!(importer.counters().session_upload.failed, 1);
    assert_eq!(importer.counters().documents, Tally::default());
}

#[test]
fn create_failure_skips_enrichment_but_cleans_up() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.pdf", b"%PDF-1.4");

    let t = Recorder::failing(vec!["documentAdd"]);
    let mut importer = Importer::new(&t);
    let mut r = row(&a);
    r.owner = Some("jdoe".to_string());
    r.collections = vec![4];
    r.tags = vec!["HR".to_string()];
    r.shares = vec![Share {
        urn: "urn:sys:group:hr".to_string(),
        read: true,
        modify_content: false,
        modify_metadata: false,
    }];
    let outcome = importer.process_row(&mut r);

    assert_eq!(outcome, RowOutcome::CreateFailed);
    assert!(r.document_id.is_none());
    let trace = t.trace.borrow();
    assert_eq!(trace.len(), 3, "{:?}", trace);
    assert!(trace[0].starts_with("PUT session/a.pdf"));
    assert!(trace[1].starts_with("documentAdd "));
    assert_eq!(trace[2], "DELETE session/a.pdf");

    let c = importer.counters();
    assert_eq!(c.documents, Tally { success: 0, failed: 1 });
    assert_eq!(c.collections, Tally::default());
    assert_eq!(c.shares, Tally::default());
    assert_eq!(c.tags, Tally::default());
}

#[test]
fn row_steps_run_in_order() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "report.pdf", b"%PDF-1.4");

    let t = Recorder::default();
    let mut importer = Importer::new(&t);
    let mut r = row(&a);
    r.owner = Some("jdoe".to_string());
    r.collections = vec![4];
    r.shares = vec![Share {
        urn: "urn:sys:user:asmith".to_string(),
        read: true,
        modify_content: true,
        modify_metadata: false,
    }];
    r.tags = vec!["Finance".to_string()];
    assert_eq!(importer.process_row(&mut r), RowOutcome::Imported);
    assert_eq!(r.document_id.as_deref(), Some("DOC-1"));
    assert_eq!(r.title, "report");

    let ops: Vec<String> = t
        .trace
        .borrow()
        .iter()
        .map(|l| l.split(' ').next().unwrap_or_default().to_string())
        .collect();
    assert_eq!(
        ops,
        vec![
            "PUT",
            "documentAdd",
            "documentChangeOwner",
            "addToCollection",
            "documentShare",
            "tagGetList",
            "tagCreate",
            "tagLinkObject",
            "DELETE",
        ]
    );

    let trace = t.trace.borrow();
    assert!(trace[1].contains("<fileSource>/session/report.pdf</fileSource>"));
    assert!(trace[1].contains("<mimeType>application/pdf</mimeType>"));
    assert!(trace[2].contains("<owner>urn:sys:user:jdoe</owner>"));
    assert!(trace[7].contains("<tagID>2</tagID>"));
    assert!(trace[7].contains("<objectRefUrn>urn:lib:document:DOC-1</objectRefUrn>"));
}

#[test]
fn shared_tag_is_resolved_once_per_run() {
    let tmp = TempDir::new().unwrap();
    let rows: Vec<Row> = ["a.pdf", "b.pdf", "c.pdf"]
        .iter()
        .map(|name| {
            let mut r = row(&write_file(tmp.path(), name, b"%PDF-1.4"));
            r.tags = vec!["Finance".to_string()];
            r
        })
        .collect();

    let t = Recorder::default();
    let mut importer = Importer::new(&t);
    let counters = importer.run(rows).clone();

    assert_eq!(t.count("tagGetList"), 1);
    assert_eq!(t.count("tagCreate"), 1);
    assert_eq!(t.count("tagLinkObject"), 3);
    assert_eq!(counters.tags, Tally { success: 3, failed: 0 });
    assert_eq!(importer.context().tags.len(), 1);
}

#[test]
fn enrichment_failures_are_independent() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.pdf", b"%PDF-1.4");

    let t = Recorder::failing(vec!["addToCollection", "documentChangeOwner"]);
    let mut importer = Importer::new(&t);
    let mut r = row(&a);
    r.owner = Some("jdoe".to_string());
    r.collections = vec![1, 2];
    r.shares = vec![Share {
        urn: "urn:sys:group:hr".to_string(),
        read: true,
        modify_content: false,
        modify_metadata: false,
    }];
    r.tags = vec!["Finance".to_string(), "HR".to_string()];

    assert_eq!(importer.process_row(&mut r), RowOutcome::Imported);
    let c = importer.counters();
    assert_eq!(c.collections, Tally { success: 0, failed: 2 });
    assert_eq!(c.shares, Tally { success: 1, failed: 0 });
    assert_eq!(c.tags, Tally { success: 2, failed: 0 });
    assert_eq!(c.session_delete, Tally { success: 1, failed: 0 });
}

#[test]
fn failed_tag_lookup_is_retried_on_next_use() {
    let tmp = TempDir::new().unwrap();
    let a = write_file(tmp.path(), "a.pdf", b"%PDF-1.4");
    let b = write_file(tmp.path(), "b.pdf", b"%PDF-1.4");

    let t = Recorder::failing(vec!["tagGetList"]);
    let mut importer = Importer::new(&t);
    let rows = [a, b]
        .iter()
        .map(|p| {
            let mut r = row(p);
            r.tags = vec!["Finance".to_string()];
            r
        })
        .collect();
    let counters = importer.run(rows).clone();

    assert_eq!(t.count("tagGetList"), 2);
    assert_eq!(t.count("tagLinkObject"), 0);
    assert_eq!(counters.tags, Tally { success: 0, failed: 2 });
    assert!(importer.context().tags.is_empty());
}

#[test]
fn loaded_rows_drop_non_numeric_collections() {
    let tmp = TempDir::new().unwrap();
    let doc = write_file(tmp.path(), "doc.pdf", b"%PDF-1.4");

    let documents = write_file(
        tmp.path(),
        "documents.csv",
        format!("path,title,status\n{},Quarterly,published\n", doc).as_bytes(),
    );
    let collections = write_file(
        tmp.path(),
        "collections.csv",
        format!("path,collectionId\n{doc},12\n{doc},abc\n").as_bytes(),
    );
    let input = InputConfig {
        documents: documents.into(),
        shares: None,
        collections: Some(collections.into()),
        tags: None,
    };

    let rows = loader::load_rows(&input).unwrap();
    assert_eq!(rows.len(), 1);

    let t = Recorder::default();
    let mut importer = Importer::new(&t);
    let counters = importer.run(rows).clone();

    assert_eq!(t.count("addToCollection"), 1);
    assert_eq!(counters.collections, Tally { success: 1, failed: 0 });
    assert!(t
        .trace
        .borrow()
        .iter()
        .any(|l| l.contains("<title>Quarterly</title>")));
}

#[test]
fn dry_run_counts_like_a_clean_live_run() {
    let tmp = TempDir::new().unwrap();
    let build_rows = || {
        let mut a = row(&write_file(tmp.path(), "a.pdf", b"%PDF-1.4"));
        a.owner = Some("jdoe".to_string());
        a.collections = vec![3];
        a.tags = vec!["Finance".to_string(), "HR".to_string()];
        let mut b = row(&write_file(tmp.path(), "b.docx", b"PK\x03\x04rest"));
        b.tags = vec!["Finance".to_string()];
        b.shares = vec![Share {
            urn: "urn:sys:user:asmith".to_string(),
            read: true,
            modify_content: false,
            modify_metadata: false,
        }];
        let missing = row(&tmp.path().join("none.pdf").to_string_lossy());
        vec![a, missing, b]
    };

    let live = Recorder::default();
    let mut live_run = Importer::new(&live);
    let live_counters = live_run.run(build_rows()).clone();

    let dry = DryRunTransport;
    let mut dry_run = Importer::new(&dry);
    let dry_counters = dry_run.run(build_rows()).clone();

    assert_eq!(dry_counters, live_counters);
    assert_eq!(dry_counters.session_upload, Tally { success: 2, failed: 1 });
    assert_eq!(dry_counters.tags, Tally { success: 3, failed: 0 });
    assert_eq!(dry_run.context().tags.len(), 2);
    assert_eq!(dry_run.context().tags.get("Finance"), Some(0));
}
