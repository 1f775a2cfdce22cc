//! Staging transfer: moving file bytes into the API user's session and
//! removing them once the document has been created (or not).

use tracing::{debug, info};

use crate::models::Row;
use crate::sniff::detect_content_type;
use crate::transport::Transport;
use crate::xmlmc::ApiError;

/// Read the row's source file, sniff its type and PUT it at the row's
/// staging path. Sets `row.content_type`.
pub fn upload(transport: &dyn Transport, row: &mut Row) -> Result<(), ApiError> {
    info!("Uploading: {}", row.source_path);
    let bytes = std::fs::read(&row.source_path)
        .map_err(|e| ApiError::Io(format!("{}: {}", row.source_path, e)))?;

    row.content_type = detect_content_type(&row.file_name, &bytes);
    debug!("Content Type: {}", row.content_type);

    transport.upload(&row.staging_path, bytes, &row.content_type)?;
    info!("Upload Success: {}", row.staging_path);
    Ok(())
}

/// Delete the row's staged file.
pub fn cleanup(transport: &dyn Transport, row: &Row) -> Result<(), ApiError> {
    info!("Deleting: {}", row.staging_path);
    transport.delete(&row.staging_path)?;
    info!("Delete Success");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::xmlmc::{Method, Params, Response};
    use std::cell::RefCell;
    use tempfile::TempDir;

    #[derive(Default)]
    struct Recorder {
        puts: RefCell<Vec<(String, usize, String)>>,
        deletes: RefCell<Vec<String>>,
    }

    impl Transport for Recorder {
        fn upload(&self, path: &str, bytes: Vec<u8>, content_type: &str) -> Result<(), ApiError> {
            self.puts
                .borrow_mut()
                .push((path.to_string(), bytes.len(), content_type.to_string()));
            Ok(())
        }
        fn delete(&self, path: &str) -> Result<(), ApiError> {
            self.deletes.borrow_mut().push(path.to_string());
            Ok(())
        }
        fn invoke(&self, _: &Method, _: Params) -> Result<Response, ApiError> {
            Ok(Response::synthetic_ok())
        }
    }

    #[test]
    fn upload_reads_sniffs_and_puts() {
        let tmp = TempDir::new().unwrap();
        let path = tmp.path().join("policy.pdf");
        std::fs::write(&path, b"%PDF-1.4 body").unwrap();

        let mut row = Row::new(path.to_string_lossy());
        row.prepare();
        let t = Recorder::default();
        upload(&t, &mut row).unwrap();

        assert_eq!(row.content_type, "application/pdf");
        assert_eq!(
            t.puts.borrow().as_slice(),
            &[(
                "session/policy.pdf".to_string(),
                13,
                "application/pdf".to_string()
            )]
        );
    }

    #[test]
    fn upload_missing_file_never_reaches_transport() {
        let mut row = Row::new("/definitely/not/here.pdf");
        row.prepare();
        let t = Recorder::default();
        let err = upload(&t, &mut row).unwrap_err();
        assert!(matches!(err, ApiError::Io(_)));
        assert!(err.to_string().contains("/definitely/not/here.pdf"));
        assert!(t.puts.borrow().is_empty());
    }

    #[test]
    fn cleanup_deletes_staging_path() {
        let mut row = Row::new("a/b/c.txt");
        row.prepare();
        let t = Recorder::default();
        cleanup(&t, &row).unwrap();
        assert_eq!(t.deletes.borrow().as_slice(), &["session/c.txt".to_string()]);
    }
}
