//! Content-type detection for uploaded files.
//!
//! The type is sniffed from the first 512 bytes of content using well-known
//! signatures. When sniffing only yields a generic container type
//! (`application/octet-stream`, `application/zip`), the file extension is
//! consulted so that e.g. `.docx` uploads are labelled as Word documents
//! rather than ZIP archives.
//!
//! | Signature | MIME Type |
//! |-----------|-----------|
//! | `%PDF-` | `application/pdf` |
//! | PNG / JPEG / GIF / BMP / WEBP / ICO | `image/*` |
//! | `PK\x03\x04` | `application/zip` |
//! | gzip / RAR / 7z | archive types |
//! | OGG / MP3 / WAV / MP4 | media types |
//! | `<!DOCTYPE html`, `<html`, ... | `text/html; charset=utf-8` |
//! | `<?xml` | `text/xml; charset=utf-8` |
//! | UTF-8 / UTF-16 BOM | `text/plain; charset=...` |
//! | no binary bytes | `text/plain; charset=utf-8` |
//! | Other | `application/octet-stream` |

use std::path::Path;

const SNIFF_LEN: usize = 512;

pub const OCTET_STREAM: &str = "application/octet-stream";
pub const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Exact prefix signatures, checked in order.
const SIGNATURES: &[(&[u8], &str)] = &[
    (b"%PDF-", "application/pdf"),
    (b"%!PS-Adobe-", "application/postscript"),
    (b"\x89PNG\r\n\x1a\n", "image/png"),
    (b"\xFF\xD8\xFF", "image/jpeg"),
    (b"GIF87a", "image/gif"),
    (b"GIF89a", "image/gif"),
    (b"BM", "image/bmp"),
    (b"\x00\x00\x01\x00", "image/x-icon"),
    (b"\x00\x00\x02\x00", "image/x-icon"),
    (b"PK\x03\x04", "application/zip"),
    (b"\x1F\x8B\x08", "application/x-gzip"),
    (b"Rar!\x1A\x07", "application/x-rar-compressed"),
    (b"7z\xBC\xAF\x27\x1C", "application/x-7z-compressed"),
    (b"OggS\x00", "application/ogg"),
    (b"ID3", "audio/mpeg"),
    (b"\xD0\xCF\x11\xE0\xA1\xB1\x1A\xE1", "application/x-ole-storage"),
    (b"{\\rtf", "text/rtf; charset=utf-8"),
    (b"\xEF\xBB\xBF", TEXT_PLAIN),
    (b"\xFE\xFF", "text/plain; charset=utf-16be"),
    (b"\xFF\xFE", "text/plain; charset=utf-16le"),
];

/// Markup openers that identify HTML, matched case-insensitively after
/// leading whitespace and followed by a space or `>`.
const HTML_TAGS: &[&str] = &[
    "<!doctype html",
    "<html",
    "<head",
    "<script",
    "<iframe",
    "<h1",
    "<div",
    "<font",
    "<table",
    "<a",
    "<style",
    "<title",
    "<b",
    "<body",
    "<br",
    "<p",
    "<!--",
];

/// Sniff the content type of `bytes`.
pub fn sniff(bytes: &[u8]) -> &'static str {
    let head = &bytes[..bytes.len().min(SNIFF_LEN)];

    let trimmed = trim_leading_whitespace(head);
    if let Some(ct) = sniff_markup(trimmed) {
        return ct;
    }

    for &(sig, ct) in SIGNATURES {
        if head.starts_with(sig) {
            return ct;
        }
    }

    if let Some(ct) = sniff_riff(head) {
        return ct;
    }
    if is_mp4(head) {
        return "video/mp4";
    }

    if head.iter().any(|b| is_binary_byte(*b)) {
        OCTET_STREAM
    } else {
        TEXT_PLAIN
    }
}

/// Sniff `bytes`, then refine generic results using `file_name`'s extension.
pub fn detect_content_type(file_name: &str, bytes: &[u8]) -> String {
    let sniffed = sniff(bytes);
    if sniffed != OCTET_STREAM && sniffed != "application/zip" {
        return sniffed.to_string();
    }

    let has_extension = Path::new(file_name).extension().is_some();
    if has_extension {
        if let Some(guess) = mime_guess::from_path(file_name).first() {
            return guess.essence_str().to_string();
        }
    }
    sniffed.to_string()
}

fn trim_leading_whitespace(data: &[u8]) -> &[u8] {
    let start = data
        .iter()
        .position(|b| !matches!(b, b'\t' | b'\n' | b'\x0C' | b'\r' | b' '))
        .unwrap_or(data.len());
    &data[start..]
}

fn sniff_markup(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(b"<?xml") {
        return Some("text/xml; charset=utf-8");
    }
    for tag in HTML_TAGS {
        let tag = tag.as_bytes();
        if data.len() <= tag.len() {
            continue;
        }
        if !data[..tag.len()].eq_ignore_ascii_case(tag) {
            continue;
        }
        if matches!(data[tag.len()], b' ' | b'>') {
            return Some("text/html; charset=utf-8");
        }
    }
    None
}

fn sniff_riff(data: &[u8]) -> Option<&'static str> {
    if data.len() < 12 || &data[..4] != b"RIFF" {
        return None;
    }
    match &data[8..12] {
        b"WEBP" => Some("image/webp"),
        b"WAVE" => Some("audio/wave"),
        b"AVI " => Some("video/avi"),
        _ => None,
    }
}

fn is_mp4(data: &[u8]) -> bool {
    if data.len() < 12 {
        return false;
    }
    let box_size = u32::from_be_bytes([data[0], data[1], data[2], data[3]]) as usize;
    if box_size < 12 || box_size % 4 != 0 || data.len() < box_size {
        return false;
    }
    if &data[4..8] != b"ftyp" {
        return false;
    }
    // Major brand plus compatible brands, skipping the minor version.
    let mut offset = 8;
    while offset + 4 <= box_size {
        if offset != 12 && &data[offset..offset + 3] == b"mp4" {
            return true;
        }
        offset += 4;
    }
    false
}

fn is_binary_byte(b: u8) -> bool {
    matches!(b, 0x00..=0x08 | 0x0B | 0x0E..=0x1A | 0x1C..=0x1F)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sniff_signatures() {
        assert_eq!(sniff(b"%PDF-1.7\n..."), "application/pdf");
        assert_eq!(sniff(b"\x89PNG\r\n\x1a\n\x00\x00"), "image/png");
        assert_eq!(sniff(b"\xFF\xD8\xFF\xE0\x00\x10JFIF"), "image/jpeg");
        assert_eq!(sniff(b"GIF89a\x01\x00"), "image/gif");
        assert_eq!(sniff(b"PK\x03\x04\x14\x00"), "application/zip");
        assert_eq!(sniff(b"RIFF\x24\x00\x00\x00WEBPVP8 "), "image/webp");
    }

    #[test]
    fn sniff_text_and_markup() {
        assert_eq!(sniff(b"Hello, world\n"), TEXT_PLAIN);
        assert_eq!(sniff(b""), TEXT_PLAIN);
        assert_eq!(
            sniff(b"  <!DOCTYPE HTML><html></html>"),
            "text/html; charset=utf-8"
        );
        assert_eq!(sniff(b"<p>para</p>"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<?xml version=\"1.0\"?><a/>"), "text/xml; charset=utf-8");
        // "<pre" is not "<p" followed by a terminator
        assert_eq!(sniff(b"<pre>x</pre>"), TEXT_PLAIN);
    }

    #[test]
    fn sniff_comment_needs_terminator() {
        assert_eq!(sniff(b"<!-- note -->"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<!-->"), "text/html; charset=utf-8");
        assert_eq!(sniff(b"<!--x-->"), TEXT_PLAIN);
    }

    #[test]
    fn sniff_binary_fallback() {
        assert_eq!(sniff(&[0x00, 0x01, 0x02, 0x03]), OCTET_STREAM);
    }

    #[test]
    fn sniff_mp4() {
        let mut data = vec![0x00, 0x00, 0x00, 0x1C];
        data.extend_from_slice(b"ftypisom");
        data.extend_from_slice(&[0, 0, 2, 0]);
        data.extend_from_slice(b"isomiso2mp41");
        assert_eq!(sniff(&data), "video/mp4");
    }

    #[test]
    fn detect_refines_zip_by_extension() {
        let docx = b"PK\x03\x04\x14\x00\x06\x00";
        assert_eq!(
            detect_content_type("report.docx", docx),
            "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        );
        assert_eq!(detect_content_type("bundle", docx), "application/zip");
    }

    #[test]
    fn detect_keeps_specific_sniff() {
        // Extension says text, bytes say PDF: bytes win.
        assert_eq!(detect_content_type("misnamed.txt", b"%PDF-1.4"), "application/pdf");
        assert_eq!(detect_content_type("notes.md", b"# Notes"), TEXT_PLAIN);
    }

    #[test]
    fn detect_unknown_binary_stays_generic() {
        assert_eq!(detect_content_type("blob.zzzunknown", &[0x00, 0x01]), OCTET_STREAM);
    }
}
