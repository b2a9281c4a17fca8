//! PDF header detection.
//!
//! A cheap check run before the parser is invoked, so that obviously
//! foreign input (HTML error pages, truncated uploads) is rejected as
//! [`Error::DocumentUnreadable`] without touching the object parser.

use crate::error::{Error, Result};
use std::fs::File;
use std::io::Read;
use std::path::Path;

/// PDF magic bytes: %PDF-
const PDF_MAGIC: &[u8] = b"%PDF-";
const VERSION_LEN: usize = 3; // e.g., "1.7"

/// Some producers emit junk before the header; readers accept it within
/// the first kilobyte.
const HEADER_SEARCH_WINDOW: usize = 1024;

/// Find the PDF header in `data` and return the version string.
///
/// # Example
/// ```
/// use pdfstruct::detect::pdf_version;
///
/// assert_eq!(pdf_version(b"%PDF-1.7\n%...").unwrap(), "1.7");
/// assert!(pdf_version(b"<html>").is_err());
/// ```
pub fn pdf_version(data: &[u8]) -> Result<String> {
    let window = &data[..data.len().min(HEADER_SEARCH_WINDOW)];
    let start = window
        .windows(PDF_MAGIC.len())
        .position(|w| w == PDF_MAGIC)
        .ok_or_else(|| Error::unreadable("missing %PDF- header"))?;

    let version_start = start + PDF_MAGIC.len();
    let version_bytes = data
        .get(version_start..version_start + VERSION_LEN)
        .ok_or_else(|| Error::unreadable("truncated PDF header"))?;
    let version = String::from_utf8_lossy(version_bytes).to_string();

    if !is_valid_version(&version) {
        return Err(Error::unreadable(format!(
            "unsupported PDF version '{}'",
            version
        )));
    }

    Ok(version)
}

/// Read the start of a file and return its PDF version.
pub fn pdf_version_from_path<P: AsRef<Path>>(path: P) -> Result<String> {
    let path = path.as_ref();
    let file = File::open(path)
        .map_err(|e| Error::unreadable(format!("{}: {}", path.display(), e)))?;
    let mut header = Vec::with_capacity(HEADER_SEARCH_WINDOW);
    file.take(HEADER_SEARCH_WINDOW as u64)
        .read_to_end(&mut header)
        .map_err(|e| Error::unreadable(format!("{}: {}", path.display(), e)))?;
    pdf_version(&header)
}

/// Check if bytes start like a PDF document.
pub fn is_pdf_bytes(data: &[u8]) -> bool {
    pdf_version(data).is_ok()
}

fn is_valid_version(version: &str) -> bool {
    let bytes = version.as_bytes();
    bytes.len() == 3 && bytes[0].is_ascii_digit() && bytes[1] == b'.' && bytes[2].is_ascii_digit()
}
