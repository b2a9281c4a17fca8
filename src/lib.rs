//! # pdfstruct
//!
//! PDF to structured JSON conversion.
//!
//! This library reconstructs the hierarchy of a PDF document (titles,
//! sections, subsections, paragraphs) from positioned text, extracts tables
//! through a chain of fallback strategies, and locates image and vector
//! chart regions.
//!
//! ## Quick Start
//!
//! ```no_run
//! use pdfstruct::{convert_file, to_json, JsonFormat};
//!
//! fn main() -> pdfstruct::Result<()> {
//!     let result = convert_file("report.pdf")?;
//!     println!("{}", to_json(&result, JsonFormat::Pretty)?);
//!     Ok(())
//! }
//! ```
//!
//! ## Features
//!
//! - **Heading detection**: font-size tiers across the whole document
//! - **Reading order**: two-column layouts read column by column
//! - **Tables**: ruling lines, text alignment, character clustering, and a
//!   word-position grid as the last resort
//! - **Graphics**: placed images and clusters of vector drawing
//! - **Bounded runtime**: per-document deadline and cooperative cancellation
//! - **Parallel processing**: pages are decoded and analyzed with Rayon

pub mod convert;
pub mod detect;
pub mod error;
pub mod graphics;
pub mod model;
pub mod parser;
pub mod render;
pub mod structure;
pub mod table;

// Re-export commonly used types
pub use convert::{
    CancelToken, ConvertOptions, Converter, Deadline, GraphicsOptions, HeadingOptions,
    PageSelection, StructureOptions, TableOptions, TextOptions,
};
pub use detect::{is_pdf_bytes, pdf_version};
pub use error::{Error, Result};
pub use model::{
    DocumentResult, FontFlags, GraphicKind, GraphicRegion, Level, Metadata, Outline, PageResult,
    Rect, SkipRecord, SourceMethod, StructuralNode, Table, TextRun,
};
pub use render::{to_json, write_json, JsonFormat};
pub use table::Rasterizer;

use std::io::Read;
use std::path::Path;

/// Convert a PDF file with default options.
///
/// # Example
///
/// ```no_run
/// use pdfstruct::convert_file;
///
/// let result = convert_file("report.pdf").unwrap();
/// println!("Pages: {}", result.pages.len());
/// ```
pub fn convert_file<P: AsRef<Path>>(path: P) -> Result<DocumentResult> {
    Converter::default().convert_file(path)
}

/// Convert a PDF file with custom options.
///
/// # Example
///
/// ```no_run
/// use pdfstruct::{convert_file_with_options, ConvertOptions, PageSelection, SourceMethod};
///
/// let options = ConvertOptions::new()
///     .with_pages(PageSelection::parse("1-3").unwrap())
///     .without_tier(SourceMethod::Lattice);
/// let result = convert_file_with_options("report.pdf", options).unwrap();
/// ```
pub fn convert_file_with_options<P: AsRef<Path>>(
    path: P,
    options: ConvertOptions,
) -> Result<DocumentResult> {
    Converter::new(options).convert_file(path)
}

/// Convert a PDF from bytes.
///
/// # Example
///
/// ```no_run
/// use pdfstruct::convert_bytes;
///
/// let data = std::fs::read("report.pdf").unwrap();
/// let result = convert_bytes(&data).unwrap();
/// ```
pub fn convert_bytes(data: &[u8]) -> Result<DocumentResult> {
    Converter::default().convert_bytes(data)
}

/// Convert a PDF from bytes with custom options.
pub fn convert_bytes_with_options(data: &[u8], options: ConvertOptions) -> Result<DocumentResult> {
    Converter::new(options).convert_bytes(data)
}

/// Convert a PDF from a reader.
///
/// # Example
///
/// ```no_run
/// use pdfstruct::convert_reader;
/// use std::fs::File;
///
/// let file = File::open("report.pdf").unwrap();
/// let result = convert_reader(file).unwrap();
/// ```
pub fn convert_reader<R: Read>(reader: R) -> Result<DocumentResult> {
    Converter::default().convert_reader(reader)
}

/// Convert a PDF file straight to JSON.
///
/// # Example
///
/// ```no_run
/// use pdfstruct::{file_to_json, JsonFormat};
///
/// let json = file_to_json("report.pdf", JsonFormat::Compact).unwrap();
/// std::fs::write("report.json", json).unwrap();
/// ```
pub fn file_to_json<P: AsRef<Path>>(path: P, format: JsonFormat) -> Result<String> {
    let result = convert_file(path)?;
    render::to_json(&result, format)
}

/// Convert a PDF file on tokio's blocking thread pool.
///
/// # Example
///
/// ```no_run
/// # async fn run() -> pdfstruct::Result<()> {
/// use pdfstruct::{convert_file_async, ConvertOptions};
///
/// let result = convert_file_async("report.pdf", ConvertOptions::default()).await?;
/// # Ok(())
/// # }
/// ```
#[cfg(feature = "async")]
pub async fn convert_file_async<P: AsRef<Path>>(
    path: P,
    options: ConvertOptions,
) -> Result<DocumentResult> {
    let path = path.as_ref().to_path_buf();
    tokio::task::spawn_blocking(move || Converter::new(options).convert_file(path))
        .await
        .map_err(|e| Error::Io(std::io::Error::other(e)))?
}
