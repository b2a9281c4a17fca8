//! PDF parsing module.
//!
//! [`backend`] isolates lopdf, [`content`] interprets page content streams,
//! and [`extractor`] turns what a page paints into text runs.

pub mod backend;
pub mod content;
pub mod extractor;
pub mod fonts;

#[cfg(test)]
pub(crate) mod testing;

pub use backend::{ContentOp, LopdfBackend, PageBox, PageId, PdfBackend, PdfValue, XObject};
pub use content::{PageContent, PaintedPath, TextSpan};
pub use extractor::{PageView, TextNormalizer, TextRunExtractor};
pub use fonts::FontMetrics;
