//! Document model types.
//!
//! This module defines the types shared by every stage of the conversion:
//! positioned text runs coming out of the extractor, the hierarchical
//! structure built from them, tables, graphic regions and the final
//! per-document result that is serialized to JSON.

mod document;
mod geometry;
mod graphic;
mod structure;
mod table;
mod text_run;

pub use document::{DocumentResult, Metadata, Outline, OutlineItem, PageResult, SkipRecord};
pub use geometry::{interior_gaps, Rect};
pub use graphic::{GraphicKind, GraphicRegion};
pub use structure::{Level, StructuralNode};
pub use table::{SourceMethod, Table};
pub use text_run::{FontFlags, Glyph, TextRun};
