//! Chart and image regions.

use super::Rect;
use serde::{Deserialize, Serialize};

/// Kind of graphic region.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum GraphicKind {
    /// A placed raster image
    Image,
    /// A cluster of painted vector paths
    VectorChart,
}

/// A region of a page holding an image or a vector drawing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GraphicRegion {
    #[serde(skip)]
    pub page_index: usize,

    pub bbox: Rect,

    pub kind: GraphicKind,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
}

impl GraphicRegion {
    pub fn new(page_index: usize, bbox: Rect, kind: GraphicKind) -> Self {
        Self {
            page_index,
            bbox,
            kind,
            section: None,
            subsection: None,
        }
    }
}
