//! Document-level types.

use super::{GraphicRegion, Level, SourceMethod, StructuralNode, Table};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The result of converting one PDF document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DocumentResult {
    /// Document metadata (title, author, etc.)
    pub metadata: Metadata,

    /// Converted pages, in input order. Skipped pages are absent.
    pub pages: Vec<PageResult>,

    /// Pages and table tiers that failed and were recovered from
    #[serde(default)]
    pub skipped: Vec<SkipRecord>,
}

impl DocumentResult {
    /// Get a converted page by its zero-based index in the source document.
    pub fn page(&self, page_index: usize) -> Option<&PageResult> {
        self.pages.iter().find(|p| p.page_index == page_index)
    }

    /// All tables in page order.
    pub fn tables(&self) -> impl Iterator<Item = &Table> {
        self.pages.iter().flat_map(|p| p.tables.iter())
    }

    /// All graphic regions in page order.
    pub fn graphics(&self) -> impl Iterator<Item = &GraphicRegion> {
        self.pages.iter().flat_map(|p| p.graphics.iter())
    }

    /// Stitch per-page headings into one document-wide outline.
    ///
    /// Headings nest by level across page boundaries: a subsection on page 3
    /// belongs to the section opened on page 2.
    pub fn outline(&self) -> Outline {
        let mut outline = Outline::new();
        // Path of open items, as (level, index into parent's children).
        let mut open: Vec<(Level, usize)> = Vec::new();

        for page in &self.pages {
            page.structure.walk(&mut |node| {
                if !node.level.is_heading() {
                    return;
                }
                while open.last().is_some_and(|(level, _)| *level >= node.level) {
                    open.pop();
                }
                let item = OutlineItem::new(node.text.clone(), node.level, page.page_index);
                let siblings = outline.children_at_mut(&open);
                siblings.push(item);
                let index = siblings.len() - 1;
                open.push((node.level, index));
            });
        }
        outline
    }

    /// Plain text of all pages, headings and paragraphs in reading order.
    pub fn plain_text(&self) -> String {
        self.pages
            .iter()
            .map(PageResult::plain_text)
            .collect::<Vec<_>>()
            .join("\n\n")
    }
}

/// Structure, tables and graphics of one page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PageResult {
    /// Zero-based index in the source document
    pub page_index: usize,

    /// Page width in points
    pub width: f32,

    /// Page height in points
    pub height: f32,

    /// Page tree rooted at a synthetic `document` node
    pub structure: StructuralNode,

    #[serde(default)]
    pub tables: Vec<Table>,

    #[serde(default)]
    pub graphics: Vec<GraphicRegion>,
}

impl PageResult {
    pub fn plain_text(&self) -> String {
        let mut parts = Vec::new();
        self.structure.walk(&mut |node| {
            if !node.text.is_empty() {
                parts.push(node.text.as_str());
            }
        });
        parts.join("\n")
    }
}

/// A recovered failure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipRecord {
    /// Page the failure belongs to, `None` for document-wide events
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page_index: Option<usize>,

    /// Table tier that failed, if any
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tier: Option<SourceMethod>,

    pub reason: String,
}

impl SkipRecord {
    /// A page that could not be decoded.
    pub fn page(page_index: usize, reason: impl Into<String>) -> Self {
        Self {
            page_index: Some(page_index),
            tier: None,
            reason: reason.into(),
        }
    }

    /// A table tier that failed on a page (or document-wide with `None`).
    pub fn tier(page_index: Option<usize>, tier: SourceMethod, reason: impl Into<String>) -> Self {
        Self {
            page_index,
            tier: Some(tier),
            reason: reason.into(),
        }
    }
}

/// Document metadata.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Metadata {
    /// PDF version (e.g., "1.7")
    pub pdf_version: String,

    /// Total number of pages in the source, including skipped ones
    pub page_count: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keywords: Option<String>,

    /// Creator application
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub producer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<DateTime<Utc>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<DateTime<Utc>>,
}

impl Metadata {
    /// Create new metadata with PDF version.
    pub fn with_version(version: impl Into<String>) -> Self {
        Self {
            pdf_version: version.into(),
            ..Default::default()
        }
    }
}

/// Document-wide heading tree.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Outline {
    /// Top-level outline items
    pub items: Vec<OutlineItem>,
}

impl Outline {
    pub fn new() -> Self {
        Self { items: Vec::new() }
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Get the total number of items (including nested).
    pub fn total_items(&self) -> usize {
        fn count_items(items: &[OutlineItem]) -> usize {
            items
                .iter()
                .map(|item| 1 + count_items(&item.children))
                .sum()
        }
        count_items(&self.items)
    }

    fn children_at_mut(&mut self, path: &[(Level, usize)]) -> &mut Vec<OutlineItem> {
        let mut items = &mut self.items;
        for (_, index) in path {
            items = &mut items[*index].children;
        }
        items
    }
}

/// A heading in the outline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OutlineItem {
    pub title: String,

    pub level: Level,

    /// Page the heading appears on (zero-based)
    pub page_index: usize,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<OutlineItem>,
}

impl OutlineItem {
    pub fn new(title: impl Into<String>, level: Level, page_index: usize) -> Self {
        Self {
            title: title.into(),
            level,
            page_index,
            children: Vec::new(),
        }
    }
}
