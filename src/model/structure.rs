//! Hierarchical document structure.

use super::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Structural level of a node. Ordering follows depth: `Document` is the
/// shallowest, `Paragraph` the deepest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    /// Synthetic root; never assigned to a text run.
    Document,
    Title,
    Section,
    Subsection,
    Paragraph,
}

impl Level {
    pub fn is_heading(&self) -> bool {
        matches!(self, Level::Title | Level::Section | Level::Subsection)
    }

    /// One level shallower, saturating at `Title`.
    pub fn promoted(&self) -> Level {
        match self {
            Level::Paragraph => Level::Subsection,
            Level::Subsection => Level::Section,
            Level::Section | Level::Title => Level::Title,
            Level::Document => Level::Document,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Document => "document",
            Level::Title => "title",
            Level::Section => "section",
            Level::Subsection => "subsection",
            Level::Paragraph => "paragraph",
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A node of the document tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StructuralNode {
    pub level: Level,

    pub text: String,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<StructuralNode>,

    /// Page the node starts on (the root carries its page too)
    #[serde(skip)]
    pub page_index: usize,

    /// Bounding box of the text that formed the node
    #[serde(skip)]
    pub bbox: Rect,
}

impl StructuralNode {
    /// Create a node without children.
    pub fn new(level: Level, text: impl Into<String>, page_index: usize, bbox: Rect) -> Self {
        Self {
            level,
            text: text.into(),
            children: Vec::new(),
            page_index,
            bbox,
        }
    }

    /// Create an empty synthetic root for a page.
    pub fn root(page_index: usize) -> Self {
        Self::new(Level::Document, "", page_index, Rect::default())
    }

    /// Whether the node has no children and no text.
    pub fn is_empty(&self) -> bool {
        self.children.is_empty() && self.text.is_empty()
    }

    /// Total number of nodes below this one.
    pub fn descendant_count(&self) -> usize {
        self.children
            .iter()
            .map(|c| 1 + c.descendant_count())
            .sum()
    }

    /// Depth-first pre-order walk, excluding `self`.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a StructuralNode)) {
        for child in &self.children {
            visit(child);
            child.walk(visit);
        }
    }

    /// Check the nesting invariant: every child is strictly deeper than its
    /// parent. The synthetic root accepts any level.
    pub fn is_well_nested(&self) -> bool {
        self.children.iter().all(|c| {
            (self.level == Level::Document || c.level > self.level) && c.is_well_nested()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn node(level: Level, text: &str) -> StructuralNode {
        StructuralNode::new(level, text, 0, Rect::default())
    }

    #[test]
    fn test_level_ordering() {
        assert!(Level::Document < Level::Title);
        assert!(Level::Title < Level::Section);
        assert!(Level::Section < Level::Subsection);
        assert!(Level::Subsection < Level::Paragraph);
        assert_eq!(Level::Paragraph.promoted(), Level::Subsection);
    }

    #[test]
    fn test_serialization_shape() {
        let mut root = StructuralNode::root(0);
        let mut title = node(Level::Title, "Report");
        title.children.push(node(Level::Paragraph, "Body"));
        root.children.push(title);

        let json = serde_json::to_string(&root).unwrap();
        assert_eq!(
            json,
            r#"{"level":"document","text":"","children":[{"level":"title","text":"Report","children":[{"level":"paragraph","text":"Body"}]}]}"#
        );
    }

    #[test]
    fn test_nesting_check() {
        let mut root = StructuralNode::root(0);
        let mut section = node(Level::Section, "A");
        section.children.push(node(Level::Subsection, "B"));
        root.children.push(node(Level::Paragraph, "intro"));
        root.children.push(section);
        assert!(root.is_well_nested());
        assert_eq!(root.descendant_count(), 3);

        let mut bad = node(Level::Subsection, "X");
        bad.children.push(node(Level::Section, "Y"));
        root.children.push(bad);
        assert!(!root.is_well_nested());
    }
}
