//! Merging per-page results into one document.

use crate::model::{DocumentResult, GraphicRegion, Level, Metadata, PageResult, SkipRecord, Table};

/// Headings in effect at a point of the document.
#[derive(Debug, Clone, Default, PartialEq)]
struct SectionContext {
    section: Option<String>,
    subsection: Option<String>,
}

impl SectionContext {
    fn enter(&mut self, level: Level, text: &str) {
        match level {
            Level::Title | Level::Section => {
                self.section = Some(text.to_string());
                self.subsection = None;
            }
            Level::Subsection => self.subsection = Some(text.to_string()),
            Level::Document | Level::Paragraph => {}
        }
    }
}

/// A heading with its vertical position on the page.
struct HeadingMark<'a> {
    level: Level,
    text: &'a str,
    top: f32,
}

/// Collects pages in order and attaches section context to tables and
/// graphics.
///
/// Pages must be added in ascending page order; the context of the last
/// heading on one page carries over to the next.
#[derive(Debug, Default)]
pub struct Assembler {
    metadata: Metadata,
    pages: Vec<PageResult>,
    skipped: Vec<SkipRecord>,
    context: SectionContext,
}

impl Assembler {
    pub fn new(metadata: Metadata) -> Self {
        Self {
            metadata,
            ..Default::default()
        }
    }

    /// Add a converted page.
    pub fn add_page(&mut self, mut page: PageResult) {
        let mut headings: Vec<HeadingMark<'_>> = Vec::new();
        page.structure.walk(&mut |node| {
            if node.level.is_heading() {
                headings.push(HeadingMark {
                    level: node.level,
                    text: &node.text,
                    top: node.bbox.y,
                });
            }
        });

        for table in &mut page.tables {
            let context = self.context_at(&headings, table.bbox.y);
            apply_table(table, context);
        }
        for graphic in &mut page.graphics {
            let context = self.context_at(&headings, graphic.bbox.y);
            apply_graphic(graphic, context);
        }

        for heading in &headings {
            self.context.enter(heading.level, heading.text);
        }
        self.pages.push(page);
    }

    /// Record a skipped page or tier.
    pub fn skip(&mut self, record: SkipRecord) {
        self.skipped.push(record);
    }

    /// Context for an object whose top edge is at `top`.
    fn context_at(&self, headings: &[HeadingMark<'_>], top: f32) -> SectionContext {
        let mut context = self.context.clone();
        for heading in headings.iter().filter(|h| h.top <= top) {
            context.enter(heading.level, heading.text);
        }
        context
    }

    /// Finish the document.
    pub fn finish(self) -> DocumentResult {
        DocumentResult {
            metadata: self.metadata,
            pages: self.pages,
            skipped: self.skipped,
        }
    }
}

fn apply_table(table: &mut Table, context: SectionContext) {
    table.section = context.section;
    table.subsection = context.subsection;
}

fn apply_graphic(graphic: &mut GraphicRegion, context: SectionContext) {
    graphic.section = context.section;
    graphic.subsection = context.subsection;
}
