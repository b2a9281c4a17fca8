//! Document tree construction.

use crate::convert::options::StructureOptions;
use crate::model::{Level, Rect, StructuralNode, TextRun};

/// The run most recently added to the tree.
struct LastRun {
    level: Level,
    bbox: Rect,
    font_size: f32,
    ends_sentence: bool,
}

impl LastRun {
    fn of(run: &TextRun, level: Level) -> Self {
        Self {
            level,
            bbox: run.bbox,
            font_size: run.font_size,
            ends_sentence: run
                .text
                .trim_end()
                .ends_with(['.', ':', ';', '?', '!', '\u{3002}', '\u{FF1A}', '\u{FF1F}', '\u{FF01}']),
        }
    }
}

/// Builds one page's structure tree from classified runs.
///
/// The builder keeps a stack of open headings. A heading closes every open
/// node at the same or a deeper level and opens itself; paragraphs attach to
/// the innermost open heading, or to the root when none is open. Successive
/// runs of the same level that continue each other (same line, or the next
/// line within the paragraph gap) extend the previous node instead of
/// starting a new one. A heading only continues onto the next line when it
/// reads as a wrap: aligned with the line above, no wider than it, and the
/// line above does not end a sentence.
#[derive(Debug, Clone)]
pub struct TreeBuilder {
    options: StructureOptions,
}

impl TreeBuilder {
    pub fn new(options: StructureOptions) -> Self {
        Self { options }
    }

    /// Build the tree. `runs` must already be in reading order.
    pub fn build<'a>(
        &self,
        page_index: usize,
        runs: impl IntoIterator<Item = (&'a TextRun, Level)>,
    ) -> StructuralNode {
        let mut stack = vec![StructuralNode::root(page_index)];
        let mut last: Option<LastRun> = None;

        for (run, level) in runs {
            if run.is_blank() {
                continue;
            }
            // The root level is reserved
            let level = if level == Level::Document {
                Level::Paragraph
            } else {
                level
            };

            if let Some(prev) = last.as_ref().filter(|p| p.level == level) {
                let separator = self.joins(prev, run).filter(|&sep| {
                    level == Level::Paragraph || sep == ' ' || heading_wraps(prev, run)
                });
                if let Some(separator) = separator {
                    let target = if level == Level::Paragraph {
                        stack.last_mut().and_then(|top| top.children.last_mut())
                    } else {
                        stack.last_mut()
                    };
                    if let Some(node) = target {
                        node.text.push(if level == Level::Paragraph {
                            separator
                        } else {
                            ' '
                        });
                        node.text.push_str(&run.text);
                        node.bbox = node.bbox.union(&run.bbox);
                        last = Some(LastRun::of(run, level));
                        continue;
                    }
                }
            }

            let node = StructuralNode::new(level, run.text.clone(), run.page_index, run.bbox);
            if level == Level::Paragraph {
                if let Some(top) = stack.last_mut() {
                    top.children.push(node);
                }
            } else {
                close_until_shallower(&mut stack, level);
                stack.push(node);
            }
            last = Some(LastRun::of(run, level));
        }

        close_until_shallower(&mut stack, Level::Title);
        stack
            .pop()
            .unwrap_or_else(|| StructuralNode::root(page_index))
    }

    /// Separator when `run` continues the node ending with `prev`.
    fn joins(&self, prev: &LastRun, run: &TextRun) -> Option<char> {
        if (run.font_size - prev.font_size).abs() > self.options.max_size_change {
            return None;
        }

        let min_height = prev.bbox.height.min(run.bbox.height);
        if min_height > 0.0 && prev.bbox.vertical_overlap(&run.bbox) >= 0.5 * min_height {
            return (run.bbox.x >= prev.bbox.x).then_some(' ');
        }

        let gap = run.bbox.y - prev.bbox.bottom();
        if run.bbox.y < prev.bbox.y || gap > self.options.paragraph_gap_ratio * prev.font_size {
            return None;
        }
        Some('\n')
    }
}

/// Whether a heading line on the next line continues the one above.
fn heading_wraps(prev: &LastRun, run: &TextRun) -> bool {
    let tolerance = 0.5 * prev.font_size;
    let aligned = (run.bbox.x - prev.bbox.x).abs() <= tolerance
        || (run.bbox.center_x() - prev.bbox.center_x()).abs() <= tolerance;
    aligned && !prev.ends_sentence && run.bbox.width <= prev.bbox.width + tolerance
}

/// Pop open nodes until the top is strictly shallower than `level`,
/// attaching each popped node to its parent.
fn close_until_shallower(stack: &mut Vec<StructuralNode>, level: Level) {
    while stack.len() > 1 && stack.last().map_or(false, |top| top.level >= level) {
        if let Some(node) = stack.pop() {
            if let Some(parent) = stack.last_mut() {
                parent.children.push(node);
            }
        }
    }
}
