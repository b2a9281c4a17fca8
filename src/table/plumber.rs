//! Table detection by character clustering.
//!
//! Glyphs are joined into words and words into lines. Runs of consecutive
//! lines that each contain a wide gap form a block; whitespace gutters
//! shared by every line of a block separate its columns.

use super::{CandidateTable, TableExtractor, TableInput};
use crate::convert::deadline::Deadline;
use crate::convert::options::PlumberOptions;
use crate::error::Result;
use crate::model::{interior_gaps, Glyph, Rect, SourceMethod};

/// Lines further apart than this many line heights end a block.
const MAX_LINE_SPACING: f32 = 2.5;

#[derive(Debug, Clone, PartialEq)]
struct Word {
    text: String,
    bbox: Rect,
}

#[derive(Debug, Clone)]
struct Line {
    words: Vec<Word>,
    bbox: Rect,
}

pub struct PlumberExtractor {
    options: PlumberOptions,
}

impl PlumberExtractor {
    pub fn new(options: PlumberOptions) -> Self {
        Self { options }
    }

    /// Detect tables among the glyphs of a page.
    pub fn detect(&self, glyphs: &[Glyph]) -> Vec<CandidateTable> {
        let lines = self.lines(glyphs);
        let mut tables = Vec::new();
        for block in self.blocks(&lines) {
            if let Some(table) = self.block_table(block) {
                tables.push(table);
            }
        }
        log::debug!("Plumber: {} lines, {} tables", lines.len(), tables.len());
        tables
    }

    /// Cluster glyphs into lines of words, top to bottom.
    fn lines(&self, glyphs: &[Glyph]) -> Vec<Line> {
        let mut sorted: Vec<&Glyph> = glyphs.iter().filter(|g| g.bbox.is_finite()).collect();
        sorted.sort_by(|a, b| {
            a.bbox
                .center_y()
                .total_cmp(&b.bbox.center_y())
                .then(a.bbox.x.total_cmp(&b.bbox.x))
        });

        let mut groups: Vec<Vec<&Glyph>> = Vec::new();
        for glyph in sorted {
            match groups.last_mut() {
                Some(group)
                    if (glyph.bbox.center_y() - group[0].bbox.center_y()).abs()
                        <= self.options.y_tolerance =>
                {
                    group.push(glyph)
                }
                _ => groups.push(vec![glyph]),
            }
        }

        groups
            .into_iter()
            .filter_map(|mut group| {
                group.sort_by(|a, b| a.bbox.x.total_cmp(&b.bbox.x));
                let words = self.words(&group);
                let bbox = words.iter().skip(1).fold(words.first()?.bbox, |acc, w| acc.union(&w.bbox));
                Some(Line { words, bbox })
            })
            .collect()
    }

    /// Join left-to-right glyphs of one line into words.
    fn words(&self, glyphs: &[&Glyph]) -> Vec<Word> {
        let mut words: Vec<Word> = Vec::new();
        for glyph in glyphs {
            match words.last_mut() {
                Some(word) if glyph.bbox.x - word.bbox.right() <= self.options.x_tolerance => {
                    // Dropped space characters show up as small gaps
                    if glyph.bbox.x - word.bbox.right() > 0.15 * glyph.font_size {
                        word.text.push(' ');
                    }
                    word.text.push(glyph.ch);
                    word.bbox = word.bbox.union(&glyph.bbox);
                }
                _ => words.push(Word {
                    text: glyph.ch.to_string(),
                    bbox: glyph.bbox,
                }),
            }
        }
        words
    }

    /// Whether a line has a gap wide enough to separate columns.
    fn has_wide_gap(&self, line: &Line) -> bool {
        line.words
            .windows(2)
            .any(|w| w[1].bbox.x - w[0].bbox.right() >= self.options.min_gutter)
    }

    /// Runs of at least two consecutive wide-gap lines.
    fn blocks<'a>(&self, lines: &'a [Line]) -> Vec<&'a [Line]> {
        let mut blocks = Vec::new();
        let mut start: Option<usize> = None;

        for i in 0..=lines.len() {
            let continues = i < lines.len()
                && self.has_wide_gap(&lines[i])
                && match start {
                    Some(s) if i > s => {
                        let prev = &lines[i - 1].bbox;
                        lines[i].bbox.y - prev.bottom() <= MAX_LINE_SPACING * prev.height.max(1.0)
                    }
                    _ => true,
                };

            if continues {
                start.get_or_insert(i);
                continue;
            }
            if let Some(s) = start.take() {
                if i - s >= 2 {
                    blocks.push(&lines[s..i]);
                }
            }
            // A wide-gap line that broke the spacing may start the next block
            if i < lines.len() && self.has_wide_gap(&lines[i]) {
                start = Some(i);
            }
        }
        blocks
    }

    /// Column gutters common to every line of the block.
    fn gutters(&self, block: &[Line]) -> Vec<f32> {
        let Some(extent) = Rect::bounding(
            block
                .iter()
                .flat_map(|l| [(l.bbox.x, l.bbox.y), (l.bbox.right(), l.bbox.bottom())]),
        ) else {
            return Vec::new();
        };

        let words: Vec<(f32, f32)> = block
            .iter()
            .flat_map(|l| l.words.iter())
            .map(|w| ((w.bbox.x - extent.x).floor(), (w.bbox.right() - extent.x).ceil()))
            .collect();

        // Free space touching the block edges is margin, not gutter
        interior_gaps(words)
            .into_iter()
            .filter(|(start, end)| end - start >= self.options.min_gutter)
            .map(|(start, end)| extent.x + (start + end) / 2.0)
            .collect()
    }

    fn block_table(&self, block: &[Line]) -> Option<CandidateTable> {
        let gutters = self.gutters(block);
        if gutters.is_empty() {
            return None;
        }

        let rows: Vec<Vec<String>> = block
            .iter()
            .map(|line| {
                let mut cells: Vec<Vec<&str>> = vec![Vec::new(); gutters.len() + 1];
                for word in &line.words {
                    let column = gutters
                        .iter()
                        .filter(|&&g| word.bbox.center_x() > g)
                        .count();
                    cells[column].push(&word.text);
                }
                cells.into_iter().map(|c| c.join(" ")).collect()
            })
            .collect();

        let bbox = block
            .iter()
            .skip(1)
            .fold(block[0].bbox, |acc, l| acc.union(&l.bbox));
        Some(CandidateTable::new(bbox, rows))
    }
}

impl TableExtractor for PlumberExtractor {
    fn method(&self) -> SourceMethod {
        SourceMethod::Plumber
    }

    fn extract(&self, input: &TableInput<'_>, _deadline: &Deadline) -> Result<Vec<CandidateTable>> {
        Ok(self.detect(&input.page.glyphs))
    }
}
