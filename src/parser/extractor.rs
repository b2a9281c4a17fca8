//! Text run extraction.
//!
//! Turns the spans painted by the content interpreter into [`TextRun`]s:
//! spans sharing a baseline, size and weight are merged while the gap
//! between them stays below a word-gap threshold, so that table cells and
//! column fragments remain separate runs.

use regex::Regex;
use unicode_normalization::UnicodeNormalization;

use super::backend::{PageId, PdfBackend};
use super::content::{interpret_page, PaintedPath, TextSpan};
use super::fonts::is_spaceless_script_char;
use crate::convert::options::TextOptions;
use crate::error::{Error, Result};
use crate::model::{Glyph, Rect, TextRun};

/// Everything the later stages need to know about one page.
#[derive(Debug, Clone, Default)]
pub struct PageView {
    /// Zero-based page index
    pub page_index: usize,
    pub width: f32,
    pub height: f32,
    /// Text runs, top-left coordinates
    pub runs: Vec<TextRun>,
    /// Individual characters, for character-level table detection
    pub glyphs: Vec<Glyph>,
    /// Painted vector paths
    pub paths: Vec<PaintedPath>,
    /// Placed image areas
    pub images: Vec<Rect>,
}

impl PageView {
    /// An empty page of the given size.
    pub fn empty(page_index: usize, width: f32, height: f32) -> Self {
        Self {
            page_index,
            width,
            height,
            ..Default::default()
        }
    }

    /// Page area as a rectangle.
    pub fn bounds(&self) -> Rect {
        Rect::new(0.0, 0.0, self.width, self.height)
    }
}

/// Produces the text runs of a document, page by page.
///
/// Pages are decoded on demand; calling [`page`](Self::page) twice decodes
/// the page twice and has no side effects.
pub struct TextRunExtractor<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page_ids: Vec<PageId>,
    options: TextOptions,
    normalizer: TextNormalizer,
}

impl<'a, B: PdfBackend + ?Sized> TextRunExtractor<'a, B> {
    pub fn new(backend: &'a B, options: &TextOptions) -> Self {
        Self {
            backend,
            page_ids: backend.page_ids(),
            options: options.clone(),
            normalizer: TextNormalizer::new(options.clone()),
        }
    }

    /// Number of pages in the document.
    pub fn page_count(&self) -> usize {
        self.page_ids.len()
    }

    /// Lazily decode every page in order.
    pub fn pages(&self) -> impl Iterator<Item = Result<PageView>> + '_ {
        (0..self.page_count()).map(move |i| self.page(i))
    }

    /// Decode one page.
    ///
    /// A page without `/Contents` is an empty page. A page whose content
    /// cannot be decoded fails with [`Error::DocumentUnreadable`] carrying
    /// the page index.
    pub fn page(&self, page_index: usize) -> Result<PageView> {
        let page_id = *self
            .page_ids
            .get(page_index)
            .ok_or_else(|| Error::unreadable_page(page_index, "page does not exist"))?;

        let page_box = self.backend.page_box(page_id);
        let mut view = PageView::empty(page_index, page_box.width(), page_box.height());

        let Some(data) = self
            .backend
            .page_content(page_id)
            .map_err(|e| at_page(e, page_index))?
        else {
            log::debug!("Page {} has no content stream", page_index);
            return Ok(view);
        };

        let ops = self
            .backend
            .decode_content(&data)
            .map_err(|e| at_page(e, page_index))?;
        let content = interpret_page(self.backend, page_id, page_box, &ops);

        // Ink outside the page box is never shown; later stages size work
        // from these extents.
        let bounds = view.bounds();
        let spans: Vec<TextSpan> = content
            .spans
            .into_iter()
            .filter_map(|mut span| {
                span.bbox = span.bbox.clip(&bounds)?;
                Some(span)
            })
            .collect();
        let painted = content.glyphs.len();
        view.glyphs = content
            .glyphs
            .into_iter()
            .filter_map(|mut glyph| {
                glyph.bbox = glyph.bbox.clip(&bounds)?;
                Some(glyph)
            })
            .collect();
        if view.glyphs.len() < painted {
            log::debug!(
                "Page {}: dropped {} glyphs outside the page box",
                page_index,
                painted - view.glyphs.len()
            );
        }
        view.runs = self.build_runs(spans, page_index);
        view.paths = content
            .paths
            .into_iter()
            .filter_map(|mut path| {
                path.bbox = path.bbox.clip(&bounds)?;
                Some(path)
            })
            .collect();
        view.images = content.images;

        log::debug!(
            "Page {}: {} runs, {} glyphs, {} paths, {} images",
            page_index,
            view.runs.len(),
            view.glyphs.len(),
            view.paths.len(),
            view.images.len()
        );
        Ok(view)
    }

    /// Merge spans into runs.
    fn build_runs(&self, spans: Vec<TextSpan>, page_index: usize) -> Vec<TextRun> {
        let mut runs = Vec::new();
        for line in group_into_lines(spans) {
            let mut current: Option<TextSpan> = None;
            for span in line {
                current = Some(match current {
                    Some(mut prev) if self.continues(&prev, &span) => {
                        let gap = span.bbox.x - prev.bbox.right();
                        if self.needs_space(&prev.text, &span.text, gap, prev.font_size) {
                            prev.text.push(' ');
                        }
                        prev.text.push_str(&span.text);
                        prev.bbox = prev.bbox.union(&span.bbox);
                        prev
                    }
                    Some(prev) => {
                        self.push_run(&mut runs, prev, page_index);
                        span
                    }
                    None => span,
                });
            }
            if let Some(prev) = current {
                self.push_run(&mut runs, prev, page_index);
            }
        }
        runs
    }

    fn continues(&self, prev: &TextSpan, next: &TextSpan) -> bool {
        let gap = next.bbox.x - prev.bbox.right();
        (prev.font_size - next.font_size).abs() <= 0.5
            && prev.flags.is_bold() == next.flags.is_bold()
            && gap < self.options.word_gap_ratio * prev.font_size
            && gap > -prev.font_size
    }

    fn needs_space(&self, prev: &str, next: &str, gap: f32, font_size: f32) -> bool {
        if gap <= self.options.space_gap_ratio * font_size {
            return false;
        }
        let (Some(last), Some(first)) = (prev.chars().last(), next.chars().next()) else {
            return false;
        };
        if last.is_whitespace() || first.is_whitespace() {
            return false;
        }
        !(is_spaceless_script_char(last) && is_spaceless_script_char(first))
    }

    fn push_run(&self, runs: &mut Vec<TextRun>, span: TextSpan, page_index: usize) {
        let text = self.normalizer.normalize(&span.text);
        if text.is_empty() {
            return;
        }
        runs.push(
            TextRun::new(text, span.font_size, page_index, span.bbox)
                .with_flags(span.flags)
                .with_font_name(span.font_name),
        );
    }
}

/// Attach a page index to a document-level error.
fn at_page(err: Error, page_index: usize) -> Error {
    match err {
        Error::DocumentUnreadable { page: None, reason } => {
            Error::DocumentUnreadable {
                page: Some(page_index),
                reason,
            }
        }
        other => other,
    }
}

/// Group spans into baseline-aligned lines, each sorted left to right.
fn group_into_lines(mut spans: Vec<TextSpan>) -> Vec<Vec<TextSpan>> {
    spans.sort_by(|a, b| {
        a.baseline
            .total_cmp(&b.baseline)
            .then(a.bbox.x.total_cmp(&b.bbox.x))
    });

    let mut lines: Vec<Vec<TextSpan>> = Vec::new();
    let mut current: Vec<TextSpan> = Vec::new();
    let mut current_y: Option<f32> = None;

    for span in spans {
        let y_tolerance = span.font_size * 0.3; // Allow 30% of font size variance
        match current_y {
            Some(y) if (span.baseline - y).abs() <= y_tolerance => current.push(span),
            _ => {
                if !current.is_empty() {
                    lines.push(std::mem::take(&mut current));
                }
                current_y = Some(span.baseline);
                current.push(span);
            }
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }

    for line in &mut lines {
        line.sort_by(|a, b| a.bbox.x.total_cmp(&b.bbox.x));
    }
    lines
}

/// Text normalization applied to every run.
pub struct TextNormalizer {
    options: TextOptions,
    whitespace: Regex,
    ligature_map: Vec<(&'static str, &'static str)>,
}

impl TextNormalizer {
    pub fn new(options: TextOptions) -> Self {
        Self {
            options,
            whitespace: Regex::new(r"\s+").expect("static regex"),
            ligature_map: vec![
                ("\u{FB00}", "ff"),  // ﬀ
                ("\u{FB01}", "fi"),  // ﬁ
                ("\u{FB02}", "fl"),  // ﬂ
                ("\u{FB03}", "ffi"), // ﬃ
                ("\u{FB04}", "ffl"), // ﬄ
                ("\u{FB05}", "st"),  // ﬅ (long s + t)
                ("\u{FB06}", "st"),  // ﬆ
            ],
        }
    }

    /// Normalize `text`; the result has no leading or trailing whitespace
    /// when whitespace collapsing is on.
    pub fn normalize(&self, text: &str) -> String {
        let mut result: String = if self.options.normalize_unicode {
            text.nfc().collect()
        } else {
            text.to_string()
        };

        if self.options.expand_ligatures {
            for (ligature, replacement) in &self.ligature_map {
                if result.contains(ligature) {
                    result = result.replace(ligature, replacement);
                }
            }
        }

        if self.options.remove_replacement_chars {
            result.retain(|c| c != '\u{FFFD}');
        }

        if self.options.collapse_whitespace {
            result = self.whitespace.replace_all(&result, " ").trim().to_string();
        } else if result.trim().is_empty() {
            result.clear();
        }

        result
    }
}
