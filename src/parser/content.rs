//! Content stream interpretation.
//!
//! Walks the operators of a page keeping the graphics state (`q`/`Q`/`cm`)
//! and the text state, and records what the page paints: positioned text
//! spans with per-glyph boxes, vector paths and image placements. Every
//! coordinate leaving this module is in top-left page space.

use std::collections::BTreeMap;

use super::backend::{get_number_from_value, ContentOp, PageBox, PageId, PdfBackend, PdfValue, XObject};
use super::fonts::FontMetrics;
use crate::model::{FontFlags, Glyph, Rect};

/// Fraction of the font size above the baseline.
const ASCENT: f32 = 0.8;
/// Fraction of the font size below the baseline.
const DESCENT: f32 = 0.2;
/// TJ adjustments beyond this (1/1000 em) split a span.
const TJ_SPLIT_THRESHOLD: f32 = 200.0;

/// A piece of text shown by one text-showing operator (or one segment of a
/// `TJ` array).
#[derive(Debug, Clone, PartialEq)]
pub struct TextSpan {
    pub text: String,
    pub bbox: Rect,
    /// Baseline y in top-left page space
    pub baseline: f32,
    /// Effective font size after text and graphics scaling
    pub font_size: f32,
    pub font_name: String,
    pub flags: FontFlags,
}

/// A painted (stroked and/or filled) vector path.
#[derive(Debug, Clone, PartialEq)]
pub struct PaintedPath {
    pub bbox: Rect,
    pub stroked: bool,
    pub filled: bool,
}

/// Everything painted on one page.
#[derive(Debug, Clone, Default)]
pub struct PageContent {
    pub spans: Vec<TextSpan>,
    pub glyphs: Vec<Glyph>,
    pub paths: Vec<PaintedPath>,
    /// Placed areas of image XObjects and inline images
    pub images: Vec<Rect>,
}

/// Affine transformation `[a b c d e f]` in PDF row-vector convention.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix {
    pub a: f32,
    pub b: f32,
    pub c: f32,
    pub d: f32,
    pub e: f32,
    pub f: f32,
}

impl Matrix {
    pub const IDENTITY: Matrix = Matrix::new(1.0, 0.0, 0.0, 1.0, 0.0, 0.0);

    pub const fn new(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn from_array(m: [f32; 6]) -> Self {
        Self::new(m[0], m[1], m[2], m[3], m[4], m[5])
    }

    pub fn translation(tx: f32, ty: f32) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, tx, ty)
    }

    /// `self × other`: apply `self` first, then `other`.
    pub fn multiply(&self, o: &Matrix) -> Matrix {
        Matrix::new(
            self.a * o.a + self.b * o.c,
            self.a * o.b + self.b * o.d,
            self.c * o.a + self.d * o.c,
            self.c * o.b + self.d * o.d,
            self.e * o.a + self.f * o.c + o.e,
            self.e * o.b + self.f * o.d + o.f,
        )
    }

    pub fn apply(&self, x: f32, y: f32) -> (f32, f32) {
        (
            x * self.a + y * self.c + self.e,
            x * self.b + y * self.d + self.f,
        )
    }

    /// Length of the transformed unit y vector.
    pub fn vertical_scale(&self) -> f32 {
        (self.c * self.c + self.d * self.d).sqrt()
    }
}

#[derive(Debug, Clone)]
struct TextState {
    font: Vec<u8>,
    size: f32,
    char_spacing: f32,
    word_spacing: f32,
    /// Horizontal scaling as a factor (Tz / 100)
    scale: f32,
    leading: f32,
    rise: f32,
}

impl Default for TextState {
    fn default() -> Self {
        Self {
            font: Vec::new(),
            size: 12.0,
            char_spacing: 0.0,
            word_spacing: 0.0,
            scale: 1.0,
            leading: 0.0,
            rise: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
struct GraphicsState {
    ctm: Matrix,
    text: TextState,
}

struct SpanBuilder {
    text: String,
    ink: Option<Rect>,
    all: Option<Rect>,
    baseline: f32,
    font_size: f32,
}

/// Interpret a page's content stream.
///
/// Fonts and XObjects that cannot be loaded degrade to defaults: text is
/// still positioned with estimated widths, and unknown XObjects are ignored.
pub fn interpret_page<B: PdfBackend + ?Sized>(
    backend: &B,
    page: PageId,
    page_box: PageBox,
    ops: &[ContentOp],
) -> PageContent {
    let fonts = backend.page_fonts(page).unwrap_or_else(|e| {
        log::debug!("Fonts unavailable on page {:?}: {}", page, e);
        BTreeMap::new()
    });
    let xobjects = backend.page_xobjects(page).unwrap_or_else(|e| {
        log::debug!("XObjects unavailable on page {:?}: {}", page, e);
        BTreeMap::new()
    });

    let mut interpreter = Interpreter {
        backend,
        page,
        page_box,
        fonts,
        out: PageContent::default(),
        state: GraphicsState {
            ctm: Matrix::IDENTITY,
            text: TextState::default(),
        },
        stack: Vec::new(),
        path: Vec::new(),
        tm: Matrix::IDENTITY,
        tlm: Matrix::IDENTITY,
        span: None,
    };
    interpreter.run(ops, &xobjects, false);
    interpreter.out
}

struct Interpreter<'a, B: PdfBackend + ?Sized> {
    backend: &'a B,
    page: PageId,
    page_box: PageBox,
    fonts: BTreeMap<Vec<u8>, FontMetrics>,
    out: PageContent,
    state: GraphicsState,
    stack: Vec<GraphicsState>,
    /// Points of the path under construction, in device space
    path: Vec<(f32, f32)>,
    tm: Matrix,
    tlm: Matrix,
    span: Option<SpanBuilder>,
}

impl<B: PdfBackend + ?Sized> Interpreter<'_, B> {
    fn run(&mut self, ops: &[ContentOp], xobjects: &BTreeMap<Vec<u8>, XObject>, graphics_only: bool) {
        for op in ops {
            match op.operator.as_str() {
                // Graphics state
                "q" => self.stack.push(self.state.clone()),
                "Q" => {
                    if let Some(state) = self.stack.pop() {
                        self.state = state;
                    }
                }
                "cm" => {
                    if let Some([a, b, c, d, e, f]) = op.numbers().as_deref() {
                        let m = Matrix::new(*a, *b, *c, *d, *e, *f);
                        self.state.ctm = m.multiply(&self.state.ctm);
                    }
                }

                // Path construction
                "m" | "l" => self.push_points(op, 2),
                "c" => self.push_points(op, 6),
                "v" | "y" => self.push_points(op, 4),
                "re" => {
                    if let Some([x, y, w, h]) = op.numbers().as_deref() {
                        let ctm = self.state.ctm;
                        for (px, py) in [(*x, *y), (x + w, *y), (x + w, y + h), (*x, y + h)] {
                            self.path.push(ctm.apply(px, py));
                        }
                    }
                }
                "h" | "W" | "W*" => {}

                // Path painting
                "S" | "s" => self.paint(true, false),
                "f" | "F" | "f*" => self.paint(false, true),
                "B" | "B*" | "b" | "b*" => self.paint(true, true),
                "n" => self.path.clear(),

                // External objects
                "Do" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.do_xobject(name, xobjects);
                    }
                }
                "BI" => self.place_unit_square(),

                // Text objects
                _ if graphics_only => {}
                "BT" => {
                    self.tm = Matrix::IDENTITY;
                    self.tlm = Matrix::IDENTITY;
                }
                "ET" => self.flush_span(),
                "Tf" => {
                    if let Some(PdfValue::Name(name)) = op.operands.first() {
                        self.state.text.font = name.clone();
                    }
                    if let Some(size) = op.number(1) {
                        self.state.text.size = size;
                    }
                }
                "Tc" => set_number(op, &mut self.state.text.char_spacing),
                "Tw" => set_number(op, &mut self.state.text.word_spacing),
                "TL" => set_number(op, &mut self.state.text.leading),
                "Ts" => set_number(op, &mut self.state.text.rise),
                "Tz" => {
                    if let Some(scale) = op.number(0) {
                        self.state.text.scale = scale / 100.0;
                    }
                }
                "Td" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        self.move_line(tx, ty);
                    }
                }
                "TD" => {
                    if let (Some(tx), Some(ty)) = (op.number(0), op.number(1)) {
                        self.state.text.leading = -ty;
                        self.move_line(tx, ty);
                    }
                }
                "Tm" => {
                    if let Some([a, b, c, d, e, f]) = op.numbers().as_deref() {
                        self.flush_span();
                        self.tm = Matrix::new(*a, *b, *c, *d, *e, *f);
                        self.tlm = self.tm;
                    }
                }
                "T*" => self.next_line(),
                "Tj" => {
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        self.show(bytes);
                    }
                    self.flush_span();
                }
                "TJ" => {
                    if let Some(PdfValue::Array(items)) = op.operands.first() {
                        self.show_array(items);
                    }
                    self.flush_span();
                }
                "'" => {
                    self.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.first() {
                        self.show(bytes);
                    }
                    self.flush_span();
                }
                "\"" => {
                    set_number(op, &mut self.state.text.word_spacing);
                    if let Some(tc) = op.number(1) {
                        self.state.text.char_spacing = tc;
                    }
                    self.next_line();
                    if let Some(PdfValue::Str(bytes)) = op.operands.get(2) {
                        self.show(bytes);
                    }
                    self.flush_span();
                }
                _ => {}
            }
        }
        self.flush_span();
    }

    fn push_points(&mut self, op: &ContentOp, count: usize) {
        let Some(values) = op.numbers() else { return };
        if values.len() < count {
            return;
        }
        let ctm = self.state.ctm;
        for pair in values[..count].chunks_exact(2) {
            self.path.push(ctm.apply(pair[0], pair[1]));
        }
    }

    fn paint(&mut self, stroked: bool, filled: bool) {
        let path = std::mem::take(&mut self.path);
        let points: Vec<(f32, f32)> = path.into_iter().map(|(x, y)| self.to_page(x, y)).collect();
        if let Some(bbox) = Rect::bounding(points) {
            if bbox.is_finite() {
                self.out.paths.push(PaintedPath {
                    bbox,
                    stroked,
                    filled,
                });
            }
        }
    }

    fn place_unit_square(&mut self) {
        let ctm = self.state.ctm;
        let corners = [(0.0, 0.0), (1.0, 0.0), (1.0, 1.0), (0.0, 1.0)].map(|(x, y)| {
            let (dx, dy) = ctm.apply(x, y);
            self.to_page(dx, dy)
        });
        if let Some(bbox) = Rect::bounding(corners) {
            if bbox.is_finite() {
                self.out.images.push(bbox);
            }
        }
    }

    fn do_xobject(&mut self, name: &[u8], xobjects: &BTreeMap<Vec<u8>, XObject>) {
        match xobjects.get(name) {
            Some(XObject::Image { .. }) => self.place_unit_square(),
            Some(XObject::Form {
                content,
                matrix,
                xobjects: nested,
            }) => {
                let ops = match self.backend.decode_content(content) {
                    Ok(ops) => ops,
                    Err(e) => {
                        log::debug!("Skipping unreadable form XObject: {}", e);
                        return;
                    }
                };
                self.flush_span();
                let saved = self.state.clone();
                let depth = self.stack.len();
                self.state.ctm = Matrix::from_array(*matrix).multiply(&self.state.ctm);
                self.run(&ops, nested, true);
                // Unbalanced q/Q inside a form must not leak out.
                self.stack.truncate(depth);
                self.state = saved;
                self.path.clear();
            }
            Some(XObject::Other) | None => {}
        }
    }

    fn move_line(&mut self, tx: f32, ty: f32) {
        self.flush_span();
        self.tlm = Matrix::translation(tx, ty).multiply(&self.tlm);
        self.tm = self.tlm;
    }

    fn next_line(&mut self) {
        let leading = if self.state.text.leading != 0.0 {
            self.state.text.leading
        } else {
            self.state.text.size * 1.2
        };
        self.move_line(0.0, -leading);
    }

    fn show_array(&mut self, items: &[PdfValue]) {
        for item in items {
            match item {
                PdfValue::Str(bytes) => self.show(bytes),
                other => {
                    if let Some(adjustment) = get_number_from_value(other) {
                        let text = &self.state.text;
                        let tx = -adjustment / 1000.0 * text.size * text.scale;
                        self.tm = Matrix::translation(tx, 0.0).multiply(&self.tm);
                        if -adjustment > TJ_SPLIT_THRESHOLD {
                            self.flush_span();
                        }
                    }
                }
            }
        }
    }

    fn show(&mut self, bytes: &[u8]) {
        let metrics = self
            .fonts
            .get(&self.state.text.font)
            .cloned()
            .unwrap_or_default();
        let text = self
            .backend
            .decode_text(self.page, &self.state.text.font, bytes);
        let codes = metrics.codes(bytes);
        let chars: Vec<char> = text.chars().filter(|c| *c != '\0').collect();
        if chars.is_empty() {
            return;
        }

        let ts = self.state.text.clone();

        // (glyph width, full advance) per character in unscaled text space
        let advances: Vec<(f32, f32)> = if chars.len() == codes.len() {
            codes
                .iter()
                .map(|&code| {
                    let width = metrics.width(code) / 1000.0 * ts.size;
                    let word = if code == 32 && !metrics.two_byte {
                        ts.word_spacing
                    } else {
                        0.0
                    };
                    (width, width + ts.char_spacing + word)
                })
                .collect()
        } else {
            // Multi-byte encodings: spread the string's width evenly.
            let total: f32 = codes
                .iter()
                .map(|&c| metrics.width(c) / 1000.0 * ts.size)
                .sum();
            let width = total / chars.len() as f32;
            chars
                .iter()
                .map(|c| {
                    let word = if *c == ' ' { ts.word_spacing } else { 0.0 };
                    (width, width + ts.char_spacing + word)
                })
                .collect()
        };

        for (ch, (width, advance)) in chars.into_iter().zip(advances) {
            let trm = self.tm.multiply(&self.state.ctm);
            let font_size = (ts.size * trm.vertical_scale()).abs();
            let font_size = if font_size > 0.0 { font_size } else { ts.size.abs() };

            let glyph_width = width * ts.scale;
            let corners = [
                (0.0, ts.rise - DESCENT * ts.size),
                (glyph_width, ts.rise - DESCENT * ts.size),
                (glyph_width, ts.rise + ASCENT * ts.size),
                (0.0, ts.rise + ASCENT * ts.size),
            ]
            .map(|(x, y)| {
                let (dx, dy) = trm.apply(x, y);
                self.to_page(dx, dy)
            });
            let (ox, oy) = trm.apply(0.0, ts.rise);
            let (_, baseline) = self.to_page(ox, oy);

            if let Some(bbox) = Rect::bounding(corners).filter(Rect::is_finite) {
                let span = self.span.get_or_insert_with(|| SpanBuilder {
                    text: String::new(),
                    ink: None,
                    all: None,
                    baseline,
                    font_size,
                });
                span.text.push(ch);
                span.all = Some(span.all.map_or(bbox, |r| r.union(&bbox)));
                if !ch.is_whitespace() {
                    span.ink = Some(span.ink.map_or(bbox, |r| r.union(&bbox)));
                    self.out.glyphs.push(Glyph::new(ch, bbox, font_size));
                }
            }

            self.tm = Matrix::translation(advance * ts.scale, 0.0).multiply(&self.tm);
        }
    }

    fn flush_span(&mut self) {
        let Some(span) = self.span.take() else { return };
        let Some(bbox) = span.ink.or(span.all) else { return };
        if span.text.trim().is_empty() {
            return;
        }
        let metrics = self.fonts.get(&self.state.text.font);
        let (font_name, flags) = match metrics {
            Some(m) => (m.base_font.clone(), m.flags),
            None => (
                String::from_utf8_lossy(&self.state.text.font).to_string(),
                FontFlags::empty(),
            ),
        };
        self.out.spans.push(TextSpan {
            text: span.text,
            bbox,
            baseline: span.baseline,
            font_size: span.font_size,
            font_name,
            flags,
        });
    }

    /// Device space (bottom-left origin) to top-left page space.
    fn to_page(&self, x: f32, y: f32) -> (f32, f32) {
        (x - self.page_box.x0, self.page_box.y1 - y)
    }
}

fn set_number(op: &ContentOp, target: &mut f32) {
    if let Some(value) = op.number(0) {
        *target = value;
    }
}
