//! Ruling-line table detection on a rasterized page.
//!
//! Dark horizontal and vertical pixel runs long enough to be rulings are
//! merged into lines, lines that touch are grouped into grids, and each
//! grid's distinct line positions become the row and column boundaries.

use std::sync::Arc;

use image::GrayImage;

use super::rasterizer::Rasterizer;
use super::{cell_text, CandidateTable, TableExtractor, TableInput};
use crate::convert::deadline::Deadline;
use crate::convert::options::LatticeOptions;
use crate::error::{Error, Result};
use crate::model::{Rect, SourceMethod, TextRun};

/// Pixels darker than this are ink.
const DARK_THRESHOLD: u8 = 128;

/// A ruling line in page points (top-left origin).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Ruling {
    /// y of a horizontal line, x of a vertical one
    pub pos: f32,
    pub start: f32,
    pub end: f32,
}

/// Rulings found on one page.
#[derive(Debug, Clone, Default)]
pub struct Rulings {
    pub horizontal: Vec<Ruling>,
    pub vertical: Vec<Ruling>,
}

pub struct LatticeExtractor {
    options: LatticeOptions,
    rasterizer: Arc<dyn Rasterizer>,
}

impl LatticeExtractor {
    pub fn new(options: LatticeOptions, rasterizer: Arc<dyn Rasterizer>) -> Self {
        Self {
            options,
            rasterizer,
        }
    }

    /// Points per pixel inverse: pixels per point at the configured dpi.
    fn scale(&self) -> f32 {
        self.options.dpi as f32 / 72.0
    }
}

impl TableExtractor for LatticeExtractor {
    fn method(&self) -> SourceMethod {
        SourceMethod::Lattice
    }

    fn probe(&self) -> Result<()> {
        self.rasterizer.probe()
    }

    fn extract(&self, input: &TableInput<'_>, deadline: &Deadline) -> Result<Vec<CandidateTable>> {
        let source = input.source.ok_or_else(|| Error::TableExtractionUnavailable {
            method: SourceMethod::Lattice,
            reason: "document is not available as a file".to_string(),
        })?;
        let image = self.rasterizer.rasterize(
            source,
            input.page.page_index,
            self.options.dpi,
            deadline,
        )?;
        log::debug!(
            "Page {}: rasterized by {} to {}x{}",
            input.page.page_index,
            self.rasterizer.name(),
            image.width(),
            image.height()
        );

        let rulings = detect_rulings(&image, self.scale(), &self.options);
        Ok(build_grids(&rulings, &input.page.runs, self.options.line_merge_tolerance))
    }
}

/// Find ruling lines in a grayscale page image.
pub fn detect_rulings(image: &GrayImage, scale: f32, options: &LatticeOptions) -> Rulings {
    let (width, height) = image.dimensions();
    let is_dark = |x: u32, y: u32| image.get_pixel(x, y).0[0] < DARK_THRESHOLD;
    let min_len = options.min_line_length * scale;

    let mut horizontal = Vec::new();
    for y in 0..height {
        for (start, end) in dark_runs(width, |x| is_dark(x, y)) {
            if (end - start) as f32 >= min_len {
                horizontal.push(Ruling {
                    pos: (y as f32 + 0.5) / scale,
                    start: start as f32 / scale,
                    end: end as f32 / scale,
                });
            }
        }
    }

    let mut vertical = Vec::new();
    for x in 0..width {
        for (start, end) in dark_runs(height, |y| is_dark(x, y)) {
            if (end - start) as f32 >= min_len {
                vertical.push(Ruling {
                    pos: (x as f32 + 0.5) / scale,
                    start: start as f32 / scale,
                    end: end as f32 / scale,
                });
            }
        }
    }

    let tolerance = options.line_merge_tolerance;
    Rulings {
        horizontal: merge_rulings(horizontal, tolerance),
        vertical: merge_rulings(vertical, tolerance),
    }
}

/// Half-open pixel ranges where `dark` holds.
fn dark_runs(len: u32, dark: impl Fn(u32) -> bool) -> Vec<(u32, u32)> {
    let mut runs = Vec::new();
    let mut start: Option<u32> = None;
    for i in 0..len {
        match (dark(i), start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                runs.push((s, i));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        runs.push((s, len));
    }
    runs
}

/// Merge collinear, overlapping segments (thick lines span several pixel rows).
fn merge_rulings(mut segments: Vec<Ruling>, tolerance: f32) -> Vec<Ruling> {
    segments.sort_by(|a, b| a.pos.total_cmp(&b.pos).then(a.start.total_cmp(&b.start)));

    // (lowest pos, highest pos, start, end)
    let mut merged: Vec<(f32, f32, f32, f32)> = Vec::new();
    for s in segments {
        let existing = merged.iter_mut().find(|(lo, hi, start, end)| {
            s.pos >= *lo - tolerance
                && s.pos <= *hi + tolerance
                && s.start <= *end + tolerance
                && s.end >= *start - tolerance
        });
        match existing {
            Some((_, hi, start, end)) => {
                *hi = hi.max(s.pos);
                *start = start.min(s.start);
                *end = end.max(s.end);
            }
            None => merged.push((s.pos, s.pos, s.start, s.end)),
        }
    }

    merged
        .into_iter()
        .map(|(lo, hi, start, end)| Ruling {
            pos: (lo + hi) / 2.0,
            start,
            end,
        })
        .collect()
}

/// Disjoint-set forest over ruling indices.
struct DisjointSet {
    parent: Vec<usize>,
}

impl DisjointSet {
    fn new(len: usize) -> Self {
        Self {
            parent: (0..len).collect(),
        }
    }

    fn find(&mut self, mut i: usize) -> usize {
        while self.parent[i] != i {
            self.parent[i] = self.parent[self.parent[i]];
            i = self.parent[i];
        }
        i
    }

    fn union(&mut self, a: usize, b: usize) {
        let (ra, rb) = (self.find(a), self.find(b));
        if ra != rb {
            self.parent[rb.max(ra)] = ra.min(rb);
        }
    }
}

fn crosses(h: &Ruling, v: &Ruling, tolerance: f32) -> bool {
    v.pos >= h.start - tolerance
        && v.pos <= h.end + tolerance
        && h.pos >= v.start - tolerance
        && h.pos <= v.end + tolerance
}

/// Sorted distinct positions, merging those within `tolerance`.
fn boundaries(rulings: &[&Ruling], tolerance: f32) -> Vec<f32> {
    let mut positions: Vec<f32> = rulings.iter().map(|r| r.pos).collect();
    positions.sort_by(f32::total_cmp);
    let mut merged: Vec<f32> = Vec::new();
    for p in positions {
        match merged.last() {
            Some(&last) if p - last <= tolerance => {}
            _ => merged.push(p),
        }
    }
    merged
}

/// Turn intersecting rulings into grids and fill them with runs.
pub fn build_grids(rulings: &Rulings, runs: &[TextRun], tolerance: f32) -> Vec<CandidateTable> {
    let h_count = rulings.horizontal.len();
    let mut sets = DisjointSet::new(h_count + rulings.vertical.len());
    for (i, h) in rulings.horizontal.iter().enumerate() {
        for (j, v) in rulings.vertical.iter().enumerate() {
            if crosses(h, v, tolerance) {
                sets.union(i, h_count + j);
            }
        }
    }

    // Group members by root, in index order for determinism.
    let mut groups: Vec<(usize, Vec<usize>)> = Vec::new();
    for i in 0..h_count + rulings.vertical.len() {
        let root = sets.find(i);
        match groups.iter_mut().find(|(r, _)| *r == root) {
            Some((_, members)) => members.push(i),
            None => groups.push((root, vec![i])),
        }
    }

    let mut tables = Vec::new();
    for (_, members) in groups {
        let hs: Vec<&Ruling> = members
            .iter()
            .filter(|&&i| i < h_count)
            .map(|&i| &rulings.horizontal[i])
            .collect();
        let vs: Vec<&Ruling> = members
            .iter()
            .filter(|&&i| i >= h_count)
            .map(|&i| &rulings.vertical[i - h_count])
            .collect();

        let ys = boundaries(&hs, tolerance);
        let xs = boundaries(&vs, tolerance);
        if ys.len() < 2 || xs.len() < 2 {
            continue;
        }
        if let Some(table) = fill_grid(&xs, &ys, runs) {
            tables.push(table);
        }
    }

    tables.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y).then(a.bbox.x.total_cmp(&b.bbox.x)));
    tables
}

/// Index of the band `[edges[i], edges[i + 1])` holding `value`.
fn band_of(edges: &[f32], value: f32) -> Option<usize> {
    edges.windows(2).position(|w| value >= w[0] && value < w[1])
}

fn fill_grid(xs: &[f32], ys: &[f32], runs: &[TextRun]) -> Option<CandidateTable> {
    let rows = ys.len() - 1;
    let cols = xs.len() - 1;
    let mut cells: Vec<Vec<Vec<&TextRun>>> = vec![vec![Vec::new(); cols]; rows];

    for run in runs {
        let (cx, cy) = (run.bbox.center_x(), run.bbox.center_y());
        if let (Some(r), Some(c)) = (band_of(ys, cy), band_of(xs, cx)) {
            cells[r][c].push(run);
        }
    }

    let grid: Vec<Vec<String>> = cells
        .iter()
        .map(|row| row.iter().map(|cell| cell_text(cell)).collect())
        .collect();
    if grid.iter().flatten().all(|c| c.is_empty()) {
        log::debug!("Discarding empty {}x{} ruling grid", rows, cols);
        return None;
    }

    let bbox = Rect::from_edges(xs[0], ys[0], xs[cols], ys[rows]);
    Some(CandidateTable::new(bbox, grid))
}
