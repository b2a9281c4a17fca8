//! Reading order of the runs on one page.
//!
//! Two-column pages are detected through a vertical whitespace gutter in
//! the middle of the text extent. Runs that cross the gutter (titles,
//! full-width figures captions) cut the page into bands; each band is read
//! left column first.

use crate::model::{interior_gaps, TextRun};

/// Minimum gutter width (points)
const MIN_GUTTER: f32 = 12.0;
/// Minimum column width (points)
const MIN_COLUMN_WIDTH: f32 = 80.0;
/// Occupancy slice width (points)
const SLICE: f32 = 3.0;
/// Share of same-line neighbours that may overlap before giving up
const MAX_OVERLAP_RATIO: f32 = 0.3;

/// How the order was determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Strategy {
    /// Two columns separated by a gutter
    Columns,
    /// Line-aware top-to-bottom order
    SingleColumn,
    /// Plain sort by bbox origin
    Raw,
}

/// The runs of a page in reading order.
#[derive(Debug, Clone, PartialEq)]
pub struct ReadingOrder {
    pub strategy: Strategy,
    /// Indices into the input slice
    pub order: Vec<usize>,
}

impl ReadingOrder {
    /// Order `runs`.
    pub fn of(runs: &[TextRun]) -> Self {
        if runs.iter().any(|r| !r.bbox.is_finite()) || is_overlapping(runs) {
            log::debug!("Falling back to raw reading order");
            return Self {
                strategy: Strategy::Raw,
                order: raw_order(runs),
            };
        }

        let all: Vec<usize> = (0..runs.len()).collect();
        if let Some(gutter) = find_gutter(runs) {
            log::debug!("Two-column layout, gutter at x={:.1}", gutter);
            return Self {
                strategy: Strategy::Columns,
                order: column_order(runs, gutter),
            };
        }

        Self {
            strategy: Strategy::SingleColumn,
            order: line_order(runs, &all),
        }
    }

    /// Borrow the runs in order.
    pub fn apply<'a>(&self, runs: &'a [TextRun]) -> Vec<&'a TextRun> {
        self.order.iter().map(|&i| &runs[i]).collect()
    }
}

fn raw_order(runs: &[TextRun]) -> Vec<usize> {
    let mut order: Vec<usize> = (0..runs.len()).collect();
    order.sort_by(|&a, &b| {
        runs[a]
            .bbox
            .y
            .total_cmp(&runs[b].bbox.y)
            .then(runs[a].bbox.x.total_cmp(&runs[b].bbox.x))
    });
    order
}

/// Whether two runs sit on the same visual line.
fn same_line(a: &TextRun, b: &TextRun) -> bool {
    let tolerance = 0.5 * a.bbox.height.min(b.bbox.height).max(1.0);
    (a.bbox.center_y() - b.bbox.center_y()).abs() <= tolerance
}

/// Group `indices` into lines, top to bottom, each sorted left to right.
fn group_lines(runs: &[TextRun], indices: &[usize]) -> Vec<Vec<usize>> {
    let mut sorted = indices.to_vec();
    sorted.sort_by(|&a, &b| {
        runs[a]
            .bbox
            .center_y()
            .total_cmp(&runs[b].bbox.center_y())
            .then(runs[a].bbox.x.total_cmp(&runs[b].bbox.x))
    });

    let mut lines: Vec<Vec<usize>> = Vec::new();
    for i in sorted {
        match lines.last_mut() {
            Some(line) if same_line(&runs[line[0]], &runs[i]) => line.push(i),
            _ => lines.push(vec![i]),
        }
    }
    for line in &mut lines {
        line.sort_by(|&a, &b| runs[a].bbox.x.total_cmp(&runs[b].bbox.x));
    }
    lines
}

fn line_order(runs: &[TextRun], indices: &[usize]) -> Vec<usize> {
    group_lines(runs, indices).into_iter().flatten().collect()
}

/// Too many same-line neighbours drawn over each other to trust geometry.
fn is_overlapping(runs: &[TextRun]) -> bool {
    let all: Vec<usize> = (0..runs.len()).collect();
    let mut pairs = 0usize;
    let mut overlapping = 0usize;
    for line in group_lines(runs, &all) {
        for pair in line.windows(2) {
            pairs += 1;
            if runs[pair[0]].bbox.horizontal_overlap(&runs[pair[1]].bbox) > 1.0 {
                overlapping += 1;
            }
        }
    }
    pairs > 0 && overlapping as f32 / pairs as f32 > MAX_OVERLAP_RATIO
}

/// Find a column gutter, first over all runs, then ignoring wide runs.
fn find_gutter(runs: &[TextRun]) -> Option<f32> {
    let min_x = runs.iter().map(|r| r.bbox.x).fold(f32::INFINITY, f32::min);
    let max_x = runs.iter().map(|r| r.bbox.right()).fold(f32::NEG_INFINITY, f32::max);
    let extent = max_x - min_x;
    if runs.len() < 4 || extent < 2.0 * MIN_COLUMN_WIDTH + MIN_GUTTER {
        return None;
    }

    let all: Vec<&TextRun> = runs.iter().collect();
    let narrow: Vec<&TextRun> = runs
        .iter()
        .filter(|r| r.bbox.width <= extent * 0.5)
        .collect();

    [all, narrow]
        .iter()
        .find_map(|candidates| gutter_in(candidates, min_x, max_x))
}

fn gutter_in(runs: &[&TextRun], min_x: f32, max_x: f32) -> Option<f32> {
    let extent = max_x - min_x;
    // Snap to a coarse grid so hairline gaps between runs don't count.
    let occupied: Vec<(f32, f32)> = runs
        .iter()
        .map(|r| {
            let start = ((r.bbox.x - min_x) / SLICE).floor() * SLICE;
            let end = ((r.bbox.right() - min_x) / SLICE).ceil() * SLICE;
            (min_x + start, min_x + end)
        })
        .collect();

    // Only the middle 70% of the extent may hold the gutter.
    let lo = min_x + extent * 0.15;
    let hi = min_x + extent * 0.85;

    let mut best: Option<(f32, f32)> = None; // (width, centre)
    for (gap_start, gap_end) in interior_gaps(occupied) {
        let width = gap_end - gap_start;
        let centre = (gap_start + gap_end) / 2.0;
        if width >= MIN_GUTTER
            && centre >= lo
            && centre <= hi
            && gap_start - min_x >= MIN_COLUMN_WIDTH
            && max_x - gap_end >= MIN_COLUMN_WIDTH
            && best.map_or(true, |(w, _)| width > w)
        {
            best = Some((width, centre));
        }
    }

    let (_, gutter) = best?;
    let left = runs.iter().filter(|r| r.bbox.right() <= gutter).count();
    let right = runs.iter().filter(|r| r.bbox.x >= gutter).count();
    (left >= 2 && right >= 2).then_some(gutter)
}

fn column_order(runs: &[TextRun], gutter: f32) -> Vec<usize> {
    let mut by_top: Vec<usize> = (0..runs.len()).collect();
    by_top.sort_by(|&a, &b| {
        runs[a]
            .bbox
            .y
            .total_cmp(&runs[b].bbox.y)
            .then(runs[a].bbox.x.total_cmp(&runs[b].bbox.x))
    });

    let spans_gutter = |r: &TextRun| r.bbox.x < gutter && r.bbox.right() > gutter;

    let mut order = Vec::with_capacity(runs.len());
    let mut left: Vec<usize> = Vec::new();
    let mut right: Vec<usize> = Vec::new();
    let flush = |left: &mut Vec<usize>, right: &mut Vec<usize>, order: &mut Vec<usize>| {
        order.extend(line_order(runs, left));
        order.extend(line_order(runs, right));
        left.clear();
        right.clear();
    };

    for i in by_top {
        let run = &runs[i];
        if spans_gutter(run) {
            flush(&mut left, &mut right, &mut order);
            order.push(i);
        } else if run.bbox.center_x() < gutter {
            left.push(i);
        } else {
            right.push(i);
        }
    }
    flush(&mut left, &mut right, &mut order);
    order
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Rect;

    fn run(text: &str, x: f32, y: f32, width: f32) -> TextRun {
        TextRun::new(text, 10.0, 0, Rect::new(x, y, width, 10.0))
    }

    fn texts<'a>(runs: &'a [TextRun], order: &ReadingOrder) -> Vec<&'a str> {
        order.apply(runs).iter().map(|r| r.text.as_str()).collect()
    }

    #[test]
    fn test_single_column_line_aware() {
        let runs = vec![
            run("second", 72.0, 100.0, 100.0),
            run("right", 200.0, 80.5, 50.0),
            run("left", 72.0, 80.0, 100.0),
        ];
        let order = ReadingOrder::of(&runs);
        assert_eq!(order.strategy, Strategy::SingleColumn);
        assert_eq!(texts(&runs, &order), vec!["left", "right", "second"]);
    }

    #[test]
    fn test_two_columns_with_spanning_title() {
        let runs = vec![
            run("Title across both columns", 72.0, 50.0, 400.0),
            run("L1", 72.0, 100.0, 180.0),
            run("R1", 300.0, 100.0, 180.0),
            run("L2", 72.0, 115.0, 180.0),
            run("R2", 300.0, 115.0, 180.0),
            run("L3", 72.0, 130.0, 180.0),
        ];
        let order = ReadingOrder::of(&runs);
        assert_eq!(order.strategy, Strategy::Columns);
        assert_eq!(
            texts(&runs, &order),
            vec!["Title across both columns", "L1", "L2", "L3", "R1", "R2"]
        );
    }

    #[test]
    fn test_footer_band_after_columns() {
        let runs = vec![
            run("L1", 72.0, 100.0, 180.0),
            run("R1", 300.0, 100.0, 180.0),
            run("L2", 72.0, 115.0, 180.0),
            run("R2", 300.0, 115.0, 180.0),
            run("Footer spanning the page", 72.0, 700.0, 400.0),
        ];
        let order = ReadingOrder::of(&runs);
        assert_eq!(
            texts(&runs, &order),
            vec!["L1", "L2", "R1", "R2", "Footer spanning the page"]
        );
    }

    #[test]
    fn test_overlapping_runs_use_raw_order() {
        let runs = vec![
            run("b", 75.0, 100.0, 50.0),
            run("a", 72.0, 100.0, 50.0),
            run("c", 72.0, 120.0, 50.0),
        ];
        let order = ReadingOrder::of(&runs);
        assert_eq!(order.strategy, Strategy::Raw);
        assert_eq!(texts(&runs, &order), vec!["a", "b", "c"]);
    }

    #[test]
    fn test_non_finite_uses_raw_order() {
        let runs = vec![
            run("x", f32::NAN, 10.0, 5.0),
            run("y", 10.0, 5.0, 5.0),
        ];
        let order = ReadingOrder::of(&runs);
        assert_eq!(order.strategy, Strategy::Raw);
        assert_eq!(order.order.len(), 2);
    }

    #[test]
    fn test_far_off_run_keeps_every_index() {
        let runs = vec![
            run("L1", 72.0, 100.0, 180.0),
            run("R1", 300.0, 100.0, 180.0),
            run("L2", 72.0, 115.0, 180.0),
            run("R2", 300.0, 115.0, 180.0),
            run("far", 1.0e15, 130.0, 5.0),
        ];
        let order = ReadingOrder::of(&runs);
        let mut seen = order.order.clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn test_empty_page() {
        let order = ReadingOrder::of(&[]);
        assert!(order.order.is_empty());
    }
}
