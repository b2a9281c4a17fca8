//! Grid reconstruction from run positions.
//!
//! The last tier: runs are clustered into row bands by vertical overlap
//! and into column bands by horizontal overlap across the whole page, and
//! every run lands in the cell where its bands cross. Any page with text
//! yields a grid.

use super::{cell_text, CandidateTable, TableExtractor, TableInput};
use crate::convert::deadline::Deadline;
use crate::convert::options::WordOptions;
use crate::error::Result;
use crate::model::{Rect, SourceMethod, TextRun};

/// A one-dimensional cluster of overlapping intervals.
#[derive(Debug, Clone, Copy, PartialEq)]
struct Band {
    start: f32,
    end: f32,
}

impl Band {
    fn contains(&self, value: f32) -> bool {
        value >= self.start && value <= self.end
    }
}

/// Merge `(start, end)` intervals that overlap within `tolerance`.
fn bands(mut intervals: Vec<(f32, f32)>, tolerance: f32) -> Vec<Band> {
    intervals.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.total_cmp(&b.1)));
    let mut bands: Vec<Band> = Vec::new();
    for (start, end) in intervals {
        match bands.last_mut() {
            Some(band) if start <= band.end + tolerance => band.end = band.end.max(end),
            _ => bands.push(Band { start, end }),
        }
    }
    bands
}

fn band_index(bands: &[Band], value: f32) -> usize {
    bands
        .iter()
        .position(|b| b.contains(value))
        .unwrap_or_else(|| {
            // Values always start a band; only float edge cases get here
            bands
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| {
                    (a.start - value).abs().total_cmp(&(b.start - value).abs())
                })
                .map_or(0, |(i, _)| i)
        })
}

pub struct WordExtractor {
    options: WordOptions,
}

impl WordExtractor {
    pub fn new(options: WordOptions) -> Self {
        Self { options }
    }

    /// Rebuild a grid from `runs`; `None` only when there is no text.
    pub fn reconstruct(&self, runs: &[TextRun]) -> Option<CandidateTable> {
        let runs: Vec<&TextRun> = runs
            .iter()
            .filter(|r| !r.is_blank() && r.bbox.is_finite())
            .collect();
        if runs.is_empty() {
            return None;
        }

        let rows = bands(
            runs.iter().map(|r| (r.bbox.y, r.bbox.bottom())).collect(),
            self.options.y_tolerance,
        );
        let columns = bands(
            runs.iter().map(|r| (r.bbox.x, r.bbox.right())).collect(),
            self.options.x_tolerance,
        );

        let mut cells: Vec<Vec<Vec<&TextRun>>> = vec![vec![Vec::new(); columns.len()]; rows.len()];
        for run in &runs {
            let r = band_index(&rows, run.bbox.y);
            let c = band_index(&columns, run.bbox.x);
            cells[r][c].push(run);
        }

        let grid: Vec<Vec<String>> = cells
            .iter()
            .map(|row| row.iter().map(|cell| cell_text(cell)).collect())
            .collect();
        let bbox = runs
            .iter()
            .skip(1)
            .fold(runs[0].bbox, |acc: Rect, r| acc.union(&r.bbox));

        log::debug!(
            "Word reconstruction: {} runs into {}x{} grid",
            runs.len(),
            rows.len(),
            columns.len()
        );
        Some(CandidateTable::new(bbox, grid))
    }
}

impl TableExtractor for WordExtractor {
    fn method(&self) -> SourceMethod {
        SourceMethod::WordReconstruction
    }

    fn extract(&self, input: &TableInput<'_>, _deadline: &Deadline) -> Result<Vec<CandidateTable>> {
        Ok(self.reconstruct(&input.page.runs).into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run(text: &str, x: f32, y: f32, width: f32) -> TextRun {
        TextRun::new(text, 10.0, 0, Rect::new(x, y, width, 10.0))
    }

    fn extractor() -> WordExtractor {
        WordExtractor::new(WordOptions::default())
    }

    #[test]
    fn test_two_by_two() {
        let runs = vec![
            run("B1", 200.0, 100.0, 20.0),
            run("A1", 72.0, 100.0, 20.0),
            run("A2", 72.0, 120.0, 20.0),
            run("B2", 200.0, 121.0, 20.0),
        ];
        let table = extractor().reconstruct(&runs).unwrap();
        assert_eq!(
            table.rows,
            vec![
                vec!["A1".to_string(), "B1".to_string()],
                vec!["A2".to_string(), "B2".to_string()],
            ]
        );
        assert_eq!(table.bbox, Rect::new(72.0, 100.0, 148.0, 31.0));
    }

    #[test]
    fn test_full_width_run_merges_columns() {
        let runs = vec![
            run("A long paragraph crossing the page", 72.0, 100.0, 400.0),
            run("left", 72.0, 130.0, 30.0),
            run("right", 300.0, 130.0, 30.0),
        ];
        let table = extractor().reconstruct(&runs).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.rows[0].len(), 1);
        assert_eq!(table.rows[1], vec!["left right".to_string()]);
    }

    #[test]
    fn test_single_run_is_one_cell() {
        let table = extractor()
            .reconstruct(&[run("alone", 10.0, 10.0, 30.0)])
            .unwrap();
        assert_eq!(table.rows, vec![vec!["alone".to_string()]]);
    }

    #[test]
    fn test_never_fails_on_text() {
        // Scattered, overlapping, zero-sized and odd runs
        let runs: Vec<TextRun> = (0..40)
            .map(|i| {
                let f = i as f32;
                run(&format!("w{}", i), (f * 37.0) % 500.0, (f * 53.0) % 700.0, (f * 7.0) % 60.0)
            })
            .collect();
        let table = extractor().reconstruct(&runs).unwrap();
        assert!(!table.rows.is_empty());
        let width = table.rows[0].len();
        assert!(width >= 1);
        assert!(table.rows.iter().all(|r| r.len() == width));
        let placed: usize = table
            .rows
            .iter()
            .flatten()
            .map(|c| c.split_whitespace().count())
            .sum();
        assert_eq!(placed, 40);
    }

    #[test]
    fn test_no_text_no_table() {
        assert!(extractor().reconstruct(&[]).is_none());
        assert!(extractor().reconstruct(&[run("  ", 0.0, 0.0, 5.0)]).is_none());
    }
}
