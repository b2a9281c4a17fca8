//! Table detection from text alignment (stream mode).
//!
//! Tables are found by analyzing how text runs line up, without relying on
//! any graphical lines: runs are grouped into rows, left edges shared by
//! many rows become column boundaries, and contiguous rows that align with
//! those boundaries form a table region.

use std::collections::{BTreeMap, BTreeSet};

use super::{cell_text, CandidateTable, TableExtractor, TableInput};
use crate::convert::deadline::Deadline;
use crate::convert::options::StreamOptions;
use crate::error::Result;
use crate::model::{Rect, SourceMethod, TextRun};

/// Left edges within this many points share a bucket.
const BUCKET_SIZE: f32 = 5.0;
/// A run aligns with a column when its left edge is this close (points).
const ALIGN_TOLERANCE: f32 = 5.0;

/// A row of runs sharing a y position.
#[derive(Debug, Clone)]
struct Row<'a> {
    y: f32,
    runs: Vec<&'a TextRun>,
}

/// Detects tables from run alignment.
pub struct StreamExtractor {
    config: StreamOptions,
}

impl StreamExtractor {
    pub fn new(config: StreamOptions) -> Self {
        Self { config }
    }

    /// Detect tables among `runs`.
    pub fn detect(&self, runs: &[TextRun]) -> Vec<CandidateTable> {
        log::debug!("Stream: starting with {} runs", runs.len());

        if runs.len() < self.config.min_rows * self.config.min_columns {
            log::debug!(
                "Stream: not enough runs ({} < {})",
                runs.len(),
                self.config.min_rows * self.config.min_columns
            );
            return Vec::new();
        }

        // Step 1: Group runs into rows by y position
        let rows = self.group_into_rows(runs);
        if rows.len() < self.config.min_rows {
            log::debug!("Stream: not enough rows ({})", rows.len());
            return Vec::new();
        }

        // Step 2: Detect column boundaries from left edges
        let columns = self.detect_columns(&rows);
        if columns.len() < self.config.min_columns {
            log::debug!("Stream: not enough columns ({:?})", columns);
            return Vec::new();
        }

        // Step 3: Contiguous rows with consistent alignment
        let regions = self.find_table_regions(&rows, &columns);
        log::debug!("Stream: found {} table regions", regions.len());

        // Step 4: Re-detect columns per region and build grids
        let mut tables = Vec::new();
        for (start, end) in regions {
            let region = &rows[start..=end];
            let region_columns = self.detect_columns(region);

            if region_columns.len() < self.config.min_columns {
                continue;
            }
            // Too many columns usually means word-level splitting
            if region_columns.len() > self.config.max_columns {
                log::debug!(
                    "Stream: skipping region, too many columns ({} > {})",
                    region_columns.len(),
                    self.config.max_columns
                );
                continue;
            }
            if self.is_list_pattern(region, &region_columns) {
                log::debug!("Stream: skipping region, detected as list pattern");
                continue;
            }

            tables.push(self.to_candidate(region, &region_columns));
        }
        tables
    }

    /// Group runs into rows, top to bottom.
    fn group_into_rows<'a>(&self, runs: &'a [TextRun]) -> Vec<Row<'a>> {
        let mut sorted: Vec<&TextRun> = runs.iter().filter(|r| !r.is_blank()).collect();
        sorted.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y).then(a.bbox.x.total_cmp(&b.bbox.x)));

        let mut rows: Vec<Row<'a>> = Vec::new();
        let mut current: Vec<&TextRun> = Vec::new();
        let mut current_y: Option<f32> = None;

        for run in sorted {
            let y_tolerance = run.font_size * self.config.y_tolerance_factor;
            match current_y {
                Some(y) if (run.bbox.y - y).abs() <= y_tolerance => current.push(run),
                _ => {
                    if !current.is_empty() {
                        rows.push(make_row(std::mem::take(&mut current)));
                    }
                    current_y = Some(run.bbox.y);
                    current.push(run);
                }
            }
        }
        if !current.is_empty() {
            rows.push(make_row(current));
        }
        rows
    }

    /// Column boundaries (left edges) shared by enough rows.
    fn detect_columns(&self, rows: &[Row<'_>]) -> Vec<f32> {
        if rows.is_empty() {
            return Vec::new();
        }

        // Rows with several runs are the likely table rows
        let multi_run_rows: Vec<&Row<'_>> = rows.iter().filter(|r| r.runs.len() >= 2).collect();
        if multi_run_rows.len() < self.config.min_rows {
            return self.detect_columns_simple(rows);
        }

        let mut edge_counts: BTreeMap<i32, usize> = BTreeMap::new();
        for row in &multi_run_rows {
            // Each bucket counts once per row
            let buckets: BTreeSet<i32> = row
                .runs
                .iter()
                .map(|r| (r.bbox.x / BUCKET_SIZE).round() as i32)
                .collect();
            for bucket in buckets {
                *edge_counts.entry(bucket).or_insert(0) += 1;
            }
        }

        let min_occurrences =
            ((multi_run_rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        self.merge_edges(&edge_counts, min_occurrences)
    }

    /// Column detection for when few rows have several runs.
    fn detect_columns_simple(&self, rows: &[Row<'_>]) -> Vec<f32> {
        let mut edge_counts: BTreeMap<i32, usize> = BTreeMap::new();
        for run in rows.iter().flat_map(|r| r.runs.iter()) {
            *edge_counts
                .entry((run.bbox.x / BUCKET_SIZE).round() as i32)
                .or_insert(0) += 1;
        }
        let min_occurrences =
            ((rows.len() as f32 * self.config.min_alignment_ratio) as usize).max(2);
        self.merge_edges(&edge_counts, min_occurrences)
    }

    fn merge_edges(&self, edge_counts: &BTreeMap<i32, usize>, min_occurrences: usize) -> Vec<f32> {
        let mut merged: Vec<f32> = Vec::new();
        for (&bucket, &count) in edge_counts {
            if count < min_occurrences {
                continue;
            }
            let edge = bucket as f32 * BUCKET_SIZE;
            match merged.last() {
                Some(&last) if edge - last < self.config.min_column_gap => {}
                _ => merged.push(edge),
            }
        }
        merged
    }

    /// Contiguous row ranges whose alignment score clears the ratio.
    fn find_table_regions(&self, rows: &[Row<'_>], columns: &[f32]) -> Vec<(usize, usize)> {
        let mut regions = Vec::new();
        let mut current_start: Option<usize> = None;

        for (i, row) in rows.iter().enumerate() {
            if alignment_score(row, columns) >= self.config.min_alignment_ratio {
                current_start.get_or_insert(i);
                continue;
            }
            if let Some(start) = current_start.take() {
                if i - start >= self.config.min_rows {
                    regions.push((start, i - 1));
                }
            }
        }
        if let Some(start) = current_start {
            if rows.len() - start >= self.config.min_rows {
                regions.push((start, rows.len() - 1));
            }
        }
        regions
    }

    /// Numbered or bulleted lists look like two-column tables.
    fn is_list_pattern(&self, rows: &[Row<'_>], columns: &[f32]) -> bool {
        if columns.len() < 2 || rows.is_empty() {
            return false;
        }

        let mut bullets = 0;
        let mut numbers = 0;
        for row in rows {
            let first = row.runs.iter().min_by(|a, b| a.bbox.x.total_cmp(&b.bbox.x));
            if let Some(run) = first {
                let text = run.text.trim();
                if is_bullet_marker(text) {
                    bullets += 1;
                } else if is_number_marker(text) {
                    numbers += 1;
                }
            }
        }

        let bullet_ratio = bullets as f32 / rows.len() as f32;
        let marker_ratio = (bullets + numbers) as f32 / rows.len() as f32;
        // Numbered first columns are common in real tables, so numbers only
        // count against two-column regions.
        bullet_ratio >= 0.5 || (columns.len() == 2 && marker_ratio >= 0.5)
    }

    fn to_candidate(&self, rows: &[Row<'_>], columns: &[f32]) -> CandidateTable {
        let right = rows
            .iter()
            .flat_map(|r| r.runs.iter())
            .map(|r| r.bbox.right())
            .fold(f32::NEG_INFINITY, f32::max);

        let grid: Vec<Vec<String>> = rows
            .iter()
            .map(|row| {
                let mut cells: Vec<Vec<&TextRun>> = vec![Vec::new(); columns.len()];
                for run in &row.runs {
                    cells[column_for(run.bbox.x, columns, right)].push(run);
                }
                cells.iter().map(|c| cell_text(c)).collect()
            })
            .collect();

        let bbox = Rect::bounding(
            rows.iter()
                .flat_map(|r| r.runs.iter())
                .flat_map(|r| [(r.bbox.x, r.bbox.y), (r.bbox.right(), r.bbox.bottom())]),
        )
        .unwrap_or_default();
        CandidateTable::new(bbox, grid)
    }
}

impl TableExtractor for StreamExtractor {
    fn method(&self) -> SourceMethod {
        SourceMethod::Stream
    }

    fn extract(&self, input: &TableInput<'_>, _deadline: &Deadline) -> Result<Vec<CandidateTable>> {
        Ok(self.detect(&input.page.runs))
    }
}

fn make_row(runs: Vec<&TextRun>) -> Row<'_> {
    let y = runs.iter().map(|r| r.bbox.y).sum::<f32>() / runs.len() as f32;
    Row { y, runs }
}

/// Share of a row's runs starting on a column edge.
fn alignment_score(row: &Row<'_>, columns: &[f32]) -> f32 {
    if row.runs.is_empty() || columns.is_empty() {
        return 0.0;
    }
    let aligned = row
        .runs
        .iter()
        .filter(|r| columns.iter().any(|c| (r.bbox.x - c).abs() <= ALIGN_TOLERANCE))
        .count();
    aligned as f32 / row.runs.len() as f32
}

/// Column holding a run that starts at `x`.
fn column_for(x: f32, columns: &[f32], right: f32) -> usize {
    // Runs may start slightly before their column edge
    for (i, &start) in columns.iter().enumerate() {
        let end = columns.get(i + 1).copied().unwrap_or(right + 100.0);
        if x >= start - 10.0 && x < end - 10.0 {
            return i;
        }
    }

    columns
        .iter()
        .enumerate()
        .min_by(|(_, a), (_, b)| (x - **a).abs().total_cmp(&(x - **b).abs()))
        .map_or(0, |(i, _)| i)
}

/// Bullet markers (•, -, etc.).
fn is_bullet_marker(text: &str) -> bool {
    matches!(
        text.trim(),
        "-" | "–" | "—" | "•" | "·" | "*" | "○" | "▪" | "◦" | "▸" | "▹" | "►" | "■" | "●" | "※"
            | "□" | "◆" | "◇" | "▶" | "▷" | "☞" | "➤" | "➜"
    )
}

/// Number-style list markers (1., 2), a., etc.).
fn is_number_marker(text: &str) -> bool {
    let cleaned: String = text.chars().filter(|c| !c.is_whitespace()).collect();
    if cleaned.is_empty() {
        return false;
    }

    // Digits followed by "." or ")"
    if let Some(pos) = cleaned.find(|c: char| !c.is_ascii_digit()) {
        let (prefix, suffix) = cleaned.split_at(pos);
        if !prefix.is_empty() && (suffix == "." || suffix == ")") {
            return true;
        }
    }
    if cleaned.parse::<u32>().is_ok() {
        return true;
    }

    // Letter markers: "a.", "B)"
    let chars: Vec<char> = cleaned.chars().collect();
    chars.len() == 2 && chars[0].is_alphabetic() && (chars[1] == '.' || chars[1] == ')')
}
