//! Table types.

use super::Rect;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which extraction tier produced a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SourceMethod {
    /// Ruling lines found on a rasterized page
    Lattice,
    /// Whitespace and alignment analysis of text runs
    Stream,
    /// Character clustering
    #[serde(rename = "plumber-style", alias = "plumber")]
    Plumber,
    /// Row/column band reconstruction from raw runs
    WordReconstruction,
}

impl SourceMethod {
    /// All methods in pipeline priority order.
    pub const ALL: [SourceMethod; 4] = [
        SourceMethod::Lattice,
        SourceMethod::Stream,
        SourceMethod::Plumber,
        SourceMethod::WordReconstruction,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceMethod::Lattice => "lattice",
            SourceMethod::Stream => "stream",
            SourceMethod::Plumber => "plumber-style",
            SourceMethod::WordReconstruction => "word-reconstruction",
        }
    }

    /// Parse a method name as written in configuration or on the command line.
    pub fn parse(name: &str) -> Option<SourceMethod> {
        match name.trim().to_ascii_lowercase().as_str() {
            "lattice" => Some(SourceMethod::Lattice),
            "stream" => Some(SourceMethod::Stream),
            "plumber-style" | "plumber" => Some(SourceMethod::Plumber),
            "word-reconstruction" | "words" => Some(SourceMethod::WordReconstruction),
            _ => None,
        }
    }
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rectangular table.
///
/// The only way to build one is [`Table::from_rows`], which guarantees that
/// every row has the same number of cells. Deserialization goes through it
/// as well.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "TableRecord")]
pub struct Table {
    /// Zero-based page index
    #[serde(skip)]
    pub page_index: usize,

    /// Region the table occupies
    pub bbox: Rect,

    rows: Vec<Vec<String>>,

    /// Tier that produced the table
    pub source_method: SourceMethod,

    /// Share of non-empty cells, in [0, 1]
    pub fill_ratio: f32,

    /// Text of the closest preceding title or section heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<String>,

    /// Text of the closest preceding subsection heading
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subsection: Option<String>,
}

/// Serialized form of a [`Table`], before the grid is checked.
#[derive(Deserialize)]
struct TableRecord {
    bbox: Rect,
    rows: Vec<Vec<String>>,
    source_method: SourceMethod,
    #[serde(default)]
    section: Option<String>,
    #[serde(default)]
    subsection: Option<String>,
}

impl TryFrom<TableRecord> for Table {
    type Error = Error;

    fn try_from(record: TableRecord) -> Result<Self> {
        let mut table = Table::from_rows(0, record.bbox, record.rows, record.source_method)?;
        table.section = record.section;
        table.subsection = record.subsection;
        Ok(table)
    }
}

impl Table {
    /// Normalize a raw grid into a table.
    ///
    /// Cell text is trimmed and ragged rows are padded with empty strings up
    /// to the widest row. A grid without rows or without any column fails
    /// with [`Error::MalformedTable`].
    pub fn from_rows(
        page_index: usize,
        bbox: Rect,
        rows: Vec<Vec<String>>,
        source_method: SourceMethod,
    ) -> Result<Self> {
        if rows.is_empty() {
            return Err(Error::MalformedTable {
                method: source_method,
                reason: "grid has no rows".into(),
            });
        }
        let width = rows.iter().map(Vec::len).max().unwrap_or(0);
        if width == 0 {
            return Err(Error::MalformedTable {
                method: source_method,
                reason: "grid has no columns".into(),
            });
        }

        let rows: Vec<Vec<String>> = rows
            .into_iter()
            .map(|row| {
                let mut cells: Vec<String> =
                    row.into_iter().map(|c| c.trim().to_string()).collect();
                cells.resize(width, String::new());
                cells
            })
            .collect();

        let total = rows.len() * width;
        let filled = rows.iter().flatten().filter(|c| !c.is_empty()).count();

        Ok(Self {
            page_index,
            bbox,
            rows,
            source_method,
            fill_ratio: filled as f32 / total as f32,
            section: None,
            subsection: None,
        })
    }

    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    pub fn column_count(&self) -> usize {
        self.rows.first().map(Vec::len).unwrap_or(0)
    }

    /// Whether every cell is empty.
    pub fn is_blank(&self) -> bool {
        self.fill_ratio == 0.0
    }

    /// Get a cell by row and column.
    pub fn cell(&self, row: usize, col: usize) -> Option<&str> {
        self.rows.get(row)?.get(col).map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(rows: &[&[&str]]) -> Vec<Vec<String>> {
        rows.iter()
            .map(|r| r.iter().map(|c| c.to_string()).collect())
            .collect()
    }

    #[test]
    fn test_ragged_rows_are_padded() {
        let table = Table::from_rows(
            0,
            Rect::default(),
            grid(&[&["a", "b", "c"], &["d"], &[" e ", "f"]]),
            SourceMethod::Stream,
        )
        .unwrap();

        assert_eq!(table.row_count(), 3);
        assert!(table.rows().iter().all(|r| r.len() == 3));
        assert_eq!(table.cell(1, 2), Some(""));
        assert_eq!(table.cell(2, 0), Some("e"));
        assert!((table.fill_ratio - 6.0 / 9.0).abs() < 1e-6);
    }

    #[test]
    fn test_empty_grid_is_malformed() {
        let err = Table::from_rows(0, Rect::default(), vec![], SourceMethod::Lattice).unwrap_err();
        assert!(matches!(err, Error::MalformedTable { .. }));

        let err = Table::from_rows(0, Rect::default(), vec![vec![], vec![]], SourceMethod::Plumber)
            .unwrap_err();
        assert!(matches!(
            err,
            Error::MalformedTable {
                method: SourceMethod::Plumber,
                ..
            }
        ));
    }

    #[test]
    fn test_blank_table() {
        let table = Table::from_rows(
            0,
            Rect::default(),
            grid(&[&["", " "], &["", ""]]),
            SourceMethod::Lattice,
        )
        .unwrap();
        assert!(table.is_blank());
    }

    #[test]
    fn test_source_method_names() {
        assert_eq!(
            serde_json::to_string(&SourceMethod::WordReconstruction).unwrap(),
            "\"word-reconstruction\""
        );
        assert_eq!(serde_json::to_string(&SourceMethod::Lattice).unwrap(), "\"lattice\"");
        assert_eq!(
            serde_json::to_string(&SourceMethod::Plumber).unwrap(),
            "\"plumber-style\""
        );
        assert_eq!(SourceMethod::Plumber.to_string(), "plumber-style");
        assert_eq!(SourceMethod::parse("plumber-style"), Some(SourceMethod::Plumber));
        assert_eq!(SourceMethod::parse("plumber"), Some(SourceMethod::Plumber));
        assert_eq!(SourceMethod::parse("Words"), Some(SourceMethod::WordReconstruction));
        assert_eq!(SourceMethod::parse("camelot"), None);
    }

    #[test]
    fn test_serialized_fields() {
        let mut table =
            Table::from_rows(2, Rect::new(1.0, 2.0, 3.0, 4.0), grid(&[&["x"]]), SourceMethod::Stream)
                .unwrap();
        table.section = Some("Results".into());
        let json = serde_json::to_value(&table).unwrap();
        assert_eq!(json["rows"][0][0], "x");
        assert_eq!(json["source_method"], "stream");
        assert_eq!(json["section"], "Results");
        assert!(json.get("subsection").is_none());
        assert!(json.get("page_index").is_none());
    }

    #[test]
    fn test_ragged_json_is_padded() {
        let json = r#"{
            "bbox": [0, 0, 100, 50],
            "rows": [["a", "b", "c"], ["d"]],
            "source_method": "plumber-style",
            "fill_ratio": 1.0,
            "section": "Results"
        }"#;
        let table: Table = serde_json::from_str(json).unwrap();
        assert_eq!(table.column_count(), 3);
        assert!(table.rows().iter().all(|r| r.len() == 3));
        assert_eq!(table.source_method, SourceMethod::Plumber);
        assert!((table.fill_ratio - 4.0 / 6.0).abs() < 1e-6);
        assert_eq!(table.section.as_deref(), Some("Results"));
    }

    #[test]
    fn test_empty_json_grid_is_rejected() {
        let json = r#"{"bbox": [0, 0, 1, 1], "rows": [], "source_method": "stream", "fill_ratio": 0}"#;
        let err = serde_json::from_str::<Table>(json).unwrap_err();
        assert!(err.to_string().contains("no rows"));
    }
}
