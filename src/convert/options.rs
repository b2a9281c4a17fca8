//! Conversion options and configuration.
//!
//! Every threshold the heuristics use lives here with its default. All
//! option structs deserialize with `#[serde(default)]`, so a JSON config
//! file only needs to name the values it overrides:
//!
//! ```
//! use pdfstruct::ConvertOptions;
//!
//! let options = ConvertOptions::from_json(r#"{ "tables": { "min_fill_ratio": 0.6 } }"#).unwrap();
//! assert_eq!(options.tables.min_fill_ratio, 0.6);
//! assert_eq!(options.headings.size_epsilon, 0.5);
//! ```

use std::ops::RangeInclusive;
use std::time::Duration;

use serde::{Deserialize, Deserializer};

use crate::error::{Error, Result};
use crate::model::SourceMethod;

/// Options for a whole conversion.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ConvertOptions {
    /// Heading classification
    pub headings: HeadingOptions,

    /// Document tree construction
    pub structure: StructureOptions,

    /// Text run extraction and normalization
    pub text: TextOptions,

    /// Table extraction pipeline
    pub tables: TableOptions,

    /// Chart/image detection
    pub graphics: GraphicsOptions,

    /// Per-document time budget (seconds in JSON); `None` = unlimited
    #[serde(deserialize_with = "deserialize_timeout")]
    pub timeout: Option<Duration>,

    /// Interpret pages in parallel
    pub parallel: bool,

    /// Page selection (which pages to convert)
    pub pages: PageSelection,
}

impl ConvertOptions {
    /// Create new options with defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from a JSON document, validating the result.
    pub fn from_json(json: &str) -> Result<Self> {
        let options: Self =
            serde_json::from_str(json).map_err(|e| Error::InvalidConfig(e.to_string()))?;
        options.validate()?;
        Ok(options)
    }

    /// Set the time budget.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Enable or disable parallel processing.
    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Disable parallel processing.
    pub fn sequential(mut self) -> Self {
        self.parallel = false;
        self
    }

    /// Set page selection.
    pub fn with_pages(mut self, pages: PageSelection) -> Self {
        self.pages = pages;
        self
    }

    pub fn with_headings(mut self, headings: HeadingOptions) -> Self {
        self.headings = headings;
        self
    }

    pub fn with_structure(mut self, structure: StructureOptions) -> Self {
        self.structure = structure;
        self
    }

    pub fn with_text(mut self, text: TextOptions) -> Self {
        self.text = text;
        self
    }

    pub fn with_tables(mut self, tables: TableOptions) -> Self {
        self.tables = tables;
        self
    }

    pub fn with_graphics(mut self, graphics: GraphicsOptions) -> Self {
        self.graphics = graphics;
        self
    }

    /// Disable one table extraction tier.
    pub fn without_tier(mut self, tier: SourceMethod) -> Self {
        self.tables.tiers.retain(|t| *t != tier);
        self
    }

    /// Reject values that would make the heuristics meaningless.
    pub fn validate(&self) -> Result<()> {
        fn check(ok: bool, what: &str) -> Result<()> {
            if ok {
                Ok(())
            } else {
                Err(Error::InvalidConfig(what.to_string()))
            }
        }

        check(
            self.headings.size_epsilon >= 0.0,
            "headings.size_epsilon must be non-negative",
        )?;
        check(
            self.structure.paragraph_gap_ratio >= 0.0,
            "structure.paragraph_gap_ratio must be non-negative",
        )?;
        check(
            self.text.word_gap_ratio > 0.0,
            "text.word_gap_ratio must be positive",
        )?;
        check(
            (0.0..=1.0).contains(&self.tables.min_fill_ratio),
            "tables.min_fill_ratio must be within [0, 1]",
        )?;
        check(self.tables.lattice.dpi > 0, "tables.lattice.dpi must be positive")?;
        check(
            self.tables.stream.min_rows >= 1 && self.tables.stream.min_columns >= 1,
            "tables.stream needs at least one row and column",
        )?;
        check(
            self.graphics.merge_gap >= 0.0,
            "graphics.merge_gap must be non-negative",
        )?;
        check(
            self.timeout.map_or(true, |t| !t.is_zero()),
            "timeout must be positive",
        )?;
        Ok(())
    }
}

impl Default for ConvertOptions {
    fn default() -> Self {
        Self {
            headings: HeadingOptions::default(),
            structure: StructureOptions::default(),
            text: TextOptions::default(),
            tables: TableOptions::default(),
            graphics: GraphicsOptions::default(),
            timeout: None,
            parallel: true,
            pages: PageSelection::All,
        }
    }
}

fn deserialize_timeout<'de, D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Option<Duration>, D::Error> {
    let secs = Option::<f64>::deserialize(deserializer)?;
    match secs {
        None => Ok(None),
        Some(s) if s.is_finite() && s > 0.0 => Ok(Some(Duration::from_secs_f64(s))),
        Some(s) => Err(serde::de::Error::custom(format!(
            "timeout must be a positive number of seconds, got {}",
            s
        ))),
    }
}

/// Heading classification thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HeadingOptions {
    /// Sizes closer than this (points) share a tier
    pub size_epsilon: f32,
    /// Number of largest heading tiers mapped to Title
    pub title_tiers: usize,
    /// Number of following tiers mapped to Section
    pub section_tiers: usize,
    /// Number of following tiers mapped to Subsection
    pub subsection_tiers: usize,
    /// Longest bold body-size run promoted to Subsection
    pub bold_heading_max_words: usize,
}

impl Default for HeadingOptions {
    fn default() -> Self {
        Self {
            size_epsilon: 0.5,
            title_tiers: 1,
            section_tiers: 1,
            subsection_tiers: 1,
            bold_heading_max_words: 4,
        }
    }
}

/// Document tree construction thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StructureOptions {
    /// Largest vertical gap (× font size) inside one paragraph
    pub paragraph_gap_ratio: f32,
    /// Largest font size change (points) inside one paragraph
    pub max_size_change: f32,
}

impl Default for StructureOptions {
    fn default() -> Self {
        Self {
            paragraph_gap_ratio: 0.8,
            max_size_change: 1.0,
        }
    }
}

/// Text run extraction and normalization.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TextOptions {
    /// Spans further apart than this (× font size) start a new run
    pub word_gap_ratio: f32,
    /// Gaps wider than this (× font size) get a space when merging
    pub space_gap_ratio: f32,
    /// Normalize Unicode to NFC form
    pub normalize_unicode: bool,
    /// Fix ligatures (fi, fl, etc.)
    pub expand_ligatures: bool,
    /// Remove Unicode replacement character (U+FFFD)
    pub remove_replacement_chars: bool,
    /// Collapse whitespace runs into one space
    pub collapse_whitespace: bool,
}

impl Default for TextOptions {
    fn default() -> Self {
        Self {
            word_gap_ratio: 1.5,
            space_gap_ratio: 0.15,
            normalize_unicode: true,
            expand_ligatures: true,
            remove_replacement_chars: true,
            collapse_whitespace: true,
        }
    }
}

/// Table extraction pipeline configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct TableOptions {
    /// Tables from `stream` and `plumber` below this fill ratio fail the
    /// confidence gate
    pub min_fill_ratio: f32,
    /// Enabled tiers; order is always lattice, stream, plumber-style, words
    pub tiers: Vec<SourceMethod>,
    pub lattice: LatticeOptions,
    pub stream: StreamOptions,
    pub plumber: PlumberOptions,
    pub words: WordOptions,
}

impl TableOptions {
    pub fn is_enabled(&self, tier: SourceMethod) -> bool {
        self.tiers.contains(&tier)
    }
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            min_fill_ratio: 0.4,
            tiers: SourceMethod::ALL.to_vec(),
            lattice: LatticeOptions::default(),
            stream: StreamOptions::default(),
            plumber: PlumberOptions::default(),
            words: WordOptions::default(),
        }
    }
}

/// Ruling-line detection on rasterized pages.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LatticeOptions {
    /// Rasterization resolution
    pub dpi: u32,
    /// Shortest dark run (points) counted as a ruling line
    pub min_line_length: f32,
    /// Rulings closer than this (points) are merged
    pub line_merge_tolerance: f32,
    /// Rasterizer executable
    pub rasterizer_command: String,
}

impl Default for LatticeOptions {
    fn default() -> Self {
        Self {
            dpi: 72,
            min_line_length: 20.0,
            line_merge_tolerance: 3.0,
            rasterizer_command: "pdftoppm".to_string(),
        }
    }
}

/// Whitespace/alignment detector configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct StreamOptions {
    /// Minimum number of rows to consider as table
    pub min_rows: usize,
    /// Minimum number of columns to consider as table
    pub min_columns: usize,
    /// Maximum number of columns (above this, likely word-level splitting)
    pub max_columns: usize,
    /// Y tolerance for grouping runs into rows (fraction of font size)
    pub y_tolerance_factor: f32,
    /// Minimum column alignment ratio (0.0-1.0)
    pub min_alignment_ratio: f32,
    /// Minimum gap between columns (points)
    pub min_column_gap: f32,
}

impl Default for StreamOptions {
    fn default() -> Self {
        Self {
            min_rows: 2,
            min_columns: 2,
            max_columns: 6,
            y_tolerance_factor: 0.4,
            min_alignment_ratio: 0.3,
            min_column_gap: 15.0,
        }
    }
}

/// Character clustering configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct PlumberOptions {
    /// Horizontal distance (points) joining characters into a word
    pub x_tolerance: f32,
    /// Vertical distance (points) joining words into a line
    pub y_tolerance: f32,
    /// Smallest whitespace gutter (points) separating columns
    pub min_gutter: f32,
}

impl Default for PlumberOptions {
    fn default() -> Self {
        Self {
            x_tolerance: 3.0,
            y_tolerance: 3.0,
            min_gutter: 10.0,
        }
    }
}

/// Word reconstruction configuration.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WordOptions {
    /// Vertical slack (points) when grouping runs into row bands
    pub y_tolerance: f32,
    /// Horizontal slack (points) when grouping runs into column bands
    pub x_tolerance: f32,
}

impl Default for WordOptions {
    fn default() -> Self {
        Self {
            y_tolerance: 3.0,
            x_tolerance: 0.0,
        }
    }
}

/// Chart/image detection thresholds.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct GraphicsOptions {
    /// Smallest vector cluster area (pt²) reported as a chart
    pub min_chart_area: f32,
    /// Paths closer than this (points) join one cluster
    pub merge_gap: f32,
    /// Paths thinner than this (points) count as rulings
    pub ruling_thickness: f32,
    /// Clusters covering this share of the page are backgrounds
    pub max_page_coverage: f32,
}

impl Default for GraphicsOptions {
    fn default() -> Self {
        Self {
            min_chart_area: 400.0,
            merge_gap: 2.0,
            ruling_thickness: 2.0,
            max_page_coverage: 0.9,
        }
    }
}

/// Page selection (1-indexed page numbers).
#[derive(Debug, Clone, Default, PartialEq)]
pub enum PageSelection {
    /// All pages
    #[default]
    All,
    /// A range of pages (inclusive, 1-indexed)
    Range(RangeInclusive<u32>),
    /// Specific pages (1-indexed)
    Pages(Vec<u32>),
}

impl PageSelection {
    /// Check if a page number should be included.
    pub fn includes(&self, page: u32) -> bool {
        match self {
            PageSelection::All => true,
            PageSelection::Range(range) => range.contains(&page),
            PageSelection::Pages(pages) => pages.contains(&page),
        }
    }

    /// Parse a page selection string (e.g., "1-10", "1,3,5,7-10").
    pub fn parse(s: &str) -> std::result::Result<Self, String> {
        let s = s.trim();

        if s.is_empty() || s == "all" {
            return Ok(PageSelection::All);
        }

        // Check for simple range (e.g., "1-10")
        if let Some((start, end)) = s.split_once('-') {
            if !start.contains(',') && !end.contains(',') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid start page")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid end page")?;
                if start == 0 || end < start {
                    return Err(format!("Invalid page range {}-{}", start, end));
                }
                return Ok(PageSelection::Range(start..=end));
            }
        }

        // Parse comma-separated list with possible ranges
        let mut pages = Vec::new();
        for part in s.split(',') {
            let part = part.trim();
            if let Some((start, end)) = part.split_once('-') {
                let start: u32 = start.trim().parse().map_err(|_| "Invalid page number")?;
                let end: u32 = end.trim().parse().map_err(|_| "Invalid page number")?;
                pages.extend(start..=end);
            } else {
                let p: u32 = part.parse().map_err(|_| "Invalid page number")?;
                pages.push(p);
            }
        }

        if pages.contains(&0) {
            return Err("Page numbers start at 1".to_string());
        }
        pages.sort_unstable();
        pages.dedup();
        Ok(PageSelection::Pages(pages))
    }
}

impl<'de> Deserialize<'de> for PageSelection {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        let s = String::deserialize(deserializer)?;
        PageSelection::parse(&s).map_err(serde::de::Error::custom)
    }
}
