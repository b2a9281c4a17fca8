//! Table extraction pipeline.
//!
//! Four tiers are tried in a fixed order on every page: [`lattice`]
//! (ruling lines on a rasterized page), [`stream`] (text alignment),
//! [`plumber`] (character clustering) and [`words`] (run positions). The
//! first tier whose output passes its gate wins the page; tiers are never
//! merged. A tier falls through when it is unavailable, fails, finds
//! nothing, produces a grid that cannot be normalized, or (for `stream`
//! and `plumber`) produces a table whose fill ratio is below
//! [`TableOptions::min_fill_ratio`].

pub mod lattice;
pub mod plumber;
pub mod rasterizer;
pub mod stream;
pub mod words;

use std::path::Path;
use std::sync::{Arc, OnceLock};

pub use lattice::LatticeExtractor;
pub use plumber::PlumberExtractor;
pub use rasterizer::{PdftoppmRasterizer, Rasterizer};
pub use stream::StreamExtractor;
pub use words::WordExtractor;

use crate::convert::deadline::Deadline;
use crate::convert::options::TableOptions;
use crate::error::{Error, Result};
use crate::model::{Rect, SkipRecord, SourceMethod, Table};
use crate::parser::PageView;

/// A grid found by one tier, before normalization.
#[derive(Debug, Clone, PartialEq)]
pub struct CandidateTable {
    pub bbox: Rect,
    pub rows: Vec<Vec<String>>,
}

impl CandidateTable {
    pub fn new(bbox: Rect, rows: Vec<Vec<String>>) -> Self {
        Self { bbox, rows }
    }
}

/// What an extractor gets to look at.
#[derive(Debug, Clone, Copy)]
pub struct TableInput<'a> {
    pub page: &'a PageView,
    /// The document on disk, for tiers that hand it to external tools
    pub source: Option<&'a Path>,
}

/// One table extraction tier.
pub trait TableExtractor: Send + Sync {
    /// Which tier this is.
    fn method(&self) -> SourceMethod;

    /// Check runtime dependencies.
    ///
    /// Fails with [`Error::TableExtractionUnavailable`] when the tier cannot
    /// run at all. Called at most once per pipeline.
    fn probe(&self) -> Result<()> {
        Ok(())
    }

    /// Find tables on a page. An empty result means "no tables found".
    fn extract(&self, input: &TableInput<'_>, deadline: &Deadline) -> Result<Vec<CandidateTable>>;
}

/// Tables accepted for one page and the tier failures along the way.
#[derive(Debug, Clone, Default)]
pub struct PageTables {
    pub tables: Vec<Table>,
    pub skipped: Vec<SkipRecord>,
}

struct Tier {
    extractor: Box<dyn TableExtractor>,
    /// `Err` holds the unavailability reason
    availability: OnceLock<std::result::Result<(), String>>,
}

/// Runs the enabled tiers in priority order.
pub struct TablePipeline {
    tiers: Vec<Tier>,
    min_fill_ratio: f32,
}

impl TablePipeline {
    /// The standard tiers, with `rasterizer` backing `lattice`.
    pub fn new(options: &TableOptions, rasterizer: Arc<dyn Rasterizer>) -> Self {
        let mut extractors: Vec<Box<dyn TableExtractor>> = Vec::new();
        for method in SourceMethod::ALL {
            if !options.is_enabled(method) {
                log::debug!("Table tier '{}' disabled", method);
                continue;
            }
            extractors.push(match method {
                SourceMethod::Lattice => Box::new(LatticeExtractor::new(
                    options.lattice.clone(),
                    Arc::clone(&rasterizer),
                )),
                SourceMethod::Stream => Box::new(StreamExtractor::new(options.stream.clone())),
                SourceMethod::Plumber => Box::new(PlumberExtractor::new(options.plumber.clone())),
                SourceMethod::WordReconstruction => {
                    Box::new(WordExtractor::new(options.words.clone()))
                }
            });
        }
        Self::with_extractors(extractors, options.min_fill_ratio)
    }

    /// A pipeline over custom extractors, tried in the given order.
    pub fn with_extractors(extractors: Vec<Box<dyn TableExtractor>>, min_fill_ratio: f32) -> Self {
        Self {
            tiers: extractors
                .into_iter()
                .map(|extractor| Tier {
                    extractor,
                    availability: OnceLock::new(),
                })
                .collect(),
            min_fill_ratio,
        }
    }

    /// Methods of the configured tiers, in order.
    pub fn methods(&self) -> Vec<SourceMethod> {
        self.tiers.iter().map(|t| t.extractor.method()).collect()
    }

    /// Whether any tier needs the document on disk.
    pub fn needs_source(&self) -> bool {
        self.tiers
            .iter()
            .any(|t| t.extractor.method() == SourceMethod::Lattice && self.is_available(t))
    }

    fn is_available(&self, tier: &Tier) -> bool {
        tier.availability
            .get_or_init(|| match tier.extractor.probe() {
                Ok(()) => Ok(()),
                Err(e) => {
                    log::warn!("{}", e);
                    Err(match e {
                        Error::TableExtractionUnavailable { reason, .. } => reason,
                        other => other.to_string(),
                    })
                }
            })
            .is_ok()
    }

    /// Skip records for tiers found unavailable, one per tier.
    pub fn unavailable_tiers(&self) -> Vec<SkipRecord> {
        self.tiers
            .iter()
            .filter_map(|t| match t.availability.get() {
                Some(Err(reason)) => Some(SkipRecord::tier(None, t.extractor.method(), reason.clone())),
                _ => None,
            })
            .collect()
    }

    /// Run the tiers on one page.
    ///
    /// Only [`Error::ConversionTimeout`] and [`Error::Cancelled`] escape;
    /// everything else is recorded and the next tier is tried.
    pub fn extract(&self, input: &TableInput<'_>, deadline: &Deadline) -> Result<PageTables> {
        let page_index = input.page.page_index;
        let mut skipped = Vec::new();

        for tier in &self.tiers {
            deadline.check()?;
            let method = tier.extractor.method();
            if !self.is_available(tier) {
                continue;
            }

            let candidates = match tier.extractor.extract(input, deadline) {
                Ok(candidates) => candidates,
                Err(e) if e.is_fatal() => return Err(e),
                Err(e) => {
                    log::warn!("Page {}: table tier '{}' failed: {}", page_index, method, e);
                    skipped.push(SkipRecord::tier(Some(page_index), method, e.to_string()));
                    continue;
                }
            };
            if candidates.is_empty() {
                log::debug!("Page {}: no tables from '{}'", page_index, method);
                continue;
            }

            match self.accept(page_index, method, candidates) {
                Ok(tables) => {
                    log::debug!(
                        "Page {}: {} table(s) from '{}'",
                        page_index,
                        tables.len(),
                        method
                    );
                    return Ok(PageTables { tables, skipped });
                }
                Err(reason) => {
                    log::debug!("Page {}: '{}' rejected: {}", page_index, method, reason);
                    skipped.push(SkipRecord::tier(Some(page_index), method, reason));
                }
            }
        }

        Ok(PageTables {
            tables: Vec::new(),
            skipped,
        })
    }

    /// Normalize a tier's candidates and apply the confidence gate.
    fn accept(
        &self,
        page_index: usize,
        method: SourceMethod,
        candidates: Vec<CandidateTable>,
    ) -> std::result::Result<Vec<Table>, String> {
        let mut tables = Vec::with_capacity(candidates.len());
        for candidate in candidates {
            let table = Table::from_rows(page_index, candidate.bbox, candidate.rows, method)
                .map_err(|e| e.to_string())?;
            if is_gated(method) && table.fill_ratio < self.min_fill_ratio {
                return Err(format!(
                    "low confidence: fill ratio {:.2} below {:.2}",
                    table.fill_ratio, self.min_fill_ratio
                ));
            }
            tables.push(table);
        }

        // Grids without a single filled cell carry nothing.
        tables.retain(|t| !t.is_blank());
        if tables.is_empty() {
            return Err("all tables blank".to_string());
        }
        tables.sort_by(|a, b| a.bbox.y.total_cmp(&b.bbox.y).then(a.bbox.x.total_cmp(&b.bbox.x)));
        Ok(tables)
    }
}

/// Tiers whose tables must clear the fill-ratio gate.
fn is_gated(method: SourceMethod) -> bool {
    matches!(method, SourceMethod::Stream | SourceMethod::Plumber)
}

/// Joined text of the runs of one cell, top to bottom then left to right.
pub(crate) fn cell_text(runs: &[&crate::model::TextRun]) -> String {
    let mut sorted: Vec<&&crate::model::TextRun> = runs.iter().collect();
    sorted.sort_by(|a, b| {
        a.bbox
            .y
            .total_cmp(&b.bbox.y)
            .then(a.bbox.x.total_cmp(&b.bbox.x))
    });
    sorted
        .iter()
        .map(|r| r.text.trim())
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
}
