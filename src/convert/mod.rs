//! Document conversion.
//!
//! [`Converter`] drives a conversion from end to end: pages are decoded
//! (in parallel unless disabled), document-wide font statistics are
//! gathered once every page is decoded, and each page is then classified,
//! nested, searched for tables and graphics, and handed to the
//! [`Assembler`].
//!
//! # Example
//!
//! ```no_run
//! use pdfstruct::convert::{ConvertOptions, Converter};
//! use std::time::Duration;
//!
//! fn main() -> pdfstruct::Result<()> {
//!     let options = ConvertOptions::default().with_timeout(Duration::from_secs(60));
//!     let converter = Converter::new(options);
//!
//!     let result = converter.convert_file("report.pdf")?;
//!     for table in result.tables() {
//!         println!("{} table on page {}", table.source_method, table.page_index);
//!     }
//!     Ok(())
//! }
//! ```

pub mod assembler;
pub mod deadline;
pub mod options;

pub use assembler::Assembler;
pub use deadline::{CancelToken, Deadline};
pub use options::{
    ConvertOptions, GraphicsOptions, HeadingOptions, LatticeOptions, PageSelection,
    PlumberOptions, StreamOptions, StructureOptions, TableOptions, TextOptions, WordOptions,
};

use std::io::{Read, Write};
use std::path::Path;
use std::sync::Arc;

use rayon::prelude::*;

use crate::detect;
use crate::error::{Error, Result};
use crate::graphics::GraphicsDetector;
use crate::model::{DocumentResult, PageResult, SkipRecord};
use crate::parser::{LopdfBackend, PageView, PdfBackend, TextRunExtractor};
use crate::structure::{build_page_structure, FontSizeStats, HeadingClassifier, TreeBuilder};
use crate::table::{PdftoppmRasterizer, Rasterizer, TableInput, TablePipeline};

/// Outcome of decoding one page.
enum Decoded {
    Page(PageView),
    Skipped(SkipRecord),
}

/// A finished page and the table tiers that failed on it.
struct AnalyzedPage {
    result: PageResult,
    skipped: Vec<SkipRecord>,
}

/// Per-conversion analysis stages shared by every page.
struct Stages<'a> {
    classifier: HeadingClassifier,
    builder: TreeBuilder,
    pipeline: &'a TablePipeline,
    graphics: GraphicsDetector,
    source: Option<&'a Path>,
}

/// Converts PDF documents into [`DocumentResult`]s.
///
/// A converter holds no per-document state and can be reused; each call
/// builds a fresh table pipeline, so rasterizer availability is probed at
/// most once per conversion.
pub struct Converter {
    options: ConvertOptions,
    rasterizer: Arc<dyn Rasterizer>,
    cancel: CancelToken,
}

impl Converter {
    /// A converter rasterizing with the configured `pdftoppm` command.
    pub fn new(options: ConvertOptions) -> Self {
        let rasterizer = PdftoppmRasterizer::new(options.tables.lattice.rasterizer_command.clone());
        Self {
            options,
            rasterizer: Arc::new(rasterizer),
            cancel: CancelToken::new(),
        }
    }

    /// Replace the rasterizer backing the lattice tier.
    pub fn with_rasterizer(mut self, rasterizer: Arc<dyn Rasterizer>) -> Self {
        self.rasterizer = rasterizer;
        self
    }

    /// Use `token` to cancel conversions from another thread.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel = token;
        self
    }

    /// A handle that cancels conversions run by this converter.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    pub fn options(&self) -> &ConvertOptions {
        &self.options
    }

    /// Convert a PDF file.
    ///
    /// # Errors
    ///
    /// [`Error::DocumentUnreadable`] when the file is not a readable PDF or
    /// none of the selected pages decode; [`Error::ConversionTimeout`] and
    /// [`Error::Cancelled`] as configured.
    pub fn convert_file<P: AsRef<Path>>(&self, path: P) -> Result<DocumentResult> {
        let path = path.as_ref();
        let deadline = self.deadline()?;
        let version = detect::pdf_version_from_path(path)?;
        log::debug!("{}: PDF {}", path.display(), version);

        let backend = LopdfBackend::load_file(path)?;
        deadline.check()?;
        let pipeline = self.pipeline();
        self.run(&backend, &pipeline, Some(path), &deadline)
    }

    /// Convert a PDF held in memory.
    ///
    /// When the lattice tier is available the bytes are written to a
    /// temporary file for the rasterizer.
    pub fn convert_bytes(&self, data: &[u8]) -> Result<DocumentResult> {
        let deadline = self.deadline()?;
        let version = detect::pdf_version(data)?;
        log::debug!("In-memory PDF {} ({} bytes)", version, data.len());

        let backend = LopdfBackend::load_bytes(data)?;
        deadline.check()?;
        let pipeline = self.pipeline();
        if !pipeline.needs_source() {
            return self.run(&backend, &pipeline, None, &deadline);
        }

        let mut file = tempfile::Builder::new()
            .prefix("pdfstruct-")
            .suffix(".pdf")
            .tempfile()?;
        file.write_all(data)?;
        file.flush()?;
        self.run(&backend, &pipeline, Some(file.path()), &deadline)
    }

    /// Convert a PDF read to the end from `reader`.
    pub fn convert_reader<R: Read>(&self, mut reader: R) -> Result<DocumentResult> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        self.convert_bytes(&data)
    }

    /// Convert a document from any backend.
    ///
    /// `source` is the document on disk, needed only by the lattice tier.
    pub fn convert_backend<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        source: Option<&Path>,
    ) -> Result<DocumentResult> {
        let deadline = self.deadline()?;
        let pipeline = self.pipeline();
        self.run(backend, &pipeline, source, &deadline)
    }

    fn deadline(&self) -> Result<Deadline> {
        self.options.validate()?;
        Ok(Deadline::new(self.options.timeout))
    }

    fn pipeline(&self) -> TablePipeline {
        TablePipeline::new(&self.options.tables, Arc::clone(&self.rasterizer))
    }

    fn run<B: PdfBackend + ?Sized>(
        &self,
        backend: &B,
        pipeline: &TablePipeline,
        source: Option<&Path>,
        deadline: &Deadline,
    ) -> Result<DocumentResult> {
        let extractor = TextRunExtractor::new(backend, &self.options.text);
        let page_count = extractor.page_count();
        let selected: Vec<usize> = (0..page_count)
            .filter(|&i| self.options.pages.includes(i as u32 + 1))
            .collect();
        if selected.is_empty() {
            return Err(Error::InvalidConfig(format!(
                "page selection matches none of the {} pages",
                page_count
            )));
        }

        let decoded = map_pages(self.options.parallel, selected, |page_index| {
            self.checkpoint(deadline)?;
            match extractor.page(page_index) {
                Ok(view) => Ok(Decoded::Page(view)),
                Err(e) if e.is_fatal() => Err(e),
                Err(e) => {
                    log::warn!("Skipping page {}: {}", page_index, e);
                    Ok(Decoded::Skipped(SkipRecord::page(page_index, e.to_string())))
                }
            }
        })?;

        let views: Vec<&PageView> = decoded
            .iter()
            .filter_map(|d| match d {
                Decoded::Page(view) => Some(view),
                Decoded::Skipped(_) => None,
            })
            .collect();
        if views.is_empty() {
            return Err(Error::unreadable(format!(
                "none of the {} selected pages could be decoded",
                decoded.len()
            )));
        }

        // Every page must be decoded before any can be classified.
        let stats = FontSizeStats::from_runs(
            views.iter().flat_map(|v| v.runs.iter()),
            self.options.headings.size_epsilon,
        );
        log::debug!(
            "Font size tiers: {} ({} heading tiers)",
            stats.tiers().len(),
            stats.heading_tier_count()
        );
        let stages = Stages {
            classifier: HeadingClassifier::new(stats, self.options.headings.clone()),
            builder: TreeBuilder::new(self.options.structure.clone()),
            pipeline,
            graphics: GraphicsDetector::new(self.options.graphics.clone()),
            source,
        };

        let analyzed = map_pages(self.options.parallel, views, |view| {
            self.checkpoint(deadline)?;
            analyze_page(view, &stages, deadline)
        })?;

        let mut assembler = Assembler::new(backend.metadata());
        let mut analyzed = analyzed.into_iter();
        for item in decoded {
            match item {
                Decoded::Skipped(record) => assembler.skip(record),
                Decoded::Page(_) => {
                    if let Some(page) = analyzed.next() {
                        page.skipped.into_iter().for_each(|r| assembler.skip(r));
                        assembler.add_page(page.result);
                    }
                }
            }
        }
        for record in pipeline.unavailable_tiers() {
            assembler.skip(record);
        }
        let result = assembler.finish();

        log::info!(
            "Converted {} page(s): {} table(s), {} graphic(s), {} skip record(s) in {:?}",
            result.pages.len(),
            result.tables().count(),
            result.graphics().count(),
            result.skipped.len(),
            deadline.elapsed()
        );
        Ok(result)
    }

    fn checkpoint(&self, deadline: &Deadline) -> Result<()> {
        self.cancel.check()?;
        deadline.check()
    }
}

impl Default for Converter {
    fn default() -> Self {
        Self::new(ConvertOptions::default())
    }
}

/// Structure, tables and graphics of one decoded page.
fn analyze_page(view: &PageView, stages: &Stages<'_>, deadline: &Deadline) -> Result<AnalyzedPage> {
    let structure = build_page_structure(
        view.page_index,
        &view.runs,
        &stages.classifier,
        &stages.builder,
    );

    let input = TableInput {
        page: view,
        source: stages.source,
    };
    let tables = stages.pipeline.extract(&input, deadline)?;
    let graphics = stages.graphics.detect(view, &tables.tables);

    Ok(AnalyzedPage {
        result: PageResult {
            page_index: view.page_index,
            width: view.width,
            height: view.height,
            structure,
            tables: tables.tables,
            graphics,
        },
        skipped: tables.skipped,
    })
}

/// Apply `f` to every item, keeping input order; stops at the first error.
fn map_pages<I, T, F>(parallel: bool, items: Vec<I>, f: F) -> Result<Vec<T>>
where
    I: Send,
    T: Send,
    F: Fn(I) -> Result<T> + Sync + Send,
{
    if parallel {
        items.into_par_iter().map(f).collect()
    } else {
        items.into_iter().map(f).collect()
    }
}
