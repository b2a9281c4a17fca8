//! Page rasterization for ruling-line detection.

use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::Duration;

use image::GrayImage;

use crate::convert::deadline::Deadline;
use crate::error::{Error, Result};
use crate::model::SourceMethod;

/// How often a running rasterizer is checked against the deadline.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Renders one page of a PDF file to a grayscale bitmap.
pub trait Rasterizer: Send + Sync {
    /// Human-readable name for logs.
    fn name(&self) -> &str;

    /// Fails with [`Error::TableExtractionUnavailable`] when the tool is missing.
    fn probe(&self) -> Result<()>;

    /// Render zero-based `page_index` of `source` at `dpi`.
    fn rasterize(
        &self,
        source: &Path,
        page_index: usize,
        dpi: u32,
        deadline: &Deadline,
    ) -> Result<GrayImage>;
}

/// Rasterizer backed by poppler's `pdftoppm` executable.
#[derive(Debug, Clone)]
pub struct PdftoppmRasterizer {
    command: String,
}

impl PdftoppmRasterizer {
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
        }
    }

    fn unavailable(&self, reason: impl std::fmt::Display) -> Error {
        Error::TableExtractionUnavailable {
            method: SourceMethod::Lattice,
            reason: format!("cannot run '{}': {}", self.command, reason),
        }
    }
}

impl Default for PdftoppmRasterizer {
    fn default() -> Self {
        Self::new("pdftoppm")
    }
}

impl Rasterizer for PdftoppmRasterizer {
    fn name(&self) -> &str {
        &self.command
    }

    fn probe(&self) -> Result<()> {
        // Any exit status will do; only a failed spawn means "missing".
        Command::new(&self.command)
            .arg("-v")
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .status()
            .map(|_| ())
            .map_err(|e| self.unavailable(e))
    }

    fn rasterize(
        &self,
        source: &Path,
        page_index: usize,
        dpi: u32,
        deadline: &Deadline,
    ) -> Result<GrayImage> {
        let dir = tempfile::tempdir()?;
        let prefix = dir.path().join("page");
        let page = (page_index + 1).to_string();

        let mut child = Command::new(&self.command)
            .args(["-gray", "-png", "-singlefile"])
            .args(["-r", &dpi.to_string()])
            .args(["-f", &page, "-l", &page])
            .arg(source)
            .arg(&prefix)
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| self.unavailable(e))?;

        let status = wait_with_deadline(&mut child, deadline)?;
        if !status.success() {
            return Err(Error::Render(format!(
                "{} failed on page {}: {}",
                self.command, page_index, status
            )));
        }

        let image = image::open(prefix.with_extension("png"))?;
        Ok(image.to_luma8())
    }
}

/// Wait for `child`, killing it once the deadline passes.
fn wait_with_deadline(child: &mut Child, deadline: &Deadline) -> Result<ExitStatus> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok(status);
        }
        if let Err(e) = deadline.check() {
            log::warn!("Killing rasterizer after the time budget ran out");
            let _ = child.kill();
            let _ = child.wait();
            return Err(e);
        }
        thread::sleep(POLL_INTERVAL);
    }
}
