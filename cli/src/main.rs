//! pdfstruct CLI - PDF to structured JSON

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use clap::{Parser, Subcommand, ValueEnum};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};

use pdfstruct::parser::{LopdfBackend, PdfBackend};
use pdfstruct::{
    ConvertOptions, Converter, DocumentResult, JsonFormat, Outline, PageSelection, SourceMethod,
};

/// Default per-document time budget for the command line.
const DEFAULT_TIMEOUT_SECS: u64 = 120;

#[derive(Parser)]
#[command(name = "pdfstruct")]
#[command(version)]
#[command(about = "Convert PDF documents to structured JSON", long_about = None)]
struct Cli {
    /// Input PDF file
    #[arg(value_name = "FILE")]
    input: Option<PathBuf>,

    /// Output file (stdout if not specified)
    #[arg(value_name = "OUTPUT")]
    output: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Convert a PDF to structured JSON
    Convert {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        /// Output file (stdout if not specified)
        #[arg(short, long, value_name = "FILE")]
        output: Option<PathBuf>,

        #[command(flatten)]
        settings: Settings,

        /// Output compact JSON
        #[arg(long)]
        compact: bool,
    },

    /// Print the heading outline of a PDF
    Outline {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,

        #[command(flatten)]
        settings: Settings,
    },

    /// Show document information
    Info {
        /// Input PDF file
        #[arg(value_name = "FILE")]
        input: PathBuf,
    },

    /// Show version information
    Version,
}

/// Conversion settings shared by the converting commands.
#[derive(clap::Args, Clone)]
struct Settings {
    /// JSON file with conversion options
    #[arg(long, value_name = "FILE", env = "PDFSTRUCT_CONFIG")]
    config: Option<PathBuf>,

    /// Page range (e.g., "1-10", "1,3,5")
    #[arg(long)]
    pages: Option<String>,

    /// Time budget in seconds (0 disables the limit)
    #[arg(long, value_name = "SECS", default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,

    /// Process pages one at a time
    #[arg(long)]
    sequential: bool,

    /// Disable a table extraction tier (repeatable)
    #[arg(long = "no-tier", value_enum, value_name = "TIER")]
    disabled_tiers: Vec<Tier>,

    /// Rasterizer executable for ruling-line detection
    #[arg(long, value_name = "CMD")]
    rasterizer: Option<String>,
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum Tier {
    /// Ruling lines on the rasterized page
    Lattice,
    /// Whitespace and text alignment
    Stream,
    /// Character clustering
    #[value(alias = "plumber-style")]
    Plumber,
    /// Grid rebuilt from word positions
    Words,
}

impl From<Tier> for SourceMethod {
    fn from(tier: Tier) -> Self {
        match tier {
            Tier::Lattice => SourceMethod::Lattice,
            Tier::Stream => SourceMethod::Stream,
            Tier::Plumber => SourceMethod::Plumber,
            Tier::Words => SourceMethod::WordReconstruction,
        }
    }
}

impl Settings {
    fn to_options(&self) -> Result<ConvertOptions, Box<dyn std::error::Error>> {
        let mut options = match &self.config {
            Some(path) => ConvertOptions::from_json(&fs::read_to_string(path)?)?,
            None => ConvertOptions::default(),
        };

        if let Some(pages) = &self.pages {
            let selection =
                PageSelection::parse(pages).map_err(|e| format!("Invalid page range: {}", e))?;
            options = options.with_pages(selection);
        }
        options.timeout = match self.timeout {
            0 => None,
            secs => Some(Duration::from_secs(secs)),
        };
        if self.sequential {
            options = options.sequential();
        }
        for tier in &self.disabled_tiers {
            options = options.without_tier((*tier).into());
        }
        if let Some(command) = &self.rasterizer {
            options.tables.lattice.rasterizer_command = command.clone();
        }

        options.validate()?;
        log::debug!("Conversion options: {:?}", options);
        Ok(options)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            config: None,
            pages: None,
            timeout: DEFAULT_TIMEOUT_SECS,
            sequential: false,
            disabled_tiers: Vec::new(),
            rasterizer: None,
        }
    }
}

fn main() {
    env_logger::init();

    let cli = Cli::parse();

    let result = match cli.command {
        Some(Commands::Convert {
            input,
            output,
            settings,
            compact,
        }) => cmd_convert(&input, output.as_deref(), &settings, compact),
        Some(Commands::Outline { input, settings }) => cmd_outline(&input, &settings),
        Some(Commands::Info { input }) => cmd_info(&input),
        Some(Commands::Version) => {
            cmd_version();
            Ok(())
        }
        None => {
            // Default behavior: convert if input is provided
            if let Some(input) = cli.input {
                cmd_convert(&input, cli.output.as_deref(), &Settings::default(), false)
            } else {
                println!("{}", "Usage: pdfstruct <FILE> [OUTPUT]".yellow());
                println!("       pdfstruct --help for more information");
                Ok(())
            }
        }
    };

    if let Err(e) = result {
        eprintln!("{}: {}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

/// Run a conversion behind a spinner on stderr.
fn convert(input: &Path, settings: &Settings) -> Result<DocumentResult, Box<dyn std::error::Error>> {
    let options = settings.to_options()?;

    let pb = ProgressBar::new_spinner();
    pb.set_style(ProgressStyle::default_spinner().template("{spinner:.green} {msg} [{elapsed}]")?);
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message(format!("Converting {}...", input.display()));

    let result = Converter::new(options).convert_file(input);
    pb.finish_and_clear();
    let result = result?;

    for record in &result.skipped {
        let location = match (record.page_index, record.tier) {
            (Some(page), Some(tier)) => format!("page {} / {}", page + 1, tier),
            (Some(page), None) => format!("page {}", page + 1),
            (None, Some(tier)) => tier.to_string(),
            (None, None) => "document".to_string(),
        };
        eprintln!("{} {}: {}", "Skipped".yellow(), location, record.reason);
    }
    Ok(result)
}

fn cmd_convert(
    input: &Path,
    output: Option<&Path>,
    settings: &Settings,
    compact: bool,
) -> Result<(), Box<dyn std::error::Error>> {
    let result = convert(input, settings)?;

    let format = if compact {
        JsonFormat::Compact
    } else {
        JsonFormat::Pretty
    };

    if let Some(path) = output {
        let file = fs::File::create(path)?;
        pdfstruct::write_json(&result, format, std::io::BufWriter::new(file))?;
        eprintln!(
            "{} {} ({} pages, {} tables, {} graphics)",
            "Saved to".green(),
            path.display(),
            result.pages.len(),
            result.tables().count(),
            result.graphics().count()
        );
    } else {
        println!("{}", pdfstruct::to_json(&result, format)?);
    }

    Ok(())
}

fn cmd_outline(input: &Path, settings: &Settings) -> Result<(), Box<dyn std::error::Error>> {
    let result = convert(input, settings)?;
    let outline = result.outline();
    if outline.is_empty() {
        println!("{}", "No headings found".yellow());
        return Ok(());
    }
    print!("{}", format_outline(&outline));
    Ok(())
}

fn format_outline(outline: &Outline) -> String {
    fn walk(items: &[pdfstruct::model::OutlineItem], depth: usize, out: &mut String) {
        for item in items {
            out.push_str(&format!(
                "{}{} (p. {})\n",
                "  ".repeat(depth),
                item.title,
                item.page_index + 1
            ));
            walk(&item.children, depth + 1, out);
        }
    }

    let mut out = String::new();
    walk(&outline.items, 0, &mut out);
    out
}

fn cmd_info(input: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let version = pdfstruct::detect::pdf_version_from_path(input)?;
    let backend = LopdfBackend::load_file(input)?;
    let metadata = backend.metadata();

    println!("{}", "Document Information".cyan().bold());
    println!("{}", "─".repeat(40).dimmed());

    println!("{}: {}", "File".bold(), input.display());
    println!("{}: PDF {}", "Format".bold(), version);
    println!("{}: {}", "Pages".bold(), metadata.page_count);

    if let Some(ref title) = metadata.title {
        println!("{}: {}", "Title".bold(), title);
    }
    if let Some(ref author) = metadata.author {
        println!("{}: {}", "Author".bold(), author);
    }
    if let Some(ref subject) = metadata.subject {
        println!("{}: {}", "Subject".bold(), subject);
    }
    if let Some(ref creator) = metadata.creator {
        println!("{}: {}", "Creator".bold(), creator);
    }
    if let Some(ref producer) = metadata.producer {
        println!("{}: {}", "Producer".bold(), producer);
    }
    if let Some(ref created) = metadata.created {
        println!("{}: {}", "Created".bold(), created.to_rfc3339());
    }
    if let Some(ref modified) = metadata.modified {
        println!("{}: {}", "Modified".bold(), modified.to_rfc3339());
    }

    Ok(())
}

fn cmd_version() {
    println!("{} {}", "pdfstruct".cyan().bold(), env!("CARGO_PKG_VERSION"));
    println!("PDF to structured JSON converter");
}

#[cfg(test)]
mod tests {
    use super::*;
    use pdfstruct::model::OutlineItem;
    use pdfstruct::Level;

    #[test]
    fn test_settings_to_options() {
        let settings = Settings {
            pages: Some("2-4".to_string()),
            timeout: 0,
            sequential: true,
            disabled_tiers: vec![Tier::Lattice, Tier::Words],
            rasterizer: Some("/opt/poppler/pdftoppm".to_string()),
            ..Settings::default()
        };
        let options = settings.to_options().unwrap();
        assert_eq!(options.pages, PageSelection::Range(2..=4));
        assert_eq!(options.timeout, None);
        assert!(!options.parallel);
        assert!(!options.tables.is_enabled(SourceMethod::Lattice));
        assert!(!options.tables.is_enabled(SourceMethod::WordReconstruction));
        assert!(options.tables.is_enabled(SourceMethod::Stream));
        assert_eq!(options.tables.lattice.rasterizer_command, "/opt/poppler/pdftoppm");
    }

    #[test]
    fn test_default_timeout() {
        let options = Settings::default().to_options().unwrap();
        assert_eq!(options.timeout, Some(Duration::from_secs(DEFAULT_TIMEOUT_SECS)));
    }

    #[test]
    fn test_config_file_is_overridden_by_flags() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("options.json");
        fs::write(&path, r#"{"parallel": false, "tables": {"min_fill_ratio": 0.5}}"#).unwrap();

        let settings = Settings {
            config: Some(path),
            timeout: 30,
            ..Settings::default()
        };
        let options = settings.to_options().unwrap();
        assert!(!options.parallel);
        assert_eq!(options.tables.min_fill_ratio, 0.5);
        assert_eq!(options.timeout, Some(Duration::from_secs(30)));
    }

    #[test]
    fn test_invalid_page_range() {
        let settings = Settings {
            pages: Some("5-2".to_string()),
            ..Settings::default()
        };
        assert!(settings.to_options().is_err());
    }

    #[test]
    fn test_format_outline() {
        let mut title = OutlineItem::new("Report", Level::Title, 0);
        title
            .children
            .push(OutlineItem::new("Results", Level::Section, 1));
        let outline = Outline { items: vec![title] };
        assert_eq!(format_outline(&outline), "Report (p. 1)\n  Results (p. 2)\n");
    }
}
