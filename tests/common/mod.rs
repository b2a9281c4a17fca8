//! Synthetic PDFs and collaborators shared by the integration tests.

#![allow(dead_code)]

use std::path::Path;

use image::{GrayImage, Luma};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};

use pdfstruct::{Deadline, Error, Rasterizer, Result, SourceMethod};

pub const PAGE_WIDTH: f32 = 612.0;
pub const PAGE_HEIGHT: f32 = 792.0;

/// Column and row boundaries (top-left points) of the bordered test table.
pub const GRID_XS: [u32; 4] = [100, 200, 300, 400];
pub const GRID_YS: [u32; 4] = [100, 130, 160, 190];

fn real(v: f32) -> Object {
    Object::Real(v)
}

/// Show `text` with its baseline at (`x`, `y`) in PDF user space.
pub fn text(font: &str, size: f32, x: f32, y: f32, text: &str) -> Vec<Operation> {
    vec![
        Operation::new("BT", vec![]),
        Operation::new("Tf", vec![font.into(), real(size)]),
        Operation::new("Td", vec![real(x), real(y)]),
        Operation::new("Tj", vec![Object::string_literal(text)]),
        Operation::new("ET", vec![]),
    ]
}

/// Stroke a straight line between two points in PDF user space.
pub fn line(x1: f32, y1: f32, x2: f32, y2: f32) -> Vec<Operation> {
    vec![
        Operation::new("w", vec![real(1.0)]),
        Operation::new("m", vec![real(x1), real(y1)]),
        Operation::new("l", vec![real(x2), real(y2)]),
        Operation::new("S", vec![]),
    ]
}

/// Fill a rectangle given in PDF user space.
pub fn filled_rect(x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("re", vec![real(x), real(y), real(width), real(height)]),
        Operation::new("f", vec![]),
    ]
}

/// Place the `Im1` image over the given rectangle (PDF user space).
pub fn image(x: f32, y: f32, width: f32, height: f32) -> Vec<Operation> {
    vec![
        Operation::new("q", vec![]),
        Operation::new(
            "cm",
            vec![real(width), real(0.0), real(0.0), real(height), real(x), real(y)],
        ),
        Operation::new("Do", vec!["Im1".into()]),
        Operation::new("Q", vec![]),
    ]
}

/// Build a PDF with one page per operation list.
///
/// Every page can use `F1` (Helvetica), `F2` (Helvetica-Bold) and the
/// `Im1` image.
pub fn build_pdf(pages: Vec<Vec<Operation>>, title: Option<&str>) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let picture = doc.add_object(Stream::new(
        dictionary! {
            "Type" => "XObject",
            "Subtype" => "Image",
            "Width" => 2,
            "Height" => 2,
            "ColorSpace" => "DeviceGray",
            "BitsPerComponent" => 8,
        },
        vec![0, 255, 255, 0],
    ));
    let resources = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
        "XObject" => dictionary! {
            "Im1" => picture,
        },
    });

    let mut kids = Vec::new();
    for operations in pages {
        let data = Content { operations }
            .encode()
            .expect("content encodes");
        let content = doc.add_object(Stream::new(dictionary! {}, data));
        let page = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content,
            "Resources" => resources,
            "MediaBox" => vec![0.into(), 0.into(), real(PAGE_WIDTH), real(PAGE_HEIGHT)],
        });
        kids.push(Object::from(page));
    }

    let count = kids.len() as i64;
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => count,
        }),
    );
    let catalog = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog);

    if let Some(title) = title {
        let info = doc.add_object(dictionary! {
            "Title" => Object::string_literal(title),
            "Producer" => Object::string_literal("pdfstruct tests"),
        });
        doc.trailer.set("Info", info);
    }

    let mut buffer = Vec::new();
    doc.save_to(&mut buffer).expect("document saves");
    buffer
}

/// An 18pt "Report" title above three 10pt body lines.
pub fn report_page() -> Vec<Operation> {
    let mut ops = text("F1", 18.0, 72.0, 720.0, "Report");
    ops.extend(text("F1", 10.0, 72.0, 680.0, "The first body run."));
    ops.extend(text("F1", 10.0, 72.0, 650.0, "The second body run."));
    ops.extend(text("F1", 10.0, 72.0, 620.0, "The third body run."));
    ops
}

pub fn report_pdf() -> Vec<u8> {
    build_pdf(vec![report_page()], Some("Quarterly Report"))
}

/// A "Results" heading above a bordered 3x3 table with text in every cell.
pub fn lattice_page() -> Vec<Operation> {
    let flip = |y: u32| PAGE_HEIGHT - y as f32;
    let mut ops = text("F1", 16.0, 72.0, flip(70), "Results");

    let (left, right) = (GRID_XS[0] as f32, GRID_XS[3] as f32);
    let (top, bottom) = (flip(GRID_YS[0]), flip(GRID_YS[3]));
    for &y in &GRID_YS {
        ops.extend(line(left, flip(y), right, flip(y)));
    }
    for &x in &GRID_XS {
        ops.extend(line(x as f32, top, x as f32, bottom));
    }

    for row in 0..3 {
        for col in 0..3 {
            let x = GRID_XS[col] as f32 + 10.0;
            let baseline = flip(GRID_YS[row] + 20);
            ops.extend(text("F1", 10.0, x, baseline, &format!("r{}c{}", row, col)));
        }
    }
    ops
}

pub fn lattice_pdf() -> Vec<u8> {
    build_pdf(vec![lattice_page()], None)
}

/// A page holding nothing but one 200x200pt image.
pub fn image_only_pdf() -> Vec<u8> {
    build_pdf(vec![image(100.0, 400.0, 200.0, 200.0)], None)
}

/// A two-bar chart between two body paragraphs.
pub fn chart_between_paragraphs_pdf() -> Vec<u8> {
    let mut ops = text("F1", 10.0, 72.0, 720.0, "Intro paragraph above the chart.");
    ops.extend(filled_rect(100.0, 300.0, 40.0, 150.0));
    ops.extend(filled_rect(141.0, 300.0, 40.0, 200.0));
    ops.extend(text("F1", 10.0, 72.0, 100.0, "Closing paragraph below the chart."));
    build_pdf(vec![ops], None)
}

pub fn corrupt_pdf() -> Vec<u8> {
    let mut data = b"%PDF-1.7\n".to_vec();
    data.extend_from_slice(b"1 0 obj << /Type /Catalog /Pages 9 0 R >> garbage without xref\n");
    data.extend(std::iter::repeat(0xA5).take(512));
    data
}

/// The grid of [`lattice_page`] as a 72 dpi grayscale raster.
pub fn grid_raster() -> GrayImage {
    let mut raster = GrayImage::from_pixel(PAGE_WIDTH as u32, PAGE_HEIGHT as u32, Luma([255]));
    let (x0, x1) = (GRID_XS[0], GRID_XS[3]);
    let (y0, y1) = (GRID_YS[0], GRID_YS[3]);
    for &y in &GRID_YS {
        for x in x0..=x1 {
            raster.put_pixel(x, y, Luma([0]));
        }
    }
    for &x in &GRID_XS {
        for y in y0..=y1 {
            raster.put_pixel(x, y, Luma([0]));
        }
    }
    raster
}

/// Renders every page as the bordered table grid.
pub struct GridRasterizer;

impl Rasterizer for GridRasterizer {
    fn name(&self) -> &str {
        "grid"
    }

    fn probe(&self) -> Result<()> {
        Ok(())
    }

    fn rasterize(
        &self,
        source: &Path,
        _page_index: usize,
        _dpi: u32,
        deadline: &Deadline,
    ) -> Result<GrayImage> {
        assert!(source.exists(), "lattice needs the document on disk");
        deadline.check()?;
        Ok(grid_raster())
    }
}

/// A rasterizer whose tool is not installed.
pub struct MissingRasterizer;

impl Rasterizer for MissingRasterizer {
    fn name(&self) -> &str {
        "missing"
    }

    fn probe(&self) -> Result<()> {
        Err(Error::TableExtractionUnavailable {
            method: SourceMethod::Lattice,
            reason: "not installed".to_string(),
        })
    }

    fn rasterize(&self, _: &Path, _: usize, _: u32, _: &Deadline) -> Result<GrayImage> {
        Err(Error::TableExtractionUnavailable {
            method: SourceMethod::Lattice,
            reason: "not installed".to_string(),
        })
    }
}
