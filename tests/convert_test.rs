//! End-to-end conversion of synthetic documents.

mod common;

use std::io::Cursor;
use std::sync::Arc;

use common::{GridRasterizer, MissingRasterizer};
use pdfstruct::{
    to_json, ConvertOptions, Converter, DocumentResult, Error, GraphicKind, JsonFormat, Level,
    SourceMethod, StructuralNode,
};

fn converter() -> Converter {
    Converter::new(ConvertOptions::default()).with_rasterizer(Arc::new(MissingRasterizer))
}

fn lattice_converter() -> Converter {
    Converter::new(ConvertOptions::default()).with_rasterizer(Arc::new(GridRasterizer))
}

fn assert_rectangular(result: &DocumentResult) {
    for table in result.tables() {
        let width = table.column_count();
        assert!(width > 0);
        assert!(table.rows().iter().all(|row| row.len() == width));
    }
}

#[test]
fn test_report_scenario() {
    let result = converter().convert_bytes(&common::report_pdf()).unwrap();

    assert_eq!(result.pages.len(), 1);
    let root = &result.pages[0].structure;
    assert_eq!(root.level, Level::Document);
    assert_eq!(root.children.len(), 1);

    let title = &root.children[0];
    assert_eq!(title.level, Level::Title);
    assert_eq!(title.text, "Report");
    let body: Vec<(&str, Level)> = title
        .children
        .iter()
        .map(|c| (c.text.as_str(), c.level))
        .collect();
    assert_eq!(
        body,
        vec![
            ("The first body run.", Level::Paragraph),
            ("The second body run.", Level::Paragraph),
            ("The third body run.", Level::Paragraph),
        ]
    );
}

#[test]
fn test_metadata() {
    let result = converter().convert_bytes(&common::report_pdf()).unwrap();
    assert_eq!(result.metadata.pdf_version, "1.5");
    assert_eq!(result.metadata.page_count, 1);
    assert_eq!(result.metadata.title.as_deref(), Some("Quarterly Report"));
    assert_eq!(result.metadata.producer.as_deref(), Some("pdfstruct tests"));
}

#[test]
fn test_lattice_scenario() {
    let result = lattice_converter()
        .convert_bytes(&common::lattice_pdf())
        .unwrap();

    let tables = &result.pages[0].tables;
    assert_eq!(tables.len(), 1);
    let table = &tables[0];
    assert_eq!(table.source_method, SourceMethod::Lattice);
    assert_eq!(table.rows().len(), 3);
    assert!(table.rows().iter().all(|row| row.len() == 3));
    assert_eq!(table.rows()[1][2], "r1c2");
    assert_eq!(table.fill_ratio, 1.0);
    assert_eq!(table.section.as_deref(), Some("Results"));

    // The table borders are not reported as a chart.
    assert!(result.pages[0].graphics.is_empty());
}

#[test]
fn test_lattice_from_file_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grid.pdf");
    std::fs::write(&path, common::lattice_pdf()).unwrap();

    let result = lattice_converter().convert_file(&path).unwrap();
    assert_eq!(
        result.tables().next().map(|t| t.source_method),
        Some(SourceMethod::Lattice)
    );
}

#[test]
fn test_unavailable_lattice_falls_back() {
    let mut options = ConvertOptions::default();
    options.tables.lattice.rasterizer_command = "/nonexistent/pdfstruct-rasterizer".to_string();
    let result = Converter::new(options)
        .convert_bytes(&common::lattice_pdf())
        .unwrap();

    assert!(result
        .tables()
        .all(|t| t.source_method != SourceMethod::Lattice));
    let lattice_skips: Vec<_> = result
        .skipped
        .iter()
        .filter(|r| r.tier == Some(SourceMethod::Lattice))
        .collect();
    assert_eq!(lattice_skips.len(), 1);
    assert_eq!(lattice_skips[0].page_index, None);
    assert_rectangular(&result);
}

#[test]
fn test_image_only_scenario() {
    let result = converter()
        .convert_bytes(&common::image_only_pdf())
        .unwrap();

    let page = &result.pages[0];
    assert!(page.structure.is_empty());
    assert!(page.tables.is_empty());
    assert_eq!(page.graphics.len(), 1);
    let graphic = &page.graphics[0];
    assert_eq!(graphic.kind, GraphicKind::Image);
    assert!((graphic.bbox.width - 200.0).abs() < 0.01);
    assert!((graphic.bbox.height - 200.0).abs() < 0.01);
    // Placed at PDF y 400..600, so 192 from the top
    assert!((graphic.bbox.y - 192.0).abs() < 0.01);
}

#[test]
fn test_chart_between_paragraphs() {
    let result = converter()
        .convert_bytes(&common::chart_between_paragraphs_pdf())
        .unwrap();

    let page = &result.pages[0];
    let table = &page.tables[0];
    assert_eq!(table.source_method, SourceMethod::WordReconstruction);

    let charts: Vec<_> = page
        .graphics
        .iter()
        .filter(|g| g.kind == GraphicKind::VectorChart)
        .collect();
    assert_eq!(charts.len(), 1);
    let chart = charts[0].bbox;
    // Bars span PDF y 300..500, so 292 from the top
    assert!((chart.x - 100.0).abs() < 0.01);
    assert!((chart.y - 292.0).abs() < 0.01);
    assert!((chart.width - 81.0).abs() < 0.01);
    assert!((chart.height - 200.0).abs() < 0.01);
    assert!(table.bbox.contains_rect(&chart, 0.0));
}

#[test]
fn test_corrupt_document() {
    let err = converter()
        .convert_bytes(&common::corrupt_pdf())
        .unwrap_err();
    assert!(matches!(err, Error::DocumentUnreadable { .. }));

    let err = converter().convert_bytes(b"not a pdf at all").unwrap_err();
    assert!(matches!(err, Error::DocumentUnreadable { .. }));
}

#[test]
fn test_json_is_idempotent() {
    let data = common::build_pdf(
        vec![common::report_page(), common::lattice_page()],
        Some("Twice"),
    );
    let first = to_json(&converter().convert_bytes(&data).unwrap(), JsonFormat::Pretty).unwrap();
    let second = to_json(&converter().convert_bytes(&data).unwrap(), JsonFormat::Pretty).unwrap();
    assert_eq!(first, second);
}

#[test]
fn test_structure_nesting_and_rectangularity() {
    let data = common::build_pdf(
        vec![
            common::report_page(),
            common::lattice_page(),
            common::image(50.0, 50.0, 100.0, 80.0),
        ],
        None,
    );
    for converter in [converter(), lattice_converter()] {
        let result = converter.convert_bytes(&data).unwrap();
        assert_eq!(result.pages.len(), 3);
        assert!(result.pages.iter().all(|p| p.structure.is_well_nested()));
        assert_rectangular(&result);
    }
}

#[test]
fn test_headings_are_classified_document_wide() {
    // Page two only has body text; its size still maps to paragraphs.
    let data = common::build_pdf(
        vec![
            common::report_page(),
            common::text("F1", 10.0, 72.0, 700.0, "Continued body text."),
        ],
        None,
    );
    let result = converter().convert_bytes(&data).unwrap();
    let second = &result.pages[1].structure;
    assert_eq!(second.children.len(), 1);
    assert_eq!(second.children[0].level, Level::Paragraph);

    let outline = result.outline();
    assert_eq!(outline.total_items(), 1);
    assert_eq!(outline.items[0].title, "Report");
}

#[test]
fn test_reader_and_file_inputs_agree() {
    let data = common::report_pdf();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("report.pdf");
    std::fs::write(&path, &data).unwrap();

    let from_file = converter().convert_file(&path).unwrap();
    let from_reader = converter().convert_reader(Cursor::new(data)).unwrap();
    assert_eq!(
        to_json(&from_file, JsonFormat::Compact).unwrap(),
        to_json(&from_reader, JsonFormat::Compact).unwrap()
    );
}

#[test]
fn test_disabled_tiers_are_not_used() {
    let options = ConvertOptions::default()
        .without_tier(SourceMethod::Lattice)
        .without_tier(SourceMethod::WordReconstruction);
    let result = Converter::new(options)
        .convert_bytes(&common::report_pdf())
        .unwrap();
    assert!(result.tables().next().is_none());
    assert!(result.skipped.is_empty());
}

#[test]
fn test_bold_line_becomes_heading() {
    let mut page = common::text("F1", 18.0, 72.0, 720.0, "Annual Summary");
    page.extend(common::text("F2", 10.0, 72.0, 680.0, "Highlights"));
    page.extend(common::text("F1", 10.0, 72.0, 650.0, "Revenue grew in every region this year."));
    let result = converter()
        .convert_bytes(&common::build_pdf(vec![page], None))
        .unwrap();

    let title = &result.pages[0].structure.children[0];
    assert_eq!(title.level, Level::Title);
    let promoted: &StructuralNode = &title.children[0];
    assert_eq!(promoted.text, "Highlights");
    assert!(promoted.level.is_heading());
    assert_eq!(promoted.children[0].level, Level::Paragraph);
}
