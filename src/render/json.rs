//! JSON rendering for conversion results.

use std::io::Write;

use crate::error::{Error, Result};
use crate::model::DocumentResult;

/// JSON output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JsonFormat {
    /// Pretty-printed JSON with indentation
    #[default]
    Pretty,
    /// Compact JSON without extra whitespace
    Compact,
}

/// Serialize a conversion result.
///
/// Output is deterministic: the same result always renders to the same
/// bytes.
pub fn to_json(result: &DocumentResult, format: JsonFormat) -> Result<String> {
    let json = match format {
        JsonFormat::Pretty => serde_json::to_string_pretty(result),
        JsonFormat::Compact => serde_json::to_string(result),
    };

    json.map_err(|e| Error::Render(format!("JSON serialization error: {}", e)))
}

/// Serialize a conversion result into `writer`.
pub fn write_json<W: Write>(result: &DocumentResult, format: JsonFormat, mut writer: W) -> Result<()> {
    let written = match format {
        JsonFormat::Pretty => serde_json::to_writer_pretty(&mut writer, result),
        JsonFormat::Compact => serde_json::to_writer(&mut writer, result),
    };
    written.map_err(|e| {
        if e.is_io() {
            Error::Io(e.into())
        } else {
            Error::Render(format!("JSON serialization error: {}", e))
        }
    })?;
    writer.flush()?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{
        GraphicKind, GraphicRegion, Level, Metadata, PageResult, Rect, SkipRecord, SourceMethod,
        StructuralNode, Table,
    };

    fn sample() -> DocumentResult {
        let mut structure = StructuralNode::root(0);
        let mut title = StructuralNode::new(Level::Title, "Report", 0, Rect::new(72.0, 54.0, 60.0, 18.0));
        title.children.push(StructuralNode::new(
            Level::Paragraph,
            "Body",
            0,
            Rect::new(72.0, 100.0, 30.0, 10.0),
        ));
        structure.children.push(title);

        let mut table = Table::from_rows(
            0,
            Rect::new(72.0, 200.0, 200.0, 40.0),
            vec![vec!["a".into(), "b".into()], vec!["c".into()]],
            SourceMethod::Stream,
        )
        .unwrap();
        table.section = Some("Report".to_string());

        DocumentResult {
            metadata: Metadata::with_version("1.7"),
            pages: vec![PageResult {
                page_index: 0,
                width: 612.0,
                height: 792.0,
                structure,
                tables: vec![table],
                graphics: vec![GraphicRegion::new(
                    0,
                    Rect::new(100.0, 300.0, 200.0, 200.0),
                    GraphicKind::Image,
                )],
            }],
            skipped: vec![SkipRecord::tier(None, SourceMethod::Lattice, "pdftoppm missing")],
        }
    }

    #[test]
    fn test_document_shape() {
        let json = to_json(&sample(), JsonFormat::Compact).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();

        let page = &value["pages"][0];
        assert_eq!(page["structure"]["level"], "document");
        assert_eq!(page["structure"]["children"][0]["level"], "title");
        assert_eq!(page["structure"]["children"][0]["children"][0]["text"], "Body");
        assert!(page["structure"]["children"][0].get("bbox").is_none());

        let table = &page["tables"][0];
        assert_eq!(table["source_method"], "stream");
        assert_eq!(table["rows"][1], serde_json::json!(["c", ""]));
        assert_eq!(table["bbox"], serde_json::json!([72.0, 200.0, 200.0, 40.0]));
        assert_eq!(table["section"], "Report");
        assert!(table.get("subsection").is_none());

        assert_eq!(page["graphics"][0]["kind"], "image");
        assert_eq!(value["skipped"][0]["tier"], "lattice");
        assert!(value["skipped"][0].get("page_index").is_none());
    }

    #[test]
    fn test_formats() {
        let result = sample();
        let pretty = to_json(&result, JsonFormat::Pretty).unwrap();
        let compact = to_json(&result, JsonFormat::Compact).unwrap();
        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
        assert_eq!(
            serde_json::from_str::<serde_json::Value>(&pretty).unwrap(),
            serde_json::from_str::<serde_json::Value>(&compact).unwrap()
        );
    }

    #[test]
    fn test_rendering_is_repeatable() {
        let result = sample();
        assert_eq!(
            to_json(&result, JsonFormat::Pretty).unwrap(),
            to_json(&result, JsonFormat::Pretty).unwrap()
        );
    }

    #[test]
    fn test_write_json_matches_to_json() {
        let result = sample();
        let mut buffer = Vec::new();
        write_json(&result, JsonFormat::Compact, &mut buffer).unwrap();
        assert_eq!(
            String::from_utf8(buffer).unwrap(),
            to_json(&result, JsonFormat::Compact).unwrap()
        );
    }
}
