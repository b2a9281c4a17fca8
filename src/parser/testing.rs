//! In-memory backend for unit tests.

use std::collections::BTreeMap;

use super::backend::{ContentOp, PageBox, PageId, PdfBackend, PdfValue, XObject};
use super::fonts::FontMetrics;
use crate::error::{Error, Result};
use crate::model::Metadata;

pub fn name(s: &str) -> PdfValue {
    PdfValue::Name(s.as_bytes().to_vec())
}

pub fn num(v: f32) -> PdfValue {
    PdfValue::Real(v)
}

pub fn string(s: &str) -> PdfValue {
    PdfValue::Str(s.as_bytes().to_vec())
}

pub fn ops(list: Vec<(&str, Vec<PdfValue>)>) -> Vec<ContentOp> {
    list.into_iter()
        .map(|(op, operands)| ContentOp::new(op, operands))
        .collect()
}

/// A text object showing `text` at (`x`, `y`) in PDF user space.
pub fn text_at(font: &str, size: f32, x: f32, y: f32, text: &str) -> Vec<ContentOp> {
    ops(vec![
        ("BT", vec![]),
        ("Tf", vec![name(font), num(size)]),
        ("Td", vec![num(x), num(y)]),
        ("Tj", vec![string(text)]),
        ("ET", vec![]),
    ])
}

#[derive(Debug, Clone, Default)]
pub struct MockPage {
    pub ops: Vec<ContentOp>,
    pub broken: bool,
    pub no_contents: bool,
}

impl MockPage {
    pub fn with_ops(ops: Vec<ContentOp>) -> Self {
        Self {
            ops,
            ..Default::default()
        }
    }
}

#[derive(Debug, Default)]
pub struct MockBackend {
    pub pages: Vec<MockPage>,
    pub fonts: BTreeMap<Vec<u8>, FontMetrics>,
    pub xobjects: BTreeMap<Vec<u8>, XObject>,
    /// Operations returned for any form XObject content
    pub form_ops: Vec<ContentOp>,
}

impl MockBackend {
    pub fn with_pages(pages: Vec<MockPage>) -> Self {
        Self {
            pages,
            ..Default::default()
        }
    }

    /// Register `F1` as a regular font and `F2` as its bold variant.
    pub fn with_standard_fonts(mut self) -> Self {
        self.fonts
            .insert(b"F1".to_vec(), FontMetrics::named("Helvetica"));
        self.fonts
            .insert(b"F2".to_vec(), FontMetrics::named("Helvetica-Bold"));
        self
    }

    fn index(page: PageId) -> usize {
        page.0.saturating_sub(1) as usize
    }
}

const PAGE_MARKER: &[u8] = b"mock-page:";

impl PdfBackend for MockBackend {
    fn page_ids(&self) -> Vec<PageId> {
        (1..=self.pages.len() as u32).map(|n| (n, 0)).collect()
    }

    fn page_box(&self, _page: PageId) -> PageBox {
        PageBox::default()
    }

    fn page_content(&self, page: PageId) -> Result<Option<Vec<u8>>> {
        let index = Self::index(page);
        let mock = self
            .pages
            .get(index)
            .ok_or_else(|| Error::unreadable("no such page"))?;
        if mock.broken {
            return Err(Error::unreadable("corrupt content stream"));
        }
        if mock.no_contents {
            return Ok(None);
        }
        let mut data = PAGE_MARKER.to_vec();
        data.extend_from_slice(index.to_string().as_bytes());
        Ok(Some(data))
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        match data.strip_prefix(PAGE_MARKER) {
            Some(rest) => {
                let index: usize = std::str::from_utf8(rest)
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .ok_or_else(|| Error::unreadable("bad marker"))?;
                Ok(self.pages[index].ops.clone())
            }
            None => Ok(self.form_ops.clone()),
        }
    }

    fn page_fonts(&self, _page: PageId) -> Result<BTreeMap<Vec<u8>, FontMetrics>> {
        Ok(self.fonts.clone())
    }

    fn decode_text(&self, _page: PageId, _font_name: &[u8], bytes: &[u8]) -> String {
        super::backend::decode_text_simple(bytes)
    }

    fn page_xobjects(&self, _page: PageId) -> Result<BTreeMap<Vec<u8>, XObject>> {
        Ok(self.xobjects.clone())
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version("1.7");
        metadata.page_count = self.pages.len();
        metadata
    }
}
