//! PDF backend abstraction layer.
//!
//! Provides a trait-based interface for PDF operations, isolating
//! the concrete PDF library (lopdf) from the layout analysis logic.

use std::collections::BTreeMap;

use lopdf::{Dictionary, Document as LopdfDocument, Object, ObjectId};

use super::fonts::{flags_from_descriptor, flags_from_name, FontMetrics};
use crate::error::{Error, Result};
use crate::model::Metadata;

/// Page identifier: (object number, generation number).
pub type PageId = (u32, u16);

/// Form XObjects nested deeper than this are not followed.
pub const MAX_XOBJECT_DEPTH: usize = 4;

/// US Letter, used when a page has no usable MediaBox.
const DEFAULT_MEDIA_BOX: [f32; 4] = [0.0, 0.0, 612.0, 792.0];

/// A value from a PDF content stream operand.
#[derive(Debug, Clone, PartialEq)]
pub enum PdfValue {
    Integer(i64),
    Real(f32),
    Name(Vec<u8>),
    Str(Vec<u8>),
    Array(Vec<PdfValue>),
    Other,
}

/// A single operation from a PDF content stream.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentOp {
    pub operator: String,
    pub operands: Vec<PdfValue>,
}

impl ContentOp {
    pub fn new(operator: impl Into<String>, operands: Vec<PdfValue>) -> Self {
        Self {
            operator: operator.into(),
            operands,
        }
    }

    /// Numeric operand at `index`.
    pub fn number(&self, index: usize) -> Option<f32> {
        self.operands.get(index).and_then(get_number_from_value)
    }

    /// All operands as numbers, if every one of them is numeric.
    pub fn numbers(&self) -> Option<Vec<f32>> {
        self.operands.iter().map(get_number_from_value).collect()
    }
}

/// The visible page area in default user space.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PageBox {
    pub x0: f32,
    pub y0: f32,
    pub x1: f32,
    pub y1: f32,
}

impl PageBox {
    pub fn width(&self) -> f32 {
        self.x1 - self.x0
    }

    pub fn height(&self) -> f32 {
        self.y1 - self.y0
    }
}

impl Default for PageBox {
    fn default() -> Self {
        let [x0, y0, x1, y1] = DEFAULT_MEDIA_BOX;
        Self { x0, y0, x1, y1 }
    }
}

/// An external object referenced by a page through `Do`.
#[derive(Debug, Clone)]
pub enum XObject {
    /// A raster image with its pixel dimensions.
    Image { width: u32, height: u32 },
    /// A form with its own content stream.
    Form {
        content: Vec<u8>,
        matrix: [f32; 6],
        xobjects: BTreeMap<Vec<u8>, XObject>,
    },
    /// PostScript or unknown subtypes.
    Other,
}

/// Abstract interface for PDF document access.
///
/// Implementations provide page enumeration, font info, content stream
/// decoding, and text decoding without exposing any concrete PDF library
/// types. Implementations must be shareable across the worker threads that
/// interpret pages in parallel.
pub trait PdfBackend: Sync {
    /// All pages in document order.
    fn page_ids(&self) -> Vec<PageId>;

    /// Visible area of a page (inherited MediaBox, normalized).
    fn page_box(&self, page: PageId) -> PageBox;

    /// The decompressed content stream of a page, or `None` when the page
    /// has no `/Contents` entry.
    fn page_content(&self, page: PageId) -> Result<Option<Vec<u8>>>;

    /// Parse raw content stream bytes into a sequence of operations.
    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>>;

    /// Metrics for every font resource of a page, keyed by resource name.
    fn page_fonts(&self, page: PageId) -> Result<BTreeMap<Vec<u8>, FontMetrics>>;

    /// Decode a text byte sequence using the font's encoding on the given page.
    /// Falls back to simple decoding if the font or encoding is unavailable.
    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String;

    /// External objects of a page, keyed by resource name.
    fn page_xobjects(&self, page: PageId) -> Result<BTreeMap<Vec<u8>, XObject>>;

    /// Document information dictionary and version.
    fn metadata(&self) -> Metadata;
}

/// Simple text decoding fallback when no encoding is available.
pub fn decode_text_simple(bytes: &[u8]) -> String {
    // Try UTF-16BE first (BOM marker)
    if bytes.len() >= 2 && bytes[0] == 0xFE && bytes[1] == 0xFF {
        let utf16: Vec<u16> = bytes[2..]
            .chunks_exact(2)
            .map(|c| u16::from_be_bytes([c[0], c[1]]))
            .collect();
        return String::from_utf16_lossy(&utf16);
    }

    // Try UTF-8
    if let Ok(s) = std::str::from_utf8(bytes) {
        return s.to_string();
    }

    // Fallback: Latin-1
    bytes.iter().map(|&b| b as char).collect()
}

/// Helper: extract a number from a [`PdfValue`].
pub fn get_number_from_value(val: &PdfValue) -> Option<f32> {
    match val {
        PdfValue::Integer(i) => Some(*i as f32),
        PdfValue::Real(r) => Some(*r),
        _ => None,
    }
}

// ---------------------------------------------------------------------------
// LopdfBackend: concrete implementation backed by lopdf
// ---------------------------------------------------------------------------

/// Concrete [`PdfBackend`] backed by `lopdf::Document`.
pub struct LopdfBackend {
    doc: LopdfDocument,
}

impl LopdfBackend {
    /// Load from a file path.
    pub fn load_file<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let doc = LopdfDocument::load(path)?;
        Self::checked(doc)
    }

    /// Load from an in-memory byte slice.
    pub fn load_bytes(data: &[u8]) -> Result<Self> {
        let doc = LopdfDocument::load_mem(data)?;
        Self::checked(doc)
    }

    /// Load from a reader.
    pub fn load_reader<R: std::io::Read>(mut reader: R) -> Result<Self> {
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Self::load_bytes(&data)
    }

    fn checked(doc: LopdfDocument) -> Result<Self> {
        if doc.is_encrypted() {
            return Err(Error::unreadable("document is encrypted"));
        }
        if doc.get_pages().is_empty() {
            return Err(Error::unreadable("document has no pages"));
        }
        Ok(Self { doc })
    }

    /// Direct access to the underlying `lopdf::Document`.
    pub fn raw_doc(&self) -> &LopdfDocument {
        &self.doc
    }

    /// Get PDF version string.
    pub fn version(&self) -> String {
        self.doc.version.to_string()
    }

    /// Resolve a reference to the object it points to.
    fn resolve<'a>(&'a self, obj: &'a Object) -> Option<&'a Object> {
        match obj {
            Object::Reference(r) => self.doc.get_object(*r).ok(),
            other => Some(other),
        }
    }

    fn resolve_dict<'a>(&'a self, obj: &'a Object) -> Option<&'a Dictionary> {
        match self.resolve(obj)? {
            Object::Dictionary(d) => Some(d),
            Object::Stream(s) => Some(&s.dict),
            _ => None,
        }
    }

    /// Look up a page attribute, following the `/Parent` chain for
    /// inheritable entries.
    fn inherited(&self, page: PageId, key: &[u8]) -> Option<&Object> {
        let mut dict = self.doc.get_dictionary(page).ok()?;
        // Bounded walk; malformed trees can contain parent cycles.
        for _ in 0..32 {
            if let Ok(value) = dict.get(key) {
                return Some(value);
            }
            let parent = dict.get(b"Parent").ok()?.as_reference().ok()?;
            dict = self.doc.get_dictionary(parent).ok()?;
        }
        None
    }

    fn font_metrics(&self, font: &Dictionary) -> FontMetrics {
        let base_font = font
            .get(b"BaseFont")
            .ok()
            .and_then(|o| o.as_name().ok())
            .map(|n| String::from_utf8_lossy(n).to_string())
            .unwrap_or_default();
        let mut metrics = FontMetrics::named(&base_font);

        let subtype = font.get(b"Subtype").ok().and_then(|o| o.as_name().ok());
        metrics.two_byte = subtype == Some(b"Type0".as_slice());

        if let Some(first) = font.get(b"FirstChar").ok().and_then(|o| o.as_i64().ok()) {
            metrics.first_char = first.max(0) as u32;
        }
        if let Some(widths) = font
            .get(b"Widths")
            .ok()
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
        {
            metrics.widths = widths
                .iter()
                .map(|w| self.resolve(w).and_then(|w| w.as_float().ok()).unwrap_or(0.0))
                .collect();
        }

        if let Some(descriptor) = font
            .get(b"FontDescriptor")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        {
            let flags = descriptor
                .get(b"Flags")
                .ok()
                .and_then(|o| o.as_i64().ok())
                .unwrap_or(0);
            let weight = descriptor
                .get(b"FontWeight")
                .ok()
                .and_then(|o| o.as_float().ok());
            metrics.flags |= flags_from_descriptor(flags, weight);

            if let Some(missing) = descriptor
                .get(b"MissingWidth")
                .ok()
                .and_then(|o| o.as_float().ok())
                .filter(|w| *w > 0.0)
            {
                metrics.missing_width = missing;
            }
        }

        // Standard 14 fonts carry no metrics; the name still tells the style.
        metrics.flags |= flags_from_name(&metrics.base_font);
        metrics
    }

    fn collect_xobjects(&self, resources: &Dictionary, depth: usize) -> BTreeMap<Vec<u8>, XObject> {
        let mut result = BTreeMap::new();
        let Some(xobjects) = resources
            .get(b"XObject")
            .ok()
            .and_then(|o| self.resolve_dict(o))
        else {
            return result;
        };

        for (name, obj) in xobjects.iter() {
            let Some(Object::Stream(stream)) = self.resolve(obj) else {
                continue;
            };
            let dict = &stream.dict;
            let subtype = dict.get(b"Subtype").ok().and_then(|o| o.as_name().ok());

            let xobject = match subtype {
                Some(b"Image") => {
                    let dimension = |key: &[u8]| {
                        dict.get(key)
                            .ok()
                            .and_then(|o| o.as_i64().ok())
                            .map(|v| v.max(0) as u32)
                            .unwrap_or(0)
                    };
                    XObject::Image {
                        width: dimension(b"Width"),
                        height: dimension(b"Height"),
                    }
                }
                Some(b"Form") if depth < MAX_XOBJECT_DEPTH => {
                    let content = match stream.decompressed_content() {
                        Ok(data) => data,
                        Err(_) => stream.content.clone(),
                    };
                    let mut matrix = [1.0, 0.0, 0.0, 1.0, 0.0, 0.0];
                    if let Some(values) = dict.get(b"Matrix").ok().and_then(|o| o.as_array().ok())
                    {
                        for (slot, value) in matrix.iter_mut().zip(values) {
                            if let Ok(v) = value.as_float() {
                                *slot = v;
                            }
                        }
                    }
                    let xobjects = dict
                        .get(b"Resources")
                        .ok()
                        .and_then(|o| self.resolve_dict(o))
                        .map(|res| self.collect_xobjects(res, depth + 1))
                        .unwrap_or_default();
                    XObject::Form {
                        content,
                        matrix,
                        xobjects,
                    }
                }
                _ => XObject::Other,
            };
            result.insert(name.clone(), xobject);
        }
        result
    }
}

impl PdfBackend for LopdfBackend {
    fn page_ids(&self) -> Vec<PageId> {
        self.doc.get_pages().into_values().collect()
    }

    fn page_box(&self, page: PageId) -> PageBox {
        let values: Option<Vec<f32>> = self
            .inherited(page, b"MediaBox")
            .and_then(|o| self.resolve(o))
            .and_then(|o| o.as_array().ok())
            .and_then(|arr| {
                arr.iter()
                    .map(|v| self.resolve(v).and_then(|v| v.as_float().ok()))
                    .collect()
            });

        match values.as_deref() {
            Some([a, b, c, d, ..]) if a != c && b != d => PageBox {
                x0: a.min(*c),
                y0: b.min(*d),
                x1: a.max(*c),
                y1: b.max(*d),
            },
            _ => PageBox::default(),
        }
    }

    fn page_content(&self, page: PageId) -> Result<Option<Vec<u8>>> {
        let page_dict = self
            .doc
            .get_dictionary(page)
            .map_err(|e| Error::unreadable(format!("page object: {}", e)))?;

        let Ok(contents) = page_dict.get(b"Contents") else {
            return Ok(None);
        };

        let stream_data = |obj: &Object| -> Result<Vec<u8>> {
            match self.resolve(obj) {
                Some(Object::Stream(s)) => s
                    .decompressed_content()
                    .map_err(|e| Error::unreadable(format!("content stream: {}", e))),
                _ => Err(Error::unreadable("invalid content stream")),
            }
        };

        match self.resolve(contents) {
            Some(Object::Stream(_)) => stream_data(contents).map(Some),
            Some(Object::Array(arr)) => {
                let mut content = Vec::new();
                for obj in arr {
                    content.extend_from_slice(&stream_data(obj)?);
                    content.push(b'\n');
                }
                Ok(Some(content))
            }
            Some(Object::Null) => Ok(None),
            _ => Err(Error::unreadable("invalid content stream")),
        }
    }

    fn decode_content(&self, data: &[u8]) -> Result<Vec<ContentOp>> {
        let content = lopdf::content::Content::decode(data)
            .map_err(|e| Error::unreadable(format!("content stream syntax: {}", e)))?;

        Ok(content
            .operations
            .into_iter()
            .map(|op| ContentOp {
                operator: op.operator,
                operands: op.operands.iter().map(convert_object).collect(),
            })
            .collect())
    }

    fn page_fonts(&self, page: PageId) -> Result<BTreeMap<Vec<u8>, FontMetrics>> {
        let fonts = self
            .doc
            .get_page_fonts(page)
            .map_err(|e| Error::unreadable(format!("page fonts: {}", e)))?;

        Ok(fonts
            .into_iter()
            .map(|(name, dict)| (name, self.font_metrics(dict)))
            .collect())
    }

    fn decode_text(&self, page: PageId, font_name: &[u8], bytes: &[u8]) -> String {
        if let Ok(lopdf_fonts) = self.doc.get_page_fonts(page) {
            if let Some(font_dict) = lopdf_fonts.get(font_name) {
                if let Ok(enc) = font_dict.get_font_encoding(&self.doc) {
                    if let Ok(text) = LopdfDocument::decode_text(&enc, bytes) {
                        return text;
                    }
                }
            }
        }
        decode_text_simple(bytes)
    }

    fn page_xobjects(&self, page: PageId) -> Result<BTreeMap<Vec<u8>, XObject>> {
        Ok(self
            .inherited(page, b"Resources")
            .and_then(|o| self.resolve_dict(o))
            .map(|res| self.collect_xobjects(res, 0))
            .unwrap_or_default())
    }

    fn metadata(&self) -> Metadata {
        let mut metadata = Metadata::with_version(self.version());
        metadata.page_count = self.doc.get_pages().len();

        let info = self
            .doc
            .trailer
            .get(b"Info")
            .ok()
            .and_then(|o| self.resolve_dict(o));
        if let Some(info_dict) = info {
            metadata.title = get_string_from_dict(info_dict, b"Title");
            metadata.author = get_string_from_dict(info_dict, b"Author");
            metadata.subject = get_string_from_dict(info_dict, b"Subject");
            metadata.keywords = get_string_from_dict(info_dict, b"Keywords");
            metadata.creator = get_string_from_dict(info_dict, b"Creator");
            metadata.producer = get_string_from_dict(info_dict, b"Producer");
            metadata.created =
                get_string_from_dict(info_dict, b"CreationDate").and_then(|s| parse_pdf_date(&s));
            metadata.modified =
                get_string_from_dict(info_dict, b"ModDate").and_then(|s| parse_pdf_date(&s));
        }
        metadata
    }
}

/// Convert a `lopdf::Object` to [`PdfValue`].
fn convert_object(obj: &Object) -> PdfValue {
    match obj {
        Object::Integer(i) => PdfValue::Integer(*i),
        Object::Real(r) => PdfValue::Real(*r),
        Object::Name(n) => PdfValue::Name(n.clone()),
        Object::String(b, _) => PdfValue::Str(b.clone()),
        Object::Array(arr) => PdfValue::Array(arr.iter().map(convert_object).collect()),
        _ => PdfValue::Other,
    }
}

/// Helper to get a string from a PDF dictionary.
fn get_string_from_dict(dict: &Dictionary, key: &[u8]) -> Option<String> {
    let value = match dict.get(key).ok()? {
        Object::String(bytes, _) => decode_text_simple(bytes),
        Object::Name(bytes) => String::from_utf8_lossy(bytes).to_string(),
        _ => return None,
    };
    let value = value.trim_matches('\0').trim().to_string();
    (!value.is_empty()).then_some(value)
}

/// Parse a PDF date string (D:YYYYMMDDHHmmSSOHH'mm').
fn parse_pdf_date(s: &str) -> Option<chrono::DateTime<chrono::Utc>> {
    let s = s.strip_prefix("D:").unwrap_or(s);

    // At minimum we need YYYY
    if s.len() < 4 {
        return None;
    }

    let year: i32 = s.get(0..4)?.parse().ok()?;
    let month: u32 = s.get(4..6).and_then(|m| m.parse().ok()).unwrap_or(1);
    let day: u32 = s.get(6..8).and_then(|d| d.parse().ok()).unwrap_or(1);
    let hour: u32 = s.get(8..10).and_then(|h| h.parse().ok()).unwrap_or(0);
    let minute: u32 = s.get(10..12).and_then(|m| m.parse().ok()).unwrap_or(0);
    let second: u32 = s.get(12..14).and_then(|s| s.parse().ok()).unwrap_or(0);

    let local = chrono::NaiveDate::from_ymd_opt(year, month, day)?.and_hms_opt(hour, minute, second)?;

    // Offset: Z, or +HH'mm / -HH'mm
    let offset_minutes = match s.get(14..15) {
        Some(sign @ ("+" | "-")) => {
            let hours: i64 = s.get(15..17).and_then(|h| h.parse().ok()).unwrap_or(0);
            let minutes: i64 = s.get(18..20).and_then(|m| m.parse().ok()).unwrap_or(0);
            let total = hours * 60 + minutes;
            if sign == "-" {
                -total
            } else {
                total
            }
        }
        _ => 0,
    };

    let utc = local - chrono::Duration::minutes(offset_minutes);
    Some(chrono::DateTime::from_naive_utc_and_offset(utc, chrono::Utc))
}
