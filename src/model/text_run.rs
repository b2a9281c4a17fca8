//! Text runs and glyphs.

use super::Rect;
use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Font style flags carried by a text run.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct FontFlags: u8 {
        const BOLD = 1;
        const ITALIC = 1 << 1;
        const MONOSPACE = 1 << 2;
        const SERIF = 1 << 3;
    }
}

impl FontFlags {
    pub fn is_bold(&self) -> bool {
        self.contains(FontFlags::BOLD)
    }

    pub fn is_italic(&self) -> bool {
        self.contains(FontFlags::ITALIC)
    }
}

impl Serialize for FontFlags {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bits().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for FontFlags {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bits = u8::deserialize(deserializer)?;
        Ok(FontFlags::from_bits_truncate(bits))
    }
}

/// A contiguous piece of text sharing one font and baseline.
///
/// Runs are produced by the extractor and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextRun {
    /// Normalized text
    pub text: String,

    /// Effective font size in points
    pub font_size: f32,

    /// Style flags
    pub flags: FontFlags,

    /// Base font name with any subset prefix removed
    pub font_name: String,

    /// Zero-based page index
    pub page_index: usize,

    /// Bounding box, top-left origin
    pub bbox: Rect,
}

impl TextRun {
    /// Create a run with default style.
    pub fn new(text: impl Into<String>, font_size: f32, page_index: usize, bbox: Rect) -> Self {
        Self {
            text: text.into(),
            font_size,
            flags: FontFlags::empty(),
            font_name: String::new(),
            page_index,
            bbox,
        }
    }

    /// Builder: set flags.
    pub fn with_flags(mut self, flags: FontFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Builder: set font name.
    pub fn with_font_name(mut self, name: impl Into<String>) -> Self {
        self.font_name = name.into();
        self
    }

    pub fn is_bold(&self) -> bool {
        self.flags.is_bold()
    }

    /// Whether the run carries no visible text.
    pub fn is_blank(&self) -> bool {
        self.text.trim().is_empty()
    }

    /// Number of non-whitespace characters.
    pub fn char_count(&self) -> usize {
        self.text.chars().filter(|c| !c.is_whitespace()).count()
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// A single positioned character.
#[derive(Debug, Clone, PartialEq)]
pub struct Glyph {
    pub ch: char,
    pub bbox: Rect,
    pub font_size: f32,
}

impl Glyph {
    pub fn new(ch: char, bbox: Rect, font_size: f32) -> Self {
        Self { ch, bbox, font_size }
    }
}
