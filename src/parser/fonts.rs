//! Font metrics and style detection.

use crate::model::FontFlags;

/// Default advance for codes without a width entry, in 1/1000 text units.
pub const DEFAULT_GLYPH_WIDTH: f32 = 500.0;

// FontDescriptor /Flags bits (PDF 32000-1, table 123).
const FLAG_FIXED_PITCH: i64 = 1;
const FLAG_SERIF: i64 = 1 << 1;
const FLAG_ITALIC: i64 = 1 << 6;
const FLAG_FORCE_BOLD: i64 = 1 << 18;

/// Metrics of one font resource on a page.
#[derive(Debug, Clone)]
pub struct FontMetrics {
    /// Base font name with any subset prefix removed
    pub base_font: String,
    /// Style flags
    pub flags: FontFlags,
    /// First character code covered by `widths`
    pub first_char: u32,
    /// Glyph widths in 1/1000 text units
    pub widths: Vec<f32>,
    /// Width for codes outside `widths`
    pub missing_width: f32,
    /// Composite (Type0) fonts use two-byte codes
    pub two_byte: bool,
}

impl Default for FontMetrics {
    fn default() -> Self {
        Self {
            base_font: String::new(),
            flags: FontFlags::empty(),
            first_char: 0,
            widths: Vec::new(),
            missing_width: DEFAULT_GLYPH_WIDTH,
            two_byte: false,
        }
    }
}

impl FontMetrics {
    /// Create metrics from the font's base name, deriving style from it.
    pub fn named(base_font: &str) -> Self {
        let base_font = strip_subset_prefix(base_font).to_string();
        Self {
            flags: flags_from_name(&base_font),
            base_font,
            ..Default::default()
        }
    }

    /// Split a shown string into character codes.
    pub fn codes(&self, bytes: &[u8]) -> Vec<u32> {
        if self.two_byte {
            bytes
                .chunks(2)
                .map(|c| match c {
                    [hi, lo] => u16::from_be_bytes([*hi, *lo]) as u32,
                    [single] => *single as u32,
                    _ => 0,
                })
                .collect()
        } else {
            bytes.iter().map(|&b| b as u32).collect()
        }
    }

    /// Advance width of a code in 1/1000 text units.
    pub fn width(&self, code: u32) -> f32 {
        code.checked_sub(self.first_char)
            .and_then(|i| self.widths.get(i as usize))
            .copied()
            .filter(|w| *w > 0.0)
            .unwrap_or(self.missing_width)
    }
}

/// Remove a `ABCDEF+` subset tag from a font name.
pub fn strip_subset_prefix(name: &str) -> &str {
    match name.split_once('+') {
        Some((tag, rest)) if tag.len() == 6 && tag.chars().all(|c| c.is_ascii_uppercase()) => rest,
        _ => name,
    }
}

/// Guess style flags from a font name.
pub fn flags_from_name(name: &str) -> FontFlags {
    let lower = name.to_lowercase();
    let mut flags = FontFlags::empty();

    if ["bold", "black", "heavy", "semibold", "demi"]
        .iter()
        .any(|w| lower.contains(w))
    {
        flags |= FontFlags::BOLD;
    }
    if lower.contains("italic") || lower.contains("oblique") {
        flags |= FontFlags::ITALIC;
    }
    if lower.contains("courier") || lower.contains("mono") || lower.contains("consol") {
        flags |= FontFlags::MONOSPACE;
    }
    if lower.contains("times") || (lower.contains("serif") && !lower.contains("sans")) {
        flags |= FontFlags::SERIF;
    }
    flags
}

/// Style flags from FontDescriptor `/Flags` and `/FontWeight`.
pub fn flags_from_descriptor(descriptor_flags: i64, font_weight: Option<f32>) -> FontFlags {
    let mut flags = FontFlags::empty();
    if descriptor_flags & FLAG_FIXED_PITCH != 0 {
        flags |= FontFlags::MONOSPACE;
    }
    if descriptor_flags & FLAG_SERIF != 0 {
        flags |= FontFlags::SERIF;
    }
    if descriptor_flags & FLAG_ITALIC != 0 {
        flags |= FontFlags::ITALIC;
    }
    if descriptor_flags & FLAG_FORCE_BOLD != 0 || font_weight.is_some_and(|w| w >= 600.0) {
        flags |= FontFlags::BOLD;
    }
    flags
}

/// Check if character is from a script that doesn't use word spaces.
/// Chinese and Japanese don't use spaces between words, but Korean does.
pub fn is_spaceless_script_char(c: char) -> bool {
    let code = c as u32;

    // CJK Unified Ideographs and extensions
    (0x4E00..=0x9FFF).contains(&code)
    || (0x3400..=0x4DBF).contains(&code)
    || (0x20000..=0x2EBEF).contains(&code)
    // Hiragana and Katakana
    || (0x3040..=0x30FF).contains(&code)
    // CJK Symbols and Punctuation
    || (0x3000..=0x303F).contains(&code)
}
