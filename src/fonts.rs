//! Font resolution and text measurement.
//!
//! Text is set in the built-in Helvetica family unless a custom TrueType font
//! has been registered; widths come from the Helvetica AFM metrics or from the
//! custom font's glyph advances (via `ttf-parser`).

use std::fs;
use std::path::Path;

use log::{debug, warn};

use crate::error::AssetError;
use crate::style::FontWeight;

pub const HELVETICA: &str = "Helvetica";
pub const HELVETICA_BOLD: &str = "Helvetica-Bold";

/// Advance widths (1/1000 em) of Helvetica for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_WIDTHS: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556,
    1015, 667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 278, 278, 278, 469, 556,
    333, 556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833, 556, 556,
    556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500, 334, 260, 334, 584,
];

/// Advance widths (1/1000 em) of Helvetica-Bold for ASCII 32..=126.
#[rustfmt::skip]
const HELVETICA_BOLD_WIDTHS: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611,
    975, 722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778,
    667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611, 333, 278, 333, 584, 556,
    333, 556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889, 611, 611,
    611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500, 389, 280, 389, 584,
];

/// Width used for characters outside the ASCII tables.
const HELVETICA_FALLBACK_WIDTH: u16 = 556;
const HELVETICA_ASCENDER: f32 = 718.0;
const HELVETICA_DESCENDER: f32 = -207.0;

/// A TrueType font registered from disk.
#[derive(Clone)]
pub struct CustomFont {
    /// Family name, also used as the PDF base font name.
    pub family: String,
    pub bytes: Vec<u8>,
    pub units_per_em: f32,
    pub ascender: f32,
    pub descender: f32,
}

impl std::fmt::Debug for CustomFont {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomFont")
            .field("family", &self.family)
            .field("bytes", &self.bytes.len())
            .field("units_per_em", &self.units_per_em)
            .finish()
    }
}

impl CustomFont {
    pub fn load(path: &Path) -> Result<Self, AssetError> {
        let bytes = fs::read(path).map_err(|source| AssetError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let fallback_family = path
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("CustomFont")
            .to_string();
        Self::from_bytes(bytes, &fallback_family).map_err(|reason| AssetError::Font {
            path: path.to_path_buf(),
            reason,
        })
    }

    pub fn from_bytes(bytes: Vec<u8>, fallback_family: &str) -> Result<Self, String> {
        let face = ttf_parser::Face::parse(&bytes, 0).map_err(|e| e.to_string())?;
        if face.number_of_glyphs() == 0 {
            return Err("font has no glyphs".to_string());
        }
        if face.tables().glyf.is_none() {
            return Err("only TrueType (glyf) outlines can be embedded".to_string());
        }

        let family = face
            .names()
            .into_iter()
            .filter(|name| name.name_id == ttf_parser::name_id::FAMILY)
            .find_map(|name| name.to_string())
            .unwrap_or_else(|| fallback_family.to_string());

        Ok(Self {
            family: sanitize_font_name(&family),
            units_per_em: f32::from(face.units_per_em()),
            ascender: f32::from(face.ascender()),
            descender: f32::from(face.descender()),
            bytes,
        })
    }

    pub fn face(&self) -> Option<ttf_parser::Face<'_>> {
        ttf_parser::Face::parse(&self.bytes, 0).ok()
    }
}

/// Resolves the font for each piece of text and measures it.
#[derive(Debug, Clone, Default)]
pub struct FontManager {
    custom: Option<CustomFont>,
}

impl FontManager {
    /// Built-in Helvetica only.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the font at `path` when it loads, Helvetica otherwise.
    pub fn with_override(path: Option<&Path>) -> Self {
        let mut fonts = Self::new();
        if let Some(path) = path {
            match CustomFont::load(path) {
                Ok(font) => {
                    debug!("registered custom font {} from {}", font.family, path.display());
                    fonts.custom = Some(font);
                }
                Err(e) => warn!("{e}; falling back to {HELVETICA}"),
            }
        }
        fonts
    }

    pub fn register(&mut self, font: CustomFont) {
        self.custom = Some(font);
    }

    pub fn custom(&self) -> Option<&CustomFont> {
        self.custom.as_ref()
    }

    pub fn has_custom_font(&self) -> bool {
        self.custom.is_some()
    }

    /// Family name to record in the layout for text of `weight`.
    ///
    /// A custom font serves both weights.
    pub fn family_for(&self, weight: FontWeight) -> &str {
        match (&self.custom, weight) {
            (Some(font), _) => &font.family,
            (None, FontWeight::Bold) => HELVETICA_BOLD,
            (None, FontWeight::Normal) => HELVETICA,
        }
    }

    /// Width of `text` in points.
    pub fn measure_text_width(&self, text: &str, font_size: f32, weight: FontWeight) -> f32 {
        if let Some(face) = self.custom.as_ref().and_then(CustomFont::face) {
            let scale = font_size / f32::from(face.units_per_em());
            return text
                .chars()
                .map(|ch| {
                    face.glyph_index(ch)
                        .and_then(|gid| face.glyph_hor_advance(gid))
                        .map(|adv| f32::from(adv) * scale)
                        .unwrap_or(font_size * 0.5)
                })
                .sum();
        }

        let table = match weight {
            FontWeight::Bold => &HELVETICA_BOLD_WIDTHS,
            FontWeight::Normal => &HELVETICA_WIDTHS,
        };
        let units: u32 = text
            .chars()
            .map(|ch| {
                let code = ch as u32;
                if (32..=126).contains(&code) {
                    u32::from(table[(code - 32) as usize])
                } else {
                    u32::from(HELVETICA_FALLBACK_WIDTH)
                }
            })
            .sum();
        units as f32 * font_size / 1000.0
    }

    /// Distance from the top of the line box to the baseline.
    pub fn ascender(&self, font_size: f32) -> f32 {
        match &self.custom {
            Some(font) => font.ascender * font_size / font.units_per_em,
            None => HELVETICA_ASCENDER * font_size / 1000.0,
        }
    }

    pub fn descender(&self, font_size: f32) -> f32 {
        match &self.custom {
            Some(font) => font.descender * font_size / font.units_per_em,
            None => HELVETICA_DESCENDER * font_size / 1000.0,
        }
    }
}

/// Word-wrap `text` to lines no wider than `max_width` points.
///
/// Explicit newlines are kept as line breaks. A word that is wider than
/// `max_width` on its own is broken between characters.
pub fn wrap_text(
    text: &str,
    font_size: f32,
    weight: FontWeight,
    max_width: f32,
    fonts: &FontManager,
) -> Vec<String> {
    if max_width <= 0.0 || text.is_empty() {
        return vec![text.to_string()];
    }

    let fits = |s: &str| fonts.measure_text_width(s, font_size, weight) <= max_width;
    let mut lines: Vec<String> = Vec::new();

    for paragraph in text.split('\n') {
        let words: Vec<&str> = paragraph.split_whitespace().collect();
        if words.is_empty() {
            lines.push(String::new());
            continue;
        }

        let mut current_line = String::new();
        for word in words {
            let candidate = if current_line.is_empty() {
                word.to_string()
            } else {
                format!("{current_line} {word}")
            };
            if fits(&candidate) {
                current_line = candidate;
                continue;
            }
            if !current_line.is_empty() {
                lines.push(std::mem::take(&mut current_line));
            }
            if fits(word) {
                current_line = word.to_string();
            } else {
                let mut pieces = break_word(word, &fits);
                current_line = pieces.pop().unwrap_or_default();
                lines.extend(pieces);
            }
        }
        if !current_line.is_empty() {
            lines.push(current_line);
        }
    }

    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

/// Split a single over-long word into pieces that each fit. Every piece holds
/// at least one character.
fn break_word(word: &str, fits: &dyn Fn(&str) -> bool) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    for ch in word.chars() {
        current.push(ch);
        if !fits(&current) && current.chars().count() > 1 {
            current.pop();
            pieces.push(std::mem::take(&mut current));
            current.push(ch);
        }
    }
    if !current.is_empty() {
        pieces.push(current);
    }
    pieces
}

/// Strip characters that are not valid in a PDF name.
fn sanitize_font_name(family: &str) -> String {
    let name: String = family
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || *c == '-' || *c == '_')
        .collect();
    if name.is_empty() {
        "CustomFont".to_string()
    } else {
        name
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helvetica_text_width() {
        let fonts = FontManager::new();
        // H 722 + e 556 + l 222 + l 222 + o 556 = 2278
        let w = fonts.measure_text_width("Hello", 10.0, FontWeight::Normal);
        assert!((w - 22.78).abs() < 0.01);
    }

    #[test]
    fn bold_is_wider() {
        let fonts = FontManager::new();
        let regular = fonts.measure_text_width("Invoice", 12.0, FontWeight::Normal);
        let bold = fonts.measure_text_width("Invoice", 12.0, FontWeight::Bold);
        assert!(bold > regular);
    }

    #[test]
    fn family_follows_weight() {
        let fonts = FontManager::new();
        assert_eq!(fonts.family_for(FontWeight::Normal), HELVETICA);
        assert_eq!(fonts.family_for(FontWeight::Bold), HELVETICA_BOLD);
    }

    #[test]
    fn word_wrap_basic() {
        let fonts = FontManager::new();
        let lines = wrap_text("Hello world foo bar", 16.0, FontWeight::Normal, 60.0, &fonts);
        assert!(lines.len() >= 2, "Expected wrapping, got {:?}", lines);
        for line in &lines {
            assert!(fonts.measure_text_width(line, 16.0, FontWeight::Normal) <= 60.0);
        }
    }

    #[test]
    fn long_word_is_broken() {
        let fonts = FontManager::new();
        let word = "Supercalifragilisticexpialidocious";
        let lines = wrap_text(word, 10.0, FontWeight::Normal, 40.0, &fonts);
        assert!(lines.len() > 1);
        assert_eq!(lines.concat(), word);
        for line in &lines {
            assert!(fonts.measure_text_width(line, 10.0, FontWeight::Normal) <= 40.0);
        }
    }

    #[test]
    fn newlines_are_kept() {
        let fonts = FontManager::new();
        let lines = wrap_text("one\n\ntwo", 9.0, FontWeight::Normal, 400.0, &fonts);
        assert_eq!(lines, vec!["one", "", "two"]);
    }

    #[test]
    fn missing_font_falls_back() {
        let fonts = FontManager::with_override(Some(Path::new("/nonexistent/font.ttf")));
        assert!(!fonts.has_custom_font());
        assert_eq!(fonts.family_for(FontWeight::Bold), HELVETICA_BOLD);
    }

    #[test]
    fn garbage_font_bytes_rejected() {
        assert!(CustomFont::from_bytes(b"not a font".to_vec(), "Bad").is_err());
    }

    /// A minimal sfnt with CFF magic and no `glyf`/`loca` tables.
    fn cff_flavoured_font() -> Vec<u8> {
        let mut head = vec![0u8; 54];
        head[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        head[18..20].copy_from_slice(&1000u16.to_be_bytes());
        let mut hhea = vec![0u8; 36];
        hhea[0..4].copy_from_slice(&0x0001_0000u32.to_be_bytes());
        hhea[34..36].copy_from_slice(&1u16.to_be_bytes());
        let maxp = vec![0, 0, 0x50, 0, 0, 1];
        let tables: [(&[u8; 4], Vec<u8>); 3] = [(b"head", head), (b"hhea", hhea), (b"maxp", maxp)];

        let mut font = Vec::new();
        font.extend_from_slice(b"OTTO");
        font.extend_from_slice(&(tables.len() as u16).to_be_bytes());
        font.extend_from_slice(&[0u8; 6]);
        let mut offset = 12 + 16 * tables.len();
        for (tag, data) in &tables {
            font.extend_from_slice(*tag);
            font.extend_from_slice(&0u32.to_be_bytes());
            font.extend_from_slice(&(offset as u32).to_be_bytes());
            font.extend_from_slice(&(data.len() as u32).to_be_bytes());
            offset += (data.len() + 3) & !3;
        }
        for (_, data) in &tables {
            font.extend_from_slice(data);
            font.resize((font.len() + 3) & !3, 0);
        }
        font
    }

    #[test]
    fn cff_outlines_are_rejected() {
        assert!(ttf_parser::Face::parse(&cff_flavoured_font(), 0).is_ok());
        assert!(CustomFont::from_bytes(cff_flavoured_font(), "Cff").is_err());
    }

    #[test]
    fn cff_font_file_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("Cff.otf");
        fs::write(&path, cff_flavoured_font()).unwrap();

        let fonts = FontManager::with_override(Some(&path));
        assert!(!fonts.has_custom_font());
        assert_eq!(fonts.family_for(FontWeight::Normal), HELVETICA);
    }

    #[test]
    fn font_names_are_sanitized() {
        assert_eq!(sanitize_font_name("Liberation Sans"), "LiberationSans");
        assert_eq!(sanitize_font_name("???"), "CustomFont");
    }
}
