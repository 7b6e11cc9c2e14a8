//! Invoice palette and paragraph styles.
//!
//! Every piece of text on the invoice uses one of the named [`TextStyle`]
//! presets below; the layout engine never invents sizes of its own.

use serde::{Deserialize, Serialize};

use crate::error::AssetError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FontWeight {
    #[default]
    Normal,
    Bold,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TextAlign {
    #[default]
    Left,
    Center,
    Right,
}

/// RGBA colour (0.0 – 1.0).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Color {
    pub r: f32,
    pub g: f32,
    pub b: f32,
    pub a: f32,
}

impl Color {
    pub const WHITE: Self = Self::opaque(1.0, 1.0, 1.0);
    /// Body text, `#1f2937`.
    pub const TEXT: Self = Self::opaque(0.121_568_63, 0.160_784_32, 0.215_686_28);
    /// Secondary text, `#6b7280`.
    pub const MUTED: Self = Self::opaque(0.419_607_85, 0.447_058_83, 0.501_960_8);
    /// Table rules, `#e5e7eb`.
    pub const BORDER: Self = Self::opaque(0.898_039_2, 0.905_882_36, 0.921_568_63);
    /// Banded row fill, `#f9fafb`.
    pub const BG_LIGHT: Self = Self::opaque(0.976_470_6, 0.980_392_16, 0.984_313_7);
    /// Theme accent when none (or an invalid one) is configured, `#0ea5a4`.
    pub const DEFAULT_ACCENT: Self = Self::opaque(0.054_901_96, 0.647_058_84, 0.643_137_3);

    const fn opaque(r: f32, g: f32, b: f32) -> Self {
        Self { r, g, b, a: 1.0 }
    }

    pub fn rgb(r: u8, g: u8, b: u8) -> Self {
        Self::opaque(f32::from(r) / 255.0, f32::from(g) / 255.0, f32::from(b) / 255.0)
    }

    /// Channel-wise comparison after quantising to 8 bits.
    pub fn same_rgb8(&self, other: &Color) -> bool {
        let q = |v: f32| (v * 255.0).round() as i32;
        q(self.r) == q(other.r) && q(self.g) == q(other.g) && q(self.b) == q(other.b)
    }

    pub fn from_hex(hex: &str) -> Option<Self> {
        let hex = hex.trim().trim_start_matches('#');
        if !hex.is_ascii() {
            return None;
        }
        if hex.len() == 6 {
            let r = u8::from_str_radix(&hex[0..2], 16).ok()?;
            let g = u8::from_str_radix(&hex[2..4], 16).ok()?;
            let b = u8::from_str_radix(&hex[4..6], 16).ok()?;
            Some(Self::rgb(r, g, b))
        } else if hex.len() == 3 {
            let r = u8::from_str_radix(&hex[0..1].repeat(2), 16).ok()?;
            let g = u8::from_str_radix(&hex[1..2].repeat(2), 16).ok()?;
            let b = u8::from_str_radix(&hex[2..3].repeat(2), 16).ok()?;
            Some(Self::rgb(r, g, b))
        } else {
            None
        }
    }

    /// Parse a configured theme colour.
    pub fn parse_theme(hex: &str) -> Result<Self, AssetError> {
        Self::from_hex(hex).ok_or_else(|| AssetError::Color(hex.to_string()))
    }

    pub fn to_array(self) -> [f32; 4] {
        [self.r, self.g, self.b, self.a]
    }
}

/// A paragraph style: size and leading in points.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextStyle {
    pub font_size: f32,
    pub leading: f32,
    pub weight: FontWeight,
    pub color: Color,
    pub align: TextAlign,
    /// Extra space below the paragraph.
    pub space_after: f32,
}

impl TextStyle {
    const fn body(font_size: f32, leading: f32, color: Color) -> Self {
        Self {
            font_size,
            leading,
            weight: FontWeight::Normal,
            color,
            align: TextAlign::Left,
            space_after: 0.0,
        }
    }

    const fn bold(mut self) -> Self {
        self.weight = FontWeight::Bold;
        self
    }

    const fn aligned(mut self, align: TextAlign) -> Self {
        self.align = align;
        self
    }

    const fn spaced(mut self, space_after: f32) -> Self {
        self.space_after = space_after;
        self
    }

    pub fn company_name(accent: Color) -> Self {
        Self::body(24.0, 28.0, accent).bold().spaced(2.0)
    }

    pub fn invoice_title(accent: Color) -> Self {
        Self::body(16.0, 20.0, accent).spaced(8.0)
    }

    pub const fn company_info() -> Self {
        Self::body(9.0, 13.0, Color::MUTED).aligned(TextAlign::Right)
    }

    pub const fn section_label() -> Self {
        Self::body(10.0, 14.0, Color::TEXT).bold().spaced(4.0)
    }

    pub const fn normal_text() -> Self {
        Self::body(9.0, 13.0, Color::TEXT)
    }

    pub const fn meta_label() -> Self {
        Self::body(9.0, 13.0, Color::MUTED).aligned(TextAlign::Right)
    }

    pub const fn meta_value() -> Self {
        Self::body(9.0, 13.0, Color::TEXT).aligned(TextAlign::Right)
    }

    pub const fn table_header() -> Self {
        Self::body(10.0, 14.0, Color::WHITE).bold()
    }

    pub const fn table_cell() -> Self {
        Self::body(9.0, 13.0, Color::TEXT)
    }

    pub const fn footer_note() -> Self {
        Self::body(8.0, 11.0, Color::MUTED).aligned(TextAlign::Center)
    }

    pub fn with_align(self, align: TextAlign) -> Self {
        self.aligned(align)
    }

    pub fn with_weight(mut self, weight: FontWeight) -> Self {
        self.weight = weight;
        self
    }
}
