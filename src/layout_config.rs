//! Layout config – the intermediate representation between layout computation
//! and PDF rendering. This is the "frozen" structure that encodes exactly what
//! goes on each page.

use serde::{Deserialize, Serialize};

use crate::options::PageGeometry;
use crate::style::TextAlign;

/// A complete document layout ready for rendering.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutConfig {
    /// Document title embedded in the PDF metadata.
    #[serde(default = "LayoutConfig::default_title")]
    pub title: String,
    /// Width of each page in PDF points (1 pt = 1/72 inch).
    pub page_width_pt: f32,
    /// Height of each page in PDF points.
    pub page_height_pt: f32,
    /// Ordered list of pages.
    pub pages: Vec<PageLayout>,
}

/// One page of content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PageLayout {
    pub page_index: usize,
    pub boxes: Vec<LayoutBox>,
}

/// A positioned rectangle with optional content.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayoutBox {
    /// Position relative to page top-left, in points.
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub background_color: Option<[f32; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub border: Option<BorderStyle>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<TextContent>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<ImageContent>,

    /// Table cells of a row box, drawn after the row's own fill and rules.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<LayoutBox>,
}

/// Which edges of a box get a rule.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BorderSides {
    All,
    Top,
    Bottom,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BorderStyle {
    pub width: f32,
    pub color: [f32; 4],
    pub sides: BorderSides,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextContent {
    /// Pre-wrapped, pre-aligned lines of text.
    pub lines: Vec<TextLine>,
    pub font_family: String,
    pub font_size: f32,
    pub bold: bool,
    pub color: [f32; 4],
    pub line_height: f32,
    pub text_align: TextAlign,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextLine {
    pub text: String,
    /// X offset within the layout box (for alignment)
    pub x_offset: f32,
    /// Baseline offset from the top of the layout box
    pub baseline: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageContent {
    /// Filesystem path of the image.
    pub src: String,
    pub width: f32,
    pub height: f32,
}

impl LayoutConfig {
    pub fn new(title: impl Into<String>, page: &PageGeometry) -> Self {
        Self {
            title: title.into(),
            page_width_pt: page.width,
            page_height_pt: page.height,
            pages: Vec::new(),
        }
    }

    /// Create an empty A4 layout config.
    pub fn a4() -> Self {
        Self::new(Self::default_title(), &PageGeometry::a4())
    }

    fn default_title() -> String {
        "Invoice".to_string()
    }

    /// Serialise to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_default()
    }

    /// Deserialise from JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Every text line in page order, for inspection and tests.
    pub fn text_lines(&self) -> Vec<&str> {
        let mut out = Vec::new();
        for page in &self.pages {
            for lbox in &page.boxes {
                lbox.collect_text(&mut out);
            }
        }
        out
    }

    pub fn image_count(&self) -> usize {
        self.pages
            .iter()
            .flat_map(|page| page.boxes.iter())
            .map(LayoutBox::image_count)
            .sum()
    }
}

impl PageLayout {
    pub fn new(page_index: usize) -> Self {
        Self {
            page_index,
            boxes: Vec::new(),
        }
    }
}

impl LayoutBox {
    pub fn new(x: f32, y: f32, width: f32, height: f32) -> Self {
        Self {
            x,
            y,
            width,
            height,
            background_color: None,
            border: None,
            text: None,
            image: None,
            children: Vec::new(),
        }
    }

    pub fn bottom(&self) -> f32 {
        self.y + self.height
    }

    pub(crate) fn collect_text<'a>(&'a self, out: &mut Vec<&'a str>) {
        if let Some(text) = &self.text {
            out.extend(text.lines.iter().map(|line| line.text.as_str()));
        }
        for child in &self.children {
            child.collect_text(out);
        }
    }

    fn image_count(&self) -> usize {
        usize::from(self.image.is_some())
            + self.children.iter().map(LayoutBox::image_count).sum::<usize>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn json_round_trip() {
        let mut config = LayoutConfig::a4();
        let mut page = PageLayout::new(0);
        let mut lbox = LayoutBox::new(10.0, 20.0, 100.0, 13.0);
        lbox.text = Some(TextContent {
            lines: vec![TextLine {
                text: "Invoice".into(),
                x_offset: 0.0,
                baseline: 9.0,
            }],
            font_family: "Helvetica".into(),
            font_size: 9.0,
            bold: false,
            color: [0.0, 0.0, 0.0, 1.0],
            line_height: 13.0,
            text_align: TextAlign::Right,
        });
        page.boxes.push(lbox);
        config.pages.push(page);

        let json = config.to_json();
        assert!(json.contains("\"text_align\": \"right\""));
        assert!(!json.contains("background_color"));
        assert_eq!(LayoutConfig::from_json(&json).unwrap(), config);
        assert_eq!(config.text_lines(), vec!["Invoice"]);
    }

    #[test]
    fn title_defaults_when_missing() {
        let json = r#"{"page_width_pt": 595.28, "page_height_pt": 841.89, "pages": []}"#;
        let config = LayoutConfig::from_json(json).unwrap();
        assert_eq!(config.title, "Invoice");
        assert!(config.pages.is_empty());
    }
}
