//! Render configuration.

use std::env;
use std::path::{Path, PathBuf};

use log::warn;
use serde::{Deserialize, Serialize};

use crate::model::{non_blank, User};
use crate::style::Color;

pub const THEME_COLOR_VAR: &str = "INVOICE_THEME_COLOR";
pub const CURRENCY_SYMBOL_VAR: &str = "INVOICE_CURRENCY_SYMBOL";
pub const FONT_PATH_VAR: &str = "INVOICE_FONT_PATH";

const CM: f32 = 72.0 / 2.54;

/// Page size and margins in points.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PageGeometry {
    pub width: f32,
    pub height: f32,
    pub margin_left: f32,
    pub margin_right: f32,
    pub margin_top: f32,
    pub margin_bottom: f32,
}

impl PageGeometry {
    /// A4 with 2.5 cm side margins and 2 cm top/bottom margins.
    pub fn a4() -> Self {
        Self {
            width: 595.28,
            height: 841.89,
            margin_left: 2.5 * CM,
            margin_right: 2.5 * CM,
            margin_top: 2.0 * CM,
            margin_bottom: 2.0 * CM,
        }
    }

    pub fn content_width(&self) -> f32 {
        self.width - self.margin_left - self.margin_right
    }

    /// Page y (from the top) where content must stop.
    pub fn content_bottom(&self) -> f32 {
        self.height - self.margin_bottom
    }
}

impl Default for PageGeometry {
    fn default() -> Self {
        Self::a4()
    }
}

/// Per-render settings supplied by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderOptions {
    /// Accent colour as `#rrggbb` or `#rgb`.
    pub theme_color: String,
    pub currency_symbol: String,
    /// TrueType font used for all text instead of Helvetica.
    pub font_override_path: Option<PathBuf>,
    /// Absolute path of the company logo.
    pub logo_path: Option<PathBuf>,
    pub page: PageGeometry,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            theme_color: "#0ea5a4".to_string(),
            currency_symbol: "$".to_string(),
            font_override_path: None,
            logo_path: None,
            page: PageGeometry::a4(),
        }
    }
}

impl RenderOptions {
    /// Defaults overridden by `INVOICE_THEME_COLOR`, `INVOICE_CURRENCY_SYMBOL`
    /// and `INVOICE_FONT_PATH` when set and non-empty.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());
        let mut options = Self::default();
        if let Some(color) = var(THEME_COLOR_VAR) {
            options.theme_color = color.trim().to_string();
        }
        if let Some(symbol) = var(CURRENCY_SYMBOL_VAR) {
            options.currency_symbol = symbol;
        }
        if let Some(path) = var(FONT_PATH_VAR) {
            options.font_override_path = Some(PathBuf::from(path));
        }
        options
    }

    pub fn with_logo(mut self, path: impl Into<PathBuf>) -> Self {
        self.logo_path = Some(path.into());
        self
    }

    /// The theme accent, or the default accent when `theme_color` is invalid.
    pub fn accent(&self) -> Color {
        Color::parse_theme(&self.theme_color).unwrap_or_else(|e| {
            warn!("{e}; using default accent");
            Color::DEFAULT_ACCENT
        })
    }
}

/// Absolute path of the user's stored logo, resolved against `base_dir`.
///
/// Absolute stored paths are returned unchanged.
pub fn resolve_logo_path(user: &User, base_dir: &Path) -> Option<PathBuf> {
    non_blank(&user.company_logo).map(|relative| base_dir.join(relative))
}
