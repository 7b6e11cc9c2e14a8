//! Pipeline – ties together document building, layout and rendering into a
//! single function call.
//!
//! Every stage is synchronous and reads nothing but the optional logo and
//! font files named in [`RenderOptions`].

use log::debug;
use serde::Deserialize;

use crate::document::build_document;
use crate::error::{RenderError, ValidationError};
use crate::fonts::FontManager;
use crate::layout::compute_layout;
use crate::layout_config::LayoutConfig;
use crate::model::{Invoice, User};
use crate::options::RenderOptions;
use crate::render::render_pdf;

pub const PDF_CONTENT_TYPE: &str = "application/pdf";

/// A rendered invoice ready to hand to an HTTP response or a mail body.
#[derive(Debug, Clone, PartialEq)]
pub struct PdfAttachment {
    pub file_name: String,
    pub content_type: &'static str,
    pub bytes: Vec<u8>,
}

/// Everything a detached caller (CLI, C ABI) sends in one JSON document.
#[derive(Debug, Clone, Deserialize)]
pub struct InvoiceBundle {
    pub invoice: Invoice,
    pub user: User,
    #[serde(default)]
    pub options: Option<RenderOptions>,
}

impl InvoiceBundle {
    /// Parse a bundle and recompute the invoice totals from its items.
    pub fn from_json(json: &str) -> Result<Self, ValidationError> {
        let mut bundle: Self =
            serde_json::from_str(json).map_err(|e| ValidationError::MalformedBody(e.to_string()))?;
        bundle.invoice.recalculate()?;
        Ok(bundle)
    }

    /// Options from the bundle, or `fallback` when it carries none.
    pub fn options_or(&self, fallback: RenderOptions) -> RenderOptions {
        self.options.clone().unwrap_or(fallback)
    }
}

/// Full pipeline: invoice → PDF bytes and the layout that produced them.
pub fn generate_pdf(
    invoice: &Invoice,
    user: &User,
    options: &RenderOptions,
) -> Result<(Vec<u8>, LayoutConfig), RenderError> {
    let fonts = FontManager::with_override(options.font_override_path.as_deref());
    let layout = layout_with(invoice, user, options, &fonts);

    let bytes = render_pdf(&layout, &fonts)?;
    debug!("rendered {} ({} bytes)", invoice.invoice_number, bytes.len());

    Ok((bytes, layout))
}

/// Render the invoice to PDF bytes.
pub fn render_invoice_pdf(
    invoice: &Invoice,
    user: &User,
    options: &RenderOptions,
) -> Result<Vec<u8>, RenderError> {
    generate_pdf(invoice, user, options).map(|(bytes, _)| bytes)
}

/// Render the invoice as `<invoice_number>.pdf`.
pub fn invoice_attachment(
    invoice: &Invoice,
    user: &User,
    options: &RenderOptions,
) -> Result<PdfAttachment, RenderError> {
    Ok(PdfAttachment {
        file_name: format!("{}.pdf", invoice.invoice_number),
        content_type: PDF_CONTENT_TYPE,
        bytes: render_invoice_pdf(invoice, user, options)?,
    })
}

/// Generate only the layout config (no PDF rendering) – useful for testing.
pub fn compute_layout_config(invoice: &Invoice, user: &User, options: &RenderOptions) -> LayoutConfig {
    let fonts = FontManager::with_override(options.font_override_path.as_deref());
    layout_with(invoice, user, options, &fonts)
}

fn layout_with(invoice: &Invoice, user: &User, options: &RenderOptions, fonts: &FontManager) -> LayoutConfig {
    let doc = build_document(invoice, user, options);
    debug!(
        "built document for {}: {} item rows, notes: {}",
        invoice.invoice_number,
        doc.items.rows.len(),
        doc.notes.is_some()
    );
    compute_layout(&doc, &options.page, fonts)
}
