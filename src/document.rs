//! Render-ready invoice document.
//!
//! [`build_document`] turns an invoice, its owner and the render options into
//! a [`RenderDocument`]: every string that will appear on the page, already
//! formatted, grouped by section. The layout engine only positions it.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use log::warn;
use serde::Serialize;

use crate::error::AssetError;
use crate::model::{non_blank, Invoice, User};
use crate::money::format_money;
use crate::options::RenderOptions;
use crate::style::Color;

pub const INVOICE_TITLE: &str = "Invoice";
pub const FOOTER_NOTE: &str =
    "Please pay the invoice before the due date. Let us know if you have any questions.";
pub const ITEM_HEADERS: [&str; 4] = ["Items", "Quantity", "Price", "Amount"];
const DATE_FORMAT: &str = "%d/%m/%Y";

/// A logo whose image header has been read successfully.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LogoImage {
    pub path: PathBuf,
    pub width_px: u32,
    pub height_px: u32,
}

impl LogoImage {
    /// Read only the image header of `path`.
    pub fn read_header(path: &Path) -> Result<Self, AssetError> {
        fs::metadata(path).map_err(|source| AssetError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let (width_px, height_px) =
            image::image_dimensions(path).map_err(|source| AssetError::Image {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self {
            path: path.to_path_buf(),
            width_px,
            height_px,
        })
    }

    pub fn aspect_ratio(&self) -> f32 {
        if self.height_px == 0 {
            1.0
        } else {
            self.width_px as f32 / self.height_px as f32
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Header {
    pub logo: Option<LogoImage>,
    pub company_name: String,
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ContactLine {
    pub text: String,
    pub emphasis: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BillTo {
    pub client_name: String,
    /// Email, then address lines.
    pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetaRow {
    pub label: String,
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemsTable {
    pub headers: [String; 4],
    /// Description, quantity, unit price, amount.
    pub rows: Vec<[String; 4]>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TotalsRow {
    pub label: String,
    pub value: String,
    pub emphasis: bool,
}

/// Everything printed on an invoice, in section order.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderDocument {
    /// Used as the PDF title.
    pub title: String,
    #[serde(skip)]
    pub accent: Color,
    pub header: Header,
    pub contact: Vec<ContactLine>,
    pub bill_to: BillTo,
    pub meta: Vec<MetaRow>,
    pub items: ItemsTable,
    pub totals: Vec<TotalsRow>,
    pub notes: Option<String>,
    pub footer: String,
}

pub fn build_document(invoice: &Invoice, user: &User, options: &RenderOptions) -> RenderDocument {
    let symbol = options.currency_symbol.as_str();

    RenderDocument {
        title: invoice.invoice_number.clone(),
        accent: options.accent(),
        header: Header {
            logo: options.logo_path.as_deref().and_then(load_logo),
            company_name: company_display_name(user),
            title: INVOICE_TITLE.to_string(),
        },
        contact: contact_lines(user),
        bill_to: bill_to(invoice),
        meta: meta_rows(invoice),
        items: ItemsTable {
            headers: ITEM_HEADERS.map(String::from),
            rows: invoice
                .items
                .iter()
                .map(|item| {
                    [
                        item.description.clone(),
                        item.quantity.to_string(),
                        format_money(item.unit_price, symbol),
                        format_money(item.total, symbol),
                    ]
                })
                .collect(),
        },
        totals: vec![
            totals_row("Subtotal", invoice.subtotal, symbol, false),
            totals_row("Tax (+)", invoice.tax_amount, symbol, false),
            // Discounts are not modelled yet; the row is always zero.
            totals_row("Discount (-)", 0.0, symbol, false),
            totals_row("Total", invoice.total, symbol, true),
        ],
        notes: non_blank(&invoice.notes).map(str::to_string),
        footer: FOOTER_NOTE.to_string(),
    }
}

fn load_logo(path: &Path) -> Option<LogoImage> {
    match LogoImage::read_header(path) {
        Ok(logo) if logo.width_px > 0 && logo.height_px > 0 => Some(logo),
        Ok(_) => {
            warn!("logo {} has no pixels; rendering without logo", path.display());
            None
        }
        Err(e) => {
            warn!("{e}; rendering without logo");
            None
        }
    }
}

fn company_display_name(user: &User) -> String {
    non_blank(&user.company_name)
        .or_else(|| non_blank(&user.full_name))
        .unwrap_or("Company")
        .to_string()
}

fn contact_lines(user: &User) -> Vec<ContactLine> {
    let line = |text: &str, emphasis| ContactLine {
        text: text.to_string(),
        emphasis,
    };
    let email = Some(user.email.clone());

    let mut lines = Vec::new();
    lines.extend(non_blank(&user.company_name).map(|s| line(s, true)));
    lines.extend(non_blank(&email).map(|s| line(s, false)));
    lines.extend(non_blank(&user.phone).map(|s| line(s, false)));
    lines.extend(non_blank(&user.address).map(|s| line(s, false)));
    lines
}

fn bill_to(invoice: &Invoice) -> BillTo {
    let client_name = match invoice.client_name.trim() {
        "" => "-".to_string(),
        name => name.to_string(),
    };

    let mut lines: Vec<String> = non_blank(&invoice.client_email)
        .map(str::to_string)
        .into_iter()
        .collect();
    if let Some(address) = non_blank(&invoice.client_address) {
        lines.extend(
            address
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(str::to_string),
        );
    }

    BillTo { client_name, lines }
}

fn meta_rows(invoice: &Invoice) -> Vec<MetaRow> {
    let row = |label: &str, value: String| MetaRow {
        label: label.to_string(),
        value,
    };
    let mut rows = vec![
        row("Invoice number:", invoice.invoice_number.clone()),
        row("Invoice date:", format_date(invoice.invoice_date)),
    ];
    if let Some(due) = invoice.due_date {
        rows.push(row("Due date:", format_date(due)));
    }
    rows
}

fn totals_row(label: &str, value: f64, symbol: &str, emphasis: bool) -> TotalsRow {
    TotalsRow {
        label: label.to_string(),
        value: format_money(value, symbol),
        emphasis,
    }
}

pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceItem;

    fn invoice() -> Invoice {
        let mut invoice = Invoice::new(
            "INV-00012",
            "Acme Corp",
            NaiveDate::from_ymd_opt(2024, 3, 5).unwrap(),
        );
        invoice.client_email = Some("billing@acme.test".into());
        invoice.client_address = Some("1 Main St\n\n  Springfield  \n".into());
        invoice.tax_rate = 10.0;
        invoice
            .set_items(vec![InvoiceItem::new("Widget", 2, 9.99).unwrap()])
            .unwrap();
        invoice
    }

    fn user() -> User {
        User {
            email: "me@studio.test".into(),
            full_name: Some("Jo Maker".into()),
            company_name: Some("  Studio Nine ".into()),
            phone: Some("".into()),
            address: Some("42 Side Rd".into()),
            ..Default::default()
        }
    }

    #[test]
    fn header_and_contact() {
        let doc = build_document(&invoice(), &user(), &RenderOptions::default());
        assert_eq!(doc.header.company_name, "Studio Nine");
        assert_eq!(doc.header.title, "Invoice");
        assert!(doc.header.logo.is_none());

        let texts: Vec<_> = doc.contact.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["Studio Nine", "me@studio.test", "42 Side Rd"]);
        assert!(doc.contact[0].emphasis);
    }

    #[test]
    fn company_name_fallbacks() {
        let mut user = user();
        user.company_name = None;
        assert_eq!(company_display_name(&user), "Jo Maker");
        user.full_name = Some("   ".into());
        assert_eq!(company_display_name(&user), "Company");
    }

    #[test]
    fn bill_to_drops_blank_address_lines() {
        let doc = build_document(&invoice(), &user(), &RenderOptions::default());
        assert_eq!(doc.bill_to.client_name, "Acme Corp");
        assert_eq!(doc.bill_to.lines, vec!["billing@acme.test", "1 Main St", "Springfield"]);
    }

    #[test]
    fn meta_dates_are_day_first() {
        let mut inv = invoice();
        let doc = build_document(&inv, &user(), &RenderOptions::default());
        assert_eq!(doc.meta.len(), 2);
        assert_eq!(doc.meta[1].value, "05/03/2024");

        inv.due_date = NaiveDate::from_ymd_opt(2024, 4, 4);
        let doc = build_document(&inv, &user(), &RenderOptions::default());
        assert_eq!(doc.meta[2].label, "Due date:");
        assert_eq!(doc.meta[2].value, "04/04/2024");
    }

    #[test]
    fn items_and_totals_are_formatted() {
        let doc = build_document(&invoice(), &user(), &RenderOptions::default());
        assert_eq!(doc.items.headers, ITEM_HEADERS.map(String::from));
        assert_eq!(doc.items.rows[0], ["Widget", "2", "$9.99", "$19.98"].map(String::from));

        let totals: Vec<_> = doc
            .totals
            .iter()
            .map(|r| (r.label.as_str(), r.value.as_str()))
            .collect();
        assert_eq!(
            totals,
            vec![
                ("Subtotal", "$19.98"),
                ("Tax (+)", "$2.00"),
                ("Discount (-)", "$0.00"),
                ("Total", "$21.98"),
            ]
        );
        assert!(doc.totals[3].emphasis);
    }

    #[test]
    fn blank_notes_are_omitted() {
        let mut inv = invoice();
        inv.notes = Some("  \n ".into());
        assert!(build_document(&inv, &user(), &RenderOptions::default()).notes.is_none());
        inv.notes = Some(" Thanks! ".into());
        assert_eq!(
            build_document(&inv, &user(), &RenderOptions::default()).notes.as_deref(),
            Some("Thanks!")
        );
    }

    #[test]
    fn missing_logo_is_dropped() {
        let options = RenderOptions::default().with_logo("/nonexistent/logo.png");
        let doc = build_document(&invoice(), &user(), &options);
        assert!(doc.header.logo.is_none());
    }

    #[test]
    fn undecodable_logo_is_dropped() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("logo.png");
        fs::write(&path, b"definitely not a png").unwrap();
        let doc = build_document(&invoice(), &user(), &RenderOptions::default().with_logo(&path));
        assert!(doc.header.logo.is_none());
    }
}
