//! Persisted records: users, invoices and their line items.
//!
//! Derived money fields (`InvoiceItem::total`, `Invoice::subtotal`,
//! `tax_amount`, `total`) are only ever written by [`Invoice::recalculate`]
//! and [`InvoiceItem::new`], so `total == subtotal + tax_amount` and
//! `subtotal == Σ item.total` hold for every invoice that leaves this module.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::ValidationError;
use crate::totals::{self, LineAmount, Totals};

/// Lifecycle of an invoice.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InvoiceStatus {
    #[default]
    Draft,
    Sent,
    Paid,
}

impl InvoiceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoiceStatus::Draft => "draft",
            InvoiceStatus::Sent => "sent",
            InvoiceStatus::Paid => "paid",
        }
    }
}

impl FromStr for InvoiceStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "draft" => Ok(InvoiceStatus::Draft),
            "sent" => Ok(InvoiceStatus::Sent),
            "paid" => Ok(InvoiceStatus::Paid),
            _ => Err(ValidationError::UnknownStatus(s.to_string())),
        }
    }
}

impl fmt::Display for InvoiceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One billable row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvoiceItem {
    pub description: String,
    pub quantity: u32,
    pub unit_price: f64,
    /// `quantity * unit_price`, no intermediate rounding.
    #[serde(default)]
    pub total: f64,
}

impl InvoiceItem {
    /// Build an item with its total already computed.
    pub fn new(
        description: impl Into<String>,
        quantity: u32,
        unit_price: f64,
    ) -> Result<Self, ValidationError> {
        let total = totals::line_total(quantity, unit_price)?;
        Ok(Self {
            description: description.into(),
            quantity,
            unit_price,
            total,
        })
    }

    pub fn amount(&self) -> LineAmount {
        LineAmount {
            quantity: self.quantity,
            unit_price: self.unit_price,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_number: String,
    pub client_name: String,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_address: Option<String>,
    pub invoice_date: NaiveDate,
    #[serde(default)]
    pub due_date: Option<NaiveDate>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tax_rate: f64,
    #[serde(default)]
    pub status: InvoiceStatus,
    #[serde(default)]
    pub items: Vec<InvoiceItem>,
    #[serde(default)]
    pub subtotal: f64,
    #[serde(default)]
    pub tax_amount: f64,
    #[serde(default)]
    pub total: f64,
}

impl Invoice {
    /// A draft invoice with no items; totals are zero until items are added
    /// through [`Invoice::set_items`].
    pub fn new(
        invoice_number: impl Into<String>,
        client_name: impl Into<String>,
        invoice_date: NaiveDate,
    ) -> Self {
        Self {
            invoice_number: invoice_number.into(),
            client_name: client_name.into(),
            client_email: None,
            client_address: None,
            invoice_date,
            due_date: None,
            notes: None,
            tax_rate: 0.0,
            status: InvoiceStatus::Draft,
            items: Vec::new(),
            subtotal: 0.0,
            tax_amount: 0.0,
            total: 0.0,
        }
    }

    /// Replace the whole item set and recompute totals.
    ///
    /// On error the invoice is left untouched.
    pub fn set_items(&mut self, items: Vec<InvoiceItem>) -> Result<(), ValidationError> {
        let computed = compute_for(&items, self.tax_rate)?;
        self.items = items;
        self.apply(computed);
        Ok(())
    }

    /// On error the invoice is left untouched.
    pub fn set_tax_rate(&mut self, tax_rate: f64) -> Result<(), ValidationError> {
        let computed = compute_for(&self.items, tax_rate)?;
        self.tax_rate = tax_rate;
        self.apply(computed);
        Ok(())
    }

    /// Recompute every derived field from quantities, prices and the tax rate.
    ///
    /// On error the invoice is left untouched.
    pub fn recalculate(&mut self) -> Result<(), ValidationError> {
        let computed = compute_for(&self.items, self.tax_rate)?;
        self.apply(computed);
        Ok(())
    }

    fn apply(&mut self, computed: Totals) {
        for (item, line_total) in self.items.iter_mut().zip(&computed.line_totals) {
            item.total = *line_total;
        }
        self.subtotal = computed.subtotal;
        self.tax_amount = computed.tax_amount;
        self.total = computed.total;
    }
}

fn compute_for(items: &[InvoiceItem], tax_rate: f64) -> Result<Totals, ValidationError> {
    let lines: Vec<LineAmount> = items.iter().map(InvoiceItem::amount).collect();
    totals::compute_totals(&lines, tax_rate)
}

/// Account owner and company branding.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub email: String,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub company_name: Option<String>,
    /// Relative path of the uploaded logo, e.g. `uploads/logos/user_3_logo.png`.
    #[serde(default)]
    pub company_logo: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
}

/// `Some(trimmed)` when the field holds something other than whitespace.
pub(crate) fn non_blank(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|s| !s.is_empty())
}
