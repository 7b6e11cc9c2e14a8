//! Request input resolved once at the boundary into typed drafts.
//!
//! Web clients send numbers either as JSON numbers or as strings (form posts
//! always do). [`NumericInput`] accepts both and is converted exactly once,
//! so nothing past this module sees untyped values.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::ValidationError;
use crate::model::{Invoice, InvoiceItem};

/// A number as the client sent it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum NumericInput {
    Int(i64),
    Float(f64),
    Text(String),
}

impl NumericInput {
    pub fn to_f64(&self, field: &'static str) -> Result<f64, ValidationError> {
        let value = match self {
            NumericInput::Int(v) => *v as f64,
            NumericInput::Float(v) => *v,
            NumericInput::Text(s) => s.trim().parse::<f64>().map_err(|_| non_numeric(field, s))?,
        };
        if !value.is_finite() {
            return Err(non_numeric(field, &value.to_string()));
        }
        if value < 0.0 {
            return Err(ValidationError::Negative { field, value });
        }
        Ok(value)
    }

    /// A non-negative whole number that fits in `u32`.
    pub fn to_quantity(&self) -> Result<u32, ValidationError> {
        const FIELD: &str = "quantity";
        if let NumericInput::Int(v) = self {
            return u32::try_from(*v).map_err(|_| {
                if *v < 0 {
                    ValidationError::Negative {
                        field: FIELD,
                        value: *v as f64,
                    }
                } else {
                    non_numeric(FIELD, &v.to_string())
                }
            });
        }

        let value = self.to_f64(FIELD)?;
        if value.fract() != 0.0 {
            return Err(ValidationError::FractionalQuantity(value));
        }
        if value > f64::from(u32::MAX) {
            return Err(non_numeric(FIELD, &value.to_string()));
        }
        Ok(value as u32)
    }
}

impl From<f64> for NumericInput {
    fn from(value: f64) -> Self {
        NumericInput::Float(value)
    }
}

impl From<i64> for NumericInput {
    fn from(value: i64) -> Self {
        NumericInput::Int(value)
    }
}

fn non_numeric(field: &'static str, value: &str) -> ValidationError {
    ValidationError::NonNumeric {
        field,
        value: value.to_string(),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemDraft {
    #[serde(default)]
    pub description: String,
    pub quantity: NumericInput,
    pub unit_price: NumericInput,
}

impl ItemDraft {
    pub fn new(description: impl Into<String>, quantity: u32, unit_price: f64) -> Self {
        Self {
            description: description.into(),
            quantity: NumericInput::Int(i64::from(quantity)),
            unit_price: NumericInput::Float(unit_price),
        }
    }

    pub fn into_item(self) -> Result<InvoiceItem, ValidationError> {
        let quantity = self.quantity.to_quantity()?;
        let unit_price = self.unit_price.to_f64("unit_price")?;
        InvoiceItem::new(self.description, quantity, unit_price)
    }
}

/// Payload for creating an invoice.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoiceDraft {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<NumericInput>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Vec<ItemDraft>,
}

impl InvoiceDraft {
    /// Validate and build a fully computed invoice.
    ///
    /// `today` is used when no invoice date was given.
    pub fn into_invoice(self, number: String, today: NaiveDate) -> Result<Invoice, ValidationError> {
        let client_name = self
            .client_name
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or(ValidationError::MissingClientName)?
            .to_string();
        if self.items.is_empty() {
            return Err(ValidationError::NoItems);
        }

        let invoice_date = parse_date("invoice_date", self.invoice_date.as_deref())?.unwrap_or(today);
        let due_date = parse_date("due_date", self.due_date.as_deref())?;

        let mut invoice = Invoice::new(number, client_name, invoice_date);
        invoice.client_email = self.client_email;
        invoice.client_address = self.client_address;
        invoice.due_date = due_date;
        invoice.notes = self.notes;
        invoice.tax_rate = match &self.tax_rate {
            Some(rate) => rate.to_f64("tax_rate")?,
            None => 0.0,
        };
        if let Some(status) = self.status.as_deref().filter(|s| !s.trim().is_empty()) {
            invoice.status = status.parse()?;
        }

        let items = self
            .items
            .into_iter()
            .map(ItemDraft::into_item)
            .collect::<Result<Vec<_>, _>>()?;
        invoice.set_items(items)?;
        Ok(invoice)
    }
}

/// Partial update. Absent fields keep their current value; `items`, when
/// present, replaces the whole item set.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct InvoicePatch {
    #[serde(default)]
    pub client_name: Option<String>,
    #[serde(default)]
    pub client_email: Option<String>,
    #[serde(default)]
    pub client_address: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub tax_rate: Option<NumericInput>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub items: Option<Vec<ItemDraft>>,
}

impl InvoicePatch {
    /// Apply onto `invoice`, recomputing totals. The invoice is only modified
    /// when every field validates.
    pub fn apply(self, invoice: &mut Invoice) -> Result<(), ValidationError> {
        let mut next = invoice.clone();

        if let Some(name) = self.client_name {
            if name.trim().is_empty() {
                return Err(ValidationError::MissingClientName);
            }
            next.client_name = name.trim().to_string();
        }
        if let Some(email) = self.client_email {
            next.client_email = Some(email);
        }
        if let Some(address) = self.client_address {
            next.client_address = Some(address);
        }
        if let Some(notes) = self.notes {
            next.notes = Some(notes);
        }
        if let Some(rate) = &self.tax_rate {
            next.tax_rate = rate.to_f64("tax_rate")?;
        }
        if let Some(status) = self.status.as_deref() {
            next.status = status.parse()?;
        }
        if let Some(date) = parse_date("invoice_date", self.invoice_date.as_deref())? {
            next.invoice_date = date;
        }
        if let Some(date) = parse_date("due_date", self.due_date.as_deref())? {
            next.due_date = Some(date);
        }
        if let Some(items) = self.items {
            next.items = items
                .into_iter()
                .map(ItemDraft::into_item)
                .collect::<Result<Vec<_>, _>>()?;
        }

        next.recalculate()?;
        *invoice = next;
        Ok(())
    }
}

/// Parse `YYYY-MM-DD`, ignoring a trailing `T…` time part.
///
/// Missing or blank input yields `Ok(None)`.
pub fn parse_date(field: &'static str, raw: Option<&str>) -> Result<Option<NaiveDate>, ValidationError> {
    let Some(raw) = raw.map(str::trim).filter(|s| !s.is_empty()) else {
        return Ok(None);
    };
    let day = raw.split('T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map(Some)
        .map_err(|_| ValidationError::InvalidDate {
            field,
            value: raw.to_string(),
        })
}

/// A request body in one of the encodings the web layer accepts.
#[derive(Debug, Clone)]
pub enum RequestBody<'a> {
    Json(&'a [u8]),
    /// URL-decoded form pairs. Item fields use `items[N][field]` keys.
    Form(Vec<(String, String)>),
}

impl RequestBody<'_> {
    pub fn into_draft(self) -> Result<InvoiceDraft, ValidationError> {
        self.decode()
    }

    pub fn into_patch(self) -> Result<InvoicePatch, ValidationError> {
        self.decode()
    }

    fn decode<T: DeserializeOwned>(self) -> Result<T, ValidationError> {
        let value = match self {
            RequestBody::Json(bytes) => serde_json::from_slice::<Value>(bytes)
                .map_err(|e| ValidationError::MalformedBody(e.to_string()))?,
            RequestBody::Form(pairs) => form_to_value(pairs)?,
        };
        serde_json::from_value(value).map_err(|e| ValidationError::MalformedBody(e.to_string()))
    }
}

fn form_to_value(pairs: Vec<(String, String)>) -> Result<Value, ValidationError> {
    let mut fields = Map::new();
    let mut items: BTreeMap<usize, Map<String, Value>> = BTreeMap::new();

    for (key, value) in pairs {
        match key.strip_prefix("items[") {
            Some(rest) => {
                let (index, field) = parse_item_key(rest)
                    .ok_or_else(|| ValidationError::MalformedBody(format!("bad form key {key:?}")))?;
                items.entry(index).or_default().insert(field.to_string(), Value::String(value));
            }
            None => {
                fields.insert(key, Value::String(value));
            }
        }
    }

    if !items.is_empty() {
        let list = items.into_values().map(Value::Object).collect();
        fields.insert("items".to_string(), Value::Array(list));
    }
    Ok(Value::Object(fields))
}

/// `"0][description]"` → `(0, "description")`.
fn parse_item_key(rest: &str) -> Option<(usize, &str)> {
    let (index, tail) = rest.split_once(']')?;
    let field = tail.strip_prefix('[')?.strip_suffix(']')?;
    if field.is_empty() {
        return None;
    }
    Some((index.parse().ok()?, field))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::InvoiceStatus;

    fn today() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 5, 20).unwrap()
    }

    fn widget_draft() -> InvoiceDraft {
        InvoiceDraft {
            client_name: Some("Acme Corp".into()),
            tax_rate: Some(NumericInput::Float(10.0)),
            items: vec![ItemDraft::new("Widget", 2, 9.99)],
            ..Default::default()
        }
    }

    #[test]
    fn numeric_strings_are_accepted() {
        assert_eq!(NumericInput::Text(" 12.5 ".into()).to_f64("unit_price").unwrap(), 12.5);
        assert_eq!(NumericInput::Text("3".into()).to_quantity().unwrap(), 3);
        assert_eq!(NumericInput::Float(4.0).to_quantity().unwrap(), 4);
    }

    #[test]
    fn bad_numbers_are_rejected() {
        assert!(matches!(
            NumericInput::Text("abc".into()).to_f64("unit_price"),
            Err(ValidationError::NonNumeric { field: "unit_price", .. })
        ));
        assert!(matches!(
            NumericInput::Int(-2).to_quantity(),
            Err(ValidationError::Negative { field: "quantity", .. })
        ));
        assert!(matches!(
            NumericInput::Float(1.5).to_quantity(),
            Err(ValidationError::FractionalQuantity(_))
        ));
        assert!(NumericInput::Text("NaN".into()).to_f64("unit_price").is_err());
    }

    #[test]
    fn draft_defaults_date_and_status() {
        let invoice = widget_draft().into_invoice("INV-00001".into(), today()).unwrap();
        assert_eq!(invoice.invoice_date, today());
        assert_eq!(invoice.status, InvoiceStatus::Draft);
        assert!((invoice.total - 21.978).abs() < 1e-9);
    }

    #[test]
    fn draft_requires_client_and_items() {
        let mut draft = widget_draft();
        draft.client_name = Some("   ".into());
        assert_eq!(
            draft.into_invoice("INV-1".into(), today()).unwrap_err(),
            ValidationError::MissingClientName
        );

        let mut draft = widget_draft();
        draft.items.clear();
        assert_eq!(
            draft.into_invoice("INV-1".into(), today()).unwrap_err(),
            ValidationError::NoItems
        );
    }

    #[test]
    fn dates_accept_time_suffix() {
        let date = parse_date("due_date", Some("2024-06-30T00:00:00.000Z")).unwrap();
        assert_eq!(date, NaiveDate::from_ymd_opt(2024, 6, 30));
        assert_eq!(parse_date("due_date", Some("")).unwrap(), None);
        assert!(parse_date("due_date", Some("30/06/2024")).is_err());
    }

    #[test]
    fn patch_replaces_items_and_recomputes() {
        let mut invoice = widget_draft().into_invoice("INV-00001".into(), today()).unwrap();
        InvoicePatch {
            items: Some(vec![ItemDraft::new("Gadget", 1, 50.0)]),
            status: Some("sent".into()),
            ..Default::default()
        }
        .apply(&mut invoice)
        .unwrap();

        assert_eq!(invoice.items.len(), 1);
        assert_eq!(invoice.subtotal, 50.0);
        assert!((invoice.total - 55.0).abs() < 1e-9);
        assert_eq!(invoice.status, InvoiceStatus::Sent);
    }

    #[test]
    fn failed_patch_changes_nothing() {
        let mut invoice = widget_draft().into_invoice("INV-00001".into(), today()).unwrap();
        let before = invoice.clone();
        let err = InvoicePatch {
            client_name: Some("New name".into()),
            due_date: Some("tomorrow".into()),
            ..Default::default()
        }
        .apply(&mut invoice);
        assert!(err.is_err());
        assert_eq!(invoice, before);
    }

    #[test]
    fn json_body_with_string_numbers() {
        let body = br#"{
            "client_name": "Acme",
            "tax_rate": "5",
            "items": [{"description": "Hours", "quantity": "10", "unit_price": "80"}]
        }"#;
        let draft = RequestBody::Json(body).into_draft().unwrap();
        let invoice = draft.into_invoice("INV-00007".into(), today()).unwrap();
        assert_eq!(invoice.subtotal, 800.0);
        assert_eq!(invoice.tax_amount, 40.0);
    }

    #[test]
    fn form_body_collects_indexed_items() {
        let pairs = vec![
            ("client_name".to_string(), "Acme".to_string()),
            ("items[1][description]".to_string(), "Second".to_string()),
            ("items[1][quantity]".to_string(), "1".to_string()),
            ("items[1][unit_price]".to_string(), "2".to_string()),
            ("items[0][description]".to_string(), "First".to_string()),
            ("items[0][quantity]".to_string(), "3".to_string()),
            ("items[0][unit_price]".to_string(), "1.5".to_string()),
        ];
        let draft = RequestBody::Form(pairs).into_draft().unwrap();
        assert_eq!(draft.items.len(), 2);
        assert_eq!(draft.items[0].description, "First");
        assert_eq!(draft.items[1].description, "Second");
    }

    #[test]
    fn malformed_bodies_are_validation_errors() {
        assert!(matches!(
            RequestBody::Json(b"{not json").into_draft(),
            Err(ValidationError::MalformedBody(_))
        ));
        let pairs = vec![("items[x][quantity]".to_string(), "1".to_string())];
        assert!(matches!(
            RequestBody::Form(pairs).into_draft(),
            Err(ValidationError::MalformedBody(_))
        ));
    }
}
