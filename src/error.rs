//! Error taxonomy for the invoice core.
//!
//! - [`ValidationError`] rejects a write before anything is persisted.
//! - [`AssetError`] describes a logo/font/colour problem. Callers degrade to a
//!   fallback and log it; it never escapes a render.
//! - [`RenderError`] is the only fatal rendering failure.
//! - [`StoreError`] wraps validation failures and missing records inside a
//!   unit of work.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Bad input to the totals calculation or invoice creation.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("{field} must be a number, got {value:?}")]
    NonNumeric { field: &'static str, value: String },

    #[error("{field} must not be negative, got {value}")]
    Negative { field: &'static str, value: f64 },

    #[error("quantity must be a whole number, got {0}")]
    FractionalQuantity(f64),

    #[error("Client name is required")]
    MissingClientName,

    #[error("At least one item is required")]
    NoItems,

    #[error("Invalid date format for {field}: {value:?} (expected YYYY-MM-DD)")]
    InvalidDate { field: &'static str, value: String },

    #[error("Unknown invoice status {0:?} (expected draft, sent or paid)")]
    UnknownStatus(String),

    #[error("Malformed request body: {0}")]
    MalformedBody(String),
}

/// A logo, font or theme asset could not be used.
#[derive(Debug, Error)]
pub enum AssetError {
    #[error("cannot read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("cannot decode image {}: {source}", path.display())]
    Image {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    #[error("cannot parse font {}: {reason}", path.display())]
    Font { path: PathBuf, reason: String },

    #[error("invalid theme colour {0:?}")]
    Color(String),
}

/// The laid-out document could not be turned into PDF bytes.
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("cannot embed font {family}: {reason}")]
    Font { family: String, reason: String },

    #[error("PDF output failed: {0}")]
    Io(#[from] io::Error),
}

/// Failure inside a persistence unit of work.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error("Invoice not found")]
    InvoiceNotFound(u64),

    #[error("User not found")]
    UserNotFound(u64),
}
