//! # invoice-forge – invoice totals and deterministic invoice PDFs
//!
//! This crate holds the invoicing core: line-item and tax arithmetic,
//! validated invoice input, a unit-of-work invoice store, and a pipeline that
//! renders an invoice into a reproducible PDF. The pipeline stages are:
//!
//! 1. **Totals** – line totals, subtotal, tax and total ([`totals`])
//! 2. **Build** – invoice + user + options → render-ready document ([`document`])
//! 3. **Layout** – flow the sections onto fixed-size pages ([`layout`])
//! 4. **Render** – emit PDF bytes with no timestamps or random IDs ([`render`])
//!
//! A C-compatible FFI surface is exposed via the [`ffi`] module.

pub mod document;
pub mod error;
pub mod ffi;
pub mod fonts;
pub mod input;
pub mod layout;
pub mod layout_config;
pub mod model;
pub mod money;
pub mod options;
pub mod pipeline;
pub mod render;
pub mod store;
pub mod style;
pub mod totals;

// Re-exports for convenience
pub use error::{AssetError, RenderError, StoreError, ValidationError};
pub use model::{Invoice, InvoiceItem, InvoiceStatus, User};
pub use options::RenderOptions;
pub use pipeline::{invoice_attachment, render_invoice_pdf, PdfAttachment};
pub use totals::{compute_totals, Totals};
