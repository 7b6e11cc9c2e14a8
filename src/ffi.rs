//! C-compatible FFI API for cross-language bindings.
//!
//! # ABI Contract
//!
//! All exported functions use `extern "C"` calling convention and `#[no_mangle]`
//! to ensure stable symbol names.
//!
//! ## Input
//! Render and layout calls take a UTF-8 JSON bundle (not necessarily
//! null-terminated):
//!
//! ```json
//! { "invoice": { ... }, "user": { ... }, "options": { ... } }
//! ```
//!
//! `options` is optional; when omitted the `INVOICE_*` environment variables
//! and built-in defaults apply. Invoice totals are always recomputed from the
//! items before rendering.
//!
//! ## Memory management
//! - Buffers returned by `invoice_*` functions are allocated on the Rust heap.
//! - Callers **must** free them with `invoice_free_buffer` / `invoice_free_string`.
//! - Passing a null pointer to a free function is a no-op.
//!
//! ## Error handling
//! - Functions that can fail return a `c_int` (0 = success, non-zero = error):
//!   1 null pointer, 2 invalid UTF-8, 3 invalid input, 4 render failure.
//! - Error details can be retrieved via `invoice_last_error`.
//!
//! ## Thread safety
//! - The `invoice_last_error` uses a thread-local, so it is safe to call from
//!   multiple threads.
//!
//! ## Usage from Go (cgo)
//! ```go
//! // #cgo LDFLAGS: -linvoice_forge
//! // #include <stdint.h>
//! // extern int invoice_render_pdf(const uint8_t* json, uint32_t json_len,
//! //                               uint8_t** out_buf, uint32_t* out_len);
//! // extern void invoice_free_buffer(uint8_t* buf, uint32_t len);
//! // extern const char* invoice_last_error();
//! import "C"
//! ```

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::{c_char, c_int};
use std::ptr;
use std::slice;

use crate::fonts::FontManager;
use crate::layout_config::LayoutConfig;
use crate::options::RenderOptions;
use crate::pipeline::{compute_layout_config, generate_pdf, InvoiceBundle};
use crate::render::render_pdf;

const ERR_NULL: c_int = 1;
const ERR_UTF8: c_int = 2;
const ERR_INPUT: c_int = 3;
const ERR_RENDER: c_int = 4;

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = RefCell::new(None);
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
}

/// Borrow `len` bytes at `ptr` as UTF-8.
///
/// # Safety
/// `ptr` must point to `len` valid bytes that outlive the returned slice.
unsafe fn utf8_input<'a>(ptr: *const u8, len: u32) -> Result<&'a str, c_int> {
    let bytes = slice::from_raw_parts(ptr, len as usize);
    std::str::from_utf8(bytes).map_err(|e| {
        set_last_error(&format!("Invalid UTF-8: {e}"));
        ERR_UTF8
    })
}

fn parse_bundle(json: &str) -> Result<(InvoiceBundle, RenderOptions), c_int> {
    let bundle = InvoiceBundle::from_json(json).map_err(|e| {
        set_last_error(&e.to_string());
        ERR_INPUT
    })?;
    let options = bundle.options_or(RenderOptions::from_env());
    Ok((bundle, options))
}

/// Hand `bytes` to the caller as a heap buffer; fails when the length does
/// not fit in `u32`.
///
/// # Safety
/// `out_buf` and `out_len` must be valid pointers.
unsafe fn export_buffer(bytes: Vec<u8>, out_buf: *mut *mut u8, out_len: *mut u32) -> c_int {
    let len = match buffer_len(bytes.len()) {
        Ok(len) => len,
        Err(rc) => return rc,
    };
    let buf = bytes.into_boxed_slice();
    *out_buf = Box::into_raw(buf) as *mut u8;
    *out_len = len;
    clear_last_error();
    0
}

/// Buffer lengths cross the ABI as `u32`.
fn buffer_len(len: usize) -> Result<u32, c_int> {
    u32::try_from(len).map_err(|_| {
        set_last_error(&format!("PDF of {len} bytes exceeds the 4 GiB buffer limit"));
        ERR_RENDER
    })
}

// ---------------------------------------------------------------------------
// Core API
// ---------------------------------------------------------------------------

/// Render an invoice bundle to PDF.
///
/// # Parameters
/// - `json_ptr`: pointer to UTF-8 bundle JSON bytes
/// - `json_len`: length of the JSON data in bytes
/// - `out_buf`: on success, receives a pointer to heap-allocated PDF bytes
/// - `out_len`: on success, receives the length of the PDF buffer
///
/// # Returns
/// `0` on success, non-zero on error. On error, call `invoice_last_error`.
///
/// # Safety
/// - `json_ptr` must point to `json_len` valid bytes.
/// - `out_buf` and `out_len` must be valid pointers.
/// - The caller must free `*out_buf` by calling `invoice_free_buffer`.
#[no_mangle]
pub unsafe extern "C" fn invoice_render_pdf(
    json_ptr: *const u8,
    json_len: u32,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }

    let json = match utf8_input(json_ptr, json_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let (bundle, options) = match parse_bundle(json) {
        Ok(parsed) => parsed,
        Err(rc) => return rc,
    };

    match generate_pdf(&bundle.invoice, &bundle.user, &options) {
        Ok((pdf_bytes, _layout)) => export_buffer(pdf_bytes, out_buf, out_len),
        Err(e) => {
            set_last_error(&e.to_string());
            ERR_RENDER
        }
    }
}

/// Compute only the layout config for an invoice bundle. Returns JSON.
///
/// # Parameters
/// - `json_ptr`, `json_len`: the bundle JSON
/// - `out_json_ptr`: receives a pointer to a null-terminated layout JSON string
///
/// # Returns
/// `0` on success.
///
/// # Safety
/// Same as `invoice_render_pdf`. `*out_json_ptr` must be freed with
/// `invoice_free_string`.
#[no_mangle]
pub unsafe extern "C" fn invoice_compute_layout(
    json_ptr: *const u8,
    json_len: u32,
    out_json_ptr: *mut *mut c_char,
) -> c_int {
    if json_ptr.is_null() || out_json_ptr.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }

    let json = match utf8_input(json_ptr, json_len) {
        Ok(s) => s,
        Err(rc) => return rc,
    };
    let (bundle, options) = match parse_bundle(json) {
        Ok(parsed) => parsed,
        Err(rc) => return rc,
    };

    let layout = compute_layout_config(&bundle.invoice, &bundle.user, &options);
    match CString::new(layout.to_json()) {
        Ok(cs) => {
            *out_json_ptr = cs.into_raw();
            clear_last_error();
            0
        }
        Err(_) => {
            set_last_error("JSON contained null byte");
            ERR_INPUT
        }
    }
}

/// Render a PDF from a layout config JSON string.
///
/// This allows pre-computing the layout and rendering separately. Text is set
/// in the built-in Helvetica faces.
///
/// # Safety
/// `json_ptr` must be a valid null-terminated string; `out_buf` and `out_len`
/// must be valid pointers.
#[no_mangle]
pub unsafe extern "C" fn invoice_render_from_layout(
    json_ptr: *const c_char,
    out_buf: *mut *mut u8,
    out_len: *mut u32,
) -> c_int {
    if json_ptr.is_null() || out_buf.is_null() || out_len.is_null() {
        set_last_error("Null pointer argument");
        return ERR_NULL;
    }

    let json = match CStr::from_ptr(json_ptr).to_str() {
        Ok(s) => s,
        Err(e) => {
            set_last_error(&format!("Invalid UTF-8 in JSON: {e}"));
            return ERR_UTF8;
        }
    };

    let layout_config = match LayoutConfig::from_json(json) {
        Ok(c) => c,
        Err(e) => {
            set_last_error(&format!("Invalid layout JSON: {e}"));
            return ERR_INPUT;
        }
    };

    match render_pdf(&layout_config, &FontManager::new()) {
        Ok(pdf_bytes) => export_buffer(pdf_bytes, out_buf, out_len),
        Err(e) => {
            set_last_error(&e.to_string());
            ERR_RENDER
        }
    }
}

// ---------------------------------------------------------------------------
// Memory management
// ---------------------------------------------------------------------------

/// Free a PDF buffer returned by `invoice_render_pdf`.
///
/// # Safety
/// `buf` must have been returned by a previous `invoice_render_pdf` (or
/// similar) call, and `len` must be the corresponding length.
#[no_mangle]
pub unsafe extern "C" fn invoice_free_buffer(buf: *mut u8, len: u32) {
    if !buf.is_null() {
        let _ = Box::from_raw(slice::from_raw_parts_mut(buf, len as usize));
    }
}

/// Free a layout JSON string returned by `invoice_compute_layout`.
///
/// # Safety
/// `s` must have been returned by Rust's `CString::into_raw`.
#[no_mangle]
pub unsafe extern "C" fn invoice_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = CString::from_raw(s);
    }
}

/// Retrieve the last error message. Returns a null-terminated string.
///
/// The returned pointer is valid until the next `invoice_*` call on the same
/// thread. The caller should **not** free this pointer – it is managed
/// internally.
///
/// Returns null if the last call succeeded.
#[no_mangle]
pub extern "C" fn invoice_last_error() -> *const c_char {
    LAST_ERROR.with(|e| {
        let borrow = e.borrow();
        match borrow.as_ref() {
            Some(cs) => cs.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Return the library version as a null-terminated string.
/// The caller must **not** free this pointer.
#[no_mangle]
pub extern "C" fn invoice_version() -> *const c_char {
    concat!(env!("CARGO_PKG_VERSION"), "\0").as_ptr() as *const c_char
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
