//! invoice-forge – command-line invoice → PDF renderer.
//!
//! Usage:
//!   invoice-forge <bundle.json> [output.pdf] [--theme HEX] [--currency SYM]
//!                 [--font PATH] [--logo PATH] [--layout-json PATH]
//!
//! The bundle holds `{ "invoice": ..., "user": ..., "options"?: ... }`. If
//! `output.pdf` is omitted the PDF is written next to the bundle as
//! `<invoice_number>.pdf`. Flags override the bundle options, which override
//! the `INVOICE_*` environment variables.

use std::{env, fs, path::Path, path::PathBuf, process};

use invoice_forge::options::RenderOptions;
use invoice_forge::pipeline::{generate_pdf, InvoiceBundle};

fn main() {
    env_logger::init();

    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<PathBuf> = None;
    let mut output_path: Option<PathBuf> = None;
    let mut layout_json: Option<PathBuf> = None;
    let mut theme: Option<String> = None;
    let mut currency: Option<String> = None;
    let mut font: Option<PathBuf> = None;
    let mut logo: Option<PathBuf> = None;
    let mut positional = 0usize;

    let mut iter = args.iter().skip(1);
    while let Some(arg) = iter.next() {
        let mut value = |flag: &str| match iter.next() {
            Some(v) => v.clone(),
            None => {
                eprintln!("Missing value for {flag}");
                print_usage(&args[0]);
                process::exit(1);
            }
        };
        match arg.as_str() {
            "--theme" => theme = Some(value(arg)),
            "--currency" => currency = Some(value(arg)),
            "--font" => font = Some(PathBuf::from(value(arg))),
            "--logo" => logo = Some(PathBuf::from(value(arg))),
            "--layout-json" => layout_json = Some(PathBuf::from(value(arg))),
            "--help" | "-h" => {
                print_usage(&args[0]);
                process::exit(0);
            }
            other if other.starts_with('-') => {
                eprintln!("Unknown flag: {other}");
                print_usage(&args[0]);
                process::exit(1);
            }
            path => {
                if positional == 0 {
                    input_path = Some(PathBuf::from(path));
                } else if positional == 1 {
                    output_path = Some(PathBuf::from(path));
                } else {
                    eprintln!("Unexpected argument: {path}");
                    print_usage(&args[0]);
                    process::exit(1);
                }
                positional += 1;
            }
        }
    }

    let input = match input_path {
        Some(p) => p,
        None => {
            eprintln!("Error: no bundle file specified.");
            print_usage(&args[0]);
            process::exit(1);
        }
    };

    let json = match fs::read_to_string(&input) {
        Ok(s) => s,
        Err(e) => {
            eprintln!("Error reading '{}': {e}", input.display());
            process::exit(1);
        }
    };

    let bundle = match InvoiceBundle::from_json(&json) {
        Ok(b) => b,
        Err(e) => {
            eprintln!("Invalid bundle '{}': {e}", input.display());
            process::exit(1);
        }
    };

    let mut options = bundle.options_or(RenderOptions::from_env());
    if let Some(theme) = theme {
        options.theme_color = theme;
    }
    if let Some(currency) = currency {
        options.currency_symbol = currency;
    }
    if font.is_some() {
        options.font_override_path = font;
    }
    if logo.is_some() {
        options.logo_path = logo;
    }

    // Default output: same directory as the bundle, named after the invoice.
    let output = output_path.unwrap_or_else(|| {
        input
            .parent()
            .unwrap_or_else(|| Path::new(""))
            .join(format!("{}.pdf", bundle.invoice.invoice_number))
    });

    match generate_pdf(&bundle.invoice, &bundle.user, &options) {
        Ok((bytes, layout)) => {
            write_or_exit(&output, &bytes);
            if let Some(path) = layout_json {
                write_or_exit(&path, layout.to_json().as_bytes());
            }
            let pages = layout.pages.len();
            eprintln!(
                "Wrote '{}' ({} bytes, {} page{})",
                output.display(),
                bytes.len(),
                pages,
                if pages == 1 { "" } else { "s" }
            );
        }
        Err(e) => {
            eprintln!("Error generating PDF: {e}");
            process::exit(1);
        }
    }
}

/// Write `bytes`, creating the parent directory if necessary.
fn write_or_exit(path: &Path, bytes: &[u8]) {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            if let Err(e) = fs::create_dir_all(parent) {
                eprintln!("Error creating output directory: {e}");
                process::exit(1);
            }
        }
    }
    if let Err(e) = fs::write(path, bytes) {
        eprintln!("Error writing '{}': {e}", path.display());
        process::exit(1);
    }
}

fn print_usage(prog: &str) {
    eprintln!("invoice-forge – invoice to PDF renderer");
    eprintln!();
    eprintln!("Usage:");
    eprintln!("  {prog} <bundle.json> [output.pdf] [flags]");
    eprintln!();
    eprintln!("Arguments:");
    eprintln!("  <bundle.json>  {{ \"invoice\": ..., \"user\": ..., \"options\": ... }}");
    eprintln!("  [output.pdf]   Output path  (default: <invoice_number>.pdf next to the bundle)");
    eprintln!();
    eprintln!("Flags:");
    eprintln!("  --theme HEX         Accent colour, e.g. #0ea5a4");
    eprintln!("  --currency SYM      Currency symbol (default: $)");
    eprintln!("  --font PATH         TrueType font used instead of Helvetica");
    eprintln!("  --logo PATH         Company logo (PNG or JPEG)");
    eprintln!("  --layout-json PATH  Also write the computed layout as JSON");
    eprintln!("  --help              Print this message");
    eprintln!();
    eprintln!("Environment: INVOICE_THEME_COLOR, INVOICE_CURRENCY_SYMBOL, INVOICE_FONT_PATH, RUST_LOG");
}
