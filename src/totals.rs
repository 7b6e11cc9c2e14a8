//! Pure invoice arithmetic.
//!
//! Nothing here rounds: amounts are kept at full `f64` precision and only the
//! presentation layer ([`crate::money::format_money`]) rounds to two decimals.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Quantity and price of one line, as fed to [`compute_totals`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineAmount {
    pub quantity: u32,
    pub unit_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Totals {
    /// One entry per input line, same order.
    pub line_totals: Vec<f64>,
    pub subtotal: f64,
    pub tax_amount: f64,
    pub total: f64,
}

/// `quantity * unit_price`.
pub fn line_total(quantity: u32, unit_price: f64) -> Result<f64, ValidationError> {
    check_amount("unit_price", unit_price)?;
    Ok(f64::from(quantity) * unit_price)
}

/// Subtotal, tax and grand total for a set of lines.
///
/// `tax_rate` is a percentage (`10.0` means 10 %).
pub fn compute_totals(lines: &[LineAmount], tax_rate: f64) -> Result<Totals, ValidationError> {
    check_amount("tax_rate", tax_rate)?;

    let line_totals = lines
        .iter()
        .map(|line| line_total(line.quantity, line.unit_price))
        .collect::<Result<Vec<_>, _>>()?;

    let subtotal: f64 = line_totals.iter().sum();
    let tax_amount = subtotal * tax_rate / 100.0;

    Ok(Totals {
        line_totals,
        subtotal,
        tax_amount,
        total: subtotal + tax_amount,
    })
}

fn check_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonNumeric {
            field,
            value: value.to_string(),
        });
    }
    if value < 0.0 {
        return Err(ValidationError::Negative { field, value });
    }
    Ok(())
}
