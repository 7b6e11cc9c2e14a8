//! Currency formatting for display.

/// `"$1,234.50"` style formatting: thousands separators, two decimals.
///
/// Negative values keep the sign in front of the symbol (`-$3.00`).
/// Non-finite values are printed raw after the symbol.
pub fn format_money(value: f64, symbol: &str) -> String {
    if !value.is_finite() {
        return format!("{symbol}{value}");
    }

    let fixed = format!("{:.2}", value.abs());
    let (int_part, frac_part) = fixed.split_once('.').unwrap_or((fixed.as_str(), "00"));
    let sign = if value < 0.0 && fixed.bytes().any(|b| b.is_ascii_digit() && b != b'0') {
        "-"
    } else {
        ""
    };

    format!("{sign}{symbol}{}.{frac_part}", group_thousands(int_part))
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_small_amounts() {
        assert_eq!(format_money(0.0, "$"), "$0.00");
        assert_eq!(format_money(9.99, "$"), "$9.99");
        assert_eq!(format_money(1.998, "$"), "$2.00");
    }

    #[test]
    fn groups_thousands() {
        assert_eq!(format_money(1234.5, "$"), "$1,234.50");
        assert_eq!(format_money(1_000_000.0, "€"), "€1,000,000.00");
        assert_eq!(format_money(999.999, "$"), "$1,000.00");
        assert_eq!(format_money(100.0, "$"), "$100.00");
    }

    #[test]
    fn negative_values() {
        assert_eq!(format_money(-3.0, "$"), "-$3.00");
        assert_eq!(format_money(-0.001, "$"), "$0.00");
    }

    #[test]
    fn non_finite_falls_back_to_raw() {
        assert_eq!(format_money(f64::NAN, "$"), "$NaN");
        assert_eq!(format_money(f64::INFINITY, "$"), "$inf");
    }
}
