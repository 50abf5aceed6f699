//! Utility functions for formatting and common operations
//!
//! Centralized number formatting so tables, charts and status lines agree on
//! how won amounts, volumes and percentages look.

use rust_decimal::Decimal;

/// Currency suffix options for formatting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CurrencySymbol {
    /// Append "원" (Korean won)
    Krw,
    /// No currency symbol (for table cells)
    None,
}

/// Core formatting function with full control over output.
///
/// Groups thousands with `,`. Whole numbers print without decimals, anything
/// else keeps two decimal places.
///
/// # Examples
/// ```
/// use krxdash::utils::{format_amount_with_width, CurrencySymbol};
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_amount_with_width(dec!(79600), 0, CurrencySymbol::Krw), "79,600원");
/// assert_eq!(format_amount_with_width(dec!(1234.5), 10, CurrencySymbol::None), "  1,234.50");
/// ```
pub fn format_amount_with_width(value: Decimal, width: usize, symbol: CurrencySymbol) -> String {
    let is_negative = value < Decimal::ZERO;
    let abs_value = value.abs();

    let formatted = if abs_value.fract().is_zero() {
        format!("{:.0}", abs_value)
    } else {
        format!("{:.2}", abs_value)
    };
    let (integer_part, decimal_part) = match formatted.split_once('.') {
        Some((int, dec)) => (int, Some(dec)),
        None => (formatted.as_str(), None),
    };

    let sign = if is_negative { "-" } else { "" };
    let suffix = match symbol {
        CurrencySymbol::Krw => "원",
        CurrencySymbol::None => "",
    };

    let mut result = format!("{}{}", sign, group_thousands(integer_part));
    if let Some(dec) = decimal_part {
        result.push('.');
        result.push_str(dec);
    }
    result.push_str(suffix);

    // Right-align; the suffix is double width on a terminal but counted once here
    if width > 0 && result.chars().count() < width {
        format!("{:>width$}", result, width = width)
    } else {
        result
    }
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}

// ============ Convenience functions ============

/// Format as won with suffix: "79,600원"
///
/// # Examples
/// ```
/// use krxdash::utils::format_krw;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_krw(dec!(1234567)), "1,234,567원");
/// ```
pub fn format_krw(value: Decimal) -> String {
    format_amount_with_width(value, 0, CurrencySymbol::Krw)
}

/// Format number only (no symbol): "79,600"
pub fn format_number(value: Decimal) -> String {
    format_amount_with_width(value, 0, CurrencySymbol::None)
}

/// Share volume with grouping: "17,142,847"
pub fn format_volume(volume: u64) -> String {
    group_thousands(&volume.to_string())
}

/// Signed percentage: "+1.30%", "-3.27%", "0.00%"
///
/// # Examples
/// ```
/// use krxdash::utils::format_change_pct;
/// use rust_decimal_macros::dec;
///
/// assert_eq!(format_change_pct(dec!(1.3)), "+1.30%");
/// ```
pub fn format_change_pct(value: Decimal) -> String {
    if value > Decimal::ZERO {
        format!("+{:.2}%", value)
    } else {
        format!("{:.2}%", value)
    }
}

/// Compact axis label for chart values
pub fn format_axis_value(value: f64) -> String {
    if value.abs() >= 1000.0 {
        let rounded = value.round();
        let digits = group_thousands(&format!("{:.0}", rounded.abs()));
        if rounded < 0.0 {
            format!("-{}", digits)
        } else {
            digits
        }
    } else {
        format!("{:.2}", value)
    }
}
