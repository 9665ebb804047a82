use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr;

/// Magnitude implied by the currency unit written after an amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Scale {
    /// No unit, `kr` or `sek`.
    Ones,
    /// `tkr`
    Thousands,
    /// `mkr`
    Millions,
}

const UNITS: [(&str, Scale); 4] = [
    ("tkr", Scale::Thousands),
    ("mkr", Scale::Millions),
    ("kr", Scale::Ones),
    ("sek", Scale::Ones),
];

/// Parse an amount as written in a Swedish annual report.
///
/// Handles formats like:
/// - "1 234 567" -> 1234567 (space, no-break space or narrow no-break space
///   as thousands separator)
/// - "12,5" -> 12.5 (Swedish decimal comma)
/// - "1.234,5" -> 1234.5
/// - "−3,2" -> -3.2 (typographic minus)
/// - "4 500 kr", "820 tkr" -> 4500, 820 (trailing currency unit dropped)
///
/// Returns `None` for anything that is not a plain amount. Use
/// [`parse_scaled`] when the unit matters.
pub fn parse_amount(s: &str) -> Option<Decimal> {
    parse_scaled(s).map(|(amount, _)| amount)
}

/// Like [`parse_amount`], but also reports the unit's scale, so that
/// "820 tkr" and "820 mkr" can be told apart.
pub fn parse_scaled(s: &str) -> Option<(Decimal, Scale)> {
    let mut s = s.trim().to_string();
    let lower = s.to_lowercase();
    let mut scale = Scale::Ones;
    for (unit, unit_scale) in UNITS {
        if lower.ends_with(unit) {
            let cut = s.len() - unit.len();
            if s.is_char_boundary(cut) {
                s.truncate(cut);
                scale = unit_scale;
            }
            break;
        }
    }

    let mut compact: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | '\u{a0}' | '\u{202f}' | '\t'))
        .map(|c| if c == '\u{2212}' { '-' } else { c })
        .collect();
    if compact.is_empty() {
        return None;
    }

    if compact.contains(',') {
        // Comma is the decimal separator, dots are grouping.
        compact = compact.replace('.', "").replace(',', ".");
    }

    Decimal::from_str(&compact)
        .or_else(|_| Decimal::from_scientific(&compact))
        .ok()
        .map(|amount| (amount, scale))
}

/// Numeric reading of a JSON value: numbers directly, strings via
/// [`parse_amount`].
pub fn amount_of(value: &Value) -> Option<Decimal> {
    scaled_amount_of(value).map(|(amount, _)| amount)
}

/// Numeric reading of a JSON value together with its unit scale. Bare
/// numbers carry no unit.
pub fn scaled_amount_of(value: &Value) -> Option<(Decimal, Scale)> {
    match value {
        Value::Number(n) => parse_scaled(&n.to_string()),
        Value::String(s) => parse_scaled(s),
        _ => None,
    }
}
