//! Number coercion for form input and persisted values, and display
//! formatting for amounts and hours.

use serde_json::Value;

/// Coerces free-form field input to a number. Blank input is 0, anything
/// that does not parse (or parses to a non-finite value) is 0. Negative
/// values pass through unchanged.
pub fn coerce_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match radix_literal(trimmed).or_else(|| trimmed.parse::<f64>().ok()) {
        Some(value) if value.is_finite() => value,
        _ => 0.0,
    }
}

/// Same rules as [`coerce_number`] applied to a JSON value: `null`, arrays
/// and objects are 0, booleans are 1 or 0, strings are parsed.
pub fn coerce_json(value: &Value) -> f64 {
    match value {
        Value::Number(n) => n.as_f64().filter(|v| v.is_finite()).unwrap_or(0.0),
        Value::String(s) => coerce_number(s),
        Value::Bool(true) => 1.0,
        Value::Bool(false) | Value::Null | Value::Array(_) | Value::Object(_) => 0.0,
    }
}

fn radix_literal(s: &str) -> Option<f64> {
    let radix = match s.get(..2)? {
        "0x" | "0X" => 16,
        "0o" | "0O" => 8,
        "0b" | "0B" => 2,
        _ => return None,
    };
    let digits = &s[2..];
    if digits.is_empty() || digits.starts_with('+') {
        return None;
    }
    u64::from_str_radix(digits, radix).ok().map(|v| v as f64)
}

/// Rounds to whole units and groups thousands with `,`.
pub fn format_amount(value: f64) -> String {
    if !value.is_finite() {
        return "0".to_string();
    }
    let rounded = value.round();
    if rounded == 0.0 {
        return "0".to_string();
    }
    let digits = format!("{:.0}", rounded.abs());
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if rounded < 0.0 {
        grouped.push('-');
    }
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

pub fn format_hours(value: f64) -> String {
    if value == 0.0 || !value.is_finite() {
        "0".to_string()
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn coerces_blank_and_garbage_to_zero() {
        assert_eq!(coerce_number(""), 0.0);
        assert_eq!(coerce_number("   "), 0.0);
        assert_eq!(coerce_number("abc"), 0.0);
        assert_eq!(coerce_number("12abc"), 0.0);
        assert_eq!(coerce_number("NaN"), 0.0);
        assert_eq!(coerce_number("inf"), 0.0);
    }

    #[test]
    fn parses_decimal_exponent_and_radix_forms() {
        assert_eq!(coerce_number(" 42 "), 42.0);
        assert_eq!(coerce_number("2.5"), 2.5);
        assert_eq!(coerce_number(".5"), 0.5);
        assert_eq!(coerce_number("1e3"), 1000.0);
        assert_eq!(coerce_number("0x10"), 16.0);
        assert_eq!(coerce_number("0b101"), 5.0);
        assert_eq!(coerce_number("0o17"), 15.0);
        assert_eq!(coerce_number("0x"), 0.0);
    }

    #[test]
    fn keeps_negative_values() {
        assert_eq!(coerce_number("-8"), -8.0);
    }

    #[test]
    fn coerces_json_values() {
        assert_eq!(coerce_json(&json!(160)), 160.0);
        assert_eq!(coerce_json(&json!("75")), 75.0);
        assert_eq!(coerce_json(&json!(null)), 0.0);
        assert_eq!(coerce_json(&json!(true)), 1.0);
        assert_eq!(coerce_json(&json!([1])), 0.0);
    }

    #[test]
    fn formats_amounts_with_grouping() {
        assert_eq!(format_amount(0.0), "0");
        assert_eq!(format_amount(999.4), "999");
        assert_eq!(format_amount(13_333.333), "13,333");
        assert_eq!(format_amount(110_000.0), "110,000");
        assert_eq!(format_amount(1_234_567.5), "1,234,568");
        assert_eq!(format_amount(-6_666.7), "-6,667");
        assert_eq!(format_amount(-0.2), "0");
        assert_eq!(format_amount(f64::NAN), "0");
    }

    #[test]
    fn formats_hours_without_trailing_zero() {
        assert_eq!(format_hours(160.0), "160");
        assert_eq!(format_hours(7.5), "7.5");
        assert_eq!(format_hours(-0.0), "0");
    }
}
