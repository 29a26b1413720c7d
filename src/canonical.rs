//! Canonical JSON encoding for block hashing
//!
//! Produces the byte-exact text of a sorted-keys JSON dump with the default
//! `", "` / `": "` separators and ASCII-only strings. Block digests are taken
//! over this text, so two nodes agree on a hash only if they agree on every
//! byte here. Changing any rule below changes every block hash.

use serde_json::{Map, Number, Value};

/// Floats switch to exponent notation when the decimal point position falls
/// at or below this value...
const SCI_DECPT_LOW: i32 = -4;
/// ...or above this one.
const SCI_DECPT_HIGH: i32 = 16;

/// Encode a JSON value canonically.
pub fn to_canonical_json(value: &Value) -> String {
    let mut out = String::new();
    write_value(&mut out, value);
    out
}

/// Encode a JSON value canonically, as UTF-8 bytes ready for hashing.
pub fn to_canonical_bytes(value: &Value) -> Vec<u8> {
    to_canonical_json(value).into_bytes()
}

fn write_value(out: &mut String, value: &Value) {
    match value {
        Value::Null => out.push_str("null"),
        Value::Bool(true) => out.push_str("true"),
        Value::Bool(false) => out.push_str("false"),
        Value::Number(n) => write_number(out, n),
        Value::String(s) => write_string(out, s),
        Value::Array(items) => {
            out.push('[');
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                write_value(out, item);
            }
            out.push(']');
        }
        Value::Object(map) => write_object(out, map),
    }
}

fn write_object(out: &mut String, map: &Map<String, Value>) {
    // Byte order on UTF-8 equals code point order.
    let mut entries: Vec<(&String, &Value)> = map.iter().collect();
    entries.sort_by(|a, b| a.0.cmp(b.0));

    out.push('{');
    for (i, (key, value)) in entries.into_iter().enumerate() {
        if i > 0 {
            out.push_str(", ");
        }
        write_string(out, key);
        out.push_str(": ");
        write_value(out, value);
    }
    out.push('}');
}

fn write_string(out: &mut String, s: &str) {
    out.push('"');
    for ch in s.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{08}' => out.push_str("\\b"),
            '\u{0c}' => out.push_str("\\f"),
            ' '..='~' => out.push(ch),
            _ => {
                let mut units = [0u16; 2];
                for unit in ch.encode_utf16(&mut units) {
                    out.push_str(&format!("\\u{:04x}", unit));
                }
            }
        }
    }
    out.push('"');
}

/// Numbers keep the literal text they were parsed from, so the kind is read
/// off that text: any `.`, `e` or `E` makes it a float, otherwise it is an
/// integer of unbounded size.
fn write_number(out: &mut String, n: &Number) {
    let literal = n.to_string();
    if literal.contains(['.', 'e', 'E']) {
        out.push_str(&format_float_literal(&literal));
    } else {
        out.push_str(&format_integer_literal(&literal));
    }
}

fn format_integer_literal(literal: &str) -> String {
    match literal.strip_prefix('-') {
        Some(digits) if digits.bytes().all(|b| b == b'0') => "0".to_string(),
        _ => literal.to_string(),
    }
}

/// Round a float literal to the nearest double, then lay out its shortest
/// round-trip digits. Literals beyond the double range become `Infinity`.
fn format_float_literal(literal: &str) -> String {
    let value = literal.parse::<f64>().unwrap_or(f64::NAN);
    match Number::from_f64(value) {
        Some(rounded) => format_float(&rounded.to_string()),
        None if value == f64::INFINITY => "Infinity".to_string(),
        None if value == f64::NEG_INFINITY => "-Infinity".to_string(),
        None => "NaN".to_string(),
    }
}

/// Re-render a shortest round-trip float (as printed by serde_json) in the
/// canonical layout: `1e+16`, `1e-05`, `0.0001`, `100.0`.
fn format_float(shortest: &str) -> String {
    let (sign, unsigned) = match shortest.strip_prefix('-') {
        Some(rest) => ("-", rest),
        None => ("", shortest),
    };

    let (mantissa, exponent) = match unsigned.split_once(['e', 'E']) {
        Some((m, e)) => (m, e.parse::<i32>().unwrap_or(0)),
        None => (unsigned, 0),
    };
    let (int_part, frac_part) = mantissa.split_once('.').unwrap_or((mantissa, ""));

    let mut digits: String = int_part.chars().chain(frac_part.chars()).collect();
    let mut decpt = int_part.len() as i32 + exponent;

    let leading = digits.len() - digits.trim_start_matches('0').len();
    digits.replace_range(..leading, "");
    decpt -= leading as i32;
    let trimmed_len = digits.trim_end_matches('0').len();
    digits.truncate(trimmed_len);

    if digits.is_empty() {
        return format!("{}0.0", sign);
    }

    let len = digits.len() as i32;
    let body = if decpt <= SCI_DECPT_LOW || decpt > SCI_DECPT_HIGH {
        let exp = decpt - 1;
        let exp_sign = if exp < 0 { '-' } else { '+' };
        let (first, rest) = digits.split_at(1);
        if rest.is_empty() {
            format!("{}e{}{:02}", first, exp_sign, exp.abs())
        } else {
            format!("{}.{}e{}{:02}", first, rest, exp_sign, exp.abs())
        }
    } else if decpt <= 0 {
        format!("0.{}{}", "0".repeat((-decpt) as usize), digits)
    } else if decpt >= len {
        format!("{}{}.0", digits, "0".repeat((decpt - len) as usize))
    } else {
        let (whole, frac) = digits.split_at(decpt as usize);
        format!("{}.{}", whole, frac)
    };

    format!("{}{}", sign, body)
}
