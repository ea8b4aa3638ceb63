use crate::core::TransferValue;

/// Prefix of change-log parameter keys. Selector keys use a longer prefix or
/// none at all, and camelCase names never start with `_`, so the two sets
/// cannot collide.
pub const PROPERTY_PARAMETER_PREFIX: &str = "__";

/// Strips characters the literal path cannot carry and escapes single quotes.
///
/// Backslashes, backticks and acute accents are removed rather than escaped,
/// so they do not survive a literal round trip. Blank input is returned as is.
pub fn escape_string(value: &str) -> String {
    if value.trim().is_empty() {
        return value.to_string();
    }

    let mut escaped = String::with_capacity(value.len() + 4);
    for ch in value.chars() {
        match ch {
            '\\' | '`' | '\u{00B4}' => {}
            '\'' => escaped.push_str("\\'"),
            other => escaped.push(other),
        }
    }
    escaped
}

/// Single-quoted, escaped string literal.
pub fn quote(value: &str) -> String {
    format!("'{}'", escape_string(value))
}

/// Culture-invariant literal form of a normalized value.
///
/// `None` means the literal renderer has no representation for the value.
pub fn render_literal(value: &TransferValue) -> Option<String> {
    match value {
        TransferValue::Null => Some("null".to_string()),
        TransferValue::Integer(v) => Some(v.to_string()),
        TransferValue::Float(v) => Some(render_float(*v)),
        TransferValue::Decimal(v) => Some(v.to_string()),
        TransferValue::Text(v) => Some(quote(v)),
        TransferValue::Boolean(v) => Some(if *v { "true" } else { "false" }.to_string()),
        TransferValue::Json(_) => None,
    }
}

fn render_float(value: f64) -> String {
    if value.is_nan() {
        "NaN".to_string()
    } else if value.is_infinite() {
        if value.is_sign_positive() {
            "Infinity".to_string()
        } else {
            "-Infinity".to_string()
        }
    } else {
        value.to_string()
    }
}

/// Converts a field or property name into the camelCase form used in the store.
///
/// `first_met` and `FirstMet` both become `firstMet`; leading underscores are dropped.
pub fn to_camel_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut upper_next = false;

    for ch in name.chars() {
        if ch == '_' {
            upper_next = !out.is_empty();
            continue;
        }

        if out.is_empty() {
            out.extend(ch.to_lowercase());
        } else if upper_next {
            out.extend(ch.to_uppercase());
        } else {
            out.push(ch);
        }
        upper_next = false;
    }

    out
}

/// Parameter key a change-log entry is bound to.
pub fn property_parameter_key(property: &str) -> String {
    format!("{PROPERTY_PARAMETER_PREFIX}{property}")
}
