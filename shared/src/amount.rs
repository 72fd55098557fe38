//! Lenient coercion of loosely typed wire values.
//!
//! Records reach the system from several writers: some send `amount` as a JSON
//! number, some as a string, and some leave it out entirely. Subject ids come
//! back from SQL-backed stores as integers. Everything is coerced here, once,
//! so the rest of the code only ever handles `f64` amounts and `String` ids.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};
use serde_json::Value;

/// Coerce a raw JSON value into an amount.
///
/// Numbers pass through, numeric strings are parsed with [`parse_amount_text`],
/// and everything else (null, booleans, arrays, objects) becomes `0.0`.
/// The result is always finite.
pub fn to_amount(value: &Value) -> f64 {
    let amount = match value {
        Value::Number(n) => n.as_f64().unwrap_or(0.0),
        Value::String(s) => parse_amount_text(s),
        _ => 0.0,
    };
    if amount.is_finite() {
        amount
    } else {
        0.0
    }
}

/// Parse an amount typed by a person or stored as text.
///
/// Surrounding whitespace and `,` thousands separators are ignored. Anything
/// else that does not parse as a finite number yields `0.0`.
pub fn parse_amount_text(text: &str) -> f64 {
    let cleaned: String = text.trim().chars().filter(|c| *c != ',').collect();
    match cleaned.parse::<f64>() {
        Ok(amount) if amount.is_finite() => amount,
        _ => 0.0,
    }
}

/// `deserialize_with` helper for amount fields.
pub fn deserialize_amount<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(to_amount(&value))
}

/// `deserialize_with` helper for optional amount fields (used by partial updates).
pub fn deserialize_optional_amount<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Null => Ok(None),
        other => Ok(Some(to_amount(&other))),
    }
}

/// `deserialize_with` helper for free-text fields that legacy writers may send
/// as `null` or as a non-string; those become an empty string.
pub fn deserialize_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        _ => Ok(String::new()),
    }
}

/// `deserialize_with` helper for identifiers that may be strings or integers.
pub fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(D::Error::custom(format!(
            "identifier must be a string or a number, got {}",
            other
        ))),
    }
}
