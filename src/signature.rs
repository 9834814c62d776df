use std::{cmp::Ordering, io};

use md5::{Digest, Md5};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value, ser::Formatter};
use thiserror::Error;

/// Field carrying the digest. Never part of the canonical form.
pub const SIGNATURE_FIELD: &str = "signature";

pub type Message = Map<String, Value>;

#[derive(Debug, Error)]
pub enum SignatureError {
    #[error("Message body must serialize to a JSON object, got {kind}")]
    NotAnObject { kind: &'static str },
    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

/// Renders numbers the way callers' JSON encoders do: integral floats without
/// a fraction, exponent form outside of `[1e-6, 1e21)`.
struct CanonicalFormatter;

impl Formatter for CanonicalFormatter {
    fn write_f32<W>(&mut self, writer: &mut W, value: f32) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(render_number(f64::from(value)).as_bytes())
    }

    fn write_f64<W>(&mut self, writer: &mut W, value: f64) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(render_number(value).as_bytes())
    }
}

pub(crate) fn render_number(value: f64) -> String {
    if !value.is_finite() {
        return "null".to_string();
    }
    if value == 0.0 {
        // covers -0 as well
        return "0".to_string();
    }
    if (1e-6..1e21).contains(&value.abs()) {
        return value.to_string();
    }
    let exp = format!("{value:e}");
    match exp.split_once('e') {
        Some((mantissa, exponent)) if !exponent.starts_with('-') => {
            format!("{mantissa}e+{exponent}")
        }
        _ => exp,
    }
}

/// Deterministic, key-order independent rendering of `message` without its signature.
pub fn canonicalize(message: &Message) -> String {
    let mut sorted: Vec<(&str, &Value)> = message
        .iter()
        .filter(|(key, _)| key.as_str() != SIGNATURE_FIELD)
        .map(|(key, value)| (key.as_str(), value))
        .collect();
    sorted.sort_by(|(a, _), (b, _)| key_order(a, b));

    let mut out = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, CanonicalFormatter);
    // writing string keys and json values into a Vec cannot fail
    if (&mut serializer).collect_map(sorted).is_err() {
        return String::new();
    }
    String::from_utf8(out).unwrap_or_default()
}

/// Callers sort keys by UTF-16 code units, then their objects list array
/// index keys first in numeric order.
fn key_order(a: &str, b: &str) -> Ordering {
    match (array_index(a), array_index(b)) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => a.encode_utf16().cmp(b.encode_utf16()),
    }
}

/// Canonical decimal strings below `2^32 - 1`.
fn array_index(key: &str) -> Option<u32> {
    if key.is_empty() || !key.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    if key.len() > 1 && key.starts_with('0') {
        return None;
    }
    key.parse::<u32>().ok().filter(|&index| index != u32::MAX)
}

/// Hex encoded MD5 of the canonical form with `secret` appended.
pub fn digest(message: &Message, secret: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(canonicalize(message).as_bytes());
    hasher.update(secret.as_bytes());
    hex::encode(hasher.finalize())
}

pub fn sign(message: &mut Message, secret: &str) {
    let signature = digest(message, secret);
    message.insert(SIGNATURE_FIELD.to_string(), Value::String(signature));
}

/// Serializes `body` and attaches its signature.
pub fn signed<T: Serialize>(body: &T, secret: &str) -> Result<Message, SignatureError> {
    let mut message = match serde_json::to_value(body)? {
        Value::Object(map) => map,
        other => {
            return Err(SignatureError::NotAnObject {
                kind: value_kind(&other),
            });
        }
    };
    sign(&mut message, secret);
    Ok(message)
}

/// Checks the `signature` field against the digest of the remaining fields.
/// A missing or non-string signature never verifies.
pub fn verify(message: &Message, secret: &str) -> bool {
    match message.get(SIGNATURE_FIELD) {
        Some(Value::String(signature)) => *signature == digest(message, secret),
        _ => false,
    }
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
