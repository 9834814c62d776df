use std::{fmt, str::FromStr};

use rust_decimal::Decimal;
use serde_json::Value;
use thiserror::Error;

use crate::signature::{Message, render_number};

/// A loosely typed request field, coerced the way wallet callers expect:
/// presence is truthiness and numbers are parsed leniently.
#[derive(Debug, Clone, PartialEq)]
pub struct Field(Value);

impl Field {
    pub fn new(value: Value) -> Self {
        Self(value)
    }

    fn take(message: &Message, name: &str) -> Option<Self> {
        message.get(name).cloned().map(Self)
    }

    /// `null`, `false`, `0`, `NaN` and `""` count as absent.
    pub fn is_truthy(&self) -> bool {
        match &self.0 {
            Value::Null => false,
            Value::Bool(b) => *b,
            Value::Number(n) => n.as_f64().is_some_and(|n| n != 0.0 && !n.is_nan()),
            Value::String(s) => !s.is_empty(),
            Value::Array(_) | Value::Object(_) => true,
        }
    }

    pub fn to_number(&self) -> f64 {
        number_of(&self.0)
    }

    pub fn as_str(&self) -> Option<&str> {
        self.0.as_str()
    }

    /// Strict equality: only a string with identical contents matches.
    pub fn matches(&self, expected: &str) -> bool {
        self.as_str() == Some(expected)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt_value(&self.0, f)
    }
}

fn fmt_value(value: &Value, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match value {
        Value::Null => f.write_str("null"),
        Value::Bool(b) => write!(f, "{b}"),
        Value::Number(n) if n.is_f64() => {
            f.write_str(&render_number(n.as_f64().unwrap_or(f64::NAN)))
        }
        Value::Number(n) => write!(f, "{n}"),
        Value::String(s) => f.write_str(s),
        Value::Array(items) => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    f.write_str(",")?;
                }
                if !item.is_null() {
                    fmt_value(item, f)?;
                }
            }
            Ok(())
        }
        Value::Object(_) => f.write_str("[object Object]"),
    }
}

fn number_of(value: &Value) -> f64 {
    match value {
        Value::Null => 0.0,
        Value::Bool(b) => f64::from(u8::from(*b)),
        Value::Number(n) => n.as_f64().unwrap_or(f64::NAN),
        Value::String(s) => parse_number(s),
        Value::Array(_) | Value::Object(_) => f64::NAN,
    }
}

fn parse_number(raw: &str) -> f64 {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return 0.0;
    }
    match trimmed {
        "Infinity" | "+Infinity" => return f64::INFINITY,
        "-Infinity" => return f64::NEG_INFINITY,
        _ => {}
    }
    for (prefix, radix) in [("0x", 16), ("0o", 8), ("0b", 2)] {
        let digits = trimmed
            .strip_prefix(prefix)
            .or_else(|| trimmed.strip_prefix(&prefix.to_uppercase()));
        if let Some(digits) = digits {
            if digits.is_empty() || !digits.chars().all(|c| c.is_digit(radix)) {
                return f64::NAN;
            }
            return u64::from_str_radix(digits, radix).map_or(f64::NAN, |n| n as f64);
        }
    }
    // rejects "inf", "nan" and friends that f64::from_str would otherwise accept
    if !trimmed
        .bytes()
        .all(|b| b.is_ascii_digit() || matches!(b, b'+' | b'-' | b'.' | b'e' | b'E'))
    {
        return f64::NAN;
    }
    trimmed.parse().unwrap_or(f64::NAN)
}

/// Converts through the shortest decimal rendering so `0.1` stays `0.1`.
pub fn decimal_from_number(value: f64) -> Option<Decimal> {
    if !value.is_finite() {
        return None;
    }
    Decimal::from_str(&value.to_string()).ok()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Polarity {
    Add,
    Subtract,
}

/// Refund direction is carried by the first character of the refunded
/// transaction id: `0` or anything that is not a digit subtracts.
pub fn polarity_of(transaction_id: &str) -> Polarity {
    match transaction_id.chars().next().and_then(|c| c.to_digit(10)) {
        Some(0) | None => Polarity::Subtract,
        Some(_) => Polarity::Add,
    }
}

/// Polarity of a loosely typed transaction id. Callers index it with `[0]`,
/// so an array contributes its first element and an object its `"0"` key;
/// that head counts as a nonzero number to add. Other values subtract.
pub fn transaction_polarity(transaction_id: &Field) -> Polarity {
    let head = match &transaction_id.0 {
        Value::String(s) => return polarity_of(s),
        Value::Array(items) => items.first(),
        Value::Object(map) => map.get("0"),
        Value::Null | Value::Bool(_) | Value::Number(_) => None,
    };
    match head.map(number_of) {
        Some(n) if n != 0.0 && !n.is_nan() => Polarity::Add,
        _ => Polarity::Subtract,
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BalanceAction {
    Credit,
    Debit,
    Refund(Polarity),
}

#[derive(Debug, Clone)]
pub struct BalanceCommand {
    pub action: BalanceAction,
    pub amount: Decimal,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FieldError {
    #[error("the field {field} is required")]
    Required { field: &'static str },
    // debit and refund callers have always been answered with this shorter wording
    #[error("the amount is required")]
    AmountRequired,
    #[error("the field {field} must be numeric")]
    NotNumeric { field: &'static str },
}

pub fn require<'a>(field: &'a Option<Field>, name: &'static str) -> Result<&'a Field, FieldError> {
    field
        .as_ref()
        .filter(|f| f.is_truthy())
        .ok_or(FieldError::Required { field: name })
}

#[derive(Debug, Clone, Default)]
pub struct BalanceRequest {
    pub session_token: Option<Field>,
}

impl BalanceRequest {
    pub fn from_message(message: &Message) -> Self {
        Self {
            session_token: Field::take(message, "session_token"),
        }
    }
}

/// Credit and debit share one request shape.
#[derive(Debug, Clone, Default)]
pub struct TransactionRequest {
    pub external_id: Option<Field>,
    pub currency: Option<Field>,
    pub timestamp: Option<Field>,
    pub amount: Option<Field>,
}

impl TransactionRequest {
    pub fn from_message(message: &Message) -> Self {
        Self {
            external_id: Field::take(message, "external_id"),
            currency: Field::take(message, "currency"),
            timestamp: Field::take(message, "timestamp"),
            amount: Field::take(message, "amount"),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RefundRequest {
    pub transaction_id: Option<Field>,
    pub transaction: TransactionRequest,
}

impl RefundRequest {
    pub fn from_message(message: &Message) -> Self {
        Self {
            transaction_id: Field::take(message, "transaction_id"),
            transaction: TransactionRequest::from_message(message),
        }
    }
}
