//! Typed values carried by pairs
//!
//! `Value` is a closed sum type. Formatters and filters match it exhaustively;
//! anything that is not one of the seven kinds is converted to its display
//! text with [`Value::display`].

use super::timestamp::TimestampFormat;
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fmt;
use std::time::SystemTime;

/// Value type for structured logging pairs
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    String(String),
    Int(i64),
    Uint(u64),
    Float(f64),
    Bool(bool),
    Time(DateTime<Utc>),
    Strings(Vec<String>),
}

impl Value {
    /// Fallback conversion for any displayable type
    pub fn display(value: impl fmt::Display) -> Self {
        Value::String(value.to_string())
    }

    /// Render the value as display text
    ///
    /// Integers are base 10, floats use scientific notation with a signed
    /// two-digit exponent, times use `time_format`, string sequences are
    /// joined with single spaces.
    #[must_use]
    pub fn render(&self, time_format: &TimestampFormat) -> String {
        match self {
            Value::String(s) => s.clone(),
            Value::Int(i) => i.to_string(),
            Value::Uint(u) => u.to_string(),
            Value::Float(f) => format_float(*f),
            Value::Bool(b) => b.to_string(),
            Value::Time(t) => time_format.format(t),
            Value::Strings(items) => items.join(" "),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render(&TimestampFormat::default()))
    }
}

/// Scientific notation with the exponent sign always present and at least
/// two exponent digits: `3.1415` becomes `3.1415e+00`.
pub(crate) fn format_float(value: f64) -> String {
    if value.is_nan() {
        return "NaN".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "+Inf" } else { "-Inf" }.to_string();
    }

    let shortest = format!("{:e}", value);
    match shortest.split_once('e') {
        Some((mantissa, exponent)) => {
            let (sign, digits) = match exponent.strip_prefix('-') {
                Some(digits) => ('-', digits),
                None => ('+', exponent),
            };
            format!("{}e{}{:0>2}", mantissa, sign, digits)
        }
        None => shortest,
    }
}

/// Whether rendered text must be quoted to survive as a single logfmt token
pub(crate) fn needs_quoting(text: &str) -> bool {
    text.is_empty()
        || text
            .chars()
            .any(|c| c.is_whitespace() || c.is_control() || c == '"' || c == '=')
}

macro_rules! value_from {
    ($($ty:ty => $variant:ident),+ $(,)?) => {
        $(
            impl From<$ty> for Value {
                fn from(v: $ty) -> Self {
                    Value::$variant(v.into())
                }
            }
        )+
    };
}

value_from!(
    String => String,
    &str => String,
    &String => String,
    char => String,
    i8 => Int,
    i16 => Int,
    i32 => Int,
    i64 => Int,
    u8 => Uint,
    u16 => Uint,
    u32 => Uint,
    u64 => Uint,
    f32 => Float,
    f64 => Float,
    bool => Bool,
    DateTime<Utc> => Time,
    SystemTime => Time,
    Vec<String> => Strings,
);

impl From<isize> for Value {
    fn from(v: isize) -> Self {
        Value::Int(v as i64)
    }
}

impl From<usize> for Value {
    fn from(v: usize) -> Self {
        Value::Uint(v as u64)
    }
}

impl From<&[&str]> for Value {
    fn from(v: &[&str]) -> Self {
        Value::Strings(v.iter().map(|s| s.to_string()).collect())
    }
}

impl From<Vec<&str>> for Value {
    fn from(v: Vec<&str>) -> Self {
        Value::from(v.as_slice())
    }
}
