//! Filter capability and built-in filters
//!
//! A sink keeps at most one filter per key, classified as either positive
//! (the record must satisfy it) or negative (the record is vetoed when it
//! holds). Filters see the finalized field: its typed value and its rendered
//! text. Range filters accept a matching typed value, or text that parses as
//! one, and use exclusive bounds.

use super::record::Field;
use super::value::Value;
use chrono::{DateTime, Utc};
use std::fmt;

/// Predicate deciding record admission for one key
pub trait Filter: Send + Sync {
    fn check(&self, field: &Field) -> bool;
}

impl<F> Filter for F
where
    F: Fn(&Field) -> bool + Send + Sync,
{
    fn check(&self, field: &Field) -> bool {
        self(field)
    }
}

/// Holds whenever the key is present
#[derive(Debug, Clone, Copy, Default)]
pub struct KeyFilter;

impl Filter for KeyFilter {
    fn check(&self, _field: &Field) -> bool {
        true
    }
}

/// Holds when the rendered value equals one of the listed values
#[derive(Debug, Clone)]
pub struct ValuesFilter {
    values: Vec<String>,
}

impl ValuesFilter {
    pub fn new<I, S>(values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            values: values.into_iter().map(Into::into).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl Filter for ValuesFilter {
    fn check(&self, field: &Field) -> bool {
        self.values.iter().any(|v| v == field.text())
    }
}

/// Holds when the value is a signed integer strictly between the bounds
#[derive(Debug, Clone, Copy)]
pub struct IntRangeFilter {
    pub from: i64,
    pub to: i64,
}

impl Filter for IntRangeFilter {
    fn check(&self, field: &Field) -> bool {
        let value = match field.value() {
            Value::Int(i) => Some(*i),
            Value::Uint(u) => i64::try_from(*u).ok(),
            Value::String(s) => s.trim().parse::<i64>().ok(),
            Value::Float(_) | Value::Bool(_) | Value::Time(_) | Value::Strings(_) => None,
        };
        value.is_some_and(|v| v > self.from && v < self.to)
    }
}

/// Holds when the value is a number strictly between the bounds
#[derive(Debug, Clone, Copy)]
pub struct FloatRangeFilter {
    pub from: f64,
    pub to: f64,
}

impl Filter for FloatRangeFilter {
    fn check(&self, field: &Field) -> bool {
        let value = match field.value() {
            Value::Float(f) => Some(*f),
            Value::Int(i) => Some(*i as f64),
            Value::Uint(u) => Some(*u as f64),
            Value::String(s) => s.trim().parse::<f64>().ok(),
            Value::Bool(_) | Value::Time(_) | Value::Strings(_) => None,
        };
        value.is_some_and(|v| v > self.from && v < self.to)
    }
}

/// Holds when the value is a time strictly between the bounds
#[derive(Debug, Clone, Copy)]
pub struct TimeRangeFilter {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl Filter for TimeRangeFilter {
    fn check(&self, field: &Field) -> bool {
        let value = match field.value() {
            Value::Time(t) => Some(*t),
            Value::String(s) => DateTime::parse_from_rfc3339(s.trim())
                .ok()
                .map(|t| t.with_timezone(&Utc)),
            Value::Int(_) | Value::Uint(_) | Value::Float(_) | Value::Bool(_) | Value::Strings(_) => {
                None
            }
        };
        value.is_some_and(|t| t > self.from && t < self.to)
    }
}

/// Positive or negative classification of a key's filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    Positive,
    Negative,
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FilterKind::Positive => write!(f, "positive"),
            FilterKind::Negative => write!(f, "negative"),
        }
    }
}
