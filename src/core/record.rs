//! Finalized records
//!
//! A record is the ordered, key-deduplicated result of merging a logger's
//! context, its pending pairs and the final call arguments. Once built it is
//! shared read-only between every sink it is sent to.

use super::pair::{Pair, PairValue};
use super::timestamp::TimestampFormat;
use super::value::{needs_quoting, Value};
use std::collections::HashMap;

/// One finalized pair of a record
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    key: String,
    value: Value,
    text: String,
    quoted: bool,
}

impl Field {
    pub fn new(key: impl Into<String>, value: Value, time_format: &TimestampFormat) -> Self {
        let text = value.render(time_format);
        Self {
            key: key.into(),
            quoted: needs_quoting(&text),
            value,
            text,
        }
    }

    #[inline]
    pub fn key(&self) -> &str {
        &self.key
    }

    #[inline]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Rendered display text of the value
    #[inline]
    pub fn text(&self) -> &str {
        &self.text
    }

    /// True when the text must be quoted in textual output
    #[inline]
    pub fn quoted(&self) -> bool {
        self.quoted
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: Vec<Field>,
}

impl Record {
    /// Merge pairs in order into a record
    ///
    /// A later pair with an already seen key replaces the earlier value but
    /// keeps the earlier position. Deferred values are evaluated here, once,
    /// and only for pairs that survive deduplication.
    pub fn from_pairs<'a, I>(pairs: I, time_format: &TimestampFormat) -> Self
    where
        I: IntoIterator<Item = &'a Pair>,
    {
        let mut slots: Vec<&'a Pair> = Vec::new();
        let mut positions: HashMap<&'a str, usize> = HashMap::new();

        for pair in pairs {
            match positions.get(pair.key.as_str()) {
                Some(&idx) => slots[idx] = pair,
                None => {
                    positions.insert(pair.key.as_str(), slots.len());
                    slots.push(pair);
                }
            }
        }

        let fields = slots
            .into_iter()
            .map(|pair| {
                let value = match &pair.value {
                    PairValue::Ready(value) => value.clone(),
                    PairValue::Deferred(lazy) => Value::String(lazy.evaluate()),
                };
                Field::new(pair.key.clone(), value, time_format)
            })
            .collect();

        Self { fields }
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    pub fn get(&self, key: &str) -> Option<&Field> {
        self.fields.iter().find(|f| f.key == key)
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }
}
