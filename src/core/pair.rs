//! Key-value pairs and flat argument lists
//!
//! Loggers accept their pairs as a flat sequence `key, value, key, value, ...`.
//! [`flatten`] turns such a sequence into pairs: a prebuilt [`Pair`] takes a
//! single slot, and a dangling key with no value is dropped.

use super::value::Value;
use std::fmt;
use std::sync::Arc;

/// Deferred value, evaluated once per record when the record is merged
#[derive(Clone)]
pub struct LazyValue(Arc<dyn Fn() -> String + Send + Sync>);

impl LazyValue {
    pub fn new<F>(eval: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self(Arc::new(eval))
    }

    pub(crate) fn evaluate(&self) -> String {
        (self.0)()
    }
}

impl fmt::Debug for LazyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("LazyValue(..)")
    }
}

#[derive(Debug, Clone)]
pub enum PairValue {
    Ready(Value),
    Deferred(LazyValue),
}

/// One key-value datum, in a logger's context or pending record
#[derive(Debug, Clone)]
pub struct Pair {
    pub key: String,
    pub value: PairValue,
}

impl Pair {
    pub fn new(key: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            key: key.into(),
            value: PairValue::Ready(value.into()),
        }
    }

    /// A pair whose value is produced by `eval` each time a record is merged
    pub fn lazy<F>(key: impl Into<String>, eval: F) -> Self
    where
        F: Fn() -> String + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            value: PairValue::Deferred(LazyValue::new(eval)),
        }
    }

    pub fn is_lazy(&self) -> bool {
        matches!(self.value, PairValue::Deferred(_))
    }
}

/// One slot of a flat argument list
#[derive(Debug, Clone)]
pub enum Arg {
    Value(Value),
    Lazy(LazyValue),
    Pair(Pair),
}

impl From<Pair> for Arg {
    fn from(pair: Pair) -> Self {
        Arg::Pair(pair)
    }
}

impl From<LazyValue> for Arg {
    fn from(lazy: LazyValue) -> Self {
        Arg::Lazy(lazy)
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

macro_rules! arg_from_value {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Arg {
                fn from(v: $ty) -> Self {
                    Arg::Value(Value::from(v))
                }
            }
        )+
    };
}

arg_from_value!(
    String,
    &str,
    &String,
    char,
    i8,
    i16,
    i32,
    i64,
    isize,
    u8,
    u16,
    u32,
    u64,
    usize,
    f32,
    f64,
    bool,
    chrono::DateTime<chrono::Utc>,
    std::time::SystemTime,
    Vec<String>,
    Vec<&str>,
    &[&str],
);

/// Convert a flat argument list into pairs
///
/// Keys that are not strings use their display text. A key slot holding a
/// lazy value is evaluated immediately since keys are never deferred.
pub(crate) fn flatten<I, A>(args: I) -> Vec<Pair>
where
    I: IntoIterator<Item = A>,
    A: Into<Arg>,
{
    let mut pairs = Vec::new();
    let mut pending_key: Option<String> = None;

    for arg in args {
        match (pending_key.take(), arg.into()) {
            (None, Arg::Pair(pair)) => pairs.push(pair),
            (None, Arg::Value(key)) => pending_key = Some(key.to_string()),
            (None, Arg::Lazy(key)) => pending_key = Some(key.evaluate()),
            (Some(key), Arg::Value(value)) => pairs.push(Pair {
                key,
                value: PairValue::Ready(value),
            }),
            (Some(key), Arg::Lazy(lazy)) => pairs.push(Pair {
                key,
                value: PairValue::Deferred(lazy),
            }),
            // A whole pair in a value slot: the waiting key has no value.
            (Some(_), Arg::Pair(pair)) => pairs.push(pair),
        }
    }

    pairs
}
