//! Call-site information as pairs
//!
//! [`what`] reports where it was called from as `lineno`, `file` and
//! `function` pairs, ready for [`Logger::add_pairs`](crate::Logger::add_pairs).
//! File and line are exact. The function name comes from a captured
//! backtrace and needs debug symbols; without them it is `unknown`.

use crate::core::Pair;
use std::backtrace::Backtrace;
use std::ops::BitOr;
use std::panic::Location;

/// Upper bound on backtrace frames inspected when looking for the caller
pub const MAX_FRAME_SKIP: usize = 64;

/// Function name used when the caller cannot be resolved
pub const UNKNOWN_FUNCTION: &str = "unknown";

/// Selection of call-site parts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Parts(u8);

impl Parts {
    pub const FILE: Parts = Parts(1);
    pub const LINE: Parts = Parts(1 << 1);
    pub const FUNC: Parts = Parts(1 << 2);
    pub const ALL: Parts = Parts(0b111);

    pub fn contains(self, other: Parts) -> bool {
        self.0 & other.0 == other.0
    }
}

impl BitOr for Parts {
    type Output = Parts;

    fn bitor(self, rhs: Parts) -> Parts {
        Parts(self.0 | rhs.0)
    }
}

/// Pairs describing the caller
///
/// # Example
///
/// ```
/// use rust_kvlog::location::{what, Parts};
///
/// let pairs = what(Parts::FILE | Parts::LINE);
/// assert_eq!(pairs[0].key, "lineno");
/// assert_eq!(pairs[1].key, "file");
/// ```
#[track_caller]
pub fn what(parts: Parts) -> Vec<Pair> {
    let caller = Location::caller();
    let mut pairs = Vec::with_capacity(3);

    if parts.contains(Parts::LINE) {
        pairs.push(Pair::new("lineno", caller.line()));
    }
    if parts.contains(Parts::FILE) {
        pairs.push(Pair::new("file", caller.file()));
    }
    if parts.contains(Parts::FUNC) {
        let trace = Backtrace::force_capture().to_string();
        let function = caller_function(&trace).unwrap_or_else(|| UNKNOWN_FUNCTION.to_string());
        pairs.push(Pair::new("function", function));
    }

    pairs
}

/// First frame of `trace` that belongs to neither the runtime nor this module
fn caller_function(trace: &str) -> Option<String> {
    let mut frames = trace.lines().filter_map(frame_symbol);
    let mut skipped = 0;

    while skipped < MAX_FRAME_SKIP {
        let symbol = frames.next()?;
        if !is_internal(symbol) {
            return Some(strip_hash(symbol).to_string());
        }
        skipped += 1;
    }

    None
}

/// Symbol of a numbered frame line such as `  4: app::main`
fn frame_symbol(line: &str) -> Option<&str> {
    let (index, symbol) = line.trim_start().split_once(": ")?;
    if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    Some(symbol.trim())
}

fn is_internal(symbol: &str) -> bool {
    const RUNTIME: &[&str] = &[
        "std::",
        "core::",
        "alloc::",
        "<std::",
        "<core::",
        "<alloc::",
        "__rust",
        "rust_begin_unwind",
        "<unknown>",
    ];
    let own = concat!(module_path!(), "::");

    RUNTIME.iter().any(|prefix| symbol.starts_with(prefix)) || symbol.starts_with(own)
}

/// Drop a trailing `::h0123456789abcdef` symbol hash
fn strip_hash(symbol: &str) -> &str {
    match symbol.rsplit_once("::") {
        Some((path, hash))
            if hash.len() == 17
                && hash.starts_with('h')
                && hash[1..].bytes().all(|b| b.is_ascii_hexdigit()) =>
        {
            path
        }
        _ => symbol,
    }
}
