//! Formatter implementations

pub mod json;
pub mod logfmt;

pub use json::JsonFormatter;
pub use logfmt::LogfmtFormatter;

// Re-export the trait next to its implementations
pub use crate::core::Formatter;
