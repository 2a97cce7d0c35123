//! logfmt formatter
//!
//! One line per record, `key=value` pairs separated by single spaces. Values
//! that would not survive as a single token are double-quoted with `\` and
//! `"` escaped and control characters written as escapes.

use crate::core::{Field, Formatter};
#[cfg(feature = "console")]
use colored::Colorize;

/// # Example
///
/// ```
/// use rust_kvlog::{Field, Formatter, LogfmtFormatter, TimestampFormat};
///
/// let mut formatter = LogfmtFormatter::new();
/// formatter.begin();
/// formatter.pair(&Field::new("msg", "hello world".into(), &TimestampFormat::default()));
/// formatter.pair(&Field::new("pi", 3.1415.into(), &TimestampFormat::default()));
///
/// assert_eq!(formatter.finish(), b"msg=\"hello world\" pi=3.1415e+00\n");
/// ```
#[derive(Debug, Clone, Default)]
pub struct LogfmtFormatter {
    line: String,
    #[cfg(feature = "console")]
    use_colors: bool,
}

impl LogfmtFormatter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Colour keys with ANSI escapes, for terminal destinations
    #[cfg(feature = "console")]
    #[must_use]
    pub fn with_colors(mut self, use_colors: bool) -> Self {
        self.use_colors = use_colors;
        self
    }

    #[cfg(feature = "console")]
    fn paint_key(&self, key: &str) -> String {
        if self.use_colors {
            key.cyan().to_string()
        } else {
            key.to_string()
        }
    }

    #[cfg(not(feature = "console"))]
    fn paint_key(&self, key: &str) -> String {
        key.to_string()
    }
}

impl Formatter for LogfmtFormatter {
    fn begin(&mut self) {
        self.line.clear();
    }

    fn pair(&mut self, field: &Field) {
        if !self.line.is_empty() {
            self.line.push(' ');
        }

        let key = self.paint_key(&escape_key(field.key()));
        self.line.push_str(&key);
        self.line.push('=');

        if field.quoted() {
            self.line.push_str(&quote_value(field.text()));
        } else {
            self.line.push_str(field.text());
        }
    }

    fn finish(&mut self) -> Vec<u8> {
        self.line.push('\n');
        std::mem::take(&mut self.line).into_bytes()
    }

    fn name(&self) -> &str {
        "logfmt"
    }
}

/// Keys cannot be quoted, so separators inside them are replaced
fn escape_key(key: &str) -> String {
    key.chars()
        .map(|c| {
            if c.is_whitespace() || c.is_control() || c == '=' || c == '"' {
                '_'
            } else {
                c
            }
        })
        .collect()
}

fn quote_value(value: &str) -> String {
    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\r' => quoted.push_str("\\r"),
            '\t' => quoted.push_str("\\t"),
            c if c.is_control() => quoted.push_str(&format!("\\u{:04x}", c as u32)),
            c => quoted.push(c),
        }
    }
    quoted.push('"');
    quoted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{TimestampFormat, Value};

    fn render(pairs: &[(&str, Value)]) -> String {
        let mut formatter = LogfmtFormatter::new();
        formatter.begin();
        for (key, value) in pairs {
            formatter.pair(&Field::new(*key, value.clone(), &TimestampFormat::default()));
        }
        String::from_utf8(formatter.finish()).unwrap()
    }

    #[test]
    fn test_plain_pairs() {
        let line = render(&[("msg", "hi".into()), ("status", 200.into())]);
        assert_eq!(line, "msg=hi status=200\n");
    }

    #[test]
    fn test_quoting_and_escaping() {
        assert_eq!(render(&[("empty", "".into())]), "empty=\"\"\n");
        assert_eq!(
            render(&[("q", "say \"hi\"".into())]),
            "q=\"say \\\"hi\\\"\"\n"
        );
        assert_eq!(render(&[("nl", "a\nb".into())]), "nl=\"a\\nb\"\n");
        assert_eq!(render(&[("eq", "a=b".into())]), "eq=\"a=b\"\n");
        assert_eq!(render(&[("path", "C:\\tmp".into())]), "path=C:\\tmp\n");
    }

    #[test]
    fn test_key_escaping() {
        assert_eq!(render(&[("my key", 1.into())]), "my_key=1\n");
    }

    #[test]
    fn test_empty_record_is_bare_newline() {
        assert_eq!(render(&[]), "\n");
    }

    #[test]
    fn test_begin_discards_partial_line() {
        let mut formatter = LogfmtFormatter::new();
        formatter.begin();
        formatter.pair(&Field::new("stale", "x".into(), &TimestampFormat::default()));
        formatter.begin();
        formatter.pair(&Field::new("fresh", "y".into(), &TimestampFormat::default()));
        assert_eq!(formatter.finish(), b"fresh=y\n");
    }

    #[cfg(feature = "console")]
    #[test]
    fn test_colors_keep_values_plain() {
        colored::control::set_override(true);
        let mut formatter = LogfmtFormatter::new().with_colors(true);
        formatter.begin();
        formatter.pair(&Field::new("msg", "hi".into(), &TimestampFormat::default()));
        let line = String::from_utf8(formatter.finish()).unwrap();
        colored::control::unset_override();

        assert!(line.contains("\u{1b}["));
        assert!(line.ends_with("=hi\n"));
    }
}
