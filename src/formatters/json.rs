//! JSON Lines formatter
//!
//! Each record becomes one JSON object on its own line. Keys keep record
//! order. Numbers, booleans and string sequences keep their JSON types;
//! times use the rendered text so the broker's time format applies.

use crate::core::{Field, Formatter, Value};
use serde_json::Value as JsonValue;

#[derive(Debug, Clone, Default)]
pub struct JsonFormatter {
    line: String,
    pairs: usize,
}

impl JsonFormatter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Formatter for JsonFormatter {
    fn begin(&mut self) {
        self.line.clear();
        self.line.push('{');
        self.pairs = 0;
    }

    fn pair(&mut self, field: &Field) {
        if self.pairs > 0 {
            self.line.push(',');
        }
        self.pairs += 1;

        self.line
            .push_str(&serde_json::to_string(field.key()).unwrap_or_default());
        self.line.push(':');
        self.line
            .push_str(&serde_json::to_string(&to_json(field)).unwrap_or_default());
    }

    fn finish(&mut self) -> Vec<u8> {
        if self.line.is_empty() {
            self.line.push('{');
        }
        self.line.push_str("}\n");
        self.pairs = 0;
        std::mem::take(&mut self.line).into_bytes()
    }

    fn name(&self) -> &str {
        "json"
    }
}

fn to_json(field: &Field) -> JsonValue {
    match field.value() {
        Value::String(s) => JsonValue::from(s.as_str()),
        Value::Int(i) => JsonValue::from(*i),
        Value::Uint(u) => JsonValue::from(*u),
        // Non-finite floats have no JSON number form.
        Value::Float(f) if f.is_finite() => JsonValue::from(*f),
        Value::Float(_) | Value::Time(_) => JsonValue::from(field.text()),
        Value::Bool(b) => JsonValue::from(*b),
        Value::Strings(items) => JsonValue::from(items.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::TimestampFormat;
    use chrono::{TimeZone, Utc};

    fn render(pairs: Vec<(&str, Value)>, time_format: &TimestampFormat) -> String {
        let mut formatter = JsonFormatter::new();
        formatter.begin();
        for (key, value) in pairs {
            formatter.pair(&Field::new(key, value, time_format));
        }
        String::from_utf8(formatter.finish()).unwrap()
    }

    #[test]
    fn test_typed_values_in_order() {
        let line = render(
            vec![
                ("msg", Value::from("hi")),
                ("count", Value::from(3)),
                ("ratio", Value::from(0.25)),
                ("ok", Value::from(true)),
                ("tags", Value::from(vec!["a", "b"])),
            ],
            &TimestampFormat::default(),
        );

        assert_eq!(
            line,
            "{\"msg\":\"hi\",\"count\":3,\"ratio\":0.25,\"ok\":true,\"tags\":[\"a\",\"b\"]}\n"
        );

        let parsed: JsonValue = serde_json::from_str(line.trim_end()).unwrap();
        assert_eq!(parsed["count"], 3);
    }

    #[test]
    fn test_time_uses_configured_format() {
        let at = Utc.with_ymd_and_hms(2025, 1, 8, 10, 30, 45).unwrap();
        let line = render(vec![("at", Value::from(at))], &TimestampFormat::Unix);
        assert_eq!(line, "{\"at\":\"1736332245\"}\n");
    }

    #[test]
    fn test_non_finite_float_as_text() {
        let line = render(
            vec![("nan", Value::from(f64::NAN))],
            &TimestampFormat::default(),
        );
        assert_eq!(line, "{\"nan\":\"NaN\"}\n");
    }

    #[test]
    fn test_escaping_and_empty_record() {
        let line = render(
            vec![("quote", Value::from("say \"hi\"\n"))],
            &TimestampFormat::default(),
        );
        assert_eq!(line, "{\"quote\":\"say \\\"hi\\\"\\n\"}\n");

        assert_eq!(render(Vec::new(), &TimestampFormat::default()), "{}\n");
    }
}
