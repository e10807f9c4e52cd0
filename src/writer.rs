//! JSON serialization in compact or indented form.

use crate::error::Result;
use crate::value::Value;
use std::fmt::Write as _;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// Spaces added per nesting level in pretty output.
pub const INDENT_STEP: usize = 2;

/// Serialize a value to JSON text.
///
/// Compact mode emits no whitespace at all. Pretty mode puts one element per
/// line and indents nested arrays and objects by [`INDENT_STEP`] spaces per level.
///
/// # Example
///
/// ```rust
/// use rsal::{parse, to_string};
///
/// let value = parse(r#"{ "b": [1, 2], "a": null }"#)?;
/// assert_eq!(to_string(&value, false), r#"{"a":null,"b":[1,2]}"#);
/// assert_eq!(to_string(&value, true), "{\n  \"a\": null,\n  \"b\": [\n    1,\n    2\n  ]\n}");
/// # Ok::<(), rsal::Error>(())
/// ```
pub fn to_string(value: &Value, pretty: bool) -> String {
    let mut writer = JsonWriter {
        out: String::new(),
        pretty,
    };
    writer.write_value(value, 0);
    writer.out
}

/// Serialize a value into any byte sink.
pub fn to_writer<W: Write>(mut sink: W, value: &Value, pretty: bool) -> Result<()> {
    sink.write_all(to_string(value, pretty).as_bytes())?;
    sink.flush()?;
    Ok(())
}

/// Serialize a value into a file, creating or truncating it.
pub fn save_to_file(path: impl AsRef<Path>, value: &Value, pretty: bool) -> Result<()> {
    let file = File::create(path)?;
    to_writer(BufWriter::new(file), value, pretty)
}

struct JsonWriter {
    out: String,
    pretty: bool,
}

impl JsonWriter {
    fn write_value(&mut self, value: &Value, indent: usize) {
        match value {
            Value::Null => self.out.push_str("null"),
            Value::Bool(b) => self.out.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => write_number(&mut self.out, *n),
            Value::String(s) => write_escaped(&mut self.out, s),
            Value::Array(items) => {
                self.out.push('[');
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.newline(indent + INDENT_STEP);
                    self.write_value(item, indent + INDENT_STEP);
                }
                if !items.is_empty() {
                    self.newline(indent);
                }
                self.out.push(']');
            }
            Value::Object(map) => {
                self.out.push('{');
                for (i, (key, item)) in map.iter().enumerate() {
                    if i > 0 {
                        self.out.push(',');
                    }
                    self.newline(indent + INDENT_STEP);
                    write_escaped(&mut self.out, key);
                    self.out.push(':');
                    if self.pretty {
                        self.out.push(' ');
                    }
                    self.write_value(item, indent + INDENT_STEP);
                }
                if !map.is_empty() {
                    self.newline(indent);
                }
                self.out.push('}');
            }
        }
    }

    fn newline(&mut self, indent: usize) {
        if self.pretty {
            self.out.push('\n');
            self.out.extend(std::iter::repeat(' ').take(indent));
        }
    }
}

fn write_number(out: &mut String, n: f64) {
    if !n.is_finite() {
        // Not representable in JSON.
        out.push_str("null");
    } else if n.fract() == 0.0 && n.abs() < 1e15 {
        let _ = write!(out, "{}", n as i64);
    } else {
        // `Display` for f64 prints the shortest text that reads back to the same value.
        let _ = write!(out, "{}", n);
    }
}

fn write_escaped(out: &mut String, s: &str) {
    out.push('"');
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '\u{8}' => out.push_str("\\b"),
            '\u{c}' => out.push_str("\\f"),
            c if (c as u32) < 0x20 => {
                let _ = write!(out, "\\u{:04x}", c as u32);
            }
            c => out.push(c),
        }
    }
    out.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use crate::value::Map;

    fn sample() -> Value {
        let mut metadata = Map::new();
        metadata.insert("id".to_string(), Value::from(1));

        let mut map = Map::new();
        map.insert("name".to_string(), Value::from("John Doe"));
        map.insert("age".to_string(), Value::from(30));
        map.insert("active".to_string(), Value::from(true));
        map.insert(
            "tags".to_string(),
            Value::from(vec![Value::from("admin"), Value::from("user")]),
        );
        map.insert("metadata".to_string(), Value::Object(metadata));
        Value::Object(map)
    }

    #[test]
    fn test_compact_has_no_whitespace() {
        let compact = to_string(&sample(), false);
        assert_eq!(
            compact,
            r#"{"active":true,"age":30,"metadata":{"id":1},"name":"John Doe","tags":["admin","user"]}"#
        );
    }

    #[test]
    fn test_pretty_layout() {
        let value = parse(r#"{"a": [1, {"b": null}], "c": {}}"#).unwrap();
        let expected = "{\n  \"a\": [\n    1,\n    {\n      \"b\": null\n    }\n  ],\n  \"c\": {}\n}";
        assert_eq!(to_string(&value, true), expected);
    }

    #[test]
    fn test_pretty_is_longer_and_round_trips() {
        let value = sample();
        let pretty = to_string(&value, true);
        let compact = to_string(&value, false);

        assert!(pretty.contains('\n'));
        assert!(!compact.contains('\n'));
        assert!(compact.len() < pretty.len());

        assert_eq!(parse(&pretty).unwrap(), value);
        assert_eq!(parse(&compact).unwrap(), value);
    }

    #[test]
    fn test_numbers() {
        assert_eq!(to_string(&Value::from(200), false), "200");
        assert_eq!(to_string(&Value::from(-0.5), false), "-0.5");
        assert_eq!(to_string(&Value::from(1e20), false), "100000000000000000000");
        assert_eq!(to_string(&Value::from(f64::NAN), false), "null");

        for n in [0.1, 1.0 / 3.0, 1e-7, 123456.789, 1e300, -2.5e-300] {
            let text = to_string(&Value::from(n), false);
            assert_eq!(parse(&text).unwrap().as_f64().unwrap(), n, "{text}");
        }
    }

    #[test]
    fn test_string_escaping() {
        let value = Value::from("quote \" slash \\ nl \n tab \t bell \u{7}");
        let text = to_string(&value, false);
        assert_eq!(text, r#""quote \" slash \\ nl \n tab \t bell \u0007""#);
        assert_eq!(parse(&text).unwrap(), value);
    }

    #[test]
    fn test_save_to_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");

        save_to_file(&path, &sample(), true).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(parse(&text).unwrap(), sample());

        let missing = dir.path().join("no_such_dir").join("out.json");
        assert!(save_to_file(&missing, &sample(), false).is_err());
    }
}
