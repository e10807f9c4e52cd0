//! Recursive-descent JSON parsing.

use crate::error::{Error, Result};
use crate::value::{Map, Value};

/// Default maximum nesting depth of arrays and objects.
pub const DEFAULT_MAX_DEPTH: usize = 128;

/// Configuration for the JSON parser.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ParserConfig {
    /// Nesting depth at which parsing fails instead of recursing further (default: 128).
    pub max_depth: usize,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

/// A single-pass JSON parser.
///
/// The parser walks the input once with a byte cursor. Every error carries the
/// cursor position at the point of failure.
#[derive(Debug, Clone, Default)]
pub struct Parser {
    config: ParserConfig,
}

impl Parser {
    /// Create a parser with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: ParserConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parse a complete JSON document.
    ///
    /// Whitespace may surround the value; any other trailing text is an error.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rsal::Parser;
    ///
    /// let value = Parser::new().parse(r#"{"a": 1, "b": [1, 2, 3]}"#)?;
    /// assert_eq!(value.get("b")?.len()?, 3);
    ///
    /// let err = Parser::new().parse("[1, 2,]").unwrap_err();
    /// assert_eq!(err.position(), Some(6));
    /// # Ok::<(), rsal::Error>(())
    /// ```
    pub fn parse(&self, text: &str) -> Result<Value> {
        let mut cursor = Cursor::new(text, self.config.max_depth);
        let value = cursor.parse_value()?;
        cursor.skip_whitespace();

        if cursor.pos != cursor.bytes.len() {
            return Err(Error::parse_error_with_context(
                cursor.pos,
                "unexpected trailing characters",
                cursor.snippet(),
            ));
        }

        Ok(value)
    }
}

/// Parse a JSON document with the default configuration.
pub fn parse(text: &str) -> Result<Value> {
    Parser::new().parse(text)
}

/// Check that `text` is a well-formed JSON document.
pub fn validate(text: &str) -> Result<()> {
    parse(text).map(|_| ())
}

struct Cursor<'a> {
    text: &'a str,
    bytes: &'a [u8],
    pos: usize,
    depth: usize,
    max_depth: usize,
}

impl<'a> Cursor<'a> {
    fn new(text: &'a str, max_depth: usize) -> Self {
        Self {
            text,
            bytes: text.as_bytes(),
            pos: 0,
            depth: 0,
            max_depth,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.bytes.get(self.pos).copied()
    }

    /// Up to a few characters starting at the cursor, for error context.
    fn snippet(&self) -> String {
        self.text
            .get(self.pos..)
            .unwrap_or_default()
            .chars()
            .take(8)
            .collect()
    }

    fn skip_whitespace(&mut self) {
        while let Some(b' ' | b'\t' | b'\n' | b'\r') = self.peek() {
            self.pos += 1;
        }
    }

    fn parse_value(&mut self) -> Result<Value> {
        self.skip_whitespace();

        match self.peek() {
            None => Err(Error::parse_error(self.pos, "unexpected end of input")),
            Some(b'{') => self.parse_object(),
            Some(b'[') => self.parse_array(),
            Some(b'"') => self.parse_string().map(Value::String),
            Some(b'-' | b'0'..=b'9') => self.parse_number(),
            Some(b't' | b'f' | b'n') => self.parse_keyword(),
            Some(_) => Err(Error::parse_error_with_context(
                self.pos,
                "unexpected character",
                self.snippet(),
            )),
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        if self.depth > self.max_depth {
            return Err(Error::parse_error(self.pos, "maximum nesting depth exceeded"));
        }
        Ok(())
    }

    fn parse_object(&mut self) -> Result<Value> {
        self.enter()?;
        self.pos += 1; // '{'
        self.skip_whitespace();

        let mut map = Map::new();

        if self.peek() == Some(b'}') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Object(map));
        }

        loop {
            self.skip_whitespace();
            if self.peek() != Some(b'"') {
                return Err(Error::parse_error(self.pos, "expected string key"));
            }
            let key = self.parse_string()?;

            self.skip_whitespace();
            if self.peek() != Some(b':') {
                return Err(Error::parse_error(self.pos, "expected ':' after object key"));
            }
            self.pos += 1;

            let value = self.parse_value()?;
            // Duplicate keys: the last occurrence wins.
            map.insert(key, value);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b'}') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(Error::parse_error(self.pos, "unexpected end of input")),
                Some(_) => {
                    return Err(Error::parse_error_with_context(
                        self.pos,
                        "expected ',' or '}'",
                        self.snippet(),
                    ))
                }
            }
        }

        self.depth -= 1;
        Ok(Value::Object(map))
    }

    fn parse_array(&mut self) -> Result<Value> {
        self.enter()?;
        self.pos += 1; // '['
        self.skip_whitespace();

        let mut items = Vec::new();

        if self.peek() == Some(b']') {
            self.pos += 1;
            self.depth -= 1;
            return Ok(Value::Array(items));
        }

        loop {
            items.push(self.parse_value()?);

            self.skip_whitespace();
            match self.peek() {
                Some(b',') => self.pos += 1,
                Some(b']') => {
                    self.pos += 1;
                    break;
                }
                None => return Err(Error::parse_error(self.pos, "unexpected end of input")),
                Some(_) => {
                    return Err(Error::parse_error_with_context(
                        self.pos,
                        "expected ',' or ']'",
                        self.snippet(),
                    ))
                }
            }
        }

        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn parse_string(&mut self) -> Result<String> {
        self.pos += 1; // opening quote
        let mut out = String::new();

        loop {
            let run = self.bytes[self.pos..]
                .iter()
                .position(|&b| b == b'"' || b == b'\\' || b < 0x20);

            let Some(offset) = run else {
                return Err(Error::parse_error(self.bytes.len(), "unterminated string"));
            };

            // Every stop byte is ASCII, so the slice ends on a char boundary.
            out.push_str(&self.text[self.pos..self.pos + offset]);
            self.pos += offset;

            match self.bytes[self.pos] {
                b'"' => {
                    self.pos += 1;
                    return Ok(out);
                }
                b'\\' => {}
                _ => {
                    return Err(Error::parse_error(
                        self.pos,
                        "unescaped control character in string",
                    ))
                }
            }

            self.pos += 1; // backslash
            self.parse_escape(&mut out)?;
        }
    }

    fn parse_escape(&mut self, out: &mut String) -> Result<()> {
        let Some(c) = self.peek() else {
            return Err(Error::parse_error(self.pos, "unterminated escape sequence"));
        };

        let decoded = match c {
            b'"' => '"',
            b'\\' => '\\',
            b'/' => '/',
            b'b' => '\u{8}',
            b'f' => '\u{c}',
            b'n' => '\n',
            b'r' => '\r',
            b't' => '\t',
            b'u' => {
                self.pos += 1;
                out.push(self.parse_unicode_escape()?);
                return Ok(());
            }
            _ => {
                return Err(Error::parse_error_with_context(
                    self.pos,
                    "invalid escape sequence",
                    self.snippet(),
                ))
            }
        };

        self.pos += 1;
        out.push(decoded);
        Ok(())
    }

    /// Decode the code point of a `\u` escape; the cursor sits on the first hex digit.
    fn parse_unicode_escape(&mut self) -> Result<char> {
        let first = self.read_hex4()?;

        if (0xD800..0xDC00).contains(&first) {
            // High surrogate: only a directly following low surrogate completes it.
            if self.bytes[self.pos..].starts_with(b"\\u") {
                let save = self.pos;
                self.pos += 2;
                let second = self.read_hex4()?;
                if (0xDC00..0xE000).contains(&second) {
                    let code = 0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                    return Ok(char::from_u32(code).unwrap_or(char::REPLACEMENT_CHARACTER));
                }
                self.pos = save;
            }
            return Ok(char::REPLACEMENT_CHARACTER);
        }

        Ok(char::from_u32(first).unwrap_or(char::REPLACEMENT_CHARACTER))
    }

    fn read_hex4(&mut self) -> Result<u32> {
        let start = self.pos;
        let digits = self
            .bytes
            .get(start..start + 4)
            .ok_or_else(|| Error::parse_error(start, "incomplete unicode escape"))?;

        let mut code = 0u32;
        for (i, &b) in digits.iter().enumerate() {
            let digit = (b as char).to_digit(16).ok_or_else(|| {
                Error::parse_error_with_context(start + i, "invalid unicode escape", self.snippet())
            })?;
            code = code * 16 + digit;
        }

        self.pos += 4;
        Ok(code)
    }

    fn consume_digits(&mut self) -> usize {
        let start = self.pos;
        while let Some(b'0'..=b'9') = self.peek() {
            self.pos += 1;
        }
        self.pos - start
    }

    fn parse_number(&mut self) -> Result<Value> {
        let start = self.pos;

        if self.peek() == Some(b'-') {
            self.pos += 1;
        }

        match self.peek() {
            Some(b'0') => {
                self.pos += 1;
                if let Some(b'0'..=b'9') = self.peek() {
                    return Err(Error::parse_error(self.pos, "leading zeros are not allowed"));
                }
            }
            Some(b'1'..=b'9') => {
                self.consume_digits();
            }
            _ => return Err(Error::parse_error(self.pos, "expected digit")),
        }

        if self.peek() == Some(b'.') {
            self.pos += 1;
            if self.consume_digits() == 0 {
                return Err(Error::parse_error(self.pos, "expected digit after decimal point"));
            }
        }

        if let Some(b'e' | b'E') = self.peek() {
            self.pos += 1;
            if let Some(b'+' | b'-') = self.peek() {
                self.pos += 1;
            }
            if self.consume_digits() == 0 {
                return Err(Error::parse_error(self.pos, "expected digit in exponent"));
            }
        }

        let literal = &self.text[start..self.pos];
        match literal.parse::<f64>() {
            Ok(n) if n.is_finite() => Ok(Value::Number(n)),
            Ok(_) => Err(Error::parse_error_with_context(start, "number out of range", literal)),
            Err(_) => Err(Error::parse_error_with_context(start, "invalid number", literal)),
        }
    }

    fn parse_keyword(&mut self) -> Result<Value> {
        let rest = &self.bytes[self.pos..];

        let (value, len) = if rest.starts_with(b"true") {
            (Value::Bool(true), 4)
        } else if rest.starts_with(b"false") {
            (Value::Bool(false), 5)
        } else if rest.starts_with(b"null") {
            (Value::Null, 4)
        } else {
            return Err(Error::parse_error_with_context(
                self.pos,
                "invalid literal",
                self.snippet(),
            ));
        };

        self.pos += len;
        Ok(value)
    }
}
