//! Web-server access records and their field validators.

use crate::error::{Error, Result};
use crate::value::{Map, Value, ValueKind};
use chrono::{DateTime, NaiveDateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::str::FromStr;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Object key holding the timestamp.
pub const KEY_TIMESTAMP: &str = "ts";
/// Object key holding the client IPv4 address.
pub const KEY_IP: &str = "ip";
/// Object key holding the HTTP method.
pub const KEY_METHOD: &str = "method";
/// Object key holding the request URL.
pub const KEY_URL: &str = "url";
/// Object key holding the HTTP status code.
pub const KEY_STATUS: &str = "status";

/// `chrono` format string of the timestamp profile `YYYY-MM-DDTHH:MM:SSZ`.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

static TIMESTAMP_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^[0-9]{4}-(0[1-9]|1[0-2])-(0[1-9]|[12][0-9]|3[01])T([01][0-9]|2[0-3]):[0-5][0-9]:[0-5][0-9]Z$",
    )
    .expect("timestamp pattern is valid")
});

static IPV4_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})\.([0-9]{1,3})$")
        .expect("ipv4 pattern is valid")
});

/// HTTP methods accepted in access records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "UPPERCASE"))]
pub enum Method {
    Get,
    Post,
    Put,
    Delete,
    Head,
    Options,
    Patch,
    Connect,
    Trace,
}

impl Method {
    pub const ALL: [Method; 9] = [
        Method::Get,
        Method::Post,
        Method::Put,
        Method::Delete,
        Method::Head,
        Method::Options,
        Method::Patch,
        Method::Connect,
        Method::Trace,
    ];

    /// The canonical upper-case name.
    pub fn as_str(self) -> &'static str {
        match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Delete => "DELETE",
            Method::Head => "HEAD",
            Method::Options => "OPTIONS",
            Method::Patch => "PATCH",
            Method::Connect => "CONNECT",
            Method::Trace => "TRACE",
        }
    }
}

impl FromStr for Method {
    type Err = Error;

    /// Case-insensitive: `get`, `Get` and `GET` all parse to [`Method::Get`].
    fn from_str(s: &str) -> Result<Self> {
        Method::ALL
            .into_iter()
            .find(|m| m.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::invalid_field(KEY_METHOD, s, "unknown HTTP method"))
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Check that a timestamp matches `YYYY-MM-DDTHH:MM:SSZ`.
///
/// Each component is range-checked (month 01-12, day 01-31, hour 00-23,
/// minute and second 00-59). Day-of-month is not checked against the month.
pub fn validate_timestamp(ts: &str) -> bool {
    TIMESTAMP_PATTERN.is_match(ts)
}

/// Check for four dot-separated decimal octets, each in 0-255.
pub fn validate_ip(ip: &str) -> bool {
    let Some(captures) = IPV4_PATTERN.captures(ip) else {
        return false;
    };

    captures
        .iter()
        .skip(1)
        .all(|octet| octet.is_some_and(|m| m.as_str().parse::<u16>().is_ok_and(|n| n <= 255)))
}

/// Check that a method names one of [`Method::ALL`], ignoring case.
pub fn validate_method(method: &str) -> bool {
    method.parse::<Method>().is_ok()
}

/// Check that a status code lies in 100-599.
pub fn validate_status(status: i32) -> bool {
    (100..=599).contains(&status)
}

/// Parse a timestamp in the record profile into a UTC date-time.
///
/// Returns `None` for text outside the profile or for impossible dates
/// such as February 30th.
pub fn parse_timestamp(ts: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(ts, TIMESTAMP_FORMAT)
        .ok()
        .map(|dt| dt.and_utc())
}

/// A single web-server access record.
///
/// Fields are fixed at construction. An entry can be built from any values;
/// [`Entry::is_valid`] reports whether every field passes its validator.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Entry {
    #[cfg_attr(feature = "serde", serde(rename = "ts"))]
    timestamp: String,
    ip: String,
    method: String,
    url: String,
    status: i32,
}

impl Entry {
    /// Create a new entry from its five fields.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rsal::Entry;
    ///
    /// let entry = Entry::new("2025-03-14T12:03:21Z", "192.168.1.1", "GET", "/index.html", 200);
    /// assert!(entry.is_valid());
    ///
    /// let entry = Entry::new("2025-03-14T12:03:21Z", "256.168.1.1", "GET", "/index.html", 200);
    /// assert!(!entry.is_valid());
    /// ```
    pub fn new(
        timestamp: impl Into<String>,
        ip: impl Into<String>,
        method: impl Into<String>,
        url: impl Into<String>,
        status: i32,
    ) -> Self {
        Self {
            timestamp: timestamp.into(),
            ip: ip.into(),
            method: method.into(),
            url: url.into(),
            status,
        }
    }

    /// Build an entry from a parsed object with keys `ts`, `ip`, `method`, `url`, `status`.
    ///
    /// # Returns
    ///
    /// The entry, or an error if the value is not an object, a key is missing,
    /// a field has the wrong type, or `status` does not fit an `i32`. A
    /// fractional `status` is truncated. The entry is not validated.
    pub fn from_value(value: &Value) -> Result<Self> {
        let timestamp = value.get(KEY_TIMESTAMP)?.as_str()?;
        let ip = value.get(KEY_IP)?.as_str()?;
        let method = value.get(KEY_METHOD)?.as_str()?;
        let url = value.get(KEY_URL)?.as_str()?;
        let status = status_from_number(value.get(KEY_STATUS)?.as_f64()?)?;

        Ok(Self::new(timestamp, ip, method, url, status))
    }

    /// The export shape: an object with keys `ts`, `ip`, `method`, `url`, `status`.
    pub fn to_value(&self) -> Value {
        let mut map = Map::new();
        map.insert(KEY_TIMESTAMP.to_string(), Value::from(self.timestamp.as_str()));
        map.insert(KEY_IP.to_string(), Value::from(self.ip.as_str()));
        map.insert(KEY_METHOD.to_string(), Value::from(self.method.as_str()));
        map.insert(KEY_URL.to_string(), Value::from(self.url.as_str()));
        map.insert(KEY_STATUS.to_string(), Value::from(self.status));
        Value::Object(map)
    }

    pub fn timestamp(&self) -> &str {
        &self.timestamp
    }

    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn status(&self) -> i32 {
        self.status
    }

    /// The method as a [`Method`], if it is one of the accepted names.
    pub fn method_kind(&self) -> Option<Method> {
        self.method.parse().ok()
    }

    /// The timestamp as a UTC date-time, if it parses.
    pub fn parsed_timestamp(&self) -> Option<DateTime<Utc>> {
        parse_timestamp(&self.timestamp)
    }

    /// Whether all four field validators accept this entry.
    pub fn is_valid(&self) -> bool {
        validate_timestamp(&self.timestamp)
            && validate_ip(&self.ip)
            && validate_method(&self.method)
            && validate_status(self.status)
    }
}

impl TryFrom<&Value> for Entry {
    type Error = Error;

    fn try_from(value: &Value) -> Result<Self> {
        Entry::from_value(value)
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Timestamp: {}", self.timestamp)?;
        writeln!(f, "IP: {}", self.ip)?;
        writeln!(f, "Method: {}", self.method)?;
        writeln!(f, "URL: {}", self.url)?;
        write!(f, "Status: {}", self.status)
    }
}

/// Truncate a numeric status toward zero; [`validate_status`] judges the result.
fn status_from_number(n: f64) -> Result<i32> {
    let truncated = n.trunc();
    if !truncated.is_finite() || truncated < f64::from(i32::MIN) || truncated > f64::from(i32::MAX) {
        return Err(Error::invalid_field(KEY_STATUS, n.to_string(), "out of range for a status code"));
    }
    Ok(truncated as i32)
}

/// Convert a parsed document into entries, dropping elements that do not fit.
///
/// The document is either an array of objects or a single object. Elements
/// that are not objects, miss a key, carry a field of the wrong type, or
/// fail [`Entry::is_valid`] are skipped; the rest keep their order.
///
/// # Returns
///
/// The accepted entries, or [`Error::TypeMismatch`] if the document is
/// neither an array nor an object.
pub fn entries_from_value(value: &Value) -> Result<Vec<Entry>> {
    let items = match value {
        Value::Array(items) => items.as_slice(),
        Value::Object(_) => std::slice::from_ref(value),
        other => return Err(Error::type_mismatch(ValueKind::Array, other.kind())),
    };

    let mut entries = Vec::with_capacity(items.len());
    let mut malformed = 0usize;
    let mut invalid = 0usize;

    for (index, item) in items.iter().enumerate() {
        match Entry::from_value(item) {
            Ok(entry) if entry.is_valid() => entries.push(entry),
            Ok(entry) => {
                invalid += 1;
                debug!(index, ip = entry.ip(), timestamp = entry.timestamp(), "skipping record that fails validation");
            }
            Err(err) => {
                malformed += 1;
                debug!(index, error = %err, "skipping malformed record");
            }
        }
    }

    debug!(accepted = entries.len(), malformed, invalid, "converted log records");
    Ok(entries)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;

    fn valid_entry() -> Entry {
        Entry::new("2025-03-14T12:03:21Z", "192.168.1.1", "GET", "/index.html", 200)
    }

    #[test]
    fn test_timestamp_validation() {
        assert!(validate_timestamp("2025-03-14T12:03:21Z"));
        assert!(validate_timestamp("2024-12-31T23:59:59Z"));
        assert!(validate_timestamp("2023-01-01T00:00:00Z"));

        assert!(!validate_timestamp("2025-03-14T12:03:21")); // no Z
        assert!(!validate_timestamp("2025-03-14 12:03:21Z")); // space instead of T
        assert!(!validate_timestamp("2025-13-14T12:03:21Z"));
        assert!(!validate_timestamp("2025-13-01T00:00:00Z"));
        assert!(!validate_timestamp("2025-00-14T12:03:21Z"));
        assert!(!validate_timestamp("2025-03-32T12:03:21Z"));
        assert!(!validate_timestamp("2025-03-14T25:03:21Z"));
        assert!(!validate_timestamp("2025-03-14T12:60:21Z"));
        assert!(!validate_timestamp("2025-03-14T12:03:61Z"));
        assert!(!validate_timestamp(""));
        assert!(!validate_timestamp("invalid"));
        assert!(!validate_timestamp("2025-03-14T12:03:21Z "));
    }

    #[test]
    fn test_ip_validation() {
        assert!(validate_ip("192.168.1.1"));
        assert!(validate_ip("10.0.0.1"));
        assert!(validate_ip("255.255.255.255"));
        assert!(validate_ip("0.0.0.0"));

        assert!(!validate_ip("256.168.1.1"));
        assert!(!validate_ip("192.168.1.256"));
        assert!(!validate_ip("192.168.1"));
        assert!(!validate_ip("192.168.1.1.1"));
        assert!(!validate_ip("192.168.1.1a"));
        assert!(!validate_ip("1234.1.1.1"));
        assert!(!validate_ip(""));
        assert!(!validate_ip("localhost"));
    }

    #[test]
    fn test_method_validation() {
        assert!(validate_method("GET"));
        assert!(validate_method("get"));
        assert!(validate_method("Get"));
        for method in Method::ALL {
            assert!(validate_method(method.as_str()));
            assert!(validate_method(&method.as_str().to_lowercase()));
        }

        assert!(!validate_method("INVALID"));
        assert!(!validate_method(""));
        assert!(!validate_method("GETS"));
        assert!(!validate_method(" GET"));
    }

    #[test]
    fn test_method_parse() {
        assert_eq!("delete".parse::<Method>().unwrap(), Method::Delete);
        assert_eq!(Method::Options.to_string(), "OPTIONS");
        assert!(matches!(
            "FETCH".parse::<Method>().unwrap_err(),
            Error::InvalidField { .. }
        ));
    }

    #[test]
    fn test_status_validation() {
        assert!(validate_status(100));
        assert!(validate_status(200));
        assert!(validate_status(599));
        assert!(!validate_status(99));
        assert!(!validate_status(600));
        assert!(!validate_status(-1));
    }

    #[test]
    fn test_entry_validity() {
        assert!(valid_entry().is_valid());
        assert!(!Entry::new("2025-13-14T12:03:21Z", "192.168.1.1", "GET", "/", 200).is_valid());
        assert!(!Entry::new("2025-03-14T12:03:21Z", "256.168.1.1", "GET", "/", 200).is_valid());
        assert!(!Entry::new("2025-03-14T12:03:21Z", "192.168.1.1", "INVALID", "/", 200).is_valid());
        assert!(!Entry::new("2025-03-14T12:03:21Z", "192.168.1.1", "GET", "/", 999).is_valid());
    }

    #[test]
    fn test_accessors_and_display() {
        let entry = valid_entry();
        assert_eq!(entry.timestamp(), "2025-03-14T12:03:21Z");
        assert_eq!(entry.ip(), "192.168.1.1");
        assert_eq!(entry.method_kind(), Some(Method::Get));
        assert_eq!(entry.url(), "/index.html");
        assert_eq!(entry.status(), 200);

        let text = entry.to_string();
        assert!(text.contains("IP: 192.168.1.1"));
        assert!(text.ends_with("Status: 200"));
    }

    #[test]
    fn test_parsed_timestamp() {
        let dt = valid_entry().parsed_timestamp().unwrap();
        assert_eq!(dt.timestamp(), 1_741_953_801);

        // Passes the pattern but is not a real date.
        assert!(validate_timestamp("2025-02-30T00:00:00Z"));
        assert!(parse_timestamp("2025-02-30T00:00:00Z").is_none());
        assert!(parse_timestamp("yesterday").is_none());
    }

    #[test]
    fn test_value_round_trip() {
        let entry = valid_entry();
        let value = entry.to_value();
        assert_eq!(value.get("ts").unwrap().as_str().unwrap(), "2025-03-14T12:03:21Z");
        assert_eq!(value.get("status").unwrap().as_f64().unwrap(), 200.0);
        assert_eq!(Entry::from_value(&value).unwrap(), entry);
        assert_eq!(Entry::try_from(&value).unwrap(), entry);
    }

    #[test]
    fn test_from_value_errors() {
        let missing = parse(r#"{"ts":"2025-03-14T12:03:21Z","ip":"1.2.3.4","method":"GET","url":"/"}"#).unwrap();
        assert!(matches!(
            Entry::from_value(&missing).unwrap_err(),
            Error::FieldNotFound { .. }
        ));

        let text_status = parse(r#"{"ts":"t","ip":"i","method":"m","url":"/","status":"200"}"#).unwrap();
        assert!(matches!(
            Entry::from_value(&text_status).unwrap_err(),
            Error::TypeMismatch { .. }
        ));

        let huge = parse(r#"{"ts":"t","ip":"i","method":"m","url":"/","status":1e12}"#).unwrap();
        assert!(matches!(
            Entry::from_value(&huge).unwrap_err(),
            Error::InvalidField { .. }
        ));

        assert!(Entry::from_value(&Value::from(1)).is_err());
    }

    #[test]
    fn test_fractional_status_is_truncated() {
        let fractional = parse(r#"{"ts":"t","ip":"i","method":"m","url":"/","status":200.5}"#).unwrap();
        assert_eq!(Entry::from_value(&fractional).unwrap().status(), 200);

        let negative = parse(r#"{"ts":"t","ip":"i","method":"m","url":"/","status":-0.9}"#).unwrap();
        assert_eq!(Entry::from_value(&negative).unwrap().status(), 0);

        let text = r#"[{"ts":"2025-03-14T12:00:00Z","ip":"1.2.3.4","method":"GET","url":"/","status":200.5}]"#;
        let entries = entries_from_value(&parse(text).unwrap()).unwrap();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].status(), 200);
    }

    #[test]
    fn test_entries_from_value_is_lenient() {
        let text = r#"[
            {"ts":"2025-03-14T12:03:21Z","ip":"192.168.1.1","method":"GET","url":"/index.html","status":200},
            {"ts":"2025-03-14T12:03:22Z","ip":"192.168.1.2","method":"POST","url":"/login"},
            {"ts":"2025-03-14T12:03:23Z","ip":"192.168.1.3","method":"GET","url":"/a","status":"500"},
            "not an object",
            {"ts":"2025-03-14T12:03:24Z","ip":"999.0.0.1","method":"GET","url":"/b","status":200},
            {"ts":"2025-03-14T12:03:25Z","ip":"10.0.0.1","method":"delete","url":"/c","status":204}
        ]"#;

        let entries = entries_from_value(&parse(text).unwrap()).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].ip(), "192.168.1.1");
        assert_eq!(entries[1].method(), "delete");
    }

    #[test]
    fn test_entries_from_single_object() {
        let value = valid_entry().to_value();
        let entries = entries_from_value(&value).unwrap();
        assert_eq!(entries, vec![valid_entry()]);
    }

    #[test]
    fn test_entries_from_scalar_fails() {
        let err = entries_from_value(&Value::from("text")).unwrap_err();
        assert!(matches!(
            err,
            Error::TypeMismatch {
                expected: ValueKind::Array,
                found: ValueKind::String
            }
        ));
        assert!(entries_from_value(&Value::array()).unwrap().is_empty());
    }
}
