//! # rsal - Rust Access Log analyzer
//!
//! A Rust library for reading web-server access logs stored as JSON and answering
//! questions about them.
//!
//! This library provides functionality to:
//! - Parse JSON text into a dynamic [`Value`] tree with precise error positions
//! - Serialize values back to compact or indented JSON
//! - Validate access-log records (timestamp, IPv4 address, HTTP method, status)
//! - Rank, filter, aggregate and export records with [`Analyzer`]
//!
//! ## Quick Start
//!
//! ```rust
//! use rsal::{parse, Analyzer};
//!
//! let log = r#"[
//!     {"ts": "2025-03-14T12:03:21Z", "ip": "10.0.0.1", "method": "GET", "url": "/", "status": 200},
//!     {"ts": "2025-03-14T12:03:25Z", "ip": "10.0.0.1", "method": "GET", "url": "/missing", "status": 404},
//!     {"ts": "bogus", "ip": "10.0.0.2", "method": "GET", "url": "/", "status": 200}
//! ]"#;
//!
//! let mut analyzer = Analyzer::new();
//! let loaded = analyzer.load_from_value(&parse(log)?)?;
//! assert_eq!(loaded, 2);
//!
//! assert_eq!(analyzer.top_ips(1), vec![("10.0.0.1".to_string(), 2)]);
//! assert_eq!(analyzer.filter_by_status(404).len(), 1);
//! assert_eq!(analyzer.statistics().requests_per_second, 0.5);
//! # Ok::<(), rsal::Error>(())
//! ```
//!
//! ## Features
//!
//! - **Strict JSON Parsing**: Leading zeros, trailing commas and bare words are rejected
//! - **Lenient Record Loading**: Malformed or invalid records are skipped, not fatal
//! - **Optional Index**: [`Analyzer::build_index`] speeds up IP and time-range lookups
//! - **Error Handling**: Comprehensive error types using `thiserror`
//! - **Logging**: Diagnostics are emitted through `tracing`
//! - **Optional Serde Support**: Serialize/deserialize records and reports when the `serde` feature is enabled

pub mod analyzer;
pub mod entry;
pub mod error;
pub mod parser;
pub mod reader;
pub mod value;
pub mod writer;

// Re-export main types for convenience
pub use analyzer::{Analyzer, AnalyzerConfig, AnomalyReport, Statistics, TimeRange};
pub use entry::{Entry, Method};
pub use error::{Error, Result};
pub use parser::{parse, validate, Parser, ParserConfig};
pub use reader::load_from_file;
pub use value::{Map, Value, ValueKind};
pub use writer::{save_to_file, to_string};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_end_to_end() {
        let text = r#"[
            {"ts": "2025-03-14T12:00:00Z", "ip": "192.168.1.1", "method": "GET", "url": "/a", "status": 200},
            {"ts": "2025-03-14T12:00:05Z", "ip": "192.168.1.2", "method": "POST", "url": "/b", "status": 500}
        ]"#;
        assert!(validate(text).is_ok());

        let mut analyzer = Analyzer::new();
        assert_eq!(analyzer.load_from_value(&parse(text).unwrap()).unwrap(), 2);

        let stats = analyzer.statistics();
        assert_eq!(stats.total_requests, 2);
        assert_eq!(stats.unique_ips, 2);
        assert_eq!(analyzer.detect_anomalies().failed_requests.len(), 1);
    }

    #[test]
    fn test_round_trip_through_text() {
        let value = parse(r#"{"list": [1, 2.5, "x", true, null], "nested": {"k": []}}"#).unwrap();
        assert_eq!(parse(&to_string(&value, false)).unwrap(), value);
        assert_eq!(parse(&to_string(&value, true)).unwrap(), value);
        assert_eq!(value.to_string(), to_string(&value, false));
    }
}
