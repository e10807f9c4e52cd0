//! Basic usage example for the rsal library.
//!
//! This example loads a small access log, runs the common queries over it and
//! exports the records. Set `RUST_LOG=debug` to see the library's diagnostics.

use rsal::{parse, Analyzer, Entry, Error};
use tracing_subscriber::{fmt, EnvFilter};

const SAMPLE_LOG: &str = r#"[
    {"ts": "2025-03-14T12:03:21Z", "ip": "192.168.1.1", "method": "GET",  "url": "/index.html",       "status": 200},
    {"ts": "2025-03-14T12:03:22Z", "ip": "192.168.1.1", "method": "GET",  "url": "/missing",          "status": 404},
    {"ts": "2025-03-14T12:03:25Z", "ip": "10.0.0.7",    "method": "POST", "url": "/api/login",        "status": 401},
    {"ts": "2025-03-14T12:03:31Z", "ip": "10.0.0.7",    "method": "POST", "url": "/api/login",        "status": 200},
    {"ts": "2025-03-14T12:04:02Z", "ip": "192.168.1.1", "method": "GET",  "url": "/search?q=rust",    "status": 200},
    {"ts": "2025-03-14T12:04:10Z", "ip": "172.16.0.3",  "method": "DELETE", "url": "/api/items/9",    "status": 500},
    {"ts": "not a time",           "ip": "172.16.0.3",  "method": "GET",  "url": "/",                 "status": 200}
]"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt().with_env_filter(filter).init();

    println!("=== rsal Basic Usage Example ===\n");

    // Example 1: Loading records
    let mut analyzer = loading_example()?;

    // Example 2: Rankings and filters
    query_example(&mut analyzer);

    // Example 3: Statistics and anomalies
    statistics_example(&analyzer);

    // Example 4: Export
    export_example(&analyzer)?;

    // Example 5: Error handling
    error_handling_example();

    Ok(())
}

/// Example 1: Parse the log text and load the valid records
fn loading_example() -> Result<Analyzer, Error> {
    println!("1. Loading Records");
    println!("------------------");

    let document = parse(SAMPLE_LOG)?;
    let mut analyzer = Analyzer::new();
    let loaded = analyzer.load_from_value(&document)?;
    println!("Loaded {} of {} records\n", loaded, document.len()?);

    let manual = Entry::new("2025-03-14T12:05:00Z", "10.0.0.7", "PUT", "/api/items/9", 204);
    println!("Adding a record by hand:\n{}\n", manual);
    analyzer.add_entry(manual);

    Ok(analyzer)
}

/// Example 2: Rankings and filters, before and after building the index
fn query_example(analyzer: &mut Analyzer) {
    println!("2. Rankings and Filters");
    println!("-----------------------");

    for (ip, count) in analyzer.top_ips(3) {
        println!("  {:<15} {} requests", ip, count);
    }
    for (path, count) in analyzer.top_paths(0) {
        println!("  {:<15} {} requests", path, count);
    }

    analyzer.build_index();
    let window = analyzer.filter_by_time_range("2025-03-14T12:03:00Z", "2025-03-14T12:03:59Z");
    println!("Records between 12:03 and 12:04: {}", window.len());
    println!("Records from 10.0.0.7: {}", analyzer.filter_by_ip("10.0.0.7").len());
    println!("POST requests: {}", analyzer.filter_by_method("post").len());
    println!("API requests: {}\n", analyzer.filter_by_url("/api/").len());
}

/// Example 3: Aggregate figures and anomaly detection
fn statistics_example(analyzer: &Analyzer) {
    println!("3. Statistics");
    println!("-------------");

    let stats = analyzer.statistics();
    println!("Total requests: {}", stats.total_requests);
    println!("Unique IPs:     {}", stats.unique_ips);
    println!("Unique URLs:    {}", stats.unique_urls);
    println!("Time range:     {} .. {}", stats.time_range.start, stats.time_range.end);
    println!("Requests/sec:   {:.4}", stats.requests_per_second);
    for (status, count) in &stats.status_counts {
        println!("  status {}: {}", status, count);
    }

    let report = analyzer.detect_anomalies();
    println!("Failed requests: {}", report.failed_requests.len());
    println!("Suspicious IPs:  {:?}", report.suspicious_ips);
    println!("Requests in busy minutes: {}\n", analyzer.find_busy_periods(60, 4).len());
}

/// Example 4: Write the records as JSON and delimited text
fn export_example(analyzer: &Analyzer) -> Result<(), Error> {
    println!("4. Export");
    println!("---------");

    let mut csv = Vec::new();
    analyzer.write_csv(&mut csv)?;
    print!("{}", String::from_utf8_lossy(&csv));

    let mut json = Vec::new();
    analyzer.write_json(&mut json, false)?;
    println!("Compact JSON is {} bytes\n", json.len());
    Ok(())
}

/// Example 5: Malformed input reports where it went wrong
fn error_handling_example() {
    println!("5. Error Handling");
    println!("-----------------");

    for input in ["{", "[1, 2,}", r#"{"key": value}"#, "[01]"] {
        match parse(input) {
            Ok(value) => println!("  {:<16} parsed: {}", input, value),
            Err(err) => println!("  {:<16} error: {}", input, err),
        }
    }
}
