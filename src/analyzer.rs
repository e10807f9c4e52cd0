//! Queries over an in-memory collection of access records.

use crate::entry::{entries_from_value, parse_timestamp, Entry};
use crate::error::{Error, Result};
use crate::parser::{Parser, ParserConfig};
use crate::reader;
use crate::value::Value;
use crate::writer;
use std::collections::{BTreeMap, HashMap, HashSet};
use std::fs::File;
use std::hash::Hash;
use std::io::{BufWriter, Write};
use std::ops::Bound;
use std::path::Path;
use tracing::{debug, info, warn};

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Status codes at or above this count as failed requests by default.
pub const DEFAULT_FAILED_STATUS_THRESHOLD: i32 = 400;

/// IPs with more requests than this are suspicious by default.
pub const DEFAULT_SUSPICIOUS_IP_THRESHOLD: usize = 100;

/// Header row of the delimited-text export.
pub const CSV_HEADER: &str = "timestamp,ip,method,url,status";

/// `(key, count)` pairs ordered by count, highest first.
pub type Ranking = Vec<(String, usize)>;

/// Configuration for an [`Analyzer`].
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct AnalyzerConfig {
    /// Parser settings used when loading files.
    pub parser: ParserConfig,
    /// Threshold used by [`Analyzer::detect_anomalies`] for failed requests (default: 400).
    pub failed_status_threshold: i32,
    /// Threshold used by [`Analyzer::detect_anomalies`] for suspicious IPs (default: 100).
    pub suspicious_ip_threshold: usize,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            parser: ParserConfig::default(),
            failed_status_threshold: DEFAULT_FAILED_STATUS_THRESHOLD,
            suspicious_ip_threshold: DEFAULT_SUSPICIOUS_IP_THRESHOLD,
        }
    }
}

/// Lexicographically smallest and largest timestamps of a record set.
///
/// Both ends are empty when there are no records.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TimeRange {
    pub start: String,
    pub end: String,
}

impl TimeRange {
    pub fn is_empty(&self) -> bool {
        self.start.is_empty() && self.end.is_empty()
    }

    /// Seconds between `start` and `end`, if both parse as timestamps.
    pub fn span_seconds(&self) -> Option<i64> {
        let start = parse_timestamp(&self.start)?;
        let end = parse_timestamp(&self.end)?;
        Some((end - start).num_seconds())
    }
}

/// Aggregate view of a record set.
#[derive(Debug, Clone, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Statistics {
    pub total_requests: usize,
    pub unique_ips: usize,
    pub unique_urls: usize,
    pub time_range: TimeRange,
    pub status_counts: BTreeMap<i32, usize>,
    pub method_counts: BTreeMap<String, usize>,
    /// Total requests divided by the seconds spanned by `time_range`;
    /// 0.0 when the span is empty or does not parse.
    pub requests_per_second: f64,
}

/// Output of [`Analyzer::detect_anomalies`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnomalyReport {
    pub failed_requests: Vec<Entry>,
    pub suspicious_ips: Vec<String>,
}

/// Positions of records grouped by IP, URL and timestamp.
///
/// Built from a snapshot of the record sequence; any change to the sequence
/// makes it stale, so [`Analyzer`] drops it on every mutation.
#[derive(Debug, Clone, Default)]
pub struct EntryIndex {
    by_ip: HashMap<String, Vec<usize>>,
    by_url: HashMap<String, Vec<usize>>,
    by_timestamp: BTreeMap<String, Vec<usize>>,
}

impl EntryIndex {
    fn build(entries: &[Entry]) -> Self {
        let mut index = Self::default();
        for (pos, entry) in entries.iter().enumerate() {
            index.by_ip.entry(entry.ip().to_string()).or_default().push(pos);
            index.by_url.entry(entry.url().to_string()).or_default().push(pos);
            index
                .by_timestamp
                .entry(entry.timestamp().to_string())
                .or_default()
                .push(pos);
        }
        index
    }

    /// Positions of records from `ip`, in sequence order.
    pub fn positions_for_ip(&self, ip: &str) -> &[usize] {
        self.by_ip.get(ip).map(Vec::as_slice).unwrap_or_default()
    }

    /// Positions of records for exactly `url`, in sequence order.
    pub fn positions_for_url(&self, url: &str) -> &[usize] {
        self.by_url.get(url).map(Vec::as_slice).unwrap_or_default()
    }

    /// Positions of records whose timestamp lies in `[start, end]`, in sequence order.
    /// An empty bound leaves that side open.
    pub fn positions_in_time_range(&self, start: &str, end: &str) -> Vec<usize> {
        if !start.is_empty() && !end.is_empty() && start > end {
            return Vec::new();
        }

        let lower = if start.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(start)
        };
        let upper = if end.is_empty() {
            Bound::Unbounded
        } else {
            Bound::Included(end)
        };

        let mut positions: Vec<usize> = self
            .by_timestamp
            .range::<str, _>((lower, upper))
            .flat_map(|(_, positions)| positions.iter().copied())
            .collect();
        positions.sort_unstable();
        positions
    }

    pub fn distinct_ips(&self) -> usize {
        self.by_ip.len()
    }

    pub fn distinct_urls(&self) -> usize {
        self.by_url.len()
    }
}

/// An owned, insertion-ordered collection of records and the queries over it.
///
/// Queries never modify the records. Mutations (`load_*`, [`Analyzer::add_entry`],
/// [`Analyzer::clear`]) replace, extend or empty the sequence and drop the index.
#[derive(Debug, Clone, Default)]
pub struct Analyzer {
    entries: Vec<Entry>,
    index: Option<EntryIndex>,
    config: AnalyzerConfig,
}

impl Analyzer {
    /// Create an empty analyzer with the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: AnalyzerConfig) -> Self {
        Self {
            config,
            ..Self::default()
        }
    }

    /// Create an analyzer over the given records, kept as-is and unvalidated.
    pub fn with_entries(entries: Vec<Entry>) -> Self {
        Self {
            entries,
            ..Self::default()
        }
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    /// Replace the records with those converted from a parsed document.
    ///
    /// Conversion is lenient (see [`entries_from_value`]). On error the current
    /// records are kept.
    ///
    /// # Returns
    ///
    /// The number of records loaded.
    pub fn load_from_value(&mut self, value: &Value) -> Result<usize> {
        let entries = entries_from_value(value)?;
        let count = entries.len();
        self.replace_entries(entries);
        info!(records = count, "loaded log records");
        Ok(count)
    }

    /// Replace the records with those read from a JSON file.
    pub fn try_load_from_file(&mut self, path: impl AsRef<Path>) -> Result<usize> {
        let parser = Parser::with_config(self.config.parser.clone());
        let value = reader::load_from_file_with(path, &parser)?;
        self.load_from_value(&value)
    }

    /// Like [`Analyzer::try_load_from_file`], reporting only success or failure.
    ///
    /// The error, if any, is logged at `warn` level.
    pub fn load_from_file(&mut self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        match self.try_load_from_file(path) {
            Ok(_) => true,
            Err(err) => {
                warn!(path = %path.display(), error = %err, "failed to load log file");
                false
            }
        }
    }

    /// Replace all records.
    pub fn replace_entries(&mut self, entries: Vec<Entry>) {
        self.entries = entries;
        self.invalidate_index();
    }

    /// Append one record.
    pub fn add_entry(&mut self, entry: Entry) {
        self.entries.push(entry);
        self.invalidate_index();
    }

    /// Remove all records.
    pub fn clear(&mut self) {
        self.entries.clear();
        self.invalidate_index();
        debug!("cleared log records");
    }

    pub fn entries(&self) -> &[Entry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn total_requests(&self) -> usize {
        self.entries.len()
    }

    /// Build the IP/URL/timestamp index if it is not already built.
    ///
    /// Indexed and unindexed queries return the same results.
    pub fn build_index(&mut self) -> &EntryIndex {
        let entries = &self.entries;
        self.index.get_or_insert_with(|| {
            debug!(records = entries.len(), "building record index");
            EntryIndex::build(entries)
        })
    }

    /// Drop the index, if any.
    pub fn invalidate_index(&mut self) {
        if self.index.take().is_some() {
            debug!("record index invalidated");
        }
    }

    pub fn has_index(&self) -> bool {
        self.index.is_some()
    }

    pub fn index(&self) -> Option<&EntryIndex> {
        self.index.as_ref()
    }

    /// The `n` most frequent client IPs.
    ///
    /// Counts are non-increasing; equal counts are ordered by IP text.
    /// `n == 0` or `n` above the number of distinct IPs returns every IP.
    ///
    /// # Example
    ///
    /// ```rust
    /// use rsal::{Analyzer, Entry};
    ///
    /// let mut analyzer = Analyzer::new();
    /// for ip in ["10.0.0.1", "10.0.0.2", "10.0.0.1"] {
    ///     analyzer.add_entry(Entry::new("2025-03-14T12:03:21Z", ip, "GET", "/", 200));
    /// }
    ///
    /// assert_eq!(analyzer.top_ips(1), vec![("10.0.0.1".to_string(), 2)]);
    /// assert_eq!(analyzer.top_ips(0).len(), 2);
    /// ```
    pub fn top_ips(&self, n: usize) -> Ranking {
        match &self.index {
            Some(index) => rank(counts_from_positions(&index.by_ip), n),
            None => rank(count_by(&self.entries, |e| e.ip()), n),
        }
    }

    /// The `n` most requested URLs, ordered as in [`Analyzer::top_ips`].
    pub fn top_urls(&self, n: usize) -> Ranking {
        match &self.index {
            Some(index) => rank(counts_from_positions(&index.by_url), n),
            None => rank(count_by(&self.entries, |e| e.url()), n),
        }
    }

    /// The `n` most requested URL paths, ignoring scheme, host and query string.
    pub fn top_paths(&self, n: usize) -> Ranking {
        rank(count_by(&self.entries, |e| extract_path(e.url())), n)
    }

    /// Records with exactly this status.
    pub fn filter_by_status(&self, status: i32) -> Vec<Entry> {
        self.filter(|e| e.status() == status)
    }

    /// Records with this method, compared case-insensitively.
    pub fn filter_by_method(&self, method: &str) -> Vec<Entry> {
        self.filter(|e| e.method().eq_ignore_ascii_case(method))
    }

    /// Records whose timestamp lies in `[start, end]` by string comparison.
    ///
    /// An empty bound leaves that side open. String order matches time order
    /// only because every valid timestamp has the same zero-padded layout.
    pub fn filter_by_time_range(&self, start: &str, end: &str) -> Vec<Entry> {
        match &self.index {
            Some(index) => self.collect_positions(&index.positions_in_time_range(start, end)),
            None => self.filter(|e| is_in_time_range(e.timestamp(), start, end)),
        }
    }

    /// Records from exactly this IP.
    pub fn filter_by_ip(&self, ip: &str) -> Vec<Entry> {
        match &self.index {
            Some(index) => self.collect_positions(index.positions_for_ip(ip)),
            None => self.filter(|e| e.ip() == ip),
        }
    }

    /// Records whose URL contains `pattern`.
    pub fn filter_by_url(&self, pattern: &str) -> Vec<Entry> {
        self.filter(|e| e.url().contains(pattern))
    }

    /// Records accepted by an arbitrary predicate, in sequence order.
    pub fn filter<F>(&self, predicate: F) -> Vec<Entry>
    where
        F: Fn(&Entry) -> bool,
    {
        self.entries.iter().filter(|e| predicate(e)).cloned().collect()
    }

    fn collect_positions(&self, positions: &[usize]) -> Vec<Entry> {
        positions
            .iter()
            .filter_map(|&pos| self.entries.get(pos))
            .cloned()
            .collect()
    }

    /// The smallest and largest timestamps by string comparison.
    pub fn time_range(&self) -> TimeRange {
        let mut timestamps = self.entries.iter().map(Entry::timestamp);
        let Some(first) = timestamps.next() else {
            return TimeRange::default();
        };

        let (min, max) = timestamps.fold((first, first), |(min, max), ts| {
            (min.min(ts), max.max(ts))
        });

        TimeRange {
            start: min.to_string(),
            end: max.to_string(),
        }
    }

    /// Number of records per status code. Counts sum to [`Analyzer::len`].
    pub fn status_distribution(&self) -> BTreeMap<i32, usize> {
        let mut distribution = BTreeMap::new();
        for entry in &self.entries {
            *distribution.entry(entry.status()).or_insert(0) += 1;
        }
        distribution
    }

    /// Number of records per method, as written in the records.
    pub fn method_distribution(&self) -> BTreeMap<String, usize> {
        let mut distribution = BTreeMap::new();
        for entry in &self.entries {
            *distribution.entry(entry.method().to_string()).or_insert(0) += 1;
        }
        distribution
    }

    /// Snapshot of the aggregate figures over all records.
    pub fn statistics(&self) -> Statistics {
        let unique_ips: HashSet<&str> = self.entries.iter().map(Entry::ip).collect();
        let unique_urls: HashSet<&str> = self.entries.iter().map(Entry::url).collect();
        let time_range = self.time_range();

        let requests_per_second = match time_range.span_seconds() {
            Some(span) if span > 0 => self.entries.len() as f64 / span as f64,
            _ => 0.0,
        };

        Statistics {
            total_requests: self.entries.len(),
            unique_ips: unique_ips.len(),
            unique_urls: unique_urls.len(),
            time_range,
            status_counts: self.status_distribution(),
            method_counts: self.method_distribution(),
            requests_per_second,
        }
    }

    /// Records with a status at or above `threshold`.
    pub fn find_failed_requests(&self, threshold: i32) -> Vec<Entry> {
        self.filter(|e| e.status() >= threshold)
    }

    /// IPs with strictly more than `threshold` records, sorted.
    pub fn find_suspicious_ips(&self, threshold: usize) -> Vec<String> {
        let mut ips: Vec<String> = count_by(&self.entries, |e| e.ip())
            .into_iter()
            .filter(|&(_, count)| count > threshold)
            .map(|(ip, _)| ip.to_string())
            .collect();
        ips.sort_unstable();
        ips
    }

    /// Records that fall in busy time windows.
    ///
    /// Time is cut into fixed windows of `window_seconds` aligned to the Unix
    /// epoch. A window is busy when it holds at least `threshold` records.
    /// Records whose timestamp does not parse belong to no window.
    pub fn find_busy_periods(&self, window_seconds: u64, threshold: usize) -> Vec<Entry> {
        let Ok(window) = i64::try_from(window_seconds) else {
            return Vec::new();
        };
        if window == 0 {
            return Vec::new();
        }

        let buckets: Vec<Option<i64>> = self
            .entries
            .iter()
            .map(|e| e.parsed_timestamp().map(|dt| dt.timestamp().div_euclid(window)))
            .collect();

        let mut counts: HashMap<i64, usize> = HashMap::new();
        for bucket in buckets.iter().flatten() {
            *counts.entry(*bucket).or_insert(0) += 1;
        }

        self.entries
            .iter()
            .zip(&buckets)
            .filter(|(_, bucket)| {
                bucket.is_some_and(|b| counts.get(&b).copied().unwrap_or(0) >= threshold)
            })
            .map(|(entry, _)| entry.clone())
            .collect()
    }

    /// Failed requests and suspicious IPs using the configured thresholds.
    pub fn detect_anomalies(&self) -> AnomalyReport {
        AnomalyReport {
            failed_requests: self.find_failed_requests(self.config.failed_status_threshold),
            suspicious_ips: self.find_suspicious_ips(self.config.suspicious_ip_threshold),
        }
    }

    /// All records as a JSON array of objects.
    pub fn to_value(&self) -> Value {
        Value::Array(self.entries.iter().map(Entry::to_value).collect())
    }

    /// Write the records as delimited text: a header row, then one row per
    /// record with the URL quoted.
    pub fn write_csv<W: Write>(&self, mut sink: W) -> Result<()> {
        writeln!(sink, "{}", CSV_HEADER)?;
        for entry in &self.entries {
            writeln!(
                sink,
                "{},{},{},\"{}\",{}",
                entry.timestamp(),
                entry.ip(),
                entry.method(),
                entry.url().replace('"', "\"\""),
                entry.status()
            )?;
        }
        sink.flush()?;
        Ok(())
    }

    /// Write the records as a JSON array.
    pub fn write_json<W: Write>(&self, sink: W, pretty: bool) -> Result<()> {
        writer::to_writer(sink, &self.to_value(), pretty)
    }

    /// Export the records to a delimited-text file. Returns `false` on failure.
    pub fn export_csv(&self, path: impl AsRef<Path>) -> bool {
        let path = path.as_ref();
        let result = File::create(path)
            .map_err(Error::from)
            .and_then(|file| self.write_csv(BufWriter::new(file)));
        self.report_export("csv", path, result)
    }

    /// Export the records to a JSON file. Returns `false` on failure.
    pub fn export_json(&self, path: impl AsRef<Path>, pretty: bool) -> bool {
        let path = path.as_ref();
        let result = writer::save_to_file(path, &self.to_value(), pretty);
        self.report_export("json", path, result)
    }

    fn report_export(&self, format: &str, path: &Path, result: Result<()>) -> bool {
        match result {
            Ok(()) => {
                info!(format, path = %path.display(), records = self.entries.len(), "exported log records");
                true
            }
            Err(err) => {
                warn!(format, path = %path.display(), error = %err, "export failed");
                false
            }
        }
    }
}

fn count_by<'a, K, F>(entries: &'a [Entry], key: F) -> HashMap<K, usize>
where
    K: Eq + Hash,
    F: Fn(&'a Entry) -> K,
{
    let mut counts = HashMap::new();
    for entry in entries {
        *counts.entry(key(entry)).or_insert(0) += 1;
    }
    counts
}

fn counts_from_positions(groups: &HashMap<String, Vec<usize>>) -> HashMap<&str, usize> {
    groups
        .iter()
        .map(|(key, positions)| (key.as_str(), positions.len()))
        .collect()
}

fn rank(counts: HashMap<&str, usize>, n: usize) -> Ranking {
    let mut ranked: Ranking = counts
        .into_iter()
        .map(|(key, count)| (key.to_string(), count))
        .collect();

    ranked.sort_unstable_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

    if n > 0 {
        ranked.truncate(n);
    }
    ranked
}

/// Whether `timestamp` lies in `[start, end]` by string comparison; empty bounds are open.
pub fn is_in_time_range(timestamp: &str, start: &str, end: &str) -> bool {
    (start.is_empty() || timestamp >= start) && (end.is_empty() || timestamp <= end)
}

/// The host part of a URL: the text after any `scheme://` up to the first `/`.
///
/// A URL that starts with `/` has no host and yields an empty string.
pub fn extract_domain(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(scheme_end) => &url[scheme_end + 3..],
        None => url,
    };
    match rest.find('/') {
        Some(end) => &rest[..end],
        None => rest,
    }
}

/// The path part of a URL, without query string or fragment.
///
/// Returns `/` for an absolute URL with no path.
pub fn extract_path(url: &str) -> &str {
    let rest = match url.find("://") {
        Some(scheme_end) => &url[scheme_end + 3..],
        None => url,
    };

    let Some(slash) = rest.find('/') else {
        return "/";
    };
    let path = &rest[slash..];
    match path.find(['?', '#']) {
        Some(end) => &path[..end],
        None => path,
    }
}
