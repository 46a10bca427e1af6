//! Telemetry aggregation engine
//!
//! The aggregator owns the running snapshot, the session transcript, and
//! the periodically sampled tabular log as one unit. It is designed to be
//! owned by a single feed task: every mutation funnels through
//! [`TelemetryAggregator::process_line`], so readers routed through the
//! same task always observe a consistent row set.
//!
//! # Snapshot semantics
//!
//! The snapshot maps field keys to their latest raw value string. Key
//! order is first-seen order and keys are never removed; that order
//! defines the column layout of the tabular log. The distinguished
//! `Timestamp` key is refreshed on every processed line, recognized or
//! not. Lines that fail extraction leave the snapshot entirely untouched.
//!
//! # Log gate
//!
//! The tabular log captures its header once, from the ordered key list at
//! the first non-empty merge. After that a data row is appended whenever a
//! line arrives and more than the configured interval has elapsed since
//! the previous row — a sampling gate, so row spacing is at least the
//! interval but otherwise tracks line arrival. The snapshot can keep
//! gaining keys after the header is captured, so later rows may be wider
//! than the header; that observable behavior is preserved deliberately.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use chrono::Local;
use tracing::{debug, trace};

use crate::classifier::{classify, tokenize, Classification};
use crate::error::{MonitorError, Result};
use crate::transcript::Transcript;
use crate::types::{
    DEFAULT_LOGGING_INTERVAL_SECS, SNAPSHOT_COMPLETE_KEYS, SNAPSHOT_TIMESTAMP_FORMAT,
    TIMESTAMP_KEY,
};

/// Insertion-ordered mapping from field key to latest raw value
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TelemetrySnapshot {
    keys: Vec<String>,
    values: HashMap<String, String>,
}

impl TelemetrySnapshot {
    /// Create an empty snapshot
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a field. Returns true when the stored content
    /// changed (new key, or a different value for an existing key).
    pub fn insert(&mut self, key: &str, value: &str) -> bool {
        match self.values.get_mut(key) {
            Some(existing) => {
                if existing == value {
                    false
                } else {
                    *existing = value.to_string();
                    true
                }
            }
            None => {
                self.keys.push(key.to_string());
                self.values.insert(key.to_string(), value.to_string());
                true
            }
        }
    }

    /// Latest raw value for a key
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// True when the key has been seen
    pub fn contains_key(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    /// Number of distinct keys
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// True when no field has been merged yet
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// Keys in first-seen order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.keys.iter().map(String::as_str)
    }

    /// (key, value) pairs in first-seen key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.keys.iter().map(move |k| {
            (
                k.as_str(),
                self.values.get(k).map(String::as_str).unwrap_or(""),
            )
        })
    }

    /// Values in first-seen key order
    pub fn ordered_values(&self) -> Vec<String> {
        self.keys
            .iter()
            .map(|k| self.values.get(k).cloned().unwrap_or_default())
            .collect()
    }

    /// Owned (key, value) pairs in order, for observer notifications
    pub fn to_pairs(&self) -> Vec<(String, String)> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }
}

/// The periodically sampled log: one header row captured once, then data
/// rows of ordered snapshot values
#[derive(Debug, Clone, Default)]
pub struct TabularLog {
    header: Option<Vec<String>>,
    rows: Vec<Vec<String>>,
}

impl TabularLog {
    /// The captured header, if any
    pub fn header(&self) -> Option<&[String]> {
        self.header.as_deref()
    }

    /// Data rows in append order
    pub fn rows(&self) -> &[Vec<String>] {
        &self.rows
    }

    /// Capture the header. Idempotent: a second capture is ignored.
    /// Returns true when this call captured it.
    pub fn capture_header(&mut self, keys: Vec<String>) -> bool {
        if self.header.is_some() {
            return false;
        }
        self.header = Some(keys);
        true
    }

    /// Append one data row
    pub fn append_row(&mut self, values: Vec<String>) {
        self.rows.push(values);
    }

    /// Number of data rows (the header is not counted)
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// True when neither a header nor any row has been recorded
    pub fn is_empty(&self) -> bool {
        self.header.is_none() && self.rows.is_empty()
    }

    /// Header (when captured) followed by all data rows, for export
    pub fn all_rows(&self) -> impl Iterator<Item = &[String]> {
        self.header
            .as_deref()
            .into_iter()
            .chain(self.rows.iter().map(Vec::as_slice))
    }
}

/// What one `process_line` call did, so the caller can notify observers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessOutcome {
    /// The line matched a shape
    pub recognized: bool,
    /// Number of field updates merged (excluding `Timestamp`)
    pub fields_merged: usize,
    /// Snapshot content differs from before the call
    pub snapshot_changed: bool,
    /// This call captured the log header
    pub header_captured: bool,
    /// This call appended a data row
    pub row_appended: bool,
    /// The line failed extraction and was skipped
    pub extraction_error: Option<String>,
}

/// The state-aggregation engine: snapshot, transcript, tabular log, and
/// the interval gate, owned together
#[derive(Debug)]
pub struct TelemetryAggregator {
    snapshot: TelemetrySnapshot,
    transcript: Transcript,
    log: TabularLog,
    interval: Duration,
    last_log: Instant,
}

impl Default for TelemetryAggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl TelemetryAggregator {
    /// Create an aggregator with the default logging interval
    pub fn new() -> Self {
        Self::with_interval(DEFAULT_LOGGING_INTERVAL_SECS)
    }

    /// Create an aggregator with a specific logging interval in seconds
    pub fn with_interval(secs: u64) -> Self {
        Self {
            snapshot: TelemetrySnapshot::new(),
            transcript: Transcript::new(),
            log: TabularLog::default(),
            interval: Duration::from_secs(secs),
            last_log: Instant::now(),
        }
    }

    /// Process one raw line: classify, merge, record, evaluate the gate
    pub fn process_line(&mut self, raw: &str) -> ProcessOutcome {
        self.process_line_at(raw, Instant::now())
    }

    /// Same as [`process_line`](Self::process_line) with an explicit clock,
    /// so gate behavior is deterministic under test
    pub fn process_line_at(&mut self, raw: &str, now: Instant) -> ProcessOutcome {
        let mut outcome = ProcessOutcome::default();

        let tokens = tokenize(raw);
        let classification = match classify(&tokens) {
            Ok(classification) => classification,
            Err(err) => {
                debug!(line = raw, error = %err, "skipping malformed line");
                self.transcript
                    .push_error(format!("Error parsing line {:?}: {}", raw, err));
                outcome.extraction_error = Some(err.to_string());
                return outcome;
            }
        };

        outcome.recognized = matches!(classification, Classification::Matched(_));

        let stamp = Local::now().format(SNAPSHOT_TIMESTAMP_FORMAT).to_string();
        let mut changed = self.snapshot.insert(TIMESTAMP_KEY, &stamp);
        for update in classification.updates() {
            changed |= self.snapshot.insert(&update.key, &update.value);
            outcome.fields_merged += 1;
        }
        outcome.snapshot_changed = changed;

        self.transcript.push_received(raw);

        if self.log.header().is_none() && !self.snapshot.is_empty() {
            let keys = self.snapshot.keys().map(str::to_string).collect();
            outcome.header_captured = self.log.capture_header(keys);
            trace!("log header captured");
        }
        if now.duration_since(self.last_log) > self.interval {
            self.log.append_row(self.snapshot.ordered_values());
            self.last_log = now;
            outcome.row_appended = true;
            trace!(rows = self.log.len(), "log row appended");
        }

        outcome
    }

    /// Replace the logging interval from user input.
    ///
    /// Fails with a config error unless the input parses as a positive
    /// integer; the prior interval stays in effect on failure. Success
    /// does not reset the gate clock.
    pub fn set_logging_interval(&mut self, input: &str) -> Result<u64> {
        let secs = input.trim().parse::<u64>().ok().filter(|&s| s > 0).ok_or_else(|| {
            MonitorError::Config(format!(
                "logging interval must be a positive integer, got {:?}",
                input
            ))
        })?;
        self.interval = Duration::from_secs(secs);
        debug!(interval_secs = secs, "logging interval updated");
        Ok(secs)
    }

    /// Current logging interval
    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Restart the gate clock; called when a connection session begins
    pub fn reset_gate(&mut self, now: Instant) {
        self.last_log = now;
    }

    /// Advisory completion hint: the snapshot has reached the documented
    /// key count. Does not gate logging.
    pub fn is_warmed_up(&self) -> bool {
        self.snapshot.len() >= SNAPSHOT_COMPLETE_KEYS
    }

    /// Read-only view of the current snapshot
    pub fn snapshot(&self) -> &TelemetrySnapshot {
        &self.snapshot
    }

    /// Most recently observed error-code value, empty before the first one
    pub fn current_error_codes(&self) -> &str {
        self.snapshot.get("Error_Codes").unwrap_or("")
    }

    /// The session transcript
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Mutable transcript access, for engine notices
    pub fn transcript_mut(&mut self) -> &mut Transcript {
        &mut self.transcript
    }

    /// The sampled tabular log
    pub fn log(&self) -> &TabularLog {
        &self.log
    }
}
