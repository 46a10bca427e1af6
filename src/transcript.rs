//! Human-readable transcript of the serial session
//!
//! The transcript records every processed line in arrival order, annotated
//! with a receipt timestamp, together with read/extraction errors and
//! engine notices. It is the data source for the TXT and XML exports.

use chrono::Local;

use crate::types::{LineKind, LineRecord, TRANSCRIPT_TIMESTAMP_FORMAT};

/// Ordered, timestamped record of everything the engine saw
#[derive(Debug, Default)]
pub struct Transcript {
    records: Vec<LineRecord>,
}

impl Transcript {
    /// Create an empty transcript
    pub fn new() -> Self {
        Self::default()
    }

    fn push(&mut self, kind: LineKind, text: impl Into<String>) -> &LineRecord {
        self.records.push(LineRecord {
            timestamp: Local::now().format(TRANSCRIPT_TIMESTAMP_FORMAT).to_string(),
            kind,
            text: text.into(),
        });
        self.records.last().expect("just pushed")
    }

    /// Record a raw line received from the device
    pub fn push_received(&mut self, line: &str) -> &LineRecord {
        self.push(LineKind::Received, line)
    }

    /// Record a read or extraction failure
    pub fn push_error(&mut self, message: impl Into<String>) -> &LineRecord {
        self.push(LineKind::Error, message)
    }

    /// Record an engine notice (connect, disconnect, export, interval change)
    pub fn push_notice(&mut self, message: impl Into<String>) -> &LineRecord {
        self.push(LineKind::Notice, message)
    }

    /// All records in arrival order
    pub fn records(&self) -> &[LineRecord] {
        &self.records
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// True when nothing has been recorded yet
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Render the whole transcript, one annotated line per record
    pub fn render(&self) -> String {
        let mut out = String::new();
        for record in &self.records {
            out.push_str(&record.render());
            out.push('\n');
        }
        out
    }

    /// Drop all records
    pub fn clear(&mut self) {
        self.records.clear();
    }
}
