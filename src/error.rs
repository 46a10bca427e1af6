//! Error handling for the BMS serial monitor
//!
//! This module defines custom error types and a Result alias for use
//! throughout the application.

use thiserror::Error;

/// Main error type for monitor operations
#[derive(Error, Debug)]
pub enum MonitorError {
    /// Errors from the serialport crate (opening/configuring a port)
    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    /// IO errors (port reads, export file writes)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// A line matched a shape predicate but lacked an expected token
    #[error("{shape}: token {index} missing (line has {token_count} tokens)")]
    Extraction {
        shape: &'static str,
        index: usize,
        token_count: usize,
    },

    /// Errors related to configuration loading/saving or bad user input
    #[error("Configuration error: {0}")]
    Config(String),

    /// Errors related to channel communication
    #[error("Channel error: {0}")]
    Channel(String),

    /// Errors produced while serializing an export
    #[error("Export error: {0}")]
    Export(String),

    /// Generic errors with context
    #[error("{context}: {source}")]
    WithContext {
        context: String,
        #[source]
        source: Box<MonitorError>,
    },
}

impl MonitorError {
    /// Add context to an error
    pub fn with_context(self, context: impl Into<String>) -> Self {
        MonitorError::WithContext {
            context: context.into(),
            source: Box::new(self),
        }
    }

    /// Returns true for per-line failures that the feed loop skips over
    pub fn is_line_level(&self) -> bool {
        matches!(self, MonitorError::Extraction { .. })
    }
}

impl From<csv::Error> for MonitorError {
    fn from(err: csv::Error) -> Self {
        MonitorError::Export(err.to_string())
    }
}

/// Result type alias for monitor operations
pub type Result<T> = std::result::Result<T, MonitorError>;

/// Extension trait for adding context to Results
pub trait ResultExt<T> {
    /// Add context to an error result
    fn context(self, context: impl Into<String>) -> Result<T>;

    /// Add context lazily to an error result
    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String;
}

impl<T> ResultExt<T> for Result<T> {
    fn context(self, context: impl Into<String>) -> Result<T> {
        self.map_err(|e| e.with_context(context))
    }

    fn with_context<F>(self, f: F) -> Result<T>
    where
        F: FnOnce() -> String,
    {
        self.map_err(|e| e.with_context(f()))
    }
}
