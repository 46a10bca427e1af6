//! # bmsmon-rs: Serial BMS Telemetry Monitor
//!
//! A telemetry monitor for battery-management-system devices that emit
//! whitespace-delimited text lines over a serial link. The core is a line
//! classifier and state-aggregation engine: it recognizes known message
//! shapes, extracts raw field values at fixed token positions, merges them
//! into a running snapshot, and periodically samples that snapshot into a
//! tabular log for export.
//!
//! ## Architecture
//!
//! - **Classifier**: Pure function from a tokenized line to field updates,
//!   driven by an ordered table of (predicate, extractor) shapes
//! - **Aggregator**: Owns the snapshot, the session transcript, and the
//!   interval-gated tabular log as one unit
//! - **Backend**: A single worker thread owns the serial source and the
//!   aggregator; the foreground talks to it over crossbeam channels, so
//!   exports and reads always see a consistent state
//! - **Export**: TXT and XML serialize the transcript; CSV serializes the
//!   tabular log
//!
//! ## Example
//!
//! ```ignore
//! use bmsmon_rs::{
//!     backend::{MonitorBackend, MonitorMessage},
//!     config::AppConfig,
//! };
//!
//! let config = AppConfig::load_or_default();
//! let (backend, frontend) = MonitorBackend::new(config);
//!
//! std::thread::spawn(move || backend.run());
//!
//! frontend.connect("/dev/ttyUSB0".to_string(), 115200);
//! loop {
//!     for msg in frontend.drain() {
//!         if let MonitorMessage::SnapshotUpdate(pairs) = msg {
//!             // Render the new snapshot
//!         }
//!     }
//! }
//! ```
//!
//! The engine itself stores and logs raw value strings; display scaling
//! (fixed-point voltage and SOC channels) is a consumer concern documented
//! in [`types::display_scale`].

pub mod aggregator;
pub mod backend;
pub mod classifier;
pub mod config;
pub mod error;
pub mod export;
pub mod transcript;
pub mod types;

// Re-export commonly used types
pub use aggregator::{ProcessOutcome, TabularLog, TelemetryAggregator, TelemetrySnapshot};
pub use backend::{FrontendHandle, MonitorBackend, MonitorCommand, MonitorMessage};
pub use classifier::{classify_line, tokenize, Classification};
pub use config::{AppConfig, AppState};
pub use error::{MonitorError, Result};
pub use export::ExportFormat;
pub use transcript::Transcript;
pub use types::{ConnectionStatus, FieldUpdate};
