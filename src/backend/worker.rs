//! Monitor worker thread implementation
//!
//! This module contains the main feed loop that runs in a separate thread
//! and owns the serial source and the aggregation engine. It communicates
//! with the foreground through crossbeam channels.
//!
//! # Responsibilities
//!
//! - **Command processing**: Responds to foreground commands (connect,
//!   disconnect, interval, export, shutdown)
//! - **Line feeding**: Pulls one line at a time from the source and runs
//!   it through the aggregator, sequentially, with no overlap
//! - **Observer notification**: Sends snapshot updates, transcript lines,
//!   and log-row events when the aggregator reports a change
//! - **Error isolation**: A failed line is reported to the transcript and
//!   the loop continues; only a shutdown or dropped channel stops it
//!
//! # Cancellation
//!
//! Cancellation is cooperative: the liveness flag is checked between
//! reads, and reads are bounded by the transport's timeout so the check
//! happens promptly. Disconnect drops the source before the next read, so
//! an error from a port being torn down on purpose is never reported.
//!
//! # Exports
//!
//! Export commands run here, between lines, over the worker-owned
//! transcript and log — the foreground can never observe a row mid-append.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender, TryRecvError};
use tracing::{info, warn};

use crate::aggregator::TelemetryAggregator;
use crate::config::AppConfig;
use crate::export;
use crate::types::ConnectionStatus;

use super::transport::LineSource;
use super::{MonitorCommand, MonitorMessage};

/// How long the worker parks while disconnected and idle
const IDLE_WAIT: Duration = Duration::from_millis(100);

/// The worker that runs the feed loop
pub struct MonitorWorker {
    /// Application configuration
    #[allow(dead_code)]
    config: AppConfig,
    /// Command receiver from the foreground
    command_rx: Receiver<MonitorCommand>,
    /// Message sender to the foreground
    message_tx: Sender<MonitorMessage>,
    /// Liveness flag
    running: Arc<AtomicBool>,
    /// Current line source, when connected
    source: Option<Box<dyn LineSource>>,
    /// The aggregation engine; rebuilt for each connection session
    aggregator: TelemetryAggregator,
    /// Current connection status
    status: ConnectionStatus,
    /// Messages dropped because the foreground queue was full
    dropped_messages: u64,
}

impl MonitorWorker {
    /// Create a new worker
    pub fn new(
        config: AppConfig,
        command_rx: Receiver<MonitorCommand>,
        message_tx: Sender<MonitorMessage>,
        running: Arc<AtomicBool>,
    ) -> Self {
        let interval = config.logging.interval_secs;

        Self {
            config,
            command_rx,
            message_tx,
            running,
            source: None,
            aggregator: TelemetryAggregator::with_interval(interval),
            status: ConnectionStatus::Disconnected,
            dropped_messages: 0,
        }
    }

    /// Run the feed loop until shutdown
    pub fn run(&mut self) {
        info!("Monitor worker started");

        while self.running.load(Ordering::SeqCst) {
            self.process_commands();
            if !self.running.load(Ordering::SeqCst) {
                break;
            }

            if self.source.is_some() {
                self.poll_line();
            } else {
                // Nothing to read; park until a command arrives
                match self.command_rx.recv_timeout(IDLE_WAIT) {
                    Ok(cmd) => self.handle_command(cmd),
                    Err(RecvTimeoutError::Timeout) => {}
                    Err(RecvTimeoutError::Disconnected) => {
                        self.running.store(false, Ordering::SeqCst);
                    }
                }
            }
        }

        self.source = None;
        let _ = self.message_tx.send(MonitorMessage::Shutdown);
        info!(dropped = self.dropped_messages, "Monitor worker stopped");
    }

    /// Process pending commands from the foreground
    fn process_commands(&mut self) {
        loop {
            match self.command_rx.try_recv() {
                Ok(cmd) => self.handle_command(cmd),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    self.running.store(false, Ordering::SeqCst);
                    break;
                }
            }
        }
    }

    /// Handle a single command
    fn handle_command(&mut self, cmd: MonitorCommand) {
        match cmd {
            MonitorCommand::Connect { port, baud } => {
                self.handle_connect(&port, baud);
            }
            #[cfg(feature = "mock-transport")]
            MonitorCommand::ConnectMock(lines) => {
                let source = super::mock_transport::ScriptedLineSource::new(lines);
                self.start_session(Box::new(source));
            }
            MonitorCommand::Disconnect => {
                self.handle_disconnect();
            }
            MonitorCommand::SetLoggingInterval(input) => {
                self.handle_set_interval(&input);
            }
            MonitorCommand::Export { format, dir } => {
                self.handle_export(format, &dir);
            }
            MonitorCommand::Shutdown => {
                self.running.store(false, Ordering::SeqCst);
            }
        }
    }

    /// Open the serial port and start a session
    fn handle_connect(&mut self, port: &str, baud: u32) {
        self.update_status(ConnectionStatus::Connecting);

        match super::transport::SerialLineSource::open(port, baud) {
            Ok(source) => {
                self.start_session(Box::new(source));
            }
            Err(e) => {
                self.update_status(ConnectionStatus::Error);
                let message = format!("Error: {}", e);
                warn!(port, baud, error = %e, "connect failed");
                self.aggregator.transcript_mut().push_error(&message);
                let _ = self
                    .message_tx
                    .send(MonitorMessage::ConnectionError(message));
            }
        }
    }

    /// Begin a fresh session over an opened source: new aggregator (the
    /// interval set at runtime carries over), gate clock restarted
    fn start_session(&mut self, source: Box<dyn LineSource>) {
        let interval = self.aggregator.interval().as_secs();
        self.aggregator = TelemetryAggregator::with_interval(interval);
        self.aggregator.reset_gate(Instant::now());

        let notice = format!("Connected to {}", source.describe());
        info!("{}", notice);
        self.source = Some(source);
        self.update_status(ConnectionStatus::Connected);
        self.notice(notice);
    }

    /// Stop the feed loop and drop the port. The source is dropped before
    /// the next read, so no teardown error is ever reported.
    fn handle_disconnect(&mut self) {
        if self.source.take().is_some() {
            info!("Disconnected");
            self.notice("Disconnected");
        }
        self.update_status(ConnectionStatus::Disconnected);
    }

    /// Replace the logging interval from user input
    fn handle_set_interval(&mut self, input: &str) {
        match self.aggregator.set_logging_interval(input) {
            Ok(secs) => {
                self.notice(format!("Logging data every: {} seconds", secs));
            }
            Err(e) => {
                warn!(input, error = %e, "logging interval rejected");
                let message = format!("Value must be a positive integer: {}", e);
                self.aggregator.transcript_mut().push_error(&message);
                let _ = self
                    .message_tx
                    .send(MonitorMessage::ConfigRejected(message));
            }
        }
    }

    /// Run an export over the worker-owned transcript and log
    fn handle_export(&mut self, format: crate::export::ExportFormat, dir: &std::path::Path) {
        match export::export(
            format,
            dir,
            self.aggregator.transcript(),
            self.aggregator.log(),
        ) {
            Ok(path) => {
                self.notice(format!(
                    "Log exported as {}: {}",
                    format.display_name(),
                    path.display()
                ));
                let _ = self
                    .message_tx
                    .send(MonitorMessage::ExportComplete { format, path });
            }
            Err(e) => {
                warn!(error = %e, "export failed");
                let message = format!("Export failed: {}", e);
                self.aggregator.transcript_mut().push_error(&message);
                let _ = self.message_tx.send(MonitorMessage::ExportError(message));
            }
        }
    }

    /// One bounded read from the source
    fn poll_line(&mut self) {
        let Some(source) = self.source.as_mut() else {
            return;
        };

        match source.read_line() {
            Ok(Some(line)) => self.feed_line(&line),
            Ok(None) => {} // timeout; the loop re-checks flag and commands
            Err(e) => {
                // Still connected: report and keep reading
                warn!(error = %e, "read error");
                let message = format!("Error reading from port: {}", e);
                let record = self.aggregator.transcript_mut().push_error(&message).clone();
                self.try_send(MonitorMessage::TranscriptLine(record));
            }
        }
    }

    /// Feed one line through the aggregator and notify observers
    fn feed_line(&mut self, line: &str) {
        let outcome = self.aggregator.process_line(line);

        if let Some(record) = self.aggregator.transcript().records().last() {
            let record = record.clone();
            self.try_send(MonitorMessage::TranscriptLine(record));
        }

        if outcome.snapshot_changed {
            let pairs = self.aggregator.snapshot().to_pairs();
            self.try_send(MonitorMessage::SnapshotUpdate(pairs));

            let codes = self.aggregator.current_error_codes();
            if !codes.is_empty() {
                let codes = codes.to_string();
                self.try_send(MonitorMessage::ErrorCodes(codes));
            }
        }

        if outcome.row_appended {
            let rows = self.aggregator.log().len();
            self.try_send(MonitorMessage::LogRowAppended(rows));
        }
    }

    /// Record an engine notice in the transcript and forward it
    fn notice(&mut self, message: impl Into<String>) {
        let record = self
            .aggregator
            .transcript_mut()
            .push_notice(message.into())
            .clone();
        self.try_send(MonitorMessage::TranscriptLine(record));
    }

    /// Update connection status and notify the foreground
    fn update_status(&mut self, status: ConnectionStatus) {
        self.status = status;
        let _ = self
            .message_tx
            .send(MonitorMessage::ConnectionStatus(status));
    }

    /// Try to send a message, counting drops when the queue is full
    fn try_send(&mut self, msg: MonitorMessage) {
        if self.message_tx.try_send(msg).is_err() {
            self.dropped_messages += 1;
        }
    }
}
