//! Backend module for the serial feed loop
//!
//! All serial I/O and aggregation happens in a single worker thread so the
//! foreground stays responsive and never observes a half-merged snapshot
//! or a partially-appended log row. Communication runs over crossbeam
//! channels:
//!
//! - [`MonitorCommand`] - Messages sent from the foreground to the worker
//!   (connect, disconnect, set interval, export, shutdown)
//! - [`MonitorMessage`] - Messages sent from the worker to the foreground
//!   (snapshot updates, transcript lines, status, export results)
//! - [`FrontendHandle`] - Foreground-side handle for sending commands and
//!   receiving messages
//! - [`MonitorBackend`] - Entry point that owns the channels and runs the
//!   worker
//!
//! # Example
//!
//! ```ignore
//! use bmsmon_rs::backend::{MonitorBackend, MonitorMessage};
//! use bmsmon_rs::config::AppConfig;
//!
//! let config = AppConfig::default();
//! let (backend, frontend) = MonitorBackend::new(config);
//!
//! std::thread::spawn(move || backend.run());
//!
//! frontend.connect("/dev/ttyUSB0".to_string(), 115200);
//! for msg in frontend.drain() {
//!     if let MonitorMessage::SnapshotUpdate(pairs) = msg {
//!         // Render the new snapshot
//!     }
//! }
//! ```

#[cfg(feature = "mock-transport")]
pub mod mock_transport;
pub mod transport;
pub mod worker;

#[cfg(feature = "mock-transport")]
pub use mock_transport::{MockStep, ScriptedLineSource};
pub use transport::{LineSource, SerialLineSource, READ_TIMEOUT};
pub use worker::MonitorWorker;

use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender};

use crate::config::AppConfig;
use crate::export::ExportFormat;
use crate::types::{ConnectionStatus, LineRecord};

/// Message sent from the foreground to the worker
#[derive(Debug, Clone)]
pub enum MonitorCommand {
    /// Open a serial port and start the feed loop
    Connect {
        /// Port name, e.g. `/dev/ttyUSB0` or `COM3`
        port: String,
        /// Baud rate
        baud: u32,
    },
    /// Start the feed loop over a scripted source (testing only)
    #[cfg(feature = "mock-transport")]
    ConnectMock(Vec<String>),
    /// Stop the feed loop and close the port
    Disconnect,
    /// Replace the logging interval; the string must parse as a positive
    /// integer number of seconds
    SetLoggingInterval(String),
    /// Export the transcript or tabular log to a file
    Export {
        format: ExportFormat,
        dir: PathBuf,
    },
    /// Shut the worker down
    Shutdown,
}

/// Message sent from the worker to the foreground
#[derive(Debug, Clone)]
pub enum MonitorMessage {
    /// Connection status changed
    ConnectionStatus(ConnectionStatus),
    /// Connect failed
    ConnectionError(String),
    /// The snapshot content changed; ordered (key, value) pairs
    SnapshotUpdate(Vec<(String, String)>),
    /// The latest error-code value changed
    ErrorCodes(String),
    /// A transcript record was appended
    TranscriptLine(LineRecord),
    /// A data row was appended to the tabular log; total row count
    LogRowAppended(usize),
    /// An interval or config input was rejected
    ConfigRejected(String),
    /// An export finished
    ExportComplete {
        format: ExportFormat,
        path: PathBuf,
    },
    /// An export failed
    ExportError(String),
    /// Worker is shutting down
    Shutdown,
}

/// Foreground handle for the worker
pub struct FrontendHandle {
    /// Receiver for worker messages
    pub receiver: Receiver<MonitorMessage>,
    /// Sender for commands to the worker
    pub command_sender: Sender<MonitorCommand>,
}

impl FrontendHandle {
    /// Try to receive a message without blocking
    pub fn try_recv(&self) -> Option<MonitorMessage> {
        self.receiver.try_recv().ok()
    }

    /// Receive all pending messages
    pub fn drain(&self) -> Vec<MonitorMessage> {
        let mut messages = Vec::new();
        while let Ok(msg) = self.receiver.try_recv() {
            messages.push(msg);
        }
        messages
    }

    /// Send a command to the worker
    pub fn send_command(&self, cmd: MonitorCommand) -> bool {
        self.command_sender.send(cmd).is_ok()
    }

    /// Request a serial connection
    pub fn connect(&self, port: String, baud: u32) {
        let _ = self
            .command_sender
            .send(MonitorCommand::Connect { port, baud });
    }

    /// Start a feed session over scripted lines (testing only)
    #[cfg(feature = "mock-transport")]
    pub fn connect_mock(&self, lines: Vec<String>) {
        let _ = self.command_sender.send(MonitorCommand::ConnectMock(lines));
    }

    /// Request disconnection
    pub fn disconnect(&self) {
        let _ = self.command_sender.send(MonitorCommand::Disconnect);
    }

    /// Replace the logging interval
    pub fn set_logging_interval(&self, input: impl Into<String>) {
        let _ = self
            .command_sender
            .send(MonitorCommand::SetLoggingInterval(input.into()));
    }

    /// Request an export
    pub fn export(&self, format: ExportFormat, dir: PathBuf) {
        let _ = self
            .command_sender
            .send(MonitorCommand::Export { format, dir });
    }

    /// Request shutdown
    pub fn shutdown(&self) {
        let _ = self.command_sender.send(MonitorCommand::Shutdown);
    }
}

/// The monitor backend that runs in a separate thread
pub struct MonitorBackend {
    config: AppConfig,
    command_receiver: Receiver<MonitorCommand>,
    message_sender: Sender<MonitorMessage>,
    running: Arc<AtomicBool>,
}

impl MonitorBackend {
    /// Create a backend with its communication channels
    pub fn new(config: AppConfig) -> (Self, FrontendHandle) {
        let (cmd_tx, cmd_rx) = bounded(256);
        // Bounded for backpressure; snapshot updates arrive at line rate
        let (msg_tx, msg_rx) = bounded(4096);

        let backend = Self {
            config,
            command_receiver: cmd_rx,
            message_sender: msg_tx,
            running: Arc::new(AtomicBool::new(true)),
        };

        let frontend = FrontendHandle {
            receiver: msg_rx,
            command_sender: cmd_tx,
        };

        (backend, frontend)
    }

    /// Run the worker loop until shutdown
    pub fn run(self) {
        let mut worker = MonitorWorker::new(
            self.config,
            self.command_receiver,
            self.message_sender,
            self.running,
        );
        worker.run();
    }

    /// Get a handle to stop the worker cooperatively
    pub fn stop_handle(&self) -> Arc<AtomicBool> {
        self.running.clone()
    }
}

/// A detected serial port, with a display-friendly description
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PortEntry {
    /// Port name to pass to [`MonitorCommand::Connect`]
    pub name: String,
    /// Description, e.g. "COM7: USB Serial"
    pub description: String,
}

impl std::fmt::Display for PortEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.description)
    }
}

/// List the serial ports available on this machine
pub fn list_ports() -> Vec<PortEntry> {
    let mut out = Vec::new();

    if let Ok(ports) = serialport::available_ports() {
        for p in ports {
            let description = match p.port_type {
                serialport::SerialPortType::UsbPort(info) => {
                    let mut parts = Vec::new();
                    if let Some(m) = info.manufacturer {
                        parts.push(m);
                    }
                    if let Some(prod) = info.product {
                        parts.push(prod);
                    }
                    if parts.is_empty() {
                        format!("{}: USB Serial", p.port_name)
                    } else {
                        format!("{}: {}", p.port_name, parts.join(" "))
                    }
                }
                serialport::SerialPortType::BluetoothPort => {
                    format!("{}: Bluetooth", p.port_name)
                }
                serialport::SerialPortType::PciPort => format!("{}: PCI", p.port_name),
                serialport::SerialPortType::Unknown => p.port_name.clone(),
            };

            out.push(PortEntry {
                name: p.port_name,
                description,
            });
        }
    }

    out.sort_by(|a, b| a.description.cmp(&b.description));
    out
}
