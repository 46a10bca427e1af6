//! Serial line transport
//!
//! The engine consumes lines through the [`LineSource`] trait so the feed
//! loop can run against real hardware, a scripted mock, or a test double.
//! Reads are bounded: a source returns `Ok(None)` on timeout instead of
//! blocking indefinitely, which is what lets the worker poll its liveness
//! flag between reads.

use std::collections::VecDeque;
use std::io::Read;
use std::time::Duration;

use tracing::{debug, trace};

use crate::error::Result;

/// Bound on a single blocking read, so the liveness flag is polled at
/// least this often
pub const READ_TIMEOUT: Duration = Duration::from_secs(1);

/// A source of terminator-stripped text lines with bounded blocking reads
#[cfg_attr(test, mockall::automock)]
pub trait LineSource: Send {
    /// Read the next line.
    ///
    /// Returns `Ok(Some(line))` for a complete line (terminators stripped,
    /// never empty), `Ok(None)` when the bounded read timed out with no
    /// complete line available, and `Err` on transport failure.
    fn read_line(&mut self) -> Result<Option<String>>;

    /// Human-readable description for transcript notices
    fn describe(&self) -> String;
}

/// [`LineSource`] over a serial port
///
/// Bytes are accumulated until a newline, decoded lossily as UTF-8, and
/// stripped of `\r`/`\n`. Empty lines are dropped during framing.
pub struct SerialLineSource {
    port: Box<dyn serialport::SerialPort>,
    port_name: String,
    baud: u32,
    buffer: Vec<u8>,
    pending: VecDeque<String>,
}

impl SerialLineSource {
    /// Open a serial port with the monitor's line settings (8N1, no flow
    /// control) and the bounded read timeout
    pub fn open(port_name: &str, baud: u32) -> Result<Self> {
        let port = serialport::new(port_name, baud)
            .data_bits(serialport::DataBits::Eight)
            .parity(serialport::Parity::None)
            .stop_bits(serialport::StopBits::One)
            .flow_control(serialport::FlowControl::None)
            .timeout(READ_TIMEOUT)
            .open()?;
        debug!(port = port_name, baud, "serial port opened");

        Ok(Self {
            port,
            port_name: port_name.to_string(),
            baud,
            buffer: Vec::with_capacity(256),
            pending: VecDeque::new(),
        })
    }

    /// Split completed lines out of the byte buffer
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(['\r', '\n']);
            if !line.is_empty() {
                trace!(line, "framed line");
                self.pending.push_back(line.to_string());
            }
        }
    }
}

impl LineSource for SerialLineSource {
    fn read_line(&mut self) -> Result<Option<String>> {
        loop {
            if let Some(line) = self.pending.pop_front() {
                return Ok(Some(line));
            }

            let mut chunk = [0u8; 256];
            match self.port.read(&mut chunk) {
                Ok(0) => return Ok(None),
                Ok(n) => {
                    self.buffer.extend_from_slice(&chunk[..n]);
                    self.drain_lines();
                }
                Err(e)
                    if e.kind() == std::io::ErrorKind::TimedOut
                        || e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    return Ok(None);
                }
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn describe(&self) -> String {
        format!("{} at {} baud", self.port_name, self.baud)
    }
}
