//! Scripted line source for testing without hardware
//!
//! [`ScriptedLineSource`] replays a fixed sequence of steps through the
//! [`LineSource`](super::transport::LineSource) interface: telemetry
//! lines, timeouts, and read errors, in order. Once the script is
//! exhausted it behaves like an idle port (every read times out).
//!
//! # Enabling
//!
//! Only available with the `mock-transport` feature:
//!
//! ```bash
//! cargo test --features mock-transport
//! ```

use std::collections::VecDeque;
use std::time::Duration;

use crate::error::{MonitorError, Result};

use super::transport::LineSource;

/// Short bounded wait a timeout step simulates, so a worker polling an
/// exhausted script does not spin hot the way a zero-cost timeout would
const MOCK_TIMEOUT: Duration = Duration::from_millis(10);

/// One step of a scripted session
#[derive(Debug, Clone)]
pub enum MockStep {
    /// Deliver a line
    Line(String),
    /// Simulate one bounded-read timeout
    Timeout,
    /// Fail one read with an IO error
    ReadError(String),
}

/// [`LineSource`] that replays a script
#[derive(Debug, Default)]
pub struct ScriptedLineSource {
    steps: VecDeque<MockStep>,
}

impl ScriptedLineSource {
    /// A script that delivers the given lines in order
    pub fn new<I, S>(lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            steps: lines
                .into_iter()
                .map(|l| MockStep::Line(l.into()))
                .collect(),
        }
    }

    /// A script with explicit steps (lines, timeouts, errors)
    pub fn from_steps(steps: Vec<MockStep>) -> Self {
        Self {
            steps: steps.into(),
        }
    }

    /// Steps not yet consumed
    pub fn remaining(&self) -> usize {
        self.steps.len()
    }
}

impl LineSource for ScriptedLineSource {
    fn read_line(&mut self) -> Result<Option<String>> {
        match self.steps.pop_front() {
            Some(MockStep::Line(line)) => Ok(Some(line)),
            Some(MockStep::Timeout) | None => {
                std::thread::sleep(MOCK_TIMEOUT);
                Ok(None)
            }
            Some(MockStep::ReadError(message)) => Err(MonitorError::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                message,
            ))),
        }
    }

    fn describe(&self) -> String {
        "scripted mock transport".to_string()
    }
}
