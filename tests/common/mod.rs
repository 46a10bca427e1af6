//! Common test utilities and helpers

#![allow(dead_code)] // Test utilities may not all be used in every test file

pub mod builders;
#[cfg(feature = "mock-transport")]
pub mod mock_helpers;

use std::time::{Duration, Instant};

use bmsmon_rs::backend::{FrontendHandle, MonitorMessage};

/// How long integration tests wait for the worker to act
pub fn test_timeout() -> Duration {
    Duration::from_millis(500)
}

/// Drain messages until `pred` matches one or the timeout elapses.
/// Returns every message seen, in order.
pub fn drain_until(
    frontend: &FrontendHandle,
    timeout: Duration,
    mut pred: impl FnMut(&MonitorMessage) -> bool,
) -> Vec<MonitorMessage> {
    let deadline = Instant::now() + timeout;
    let mut seen = Vec::new();
    loop {
        while let Some(msg) = frontend.try_recv() {
            let hit = pred(&msg);
            seen.push(msg);
            if hit {
                return seen;
            }
        }
        if Instant::now() >= deadline {
            return seen;
        }
        std::thread::sleep(Duration::from_millis(10));
    }
}

/// Value of a key in an ordered snapshot-update pair list
pub fn pair_value<'a>(pairs: &'a [(String, String)], key: &str) -> Option<&'a str> {
    pairs
        .iter()
        .find(|(k, _)| k == key)
        .map(|(_, v)| v.as_str())
}
