//! Helpers for driving the backend over the scripted mock transport

use std::thread::JoinHandle;

use bmsmon_rs::backend::{FrontendHandle, MonitorBackend};
use bmsmon_rs::config::AppConfig;

/// Spawn a backend thread with the default config
pub fn spawn_backend() -> (JoinHandle<()>, FrontendHandle) {
    let (backend, frontend) = MonitorBackend::new(AppConfig::default());
    let handle = std::thread::spawn(move || backend.run());
    (handle, frontend)
}

/// Spawn a backend and start a mock session over the given lines
pub fn spawn_with_lines(lines: &[&str]) -> (JoinHandle<()>, FrontendHandle) {
    let (handle, frontend) = spawn_backend();
    frontend.connect_mock(lines.iter().map(|l| l.to_string()).collect());
    (handle, frontend)
}
