//! Integration tests for the backend lifecycle
//!
//! These validate the complete worker workflow over the scripted mock
//! transport: connection and disconnection, line feeding, interval
//! configuration, exports, and shutdown.

#![cfg_attr(not(feature = "mock-transport"), allow(unused_imports, dead_code))]

mod common;

use std::time::Duration;

use bmsmon_rs::backend::MonitorMessage;
use bmsmon_rs::types::ConnectionStatus;
use serial_test::serial;

use common::{drain_until, pair_value, test_timeout};

#[test]
#[serial]
#[cfg(feature = "mock-transport")]
fn test_backend_creation_and_shutdown() {
    let (handle, frontend) = common::mock_helpers::spawn_backend();

    std::thread::sleep(Duration::from_millis(50));
    frontend.shutdown();

    assert!(handle.join().is_ok(), "worker thread should exit cleanly");
}

#[test]
#[serial]
#[cfg(feature = "mock-transport")]
fn test_mock_session_feeds_snapshot() {
    let (handle, frontend) = common::mock_helpers::spawn_with_lines(&[
        "cell 0 volt 41230",
        "total soc 875 of 36000 mAh remaining 300",
        "DTC P0A80",
    ]);

    let messages = drain_until(&frontend, test_timeout(), |m| {
        matches!(m, MonitorMessage::ErrorCodes(_))
    });

    let connected = messages.iter().any(|m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Connected))
    });
    assert!(connected, "should report connected status");

    let last_snapshot = messages.iter().rev().find_map(|m| match m {
        MonitorMessage::SnapshotUpdate(pairs) => Some(pairs.clone()),
        _ => None,
    });
    let pairs = last_snapshot.expect("should receive snapshot updates");
    assert_eq!(pair_value(&pairs, "volt0"), Some("41230"));
    assert_eq!(pair_value(&pairs, "total_soc"), Some("875"));

    let codes = messages.iter().any(|m| {
        matches!(m, MonitorMessage::ErrorCodes(codes) if codes == "P0A80")
    });
    assert!(codes, "should surface the latest error codes");

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
#[serial]
#[cfg(feature = "mock-transport")]
fn test_disconnect_reports_status() {
    let (handle, frontend) = common::mock_helpers::spawn_with_lines(&["cell 0 volt 41230"]);

    drain_until(&frontend, test_timeout(), |m| {
        matches!(m, MonitorMessage::SnapshotUpdate(_))
    });

    frontend.disconnect();
    let messages = drain_until(&frontend, test_timeout(), |m| {
        matches!(m, MonitorMessage::ConnectionStatus(ConnectionStatus::Disconnected))
    });
    assert!(messages.iter().any(|m| matches!(
        m,
        MonitorMessage::ConnectionStatus(ConnectionStatus::Disconnected)
    )));

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
#[serial]
#[cfg(feature = "mock-transport")]
fn test_bad_interval_is_rejected() {
    let (handle, frontend) = common::mock_helpers::spawn_backend();

    frontend.set_logging_interval("abc");
    let messages = drain_until(&frontend, test_timeout(), |m| {
        matches!(m, MonitorMessage::ConfigRejected(_))
    });
    assert!(messages
        .iter()
        .any(|m| matches!(m, MonitorMessage::ConfigRejected(_))));

    frontend.shutdown();
    handle.join().unwrap();
}

#[test]
#[serial]
#[cfg(feature = "mock-transport")]
fn test_export_command_writes_file() {
    use bmsmon_rs::export::ExportFormat;

    let dir = tempfile::tempdir().unwrap();
    let (handle, frontend) = common::mock_helpers::spawn_with_lines(&["cell 0 volt 41230"]);

    drain_until(&frontend, test_timeout(), |m| {
        matches!(m, MonitorMessage::SnapshotUpdate(_))
    });

    frontend.export(ExportFormat::Txt, dir.path().to_path_buf());
    let messages = drain_until(&frontend, test_timeout(), |m| {
        matches!(m, MonitorMessage::ExportComplete { .. })
    });

    let path = messages.iter().find_map(|m| match m {
        MonitorMessage::ExportComplete { path, .. } => Some(path.clone()),
        _ => None,
    });
    let path = path.expect("export should complete");
    let contents = std::fs::read_to_string(path).unwrap();
    assert!(contents.contains("cell 0 volt 41230"));

    frontend.shutdown();
    handle.join().unwrap();
}
