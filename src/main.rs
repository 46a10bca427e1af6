//! BMS Serial Monitor - Main Entry Point
//!
//! Console front end for the telemetry engine: connects to the configured
//! serial port, prints the live transcript, and accepts a few commands on
//! stdin (`show`, `interval <n>`, `export txt|csv|xml`, `ports`, `quit`).
//! All aggregation happens in the backend worker thread; this process is
//! just the display and configuration collaborator.

use anyhow::Context;
use bmsmon_rs::backend::{list_ports, MonitorBackend, MonitorMessage};
use bmsmon_rs::config::{AppConfig, AppState};
use bmsmon_rs::export::ExportFormat;
use bmsmon_rs::types::display_value;
use crossbeam_channel::{bounded, select, Receiver};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

fn main() -> anyhow::Result<()> {
    let config = AppConfig::load_or_default();

    // Initialize logging; optionally tee into a rolling file in the data dir
    let _file_guard = init_tracing(&config)?;

    tracing::info!("Starting BMS Serial Monitor");

    let mut app_state = AppState::load_or_default();

    let port = pick_port(&config, &app_state).context(
        "no serial port configured and none detected; set connection.port in config.toml",
    )?;
    let baud = config.connection.baud;
    let export_dir = config.logging.export_dir.clone();

    let (backend, frontend) = MonitorBackend::new(config);
    let backend_handle = std::thread::spawn(move || backend.run());

    frontend.connect(port.clone(), baud);
    app_state.record_connection(&port, baud);
    if let Err(e) = app_state.save() {
        tracing::warn!(error = %e, "failed to save app state");
    }

    let stdin_rx = spawn_stdin_reader();
    let mut snapshot: Vec<(String, String)> = Vec::new();

    println!("Commands: show | interval <seconds> | export txt|csv|xml | ports | quit");

    loop {
        select! {
            recv(frontend.receiver) -> msg => {
                let Ok(msg) = msg else { break };
                match msg {
                    MonitorMessage::ConnectionStatus(status) => {
                        tracing::info!(%status, "connection status");
                    }
                    MonitorMessage::ConnectionError(e) => eprintln!("{}", e),
                    MonitorMessage::SnapshotUpdate(pairs) => snapshot = pairs,
                    MonitorMessage::ErrorCodes(codes) => eprintln!("Error codes: {}", codes),
                    MonitorMessage::TranscriptLine(record) => println!("{}", record.render()),
                    MonitorMessage::LogRowAppended(rows) => {
                        tracing::debug!(rows, "log row appended");
                    }
                    MonitorMessage::ConfigRejected(e) => eprintln!("{}", e),
                    MonitorMessage::ExportComplete { format, path } => {
                        println!("Exported {} to {}", format.display_name(), path.display());
                    }
                    MonitorMessage::ExportError(e) => eprintln!("{}", e),
                    MonitorMessage::Shutdown => break,
                }
            }
            recv(stdin_rx) -> line => {
                let Ok(line) = line else {
                    // stdin closed
                    frontend.shutdown();
                    break;
                };
                if !handle_command(&line, &frontend, &export_dir, &snapshot) {
                    frontend.shutdown();
                    break;
                }
            }
        }
    }

    let _ = backend_handle.join();
    tracing::info!("Shutting down");
    Ok(())
}

/// Set up the tracing subscriber; returns the appender guard when file
/// logging is enabled so it flushes on exit
fn init_tracing(
    config: &AppConfig,
) -> anyhow::Result<Option<tracing_appender::non_blocking::WorkerGuard>> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,bmsmon_rs=debug"));

    if config.logging.log_to_file {
        let dir = bmsmon_rs::config::ensure_app_data_dir()
            .map_err(|e| anyhow::anyhow!("cannot create log directory: {}", e))?;
        let appender = tracing_appender::rolling::daily(dir, "bmsmon.log");
        let (writer, guard) = tracing_appender::non_blocking(appender);

        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .with(tracing_subscriber::fmt::layer().with_writer(writer).with_ansi(false))
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
        Ok(None)
    }
}

/// Choose the port: explicit config, then last session, then first detected
fn pick_port(config: &AppConfig, state: &AppState) -> Option<String> {
    if !config.connection.port.is_empty() {
        return Some(config.connection.port.clone());
    }
    if let Some(last) = &state.last_port {
        return Some(last.clone());
    }
    list_ports().into_iter().next().map(|p| p.name)
}

/// Forward stdin lines into a channel so the main loop can select over them
fn spawn_stdin_reader() -> Receiver<String> {
    let (tx, rx) = bounded(16);
    std::thread::spawn(move || {
        let mut line = String::new();
        loop {
            line.clear();
            match std::io::stdin().read_line(&mut line) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    if tx.send(line.trim().to_string()).is_err() {
                        break;
                    }
                }
            }
        }
    });
    rx
}

/// Apply one console command. Returns false when the loop should exit.
fn handle_command(
    line: &str,
    frontend: &bmsmon_rs::FrontendHandle,
    export_dir: &std::path::Path,
    snapshot: &[(String, String)],
) -> bool {
    let mut words = line.split_whitespace();
    match words.next() {
        Some("quit") | Some("exit") => return false,
        Some("show") => {
            if snapshot.is_empty() {
                println!("(no data yet)");
            }
            for (key, value) in snapshot {
                println!("{:24} {}", key, display_value(key, value));
            }
        }
        Some("interval") => match words.next() {
            Some(value) => frontend.set_logging_interval(value),
            None => eprintln!("usage: interval <seconds>"),
        },
        Some("export") => match words.next().map(str::parse::<ExportFormat>) {
            Some(Ok(format)) => frontend.export(format, export_dir.to_path_buf()),
            _ => eprintln!("usage: export txt|csv|xml"),
        },
        Some("ports") => {
            for entry in list_ports() {
                println!("{}", entry);
            }
        }
        Some(other) => eprintln!("unknown command: {}", other),
        None => {}
    }
    true
}
