//! Integration tests for file export
//!
//! Feed the aggregator directly, export into temp directories, and read
//! the files back.

mod common;

use std::time::{Duration, Instant};

use bmsmon_rs::export::{export_log_csv, export_transcript_txt, export_transcript_xml};
use bmsmon_rs::TelemetryAggregator;
use common::builders::{cell_volt_line, dtc_line, total_soc_line};

fn populated_aggregator() -> TelemetryAggregator {
    let mut agg = TelemetryAggregator::with_interval(1);
    let start = Instant::now();
    agg.reset_gate(start);

    agg.process_line_at(&cell_volt_line(0, "41230"), start);
    agg.process_line_at(&total_soc_line("875", "36000", "300"), start);
    agg.process_line_at(&dtc_line("P0A80"), start + Duration::from_secs(2));
    agg
}

#[test]
fn test_txt_export_contains_all_transcript_lines() {
    let agg = populated_aggregator();
    let dir = tempfile::tempdir().unwrap();

    let path = export_transcript_txt(dir.path(), agg.transcript()).unwrap();
    assert!(path.file_name().unwrap().to_str().unwrap().starts_with("serial_log_"));

    let contents = std::fs::read_to_string(&path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), agg.transcript().len());
    assert!(lines[0].ends_with(&cell_volt_line(0, "41230")));
    assert!(lines[2].ends_with(&dtc_line("P0A80")));
}

#[test]
fn test_csv_export_round_trips_header_and_rows() {
    let agg = populated_aggregator();
    let dir = tempfile::tempdir().unwrap();

    let path = export_log_csv(dir.path(), agg.log()).unwrap();

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(&path)
        .unwrap();
    let records: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();

    // Header row plus one gated data row
    assert_eq!(records.len(), 2);
    let header: Vec<&str> = records[0].iter().collect();
    assert_eq!(header[0], "Timestamp");
    assert!(header.contains(&"volt0"));
    // The data row grew past the header when Error_Codes arrived
    assert!(records[1].len() >= records[0].len());
    assert!(records[1].iter().any(|cell| cell == "41230"));
}

#[test]
fn test_xml_export_wraps_transcript_entries() {
    let agg = populated_aggregator();
    let dir = tempfile::tempdir().unwrap();

    let path = export_transcript_xml(dir.path(), agg.transcript()).unwrap();
    let contents = std::fs::read_to_string(&path).unwrap();

    assert!(contents.starts_with("<LogData>"));
    assert!(contents.trim_end().ends_with("</LogData>"));
    assert_eq!(contents.matches("<Entry><Data>").count(), agg.transcript().len());
    assert!(contents.contains("cell 0 volt 41230"));
}

#[test]
fn test_export_creates_missing_directory() {
    let agg = populated_aggregator();
    let dir = tempfile::tempdir().unwrap();
    let nested = dir.path().join("exports").join("today");

    let path = export_transcript_txt(&nested, agg.transcript()).unwrap();
    assert!(path.exists());
}
