//! File export for the transcript and the tabular log
//!
//! Two distinct data sources feed three formats: the TXT and XML exports
//! serialize the transcript (every received line, annotated), while the
//! CSV export serializes the sampled tabular log (header row plus data
//! rows). Files are named `serial_log_<YYYYMMDDHHMMSS>.<ext>` with the
//! export-time timestamp and written into the configured export directory.
//!
//! Export failures never touch live aggregation state; callers surface
//! them as transcript notices.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use tracing::info;

use crate::aggregator::TabularLog;
use crate::error::Result;
use crate::transcript::Transcript;
use crate::types::EXPORT_TIMESTAMP_FORMAT;

/// Export format selection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Txt,
    Csv,
    Xml,
}

impl ExportFormat {
    pub fn display_name(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "TXT",
            ExportFormat::Csv => "CSV",
            ExportFormat::Xml => "XML",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Txt => "txt",
            ExportFormat::Csv => "csv",
            ExportFormat::Xml => "xml",
        }
    }
}

impl std::str::FromStr for ExportFormat {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "txt" => Ok(ExportFormat::Txt),
            "csv" => Ok(ExportFormat::Csv),
            "xml" => Ok(ExportFormat::Xml),
            other => Err(format!("unknown export format {:?}", other)),
        }
    }
}

/// File name for an export started now: `serial_log_<timestamp>.<ext>`
pub fn export_file_name(format: ExportFormat) -> String {
    format!(
        "serial_log_{}.{}",
        Local::now().format(EXPORT_TIMESTAMP_FORMAT),
        format.extension()
    )
}

fn export_path(dir: &Path, format: ExportFormat) -> Result<PathBuf> {
    fs::create_dir_all(dir)?;
    Ok(dir.join(export_file_name(format)))
}

/// Write the transcript as plain text, one annotated line per record
pub fn export_transcript_txt(dir: &Path, transcript: &Transcript) -> Result<PathBuf> {
    let path = export_path(dir, ExportFormat::Txt)?;
    fs::write(&path, transcript.render())?;
    info!(path = %path.display(), records = transcript.len(), "transcript exported as TXT");
    Ok(path)
}

/// Write the tabular log as CSV: the captured header row, then data rows.
/// Rows appended after the key set grew are wider than the header; the
/// writer does not pad or truncate them.
pub fn export_log_csv(dir: &Path, log: &TabularLog) -> Result<PathBuf> {
    let path = export_path(dir, ExportFormat::Csv)?;
    let mut writer = csv::WriterBuilder::new()
        .flexible(true)
        .from_path(&path)?;
    for row in log.all_rows() {
        writer.write_record(row)?;
    }
    writer.flush()?;
    info!(path = %path.display(), rows = log.len(), "log exported as CSV");
    Ok(path)
}

/// Write the transcript as XML: each record becomes
/// `<Entry><Data>…</Data></Entry>` under a `<LogData>` root
pub fn export_transcript_xml(dir: &Path, transcript: &Transcript) -> Result<PathBuf> {
    let path = export_path(dir, ExportFormat::Xml)?;

    let mut out = String::from("<LogData>\n");
    for record in transcript.records() {
        out.push_str("  <Entry><Data>");
        out.push_str(&xml_escape(&record.render()));
        out.push_str("</Data></Entry>\n");
    }
    out.push_str("</LogData>\n");

    fs::write(&path, out)?;
    info!(path = %path.display(), records = transcript.len(), "transcript exported as XML");
    Ok(path)
}

/// Dispatch an export by format over the right data source
pub fn export(
    format: ExportFormat,
    dir: &Path,
    transcript: &Transcript,
    log: &TabularLog,
) -> Result<PathBuf> {
    match format {
        ExportFormat::Txt => export_transcript_txt(dir, transcript),
        ExportFormat::Csv => export_log_csv(dir, log),
        ExportFormat::Xml => export_transcript_xml(dir, transcript),
    }
}

fn xml_escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            other => escaped.push(other),
        }
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_names_and_extensions() {
        assert_eq!(ExportFormat::Txt.display_name(), "TXT");
        assert_eq!(ExportFormat::Csv.extension(), "csv");
        assert_eq!(ExportFormat::Xml.extension(), "xml");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("csv".parse::<ExportFormat>().unwrap(), ExportFormat::Csv);
        assert_eq!(" XML ".parse::<ExportFormat>().unwrap(), ExportFormat::Xml);
        assert!("pdf".parse::<ExportFormat>().is_err());
    }

    #[test]
    fn test_export_file_name_shape() {
        let name = export_file_name(ExportFormat::Csv);
        assert!(name.starts_with("serial_log_"));
        assert!(name.ends_with(".csv"));
        // serial_log_ + YYYYMMDDHHMMSS + .csv
        assert_eq!(name.len(), "serial_log_".len() + 14 + ".csv".len());
    }

    #[test]
    fn test_xml_escape() {
        assert_eq!(xml_escape("a < b & c > \"d\""), "a &lt; b &amp; c &gt; &quot;d&quot;");
        assert_eq!(xml_escape("plain"), "plain");
    }
}
