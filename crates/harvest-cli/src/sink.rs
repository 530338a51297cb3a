//! File-backed record sinks: JSON Lines and CSV.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::Path;
use std::sync::Mutex;

use clap::ValueEnum;
use harvest_core::error::AppError;
use harvest_core::models::JobRecord;
use harvest_core::traits::RecordSink;

/// Output format for harvested records.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// One JSON object per line
    Jsonl,
    /// Comma-separated values with a header row
    Csv,
}

type Output = Box<dyn Write + Send>;

fn open_output(path: Option<&Path>) -> Result<Output, AppError> {
    match path {
        Some(path) => {
            let file = File::create(path).map_err(|e| {
                AppError::SinkError(format!("Failed to create {}: {e}", path.display()))
            })?;
            Ok(Box::new(BufWriter::new(file)))
        }
        None => Ok(Box::new(io::stdout())),
    }
}

fn sink_error(e: impl std::fmt::Display) -> AppError {
    AppError::SinkError(e.to_string())
}

/// Writes each record as one JSON line; absent fields are omitted.
pub struct JsonLinesSink {
    out: Mutex<Output>,
}

impl JsonLinesSink {
    /// Write to `path`, or to stdout when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self, AppError> {
        Ok(Self::from_writer(open_output(path)?))
    }

    pub fn from_writer(out: Output) -> Self {
        Self {
            out: Mutex::new(out),
        }
    }
}

impl RecordSink for JsonLinesSink {
    async fn send(&self, record: &JobRecord) -> Result<(), AppError> {
        let line = serde_json::to_string(record)?;
        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        writeln!(out, "{line}").map_err(sink_error)?;
        out.flush().map_err(sink_error)
    }

    async fn finish(&self) -> Result<(), AppError> {
        self.out
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .flush()
            .map_err(sink_error)
    }
}

/// Column order of the CSV output.
pub const CSV_HEADER: &[&str] = &[
    "job_id",
    "title",
    "url",
    "source",
    "work_location",
    "posted_date",
    "business_area",
    "duration",
    "job_description",
    "extracted_at",
];

/// Writes records as CSV rows under a fixed header; absent fields are
/// empty cells.
pub struct CsvSink {
    writer: Mutex<csv::Writer<Output>>,
}

impl CsvSink {
    /// Write to `path`, or to stdout when `None`.
    pub fn open(path: Option<&Path>) -> Result<Self, AppError> {
        Self::from_writer(open_output(path)?)
    }

    pub fn from_writer(out: Output) -> Result<Self, AppError> {
        let mut writer = csv::Writer::from_writer(out);
        writer.write_record(CSV_HEADER).map_err(sink_error)?;
        writer.flush().map_err(sink_error)?;
        Ok(Self {
            writer: Mutex::new(writer),
        })
    }
}

impl RecordSink for CsvSink {
    async fn send(&self, record: &JobRecord) -> Result<(), AppError> {
        let extracted_at = record.extracted_at.to_rfc3339();
        let row = [
            record.job_id.as_str(),
            record.title.as_str(),
            record.url.as_str(),
            record.source.as_str(),
            record.work_location.as_deref().unwrap_or_default(),
            record.posted_date.as_deref().unwrap_or_default(),
            record.business_area.as_deref().unwrap_or_default(),
            record.duration.as_deref().unwrap_or_default(),
            record.job_description.as_deref().unwrap_or_default(),
            extracted_at.as_str(),
        ];
        let mut writer = self.writer.lock().unwrap_or_else(|e| e.into_inner());
        writer.write_record(row).map_err(sink_error)?;
        writer.flush().map_err(sink_error)
    }

    async fn finish(&self) -> Result<(), AppError> {
        self.writer
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .flush()
            .map_err(sink_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use harvest_core::models::DetailContext;

    fn record(job_id: &str) -> JobRecord {
        let ctx = DetailContext {
            site_name: "Acme".into(),
            title: "Data Engineer, Platform".into(),
            url: format!("https://acme.avature.net/careers/JobDetail/{job_id}"),
        };
        let mut record = JobRecord::new(&ctx, job_id, Utc.with_ymd_and_hms(2024, 1, 5, 9, 0, 0).unwrap());
        record.posted_date = Some("2024-01-05".into());
        record.with_description(Some("Build pipelines.".into()))
    }

    #[tokio::test]
    async fn jsonl_writes_one_object_per_line() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = JsonLinesSink::open(Some(file.path())).unwrap();

        sink.send(&record("1")).await.unwrap();
        sink.send(&record("2")).await.unwrap();
        sink.finish().await.unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: JobRecord = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first, record("1"));

        let raw: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(raw["job_id"], "2");
        assert!(raw.get("work_location").is_none());
    }

    #[tokio::test]
    async fn csv_writes_header_and_rows() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = CsvSink::open(Some(file.path())).unwrap();

        sink.send(&record("12345")).await.unwrap();
        sink.finish().await.unwrap();

        let mut reader = csv::Reader::from_path(file.path()).unwrap();
        let headers: Vec<String> = reader.headers().unwrap().iter().map(String::from).collect();
        assert_eq!(headers, CSV_HEADER);

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 1);
        assert_eq!(&rows[0][0], "12345");
        assert_eq!(&rows[0][1], "Data Engineer, Platform");
        assert_eq!(&rows[0][4], "");
        assert_eq!(&rows[0][5], "2024-01-05");
        assert_eq!(&rows[0][8], "Build pipelines.");
        assert_eq!(&rows[0][9], "2024-01-05T09:00:00+00:00");
    }

    #[test]
    fn unwritable_path_is_sink_error() {
        let err = JsonLinesSink::open(Some(Path::new("/nonexistent/dir/jobs.jsonl")))
            .err()
            .unwrap();
        assert!(matches!(err, AppError::SinkError(_)));
    }
}
