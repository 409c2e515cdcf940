//! Append-only CSV log of measurement records.

use std::fs::{File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use fs2::FileExt;
use log::debug;

use crate::{CsvWriteError, MeasurementRecord, RecordSink, SinkError};

pub const CSV_HEADER: &str = "timestamp,download_mbps,upload_mbps,ping_ms";

/// Appends one row per record, writing [`CSV_HEADER`] first when the file is
/// empty.
#[derive(Debug, Clone)]
pub struct CsvSink {
    path: PathBuf,
}

impl CsvSink {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn append(&self, record: &MeasurementRecord) -> Result<(), CsvWriteError> {
        self.try_append(record).map_err(|source| CsvWriteError {
            path: self.path.clone(),
            source,
        })
    }

    fn try_append(&self, record: &MeasurementRecord) -> std::io::Result<()> {
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;

        // Held until `file` is dropped; keeps the emptiness check and the
        // header write atomic across processes.
        FileExt::lock_exclusive(&file)?;

        let mut out = String::new();
        if is_empty(&file)? {
            debug!("{} is empty, writing header", self.path.display());
            out.push_str(CSV_HEADER);
            out.push('\n');
        }
        out.push_str(&csv_row(record));
        out.push('\n');

        file.write_all(out.as_bytes())?;
        file.sync_data()
    }
}

#[async_trait]
impl RecordSink for CsvSink {
    fn name(&self) -> &'static str {
        "csv"
    }

    /// Runs [`CsvSink::append`] on the blocking pool; locking and syncing the
    /// file may stall.
    async fn write(&self, record: &MeasurementRecord) -> Result<(), SinkError> {
        let sink = self.clone();
        let record = *record;
        tokio::task::spawn_blocking(move || sink.append(&record))
            .await
            .map_err(|e| CsvWriteError {
                path: self.path.clone(),
                source: std::io::Error::other(e),
            })??;
        Ok(())
    }
}

fn is_empty(file: &File) -> std::io::Result<bool> {
    Ok(file.metadata()?.len() == 0)
}

/// `timestamp,download,upload,ping` with two decimals, no trailing newline.
pub fn csv_row(record: &MeasurementRecord) -> String {
    format!(
        "{},{:.2},{:.2},{:.2}",
        record.local_timestamp(),
        record.download_mbps(),
        record.upload_mbps(),
        record.ping_ms()
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, FixedOffset};
    use speed_probe::Sample;

    fn record(download_bps: f64, upload_bps: f64, ping_ms: f64) -> MeasurementRecord {
        let captured: DateTime<FixedOffset> =
            DateTime::parse_from_rfc3339("2024-03-01T10:00:00+01:00").unwrap();
        MeasurementRecord::from_sample(
            &Sample {
                download_bps,
                upload_bps,
                ping_ms,
            },
            captured,
        )
    }

    #[test]
    fn row_is_rounded_to_two_decimals() {
        let rec = record(123_456_789.0, 9_876_543.0, 14.3);
        assert_eq!(csv_row(&rec), "2024-03-01 10:00:00,123.46,9.88,14.30");
    }

    #[test]
    fn header_written_once_for_many_appends() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("results.csv"));

        for i in 0..5 {
            sink.append(&record(1_000_000.0 * i as f64, 500_000.0, 10.0))
                .unwrap();
        }

        let content = std::fs::read_to_string(sink.path()).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 6);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.iter().filter(|l| **l == CSV_HEADER).count(), 1);
        assert_eq!(lines[1], "2024-03-01 10:00:00,0.00,0.50,10.00");
        assert_eq!(lines[5], "2024-03-01 10:00:00,4.00,0.50,10.00");
        assert!(content.ends_with('\n'));
    }

    #[test]
    fn existing_empty_file_gets_header() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let sink = CsvSink::new(file.path());

        sink.append(&record(50_000_000.0, 10_000_000.0, 8.0)).unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            content,
            format!("{CSV_HEADER}\n2024-03-01 10:00:00,50.00,10.00,8.00\n")
        );
    }

    #[test]
    fn non_empty_file_is_only_appended_to() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "{CSV_HEADER}").unwrap();
        writeln!(file, "2024-02-29 23:00:00,1.00,2.00,3.00").unwrap();
        file.flush().unwrap();

        CsvSink::new(file.path())
            .append(&record(50_000_000.0, 10_000_000.0, 8.0))
            .unwrap();

        let content = std::fs::read_to_string(file.path()).unwrap();
        assert_eq!(
            content,
            format!(
                "{CSV_HEADER}\n2024-02-29 23:00:00,1.00,2.00,3.00\n2024-03-01 10:00:00,50.00,10.00,8.00\n"
            )
        );
    }

    #[test]
    fn missing_directory_reports_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("results.csv");
        let err = CsvSink::new(&path)
            .append(&record(1.0, 1.0, 1.0))
            .unwrap_err();

        assert_eq!(err.path, path);
        assert_eq!(err.source.kind(), std::io::ErrorKind::NotFound);
        assert!(err.to_string().contains("results.csv"));
    }

    #[test]
    fn concurrent_appends_write_one_header() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results.csv");

        std::thread::scope(|scope| {
            for _ in 0..16 {
                scope.spawn(|| {
                    CsvSink::new(&path)
                        .append(&record(50_000_000.0, 10_000_000.0, 8.0))
                        .unwrap();
                });
            }
        });

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 17);
        assert_eq!(lines[0], CSV_HEADER);
        assert_eq!(lines.iter().filter(|l| **l == CSV_HEADER).count(), 1);
        assert!(
            lines[1..]
                .iter()
                .all(|l| *l == "2024-03-01 10:00:00,50.00,10.00,8.00")
        );
    }

    #[tokio::test]
    async fn sink_write_appends_off_the_runtime_thread() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("results.csv"));

        RecordSink::write(&sink, &record(50_000_000.0, 10_000_000.0, 8.0))
            .await
            .unwrap();

        let content = std::fs::read_to_string(sink.path()).unwrap();
        assert_eq!(
            content,
            format!("{CSV_HEADER}\n2024-03-01 10:00:00,50.00,10.00,8.00\n")
        );
    }

    #[tokio::test]
    async fn sink_write_reports_csv_error() {
        let dir = tempfile::tempdir().unwrap();
        let sink = CsvSink::new(dir.path().join("missing").join("results.csv"));

        let err = RecordSink::write(&sink, &record(1.0, 1.0, 1.0))
            .await
            .unwrap_err();

        assert!(matches!(err, SinkError::Csv(_)), "{err:?}");
    }
}
