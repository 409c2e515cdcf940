use std::path::PathBuf;

use reqwest::StatusCode;

/// The CSV file could not be opened, locked or written.
#[derive(Debug, thiserror::Error)]
#[error("{}: {source}", .path.display())]
pub struct CsvWriteError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// The point did not reach the time-series store.
#[derive(Debug, thiserror::Error)]
pub enum TimeSeriesWriteError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),

    #[error("invalid endpoint {url}: {reason}")]
    Endpoint { url: String, reason: String },

    #[error("write request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("write rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
}

/// Failure of any [`crate::RecordSink`].
#[derive(Debug, thiserror::Error)]
pub enum SinkError {
    #[error(transparent)]
    Csv(#[from] CsvWriteError),

    #[error(transparent)]
    TimeSeries(#[from] TimeSeriesWriteError),
}
