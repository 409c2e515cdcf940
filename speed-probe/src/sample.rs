use async_trait::async_trait;

use crate::MeasurementError;

/// One raw, unconverted measurement.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sample {
    /// Download throughput in bits per second.
    pub download_bps: f64,
    /// Upload throughput in bits per second.
    pub upload_bps: f64,
    /// Round-trip latency to the selected server in milliseconds.
    pub ping_ms: f64,
}

/// Source of network samples.
///
/// Implementations pick their own server and run every probe before
/// returning; a partial result is never reported.
#[async_trait]
pub trait MeasurementProvider: Send + Sync {
    async fn measure(&self) -> Result<Sample, MeasurementError>;
}
