use std::fmt;

use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use speed_probe::Sample;

const BITS_PER_MEGABIT: f64 = 1_000_000.0;

/// Wall-clock layout used for the CSV `timestamp` column.
pub const LOCAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// One formatted, immutable measurement.
///
/// Both timestamp renderings come from the single `captured_at` instant, so the
/// CSV text and the time-series point can only differ by the UTC offset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MeasurementRecord {
    captured_at: DateTime<FixedOffset>,
    download_mbps: f64,
    upload_mbps: f64,
    ping_ms: f64,
}

impl MeasurementRecord {
    /// Convert a raw sample taken at `captured_at` into megabits per second.
    pub fn from_sample<Tz: TimeZone>(sample: &Sample, captured_at: DateTime<Tz>) -> Self {
        Self {
            captured_at: captured_at.fixed_offset(),
            download_mbps: sample.download_bps / BITS_PER_MEGABIT,
            upload_mbps: sample.upload_bps / BITS_PER_MEGABIT,
            ping_ms: sample.ping_ms,
        }
    }

    pub fn captured_at(&self) -> DateTime<FixedOffset> {
        self.captured_at
    }

    /// `YYYY-MM-DD HH:MM:SS` in the offset the instant was captured in.
    pub fn local_timestamp(&self) -> String {
        self.captured_at.format(LOCAL_TIMESTAMP_FORMAT).to_string()
    }

    /// The capture instant in UTC, truncated to whole seconds.
    pub fn utc_timestamp(&self) -> DateTime<Utc> {
        let utc = self.captured_at.with_timezone(&Utc);
        DateTime::from_timestamp(utc.timestamp(), 0).unwrap_or(utc)
    }

    pub fn download_mbps(&self) -> f64 {
        self.download_mbps
    }

    pub fn upload_mbps(&self) -> f64 {
        self.upload_mbps
    }

    pub fn ping_ms(&self) -> f64 {
        self.ping_ms
    }
}

impl fmt::Display for MeasurementRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} down {:.2} Mbit/s, up {:.2} Mbit/s, ping {:.2} ms",
            self.local_timestamp(),
            self.download_mbps,
            self.upload_mbps,
            self.ping_ms
        )
    }
}
