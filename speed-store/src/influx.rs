//! InfluxDB v2 sink: one line-protocol point per record.

use std::fmt;

use async_trait::async_trait;
use log::debug;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Client, Url};

use crate::{MeasurementRecord, RecordSink, SinkError, TimeSeriesWriteError};

pub const MEASUREMENT: &str = "internet_speed";
pub const SOURCE_TAG: (&str, &str) = ("source", "speedtest_cron");

pub const DEFAULT_URL: &str = "http://localhost:8086";
pub const DEFAULT_TOKEN: &str = "my-token";
pub const DEFAULT_ORG: &str = "my-org";
pub const DEFAULT_BUCKET: &str = "speedtest";

/// Connection settings for the store.
#[derive(Clone, PartialEq, Eq)]
pub struct InfluxConfig {
    pub url: String,
    pub token: String,
    pub org: String,
    pub bucket: String,
}

impl InfluxConfig {
    /// `{url}/api/v2/write` with org, bucket and second precision.
    pub fn write_url(&self) -> Result<Url, TimeSeriesWriteError> {
        let base = format!("{}/api/v2/write", self.url.trim_end_matches('/'));
        Url::parse_with_params(
            &base,
            &[
                ("org", self.org.as_str()),
                ("bucket", self.bucket.as_str()),
                ("precision", "s"),
            ],
        )
        .map_err(|e| TimeSeriesWriteError::Endpoint {
            url: self.url.clone(),
            reason: e.to_string(),
        })
    }
}

impl Default for InfluxConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_URL.to_string(),
            token: DEFAULT_TOKEN.to_string(),
            org: DEFAULT_ORG.to_string(),
            bucket: DEFAULT_BUCKET.to_string(),
        }
    }
}

impl fmt::Debug for InfluxConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("InfluxConfig")
            .field("url", &self.url)
            .field("token", &"<redacted>")
            .field("org", &self.org)
            .field("bucket", &self.bucket)
            .finish()
    }
}

/// Writes each record as a single point. The HTTP client lives only for the
/// duration of one [`InfluxSink::write_point`] call.
#[derive(Debug, Clone)]
pub struct InfluxSink {
    config: InfluxConfig,
}

impl InfluxSink {
    pub fn new(config: InfluxConfig) -> Self {
        Self { config }
    }

    pub async fn write_point(&self, record: &MeasurementRecord) -> Result<(), TimeSeriesWriteError> {
        let url = self.config.write_url()?;
        let line = line_protocol(record);

        let client = Client::builder()
            .build()
            .map_err(TimeSeriesWriteError::Client)?;

        debug!("POST {url}: {line}");
        let resp = client
            .post(url)
            .header(AUTHORIZATION, format!("Token {}", self.config.token))
            .header(CONTENT_TYPE, "text/plain; charset=utf-8")
            .body(line)
            .send()
            .await
            .map_err(TimeSeriesWriteError::Request)?;

        let status = resp.status();
        if status.is_success() {
            return Ok(());
        }

        let body = resp.text().await.unwrap_or_default();
        Err(TimeSeriesWriteError::Rejected { status, body })
    }
}

#[async_trait]
impl RecordSink for InfluxSink {
    fn name(&self) -> &'static str {
        "influxdb"
    }

    async fn write(&self, record: &MeasurementRecord) -> Result<(), SinkError> {
        Ok(self.write_point(record).await?)
    }
}

/// Encode `record` as one line of InfluxDB line protocol with a timestamp in
/// seconds.
pub fn line_protocol(record: &MeasurementRecord) -> String {
    let (tag_key, tag_value) = SOURCE_TAG;
    format!(
        "{},{}={} download_mbps={},upload_mbps={},ping_ms={} {}",
        escape_measurement(MEASUREMENT),
        escape_tag(tag_key),
        escape_tag(tag_value),
        record.download_mbps(),
        record.upload_mbps(),
        record.ping_ms(),
        record.utc_timestamp().timestamp()
    )
}

fn escape_measurement(s: &str) -> String {
    escape(s, &[',', ' '])
}

fn escape_tag(s: &str) -> String {
    escape(s, &[',', '=', ' '])
}

fn escape(s: &str, special: &[char]) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        if special.contains(&c) {
            out.push('\\');
        }
        out.push(c);
    }
    out
}
