use std::time::{Duration, Instant};

use async_trait::async_trait;
use log::{debug, info, warn};
use reqwest::Client;

use crate::servers::{self, Server};
use crate::{MeasurementError, MeasurementProvider, Sample};

const CONFIG_URL: &str = "https://www.speedtest.net/speedtest-config.php";
const SERVERS_URL: &str = "https://www.speedtest.net/speedtest-servers-static.php";
const USER_AGENT: &str = concat!("speed-logger/", env!("CARGO_PKG_VERSION"));

/// Penalty charged for a latency attempt that did not complete.
const FAILED_PING_MS: f64 = 3_600_000.0;

/// Characters cycled to build upload payloads.
const PAYLOAD_CHARS: &[u8] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Tuning for [`SpeedtestClient`].
#[derive(Debug, Clone)]
pub struct ProbeConfig {
    pub config_url: String,
    pub servers_url: String,
    /// Per-request timeout.
    pub timeout: Duration,
    /// How many of the nearest servers get a latency probe.
    pub candidate_servers: usize,
    pub latency_attempts: usize,
    /// Edge length in pixels of each `randomNxN.jpg` fetched.
    pub download_sizes: Vec<u32>,
    /// Size in bytes of each upload payload.
    pub upload_sizes: Vec<usize>,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            config_url: CONFIG_URL.to_string(),
            servers_url: SERVERS_URL.to_string(),
            timeout: Duration::from_secs(30),
            candidate_servers: 5,
            latency_attempts: 3,
            download_sizes: vec![350, 500, 750, 1000, 1500, 2000],
            upload_sizes: vec![250_000, 500_000, 1_000_000, 2_000_000],
        }
    }
}

/// Measures against the closest, lowest-latency speedtest.net server.
pub struct SpeedtestClient {
    http: Client,
    config: ProbeConfig,
}

impl SpeedtestClient {
    pub fn new(config: ProbeConfig) -> Result<Self, MeasurementError> {
        let http = Client::builder()
            .user_agent(USER_AGENT)
            .timeout(config.timeout)
            .build()
            .map_err(MeasurementError::Client)?;
        Ok(Self { http, config })
    }

    async fn fetch_text(&self, url: &str) -> Result<String, MeasurementError> {
        let http_err = |source| MeasurementError::Http {
            url: url.to_string(),
            source,
        };
        self.http
            .get(url)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(http_err)?
            .text()
            .await
            .map_err(http_err)
    }

    /// Servers ordered by distance, limited to the configured candidate count.
    async fn candidates(&self) -> Result<Vec<Server>, MeasurementError> {
        let client = match self
            .fetch_text(&self.config.config_url)
            .await
            .and_then(|xml| servers::parse_client_location(&xml))
        {
            Ok(location) => Some(location),
            Err(e) => {
                warn!("client location unavailable, using server list order: {e}");
                None
            }
        };

        let xml = self.fetch_text(&self.config.servers_url).await?;
        let list = servers::parse_server_list(&xml)?;
        debug!("server list has {} entries", list.len());

        Ok(servers::closest(list, client, self.config.candidate_servers))
    }

    /// Mean latency in milliseconds, or `None` when every attempt failed.
    async fn latency_ms(&self, server: &Server) -> Option<f64> {
        let url = server.latency_url();
        let attempts = self.config.latency_attempts.max(1);
        let mut total = 0.0;
        let mut answered = 0;

        for _ in 0..attempts {
            let start = Instant::now();
            let ok = match self.http.get(&url).send().await {
                Ok(resp) if resp.status().is_success() => resp.bytes().await.is_ok(),
                Ok(resp) => {
                    warn!("latency probe {url} returned {}", resp.status());
                    false
                }
                Err(e) => {
                    warn!("latency probe {url} failed: {e}");
                    false
                }
            };
            if ok {
                total += start.elapsed().as_secs_f64() * 1000.0;
                answered += 1;
            } else {
                total += FAILED_PING_MS;
            }
        }

        (answered > 0).then(|| total / attempts as f64)
    }

    async fn best_server(&self) -> Result<(Server, f64), MeasurementError> {
        let candidates = self.candidates().await?;
        let count = candidates.len();
        let mut best: Option<(Server, f64)> = None;

        for server in candidates {
            let Some(ms) = self.latency_ms(&server).await else {
                continue;
            };
            debug!("server {} ({}) latency {ms:.2} ms", server.id, server.name);
            if best.as_ref().is_none_or(|(_, b)| ms < *b) {
                best = Some((server, ms));
            }
        }

        best.ok_or(MeasurementError::NoReachableServer(count))
    }

    async fn download_bps(&self, server: &Server) -> Result<f64, MeasurementError> {
        let start = Instant::now();
        let mut bytes = 0u64;

        for &size in &self.config.download_sizes {
            let url = server.download_url(size);
            let http_err = |source| MeasurementError::Http {
                url: url.clone(),
                source,
            };
            let body = self
                .http
                .get(&url)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(http_err)?
                .bytes()
                .await
                .map_err(http_err)?;
            bytes += body.len() as u64;
        }

        throughput_bps(bytes, start.elapsed())
    }

    async fn upload_bps(&self, server: &Server) -> Result<f64, MeasurementError> {
        let url = server.upload_url();
        let start = Instant::now();
        let mut bytes = 0u64;

        for &size in &self.config.upload_sizes {
            let body = upload_payload(size);
            let len = body.len() as u64;
            self.http
                .post(url)
                .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
                .body(body)
                .send()
                .await
                .and_then(|r| r.error_for_status())
                .map_err(|source| MeasurementError::Http {
                    url: url.to_string(),
                    source,
                })?;
            bytes += len;
        }

        throughput_bps(bytes, start.elapsed())
    }
}

#[async_trait]
impl MeasurementProvider for SpeedtestClient {
    async fn measure(&self) -> Result<Sample, MeasurementError> {
        let (server, ping_ms) = self.best_server().await?;
        info!(
            "selected server {} ({}, {}) at {ping_ms:.2} ms",
            server.id, server.sponsor, server.name
        );

        let download_bps = self.download_bps(&server).await?;
        debug!("download {download_bps:.0} bit/s");
        let upload_bps = self.upload_bps(&server).await?;
        debug!("upload {upload_bps:.0} bit/s");

        Ok(Sample {
            download_bps,
            upload_bps,
            ping_ms,
        })
    }
}

fn throughput_bps(bytes: u64, elapsed: Duration) -> Result<f64, MeasurementError> {
    let secs = elapsed.as_secs_f64();
    if bytes == 0 || secs <= 0.0 {
        return Err(MeasurementError::Probe(format!(
            "no data transferred ({bytes} bytes in {secs:.3}s)"
        )));
    }
    Ok(bytes as f64 * 8.0 / secs)
}

/// `content1=` followed by filler, `size` bytes in total (never shorter than
/// the prefix).
fn upload_payload(size: usize) -> Vec<u8> {
    const PREFIX: &[u8] = b"content1=";
    let mut body = Vec::with_capacity(size.max(PREFIX.len()));
    body.extend_from_slice(PREFIX);
    body.extend(PAYLOAD_CHARS.iter().cycle().take(size.saturating_sub(PREFIX.len())));
    body
}
