//! Bandwidth and latency probing against the speedtest.net server network.
//!
//! The crate exposes a single [`MeasurementProvider`] seam: callers ask for one
//! [`Sample`] and get raw throughput in bits per second plus latency in
//! milliseconds, or a [`MeasurementError`].

mod error;
mod sample;
mod servers;
mod speedtest;

pub use error::MeasurementError;
pub use sample::{MeasurementProvider, Sample};
pub use speedtest::{ProbeConfig, SpeedtestClient};
