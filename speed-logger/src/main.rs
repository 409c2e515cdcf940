use anyhow::bail;
use clap::Parser;
use log::{debug, error, info};
use speed_probe::SpeedtestClient;
use speed_store::{CsvSink, InfluxSink};

mod config;
mod pipeline;

use config::{Args, Config};
use pipeline::{Pipeline, RunReport};

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    // A missing .env is fine; real environment variables still apply.
    let dotenv = dotenvy::dotenv();
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Ok(path) = dotenv {
        debug!("loaded environment from {}", path.display());
    }

    let config = Config::from(Args::parse());
    debug!("{config:?}");

    let report = match SpeedtestClient::new(config.probe.clone()) {
        Ok(provider) => {
            let pipeline = Pipeline::new(
                Box::new(provider),
                vec![
                    Box::new(CsvSink::new(&config.csv_path)),
                    Box::new(InfluxSink::new(config.influx.clone())),
                ],
            );
            info!("starting speed test");
            pipeline.run().await
        }
        Err(e) => {
            error!("measurement: {e}");
            RunReport::MeasurementFailed(e)
        }
    };

    finish(&report, config.strict)
}

/// Exit status policy: failures only surface as an error under `--strict`.
fn finish(report: &RunReport, strict: bool) -> anyhow::Result<()> {
    if !strict || report.is_success() {
        return Ok(());
    }
    match report {
        RunReport::MeasurementFailed(_) => bail!("measurement failed"),
        RunReport::Completed { sinks, .. } => {
            let failed: Vec<&str> = sinks
                .iter()
                .filter(|s| s.result.is_err())
                .map(|s| s.sink)
                .collect();
            bail!("failed to store result in {}", failed.join(", "));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Local;
    use crate::pipeline::SinkOutcome;
    use speed_probe::{MeasurementError, Sample};
    use speed_store::{MeasurementRecord, SinkError, TimeSeriesWriteError};

    fn completed(influx_failed: bool) -> RunReport {
        let record = MeasurementRecord::from_sample(
            &Sample {
                download_bps: 1.0,
                upload_bps: 1.0,
                ping_ms: 1.0,
            },
            Local::now(),
        );
        let influx = if influx_failed {
            Err(SinkError::from(TimeSeriesWriteError::Endpoint {
                url: "x".to_string(),
                reason: "bad".to_string(),
            }))
        } else {
            Ok(())
        };
        RunReport::Completed {
            record,
            sinks: vec![
                SinkOutcome {
                    sink: "csv",
                    result: Ok(()),
                },
                SinkOutcome {
                    sink: "influxdb",
                    result: influx,
                },
            ],
        }
    }

    #[test]
    fn failed_measurement_exits_cleanly_by_default() {
        let report = RunReport::MeasurementFailed(MeasurementError::NoServers);
        assert!(finish(&report, false).is_ok());
    }

    #[test]
    fn failed_measurement_is_an_error_when_strict() {
        let report = RunReport::MeasurementFailed(MeasurementError::NoServers);
        let err = finish(&report, true).unwrap_err();
        assert_eq!(err.to_string(), "measurement failed");
    }

    #[test]
    fn failed_sink_exits_cleanly_by_default() {
        assert!(finish(&completed(true), false).is_ok());
    }

    #[test]
    fn strict_names_failed_sinks() {
        let err = finish(&completed(true), true).unwrap_err();
        assert_eq!(err.to_string(), "failed to store result in influxdb");
        assert!(finish(&completed(false), true).is_ok());
    }
}
