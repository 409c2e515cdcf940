//! One measurement, two sinks.
//!
//! `Measuring -> Formatted -> {csv, influxdb attempted} -> Done`. A failed
//! measurement ends the run before any sink is touched; a failed sink never
//! stops the next one.

use chrono::Local;
use log::error;
use speed_probe::{MeasurementError, MeasurementProvider};
use speed_store::{MeasurementRecord, RecordSink, SinkError};

/// What happened to the record in one sink.
#[derive(Debug)]
pub struct SinkOutcome {
    pub sink: &'static str,
    pub result: Result<(), SinkError>,
}

#[derive(Debug)]
pub enum RunReport {
    MeasurementFailed(MeasurementError),
    Completed {
        record: MeasurementRecord,
        sinks: Vec<SinkOutcome>,
    },
}

impl RunReport {
    /// True when the measurement succeeded and every sink stored the record.
    pub fn is_success(&self) -> bool {
        match self {
            RunReport::MeasurementFailed(_) => false,
            RunReport::Completed { sinks, .. } => sinks.iter().all(|s| s.result.is_ok()),
        }
    }
}

pub struct Pipeline {
    provider: Box<dyn MeasurementProvider>,
    sinks: Vec<Box<dyn RecordSink>>,
}

impl Pipeline {
    /// Sinks are written in the order given.
    pub fn new(provider: Box<dyn MeasurementProvider>, sinks: Vec<Box<dyn RecordSink>>) -> Self {
        Self { provider, sinks }
    }

    pub async fn run(&self) -> RunReport {
        let sample = match self.provider.measure().await {
            Ok(sample) => sample,
            Err(e) => {
                error!("measurement: {e}");
                return RunReport::MeasurementFailed(e);
            }
        };

        let record = MeasurementRecord::from_sample(&sample, Local::now());
        println!("Speedtest completed: {record}");

        let mut outcomes = Vec::with_capacity(self.sinks.len());
        for sink in &self.sinks {
            let result = sink.write(&record).await;
            match &result {
                Ok(()) => println!("Stored result in {}", sink.name()),
                Err(e) => error!("{}: {e}", sink.name()),
            }
            outcomes.push(SinkOutcome {
                sink: sink.name(),
                result,
            });
        }

        RunReport::Completed {
            record,
            sinks: outcomes,
        }
    }
}
