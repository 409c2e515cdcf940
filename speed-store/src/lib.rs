//! Measurement records and the sinks that persist them.

mod csv;
mod error;
pub mod influx;
mod record;
mod sink;

pub use csv::{CSV_HEADER, CsvSink, csv_row};
pub use error::{CsvWriteError, SinkError, TimeSeriesWriteError};
pub use influx::{InfluxConfig, InfluxSink, MEASUREMENT, SOURCE_TAG, line_protocol};
pub use record::{LOCAL_TIMESTAMP_FORMAT, MeasurementRecord};
pub use sink::RecordSink;
