use async_trait::async_trait;

use crate::{MeasurementRecord, SinkError};

/// A destination that durably stores one record.
#[async_trait]
pub trait RecordSink: Send + Sync {
    /// Short stage name used to prefix diagnostics, e.g. `csv`.
    fn name(&self) -> &'static str;

    async fn write(&self, record: &MeasurementRecord) -> Result<(), SinkError>;
}
