use super::MetricRecord;
use async_trait::async_trait;
use std::io;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("connection to {endpoint} failed: {source}")]
    Connect {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("write to {endpoint} failed: {source}")]
    Write {
        endpoint: String,
        #[source]
        source: io::Error,
    },

    #[error("http request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("backend rejected batch: {0}")]
    Rejected(String),

    #[error("sink timed out after {0:?}")]
    Timeout(Duration),
}

/// Delivery target for one run's metric batch.
///
/// The batch is a single logical unit: an implementation either delivers
/// every record or fails the whole submission. Per-record partial success is
/// unsupported, so a sink outage fails the run and the unsent lines are
/// re-read and re-attempted next time.
#[async_trait]
pub trait MetricSink: Send + Sync {
    async fn submit(&self, batch: &[MetricRecord]) -> Result<(), SinkError>;
}
