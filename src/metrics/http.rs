use super::sink::{MetricSink, SinkError};
use super::MetricRecord;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, warn};
use uuid::Uuid;

/// JSON envelope POSTed to a collection endpoint. Retries a bounded number
/// of times with exponential backoff inside the one submission; if every
/// attempt fails the run fails and the batch is re-derived next time.
pub struct HttpSink {
    client: Client,
    endpoint: String,
    max_retries: u32,
    retry_backoff: Duration,
}

#[derive(Debug, Serialize)]
struct MetricEnvelope<'a> {
    run_id: Uuid,
    host: String,
    emitted_at: DateTime<Utc>,
    metrics: &'a [MetricRecord],
}

impl HttpSink {
    pub fn new(
        endpoint: impl Into<String>,
        timeout: Duration,
        max_retries: u32,
        retry_backoff: Duration,
    ) -> Result<Self, SinkError> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(format!("logpulse/{}", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            endpoint: endpoint.into(),
            max_retries,
            retry_backoff,
        })
    }

    async fn attempt(&self, envelope: &MetricEnvelope<'_>) -> Result<(), SinkError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(envelope)
            .send()
            .await?;

        let status = response.status();
        if status.is_success() {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        let body: String = body.chars().take(200).collect();
        Err(SinkError::Rejected(format!("{status}: {body}")))
    }
}

fn local_hostname() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().into_owned())
        .unwrap_or_else(|_| "unknown".to_string())
}

#[async_trait]
impl MetricSink for HttpSink {
    async fn submit(&self, batch: &[MetricRecord]) -> Result<(), SinkError> {
        let envelope = MetricEnvelope {
            run_id: Uuid::new_v4(),
            host: local_hostname(),
            emitted_at: Utc::now(),
            metrics: batch,
        };

        let mut attempt = 0;
        loop {
            match self.attempt(&envelope).await {
                Ok(()) => {
                    debug!(run_id = %envelope.run_id, records = batch.len(), "batch accepted");
                    return Ok(());
                }
                Err(e) if attempt < self.max_retries => {
                    attempt += 1;
                    let backoff = self.retry_backoff * 2u32.pow(attempt - 1);
                    warn!(
                        run_id = %envelope.run_id,
                        attempt,
                        backoff_ms = backoff.as_millis() as u64,
                        error = %e,
                        "batch submission failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
