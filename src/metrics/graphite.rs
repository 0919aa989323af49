use super::sink::{MetricSink, SinkError};
use super::MetricRecord;
use async_trait::async_trait;
use chrono::Utc;
use std::fmt::Write as _;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

/// Carbon plaintext protocol over TCP: `<path> <value> <epoch>\n` per
/// record, one connection per batch. If the connection or any write fails
/// the whole submission fails.
pub struct GraphiteSink {
    addr: String,
    prefix: Option<String>,
    timeout: Duration,
}

impl GraphiteSink {
    pub fn new(addr: impl Into<String>, prefix: Option<String>, timeout: Duration) -> Self {
        Self {
            addr: addr.into(),
            prefix,
            timeout,
        }
    }
}

fn render_plaintext(batch: &[MetricRecord], prefix: Option<&str>, epoch: i64) -> String {
    let mut payload = String::new();
    for record in batch {
        match prefix {
            Some(prefix) => {
                let _ = writeln!(payload, "{}.{} {} {}", prefix, record.name, record.value, epoch);
            }
            None => {
                let _ = writeln!(payload, "{} {} {}", record.name, record.value, epoch);
            }
        }
    }
    payload
}

#[async_trait]
impl MetricSink for GraphiteSink {
    async fn submit(&self, batch: &[MetricRecord]) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }

        let payload = render_plaintext(batch, self.prefix.as_deref(), Utc::now().timestamp());
        debug!(addr = %self.addr, records = batch.len(), "sending graphite batch");

        let send = async {
            let mut stream =
                TcpStream::connect(&self.addr)
                    .await
                    .map_err(|source| SinkError::Connect {
                        endpoint: self.addr.clone(),
                        source,
                    })?;
            stream
                .write_all(payload.as_bytes())
                .await
                .map_err(|source| SinkError::Write {
                    endpoint: self.addr.clone(),
                    source,
                })?;
            stream.shutdown().await.map_err(|source| SinkError::Write {
                endpoint: self.addr.clone(),
                source,
            })
        };

        tokio::time::timeout(self.timeout, send)
            .await
            .map_err(|_| SinkError::Timeout(self.timeout))?
    }
}
