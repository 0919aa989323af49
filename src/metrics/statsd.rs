use super::sink::{MetricSink, SinkError};
use super::{MetricKind, MetricRecord};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::debug;

/// StatsD datagrams over UDP: `<name>:<value>|<type>`, one datagram per
/// record. UDP is fire-and-forget, so only local socket errors can fail the
/// batch.
pub struct StatsdSink {
    addr: String,
    prefix: Option<String>,
}

impl StatsdSink {
    pub fn new(addr: impl Into<String>, prefix: Option<String>) -> Self {
        Self {
            addr: addr.into(),
            prefix,
        }
    }
}

fn render_datagram(record: &MetricRecord, prefix: Option<&str>) -> String {
    let type_tag = match record.kind {
        MetricKind::Counter => "c",
        MetricKind::Gauge => "g",
        MetricKind::Timer => "ms",
    };
    match prefix {
        Some(prefix) => format!("{}.{}:{}|{}", prefix, record.name, record.value, type_tag),
        None => format!("{}:{}|{}", record.name, record.value, type_tag),
    }
}

#[async_trait]
impl MetricSink for StatsdSink {
    async fn submit(&self, batch: &[MetricRecord]) -> Result<(), SinkError> {
        if batch.is_empty() {
            return Ok(());
        }

        let socket = UdpSocket::bind("0.0.0.0:0")
            .await
            .map_err(|source| SinkError::Connect {
                endpoint: self.addr.clone(),
                source,
            })?;
        socket
            .connect(&self.addr)
            .await
            .map_err(|source| SinkError::Connect {
                endpoint: self.addr.clone(),
                source,
            })?;

        debug!(addr = %self.addr, records = batch.len(), "sending statsd batch");
        for record in batch {
            let datagram = render_datagram(record, self.prefix.as_deref());
            socket
                .send(datagram.as_bytes())
                .await
                .map_err(|source| SinkError::Write {
                    endpoint: self.addr.clone(),
                    source,
                })?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datagram_per_kind() {
        let counter = MetricRecord::counter("hits", 3.0);
        let gauge = MetricRecord::gauge("depth", 1.5);
        let timer = MetricRecord::timer("elapsed", 250.0);

        assert_eq!(render_datagram(&counter, None), "hits:3|c");
        assert_eq!(render_datagram(&gauge, None), "depth:1.5|g");
        assert_eq!(render_datagram(&timer, None), "elapsed:250|ms");
    }

    #[test]
    fn test_datagram_with_prefix() {
        let record = MetricRecord::counter("errors", 1.0);
        assert_eq!(render_datagram(&record, Some("app")), "app.errors:1|c");
    }

    #[tokio::test]
    async fn test_delivers_datagrams() {
        let receiver = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let addr = receiver.local_addr().unwrap();

        let sink = StatsdSink::new(addr.to_string(), None);
        let batch = vec![
            MetricRecord::counter("a", 1.0),
            MetricRecord::gauge("b", 2.0),
        ];
        sink.submit(&batch).await.unwrap();

        let mut buf = [0u8; 1024];
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"a:1|c");
        let (n, _) = receiver.recv_from(&mut buf).await.unwrap();
        assert_eq!(&buf[..n], b"b:2|g");
    }
}
