use super::sink::{MetricSink, SinkError};
use super::MetricRecord;
use async_trait::async_trait;
use std::io::Write;

/// Prints each record to standard output, one per line. The default sink;
/// pairs well with cron mail and smoke testing a new parser.
pub struct StdoutSink;

fn render(record: &MetricRecord) -> String {
    match &record.units {
        Some(units) => format!(
            "{} {} {} {}",
            record.name, record.value, record.kind, units
        ),
        None => format!("{} {} {}", record.name, record.value, record.kind),
    }
}

#[async_trait]
impl MetricSink for StdoutSink {
    async fn submit(&self, batch: &[MetricRecord]) -> Result<(), SinkError> {
        let mut out = std::io::stdout().lock();
        for record in batch {
            writeln!(out, "{}", render(record)).map_err(|source| SinkError::Write {
                endpoint: "stdout".to_string(),
                source,
            })?;
        }
        out.flush().map_err(|source| SinkError::Write {
            endpoint: "stdout".to_string(),
            source,
        })
    }
}
