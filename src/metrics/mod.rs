pub mod graphite;
pub mod http;
pub mod sink;
pub mod statsd;
pub mod stdout;

pub use sink::{MetricSink, SinkError};

use serde::{Deserialize, Serialize};
use std::fmt;

/// The kind of measurement a record carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Counter,
    Gauge,
    Timer,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            MetricKind::Counter => "counter",
            MetricKind::Gauge => "gauge",
            MetricKind::Timer => "timer",
        };
        f.write_str(s)
    }
}

/// One normalized measurement extracted from the log. Immutable once
/// emitted; the sink receives the whole run's records as a single batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricRecord {
    pub name: String,
    pub value: f64,
    pub kind: MetricKind,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub units: Option<String>,
}

impl MetricRecord {
    pub fn new(name: impl Into<String>, value: f64, kind: MetricKind) -> Self {
        Self {
            name: name.into(),
            value,
            kind,
            units: None,
        }
    }

    pub fn counter(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricKind::Counter)
    }

    pub fn gauge(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricKind::Gauge)
    }

    pub fn timer(name: impl Into<String>, value: f64) -> Self {
        Self::new(name, value, MetricKind::Timer)
    }

    pub fn with_units(mut self, units: impl Into<String>) -> Self {
        self.units = Some(units.into());
        self
    }
}
