use crate::metrics::MetricKind;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_state_dir")]
    pub state_dir: PathBuf,
    #[serde(default = "default_sink")]
    pub sink: SinkConfig,
    pub parsers: HashMap<String, ParserConfig>,
}

fn default_state_dir() -> PathBuf {
    dirs::state_dir()
        .map(|dir| dir.join("logpulse"))
        .unwrap_or_else(|| PathBuf::from("/var/lib/logpulse"))
}

fn default_sink() -> SinkConfig {
    SinkConfig::Stdout
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum SinkConfig {
    Stdout,
    Graphite(GraphiteSinkConfig),
    Statsd(StatsdSinkConfig),
    Http(HttpSinkConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GraphiteSinkConfig {
    /// `host:port` of the carbon plaintext listener.
    pub addr: String,
    #[serde(default)]
    pub prefix: Option<String>,
    #[serde(default = "default_sink_timeout", with = "humantime_serde")]
    pub timeout: Duration,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsdSinkConfig {
    /// `host:port` of the statsd UDP listener.
    pub addr: String,
    #[serde(default)]
    pub prefix: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HttpSinkConfig {
    pub endpoint: String,
    #[serde(default = "default_sink_timeout", with = "humantime_serde")]
    pub timeout: Duration,
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    #[serde(default = "default_retry_backoff", with = "humantime_serde")]
    pub retry_backoff: Duration,
}

fn default_sink_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_backoff() -> Duration {
    Duration::from_millis(500)
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ParserConfig {
    RegexCount(RegexCountConfig),
    FieldExtract(FieldExtractConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegexCountConfig {
    pub patterns: Vec<CountPatternConfig>,
    /// Also emit a `<name>_per_sec` gauge over the interval since the
    /// previous run.
    #[serde(default)]
    pub emit_rate: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CountPatternConfig {
    pub name: String,
    pub regex: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldExtractConfig {
    pub regex: String,
    /// Treat a non-matching line as a fatal parse error instead of skipping
    /// it. For logs where every line must conform.
    #[serde(default)]
    pub require_match: bool,
    pub fields: Vec<FieldConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldConfig {
    /// Named capture group holding the numeric value.
    pub group: String,
    /// Metric name to emit; defaults to the group name.
    #[serde(default)]
    pub metric: Option<String>,
    #[serde(default = "default_kind")]
    pub kind: MetricKind,
    #[serde(default = "default_aggregate")]
    pub aggregate: Aggregate,
    #[serde(default)]
    pub units: Option<String>,
}

fn default_kind() -> MetricKind {
    MetricKind::Gauge
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Aggregate {
    Last,
    Min,
    Max,
    Mean,
    Sum,
    Count,
}

fn default_aggregate() -> Aggregate {
    Aggregate::Mean
}
