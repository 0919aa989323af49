use super::{BuildError, LineParser, ParseError};
use crate::config::types::{Aggregate, FieldConfig, FieldExtractConfig};
use crate::metrics::MetricRecord;
use regex::Regex;
use std::time::Duration;

struct FieldState {
    config: FieldConfig,
    count: u64,
    sum: f64,
    min: f64,
    max: f64,
    last: f64,
}

impl FieldState {
    fn new(config: FieldConfig) -> Self {
        Self {
            config,
            count: 0,
            sum: 0.0,
            min: f64::INFINITY,
            max: f64::NEG_INFINITY,
            last: 0.0,
        }
    }

    fn observe(&mut self, value: f64) {
        self.count += 1;
        self.sum += value;
        self.min = self.min.min(value);
        self.max = self.max.max(value);
        self.last = value;
    }

    /// Aggregate value, or `None` when nothing was observed and the
    /// aggregate has no meaningful empty value.
    fn value(&self) -> Option<f64> {
        match self.config.aggregate {
            Aggregate::Count => Some(self.count as f64),
            Aggregate::Sum => Some(self.sum),
            _ if self.count == 0 => None,
            Aggregate::Last => Some(self.last),
            Aggregate::Min => Some(self.min),
            Aggregate::Max => Some(self.max),
            Aggregate::Mean => Some(self.sum / self.count as f64),
        }
    }
}

/// Extracts numeric fields via named capture groups and aggregates them
/// across the run, flushing one record per configured field.
pub struct FieldExtractParser {
    regex: Regex,
    require_match: bool,
    fields: Vec<FieldState>,
}

impl FieldExtractParser {
    pub fn from_config(config: &FieldExtractConfig) -> Result<Self, BuildError> {
        let regex = Regex::new(&config.regex).map_err(|source| BuildError::RegexCompilation {
            pattern: config.regex.clone(),
            source,
        })?;

        let group_names: Vec<&str> = regex.capture_names().flatten().collect();
        for field in &config.fields {
            if !group_names.contains(&field.group.as_str()) {
                return Err(BuildError::MissingGroup {
                    group: field.group.clone(),
                });
            }
        }

        Ok(Self {
            regex,
            require_match: config.require_match,
            fields: config.fields.iter().cloned().map(FieldState::new).collect(),
        })
    }
}

fn truncate_for_error(line: &str) -> String {
    line.chars().take(120).collect()
}

impl LineParser for FieldExtractParser {
    fn feed(&mut self, line: &str) -> Result<Vec<MetricRecord>, ParseError> {
        let captures = match self.regex.captures(line) {
            Some(captures) => captures,
            None if self.require_match => {
                return Err(ParseError::Unmatched {
                    line: truncate_for_error(line),
                })
            }
            None => return Ok(Vec::new()),
        };

        for field in &mut self.fields {
            if let Some(m) = captures.name(&field.config.group) {
                let value: f64 = m.as_str().parse().map_err(|_| ParseError::NotNumeric {
                    field: field.config.group.clone(),
                    value: m.as_str().to_string(),
                })?;
                field.observe(value);
            }
        }
        Ok(Vec::new())
    }

    fn flush(&mut self, _interval: Option<Duration>) -> Result<Vec<MetricRecord>, ParseError> {
        let mut records = Vec::with_capacity(self.fields.len());
        for field in &self.fields {
            if let Some(value) = field.value() {
                let name = field
                    .config
                    .metric
                    .clone()
                    .unwrap_or_else(|| field.config.group.clone());
                let mut record = MetricRecord::new(name, value, field.config.kind);
                record.units = field.config.units.clone();
                records.push(record);
            }
        }
        Ok(records)
    }
}
