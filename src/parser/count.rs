use super::{BuildError, LineParser, ParseError};
use crate::config::types::RegexCountConfig;
use crate::metrics::MetricRecord;
use regex::Regex;
use std::time::Duration;

struct CompiledPattern {
    name: String,
    regex: Regex,
    hits: u64,
}

/// Counts lines matching each configured pattern and emits one counter per
/// pattern at flush, including zeroes so a quiet interval is visible in the
/// backend. With `emit_rate`, also emits a per-second gauge computed over
/// the interval since the previous successful run.
pub struct RegexCountParser {
    patterns: Vec<CompiledPattern>,
    emit_rate: bool,
}

impl RegexCountParser {
    pub fn from_config(config: &RegexCountConfig) -> Result<Self, BuildError> {
        let mut patterns = Vec::with_capacity(config.patterns.len());
        for pattern in &config.patterns {
            let regex = Regex::new(&pattern.regex).map_err(|source| {
                BuildError::RegexCompilation {
                    pattern: pattern.regex.clone(),
                    source,
                }
            })?;
            patterns.push(CompiledPattern {
                name: pattern.name.clone(),
                regex,
                hits: 0,
            });
        }

        Ok(Self {
            patterns,
            emit_rate: config.emit_rate,
        })
    }
}

impl LineParser for RegexCountParser {
    fn feed(&mut self, line: &str) -> Result<Vec<MetricRecord>, ParseError> {
        // Patterns are independent; one line may count toward several.
        for pattern in &mut self.patterns {
            if pattern.regex.is_match(line) {
                pattern.hits += 1;
            }
        }
        Ok(Vec::new())
    }

    fn flush(&mut self, interval: Option<Duration>) -> Result<Vec<MetricRecord>, ParseError> {
        let mut records = Vec::with_capacity(self.patterns.len() * 2);
        for pattern in &self.patterns {
            records.push(MetricRecord::counter(&pattern.name, pattern.hits as f64));

            if self.emit_rate {
                if let Some(interval) = interval {
                    let secs = interval.as_secs_f64();
                    if secs > 0.0 {
                        records.push(MetricRecord::gauge(
                            format!("{}_per_sec", pattern.name),
                            pattern.hits as f64 / secs,
                        ));
                    }
                }
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::CountPatternConfig;
    use crate::metrics::MetricKind;

    fn config(patterns: &[(&str, &str)], emit_rate: bool) -> RegexCountConfig {
        RegexCountConfig {
            patterns: patterns
                .iter()
                .map(|(name, regex)| CountPatternConfig {
                    name: name.to_string(),
                    regex: regex.to_string(),
                })
                .collect(),
            emit_rate,
        }
    }

    #[test]
    fn test_counts_matching_lines() {
        let mut parser =
            RegexCountParser::from_config(&config(&[("status_500_count", r" 5\d\d ")], false))
                .unwrap();

        parser.feed("GET /a 200 ").unwrap();
        parser.feed("GET /b 500 ").unwrap();
        parser.feed("GET /b 500 ").unwrap();

        let records = parser.flush(None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "status_500_count");
        assert_eq!(records[0].value, 2.0);
        assert_eq!(records[0].kind, MetricKind::Counter);
    }

    #[test]
    fn test_zero_hits_still_emitted() {
        let mut parser =
            RegexCountParser::from_config(&config(&[("errors", "ERROR")], false)).unwrap();
        parser.feed("all quiet").unwrap();

        let records = parser.flush(None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].value, 0.0);
    }

    #[test]
    fn test_one_line_counts_toward_multiple_patterns() {
        let mut parser = RegexCountParser::from_config(&config(
            &[("errors", "ERROR"), ("timeouts", "timed out")],
            false,
        ))
        .unwrap();

        parser.feed("ERROR request timed out").unwrap();

        let records = parser.flush(None).unwrap();
        assert_eq!(records[0].value, 1.0);
        assert_eq!(records[1].value, 1.0);
    }

    #[test]
    fn test_rate_emitted_with_interval() {
        let mut parser =
            RegexCountParser::from_config(&config(&[("errors", "ERROR")], true)).unwrap();
        for _ in 0..30 {
            parser.feed("ERROR boom").unwrap();
        }

        let records = parser.flush(Some(Duration::from_secs(60))).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[1].name, "errors_per_sec");
        assert_eq!(records[1].kind, MetricKind::Gauge);
        assert!((records[1].value - 0.5).abs() < 1e-9);
    }

    #[test]
    fn test_no_rate_without_interval() {
        // First run: no previous state, so no interval and no rate gauge.
        let mut parser =
            RegexCountParser::from_config(&config(&[("errors", "ERROR")], true)).unwrap();
        parser.feed("ERROR boom").unwrap();

        let records = parser.flush(None).unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "errors");
    }

    #[test]
    fn test_bad_regex_rejected_at_build() {
        let result = RegexCountParser::from_config(&config(&[("broken", "([")], false));
        assert!(matches!(
            result,
            Err(BuildError::RegexCompilation { .. })
        ));
    }
}
