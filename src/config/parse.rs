use super::types::{Config, SinkConfig};
use crate::config::expand_tilde;
use regex::Regex;
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse YAML: {0}")]
    YamlParse(#[from] serde_yaml::Error),

    #[error("validation failed: {0}")]
    Validation(String),
}

pub fn load_config(path: &Path) -> Result<Config, ConfigError> {
    let yaml = fs::read_to_string(path).map_err(|e| {
        std::io::Error::new(
            e.kind(),
            format!("failed to open config file '{}': {}", path.display(), e),
        )
    })?;

    // Expand environment variables before parsing, then refuse to continue
    // with any that stayed unexpanded.
    let yaml = super::expand_env_vars(&yaml);
    check_unexpanded_vars(&yaml)?;

    let mut config: Config = serde_yaml::from_str(&yaml)?;
    config.state_dir = expand_tilde(&config.state_dir);

    validate_config(&config)?;
    Ok(config)
}

fn check_unexpanded_vars(yaml: &str) -> Result<(), ConfigError> {
    let re = Regex::new(r"\$env\{([A-Za-z_][A-Za-z0-9_]*)\}").unwrap();
    let mut unexpanded: Vec<String> = re
        .captures_iter(yaml)
        .map(|cap| cap.get(1).unwrap().as_str().to_string())
        .collect();

    if unexpanded.is_empty() {
        return Ok(());
    }

    unexpanded.sort();
    unexpanded.dedup();
    Err(ConfigError::Validation(format!(
        "environment variables are not set: {}",
        unexpanded.join(", ")
    )))
}

fn validate_config(config: &Config) -> Result<(), ConfigError> {
    if config.parsers.is_empty() {
        return Err(ConfigError::Validation(
            "at least one parser must be configured".to_string(),
        ));
    }

    // Compile every parser now so a broken regex fails `config validate`
    // rather than the scheduled run.
    for (name, parser) in &config.parsers {
        crate::parser::compile(parser)
            .map_err(|e| ConfigError::Validation(format!("parser '{name}': {e}")))?;
    }

    match &config.sink {
        SinkConfig::Stdout => {}
        SinkConfig::Graphite(g) => {
            if g.addr.is_empty() {
                return Err(ConfigError::Validation(
                    "graphite sink requires a non-empty addr".to_string(),
                ));
            }
        }
        SinkConfig::Statsd(s) => {
            if s.addr.is_empty() {
                return Err(ConfigError::Validation(
                    "statsd sink requires a non-empty addr".to_string(),
                ));
            }
        }
        SinkConfig::Http(h) => {
            if !h.endpoint.starts_with("http://") && !h.endpoint.starts_with("https://") {
                return Err(ConfigError::Validation(format!(
                    "http sink endpoint must be an http(s) URL, got '{}'",
                    h.endpoint
                )));
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::types::ParserConfig;
    use std::io::Write;

    fn load_str(yaml: &str) -> Result<Config, ConfigError> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(yaml.as_bytes()).unwrap();
        file.flush().unwrap();
        load_config(file.path())
    }

    const MINIMAL: &str = r#"
parsers:
  errors:
    type: regex_count
    patterns:
      - name: status_500_count
        regex: ' 5\d\d '
"#;

    #[test]
    fn test_minimal_config_defaults() {
        let config = load_str(MINIMAL).unwrap();
        assert!(matches!(config.sink, SinkConfig::Stdout));
        assert!(matches!(
            config.parsers.get("errors"),
            Some(ParserConfig::RegexCount(_))
        ));
    }

    #[test]
    fn test_full_config_parses() {
        let yaml = r#"
state_dir: /tmp/logpulse-state
sink:
  type: graphite
  addr: carbon.example.com:2003
  prefix: logpulse.web01
  timeout: 5s
parsers:
  errors:
    type: regex_count
    emit_rate: true
    patterns:
      - name: status_500_count
        regex: ' 5\d\d '
  latency:
    type: field_extract
    regex: 'time=(?P<ms>\d+)'
    fields:
      - group: ms
        metric: upstream_time
        kind: timer
        aggregate: mean
        units: ms
"#;
        let config = load_str(yaml).unwrap();
        assert_eq!(config.state_dir, std::path::PathBuf::from("/tmp/logpulse-state"));
        match &config.sink {
            SinkConfig::Graphite(g) => {
                assert_eq!(g.addr, "carbon.example.com:2003");
                assert_eq!(g.timeout, std::time::Duration::from_secs(5));
            }
            other => panic!("expected graphite sink, got {other:?}"),
        }
        assert_eq!(config.parsers.len(), 2);
    }

    #[test]
    fn test_no_parsers_rejected() {
        let err = load_str("parsers: {}\n").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_broken_regex_rejected() {
        let yaml = r#"
parsers:
  bad:
    type: regex_count
    patterns:
      - name: x
        regex: '(['
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_http_sink_requires_url() {
        let yaml = r#"
sink:
  type: http
  endpoint: not-a-url
parsers:
  errors:
    type: regex_count
    patterns:
      - name: x
        regex: 'x'
"#;
        let err = load_str(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Validation(_)));
    }

    #[test]
    fn test_unset_env_var_rejected() {
        let yaml = r#"
state_dir: $env{LOGPULSE_TEST_UNSET_DIR}
parsers:
  errors:
    type: regex_count
    patterns:
      - name: x
        regex: 'x'
"#;
        let err = load_str(yaml).unwrap_err();
        let message = err.to_string();
        assert!(message.contains("LOGPULSE_TEST_UNSET_DIR"));
    }
}
