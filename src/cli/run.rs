use crate::config::{load_config, SinkConfig};
use crate::metrics::graphite::GraphiteSink;
use crate::metrics::http::HttpSink;
use crate::metrics::statsd::StatsdSink;
use crate::metrics::stdout::StdoutSink;
use crate::metrics::{MetricSink, SinkError};
use crate::run::RunError;
use crate::state::{derive_key, PositionStore};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Exit codes handed back to the scheduler, one per failure kind, so
/// "nothing new" is distinguishable from a broken pipeline.
pub const EXIT_CONFIG: u8 = 2;
pub const EXIT_SOURCE_UNAVAILABLE: u8 = 10;
pub const EXIT_STREAM_READ: u8 = 11;
pub const EXIT_PARSER: u8 = 12;
pub const EXIT_SINK: u8 = 13;
pub const EXIT_STATE: u8 = 14;

pub struct RunArgs {
    pub file: PathBuf,
    pub parser: String,
    pub key: Option<String>,
    pub state_dir: Option<PathBuf>,
}

pub async fn run_once(config_path: Option<PathBuf>, args: RunArgs) -> ExitCode {
    let config_path = match config_path {
        Some(path) => path,
        None => {
            eprintln!("Error: config not found");
            eprintln!("Searched locations:");
            eprintln!("  ~/.config/logpulse/config.yml");
            eprintln!("  /etc/logpulse/config.yml");
            eprintln!("\nUse --config <path> to specify a config file, or run 'logpulse config init' to generate one.");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let config = match load_config(&config_path) {
        Ok(config) => config,
        Err(e) => {
            error!(config_path = %config_path.display(), error = %e, "failed to load config");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let mut parser = match crate::parser::build(&args.parser, &config.parsers) {
        Ok(parser) => parser,
        Err(e) => {
            error!(parser = %args.parser, error = %e, "failed to build parser");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let sink = match build_sink(&config.sink) {
        Ok(sink) => sink,
        Err(e) => {
            error!(error = %e, "failed to build sink");
            return ExitCode::from(EXIT_SINK);
        }
    };

    let file = crate::config::expand_tilde(&args.file);
    let state_dir = args
        .state_dir
        .map(|dir| crate::config::expand_tilde(&dir))
        .unwrap_or(config.state_dir);
    let store = PositionStore::new(state_dir);
    let key = args
        .key
        .unwrap_or_else(|| derive_key(&args.parser, &file));

    match crate::run::run(&store, &key, &file, parser.as_mut(), sink.as_ref()).await {
        Ok(report) => {
            if report.lines == 0 {
                info!(key, "no new lines");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(key, error = %e, "run aborted");
            ExitCode::from(exit_code_for(&e))
        }
    }
}

fn exit_code_for(err: &RunError) -> u8 {
    match err {
        RunError::SourceUnavailable { .. } => EXIT_SOURCE_UNAVAILABLE,
        RunError::StreamRead { .. } => EXIT_STREAM_READ,
        RunError::Parser { .. } => EXIT_PARSER,
        RunError::Sink(_) => EXIT_SINK,
        RunError::State(_) => EXIT_STATE,
    }
}

fn build_sink(config: &SinkConfig) -> Result<Box<dyn MetricSink>, SinkError> {
    match config {
        SinkConfig::Stdout => Ok(Box::new(StdoutSink)),
        SinkConfig::Graphite(g) => Ok(Box::new(GraphiteSink::new(
            g.addr.clone(),
            g.prefix.clone(),
            g.timeout,
        ))),
        SinkConfig::Statsd(s) => Ok(Box::new(StatsdSink::new(s.addr.clone(), s.prefix.clone()))),
        SinkConfig::Http(h) => Ok(Box::new(HttpSink::new(
            h.endpoint.clone(),
            h.timeout,
            h.max_retries,
            h.retry_backoff,
        )?)),
    }
}
