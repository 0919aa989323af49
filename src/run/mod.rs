use crate::metrics::{MetricSink, SinkError};
use crate::parser::{LineParser, ParseError, ParserEngine};
use crate::state::{PositionState, PositionStore, StateError};
use crate::tail::rotation::{decide, ResumeReason};
use crate::tail::source::LineSource;
use chrono::Utc;
use std::io;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum RunError {
    #[error("log file unavailable: {path}: {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("read failed after offset {offset}: {source}")]
    StreamRead {
        offset: u64,
        #[source]
        source: io::Error,
    },

    #[error("parser failed at offset {offset}: {source}")]
    Parser {
        offset: u64,
        #[source]
        source: ParseError,
    },

    #[error("metric delivery failed: {0}")]
    Sink(#[from] SinkError),

    #[error("failed to persist position state: {0}")]
    State(#[from] StateError),
}

/// Summary of one completed run.
#[derive(Debug, Clone)]
pub struct RunReport {
    pub reason: ResumeReason,
    pub resumed_at: u64,
    pub committed_offset: u64,
    pub lines: u64,
    pub records: usize,
}

/// Execute one tailing run.
///
/// Load the stored position, decide where to resume against the file
/// currently behind the path, stream the new complete lines through the
/// parser in order, deliver the accumulated batch to the sink exactly once,
/// then commit the new position atomically. Any failure aborts before the
/// commit, so the prior state stays authoritative and the next run
/// re-derives whatever this one lost; nothing is ever silently skipped.
pub async fn run(
    store: &PositionStore,
    key: &str,
    path: &Path,
    parser: &mut dyn LineParser,
    sink: &dyn MetricSink,
) -> Result<RunReport, RunError> {
    let previous = store.load(key);

    let mut source = LineSource::open(path).map_err(|source| RunError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })?;

    let identity = source.identity();
    let resume = decide(previous.as_ref(), identity, source.snapshot_len());
    info!(
        key,
        path = %path.display(),
        identity = %identity,
        offset = resume.offset,
        reason = %resume.reason,
        "resuming"
    );
    source
        .seek_to(resume.offset)
        .map_err(|source| RunError::StreamRead {
            offset: resume.offset,
            source,
        })?;

    // Interval since the last committed run, for rate-producing parsers.
    // Negative intervals (clock stepped back) are treated as unknown.
    let interval = previous
        .as_ref()
        .and_then(|prev| (Utc::now() - prev.saved_at).to_std().ok());

    let mut engine = ParserEngine::new(parser);
    let mut committed = resume.offset;
    for item in &mut source {
        let line = item.map_err(|source| RunError::StreamRead {
            offset: committed,
            source,
        })?;
        engine.feed(&line.text).map_err(|source| RunError::Parser {
            offset: line.end_offset,
            source,
        })?;
        committed = line.end_offset;
    }

    let lines = engine.lines_seen();
    let records = engine.finish(interval).map_err(|source| RunError::Parser {
        offset: committed,
        source,
    })?;

    debug!(lines, records = records.len(), "flushing batch");
    sink.submit(&records).await?;

    store.save(
        key,
        &PositionState {
            identity,
            offset: committed,
            saved_at: Utc::now(),
        },
    )?;

    info!(
        lines,
        records = records.len(),
        offset = committed,
        "run complete"
    );
    Ok(RunReport {
        reason: resume.reason,
        resumed_at: resume.offset,
        committed_offset: committed,
        lines,
        records: records.len(),
    })
}
