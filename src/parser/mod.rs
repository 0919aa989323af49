pub mod count;
pub mod extract;

pub use count::RegexCountParser;
pub use extract::FieldExtractParser;

use crate::config::types::ParserConfig;
use crate::metrics::MetricRecord;
use std::collections::HashMap;
use std::time::Duration;
use thiserror::Error;

/// Error while compiling a parser from configuration.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("regex compilation error for pattern '{pattern}': {source}")]
    RegexCompilation {
        pattern: String,
        #[source]
        source: regex::Error,
    },

    #[error("field '{group}' is not a named capture group of the regex")]
    MissingGroup { group: String },

    #[error("unknown parser: {0}")]
    UnknownParser(String),
}

/// Error raised by a parser while consuming a line. Any such error aborts
/// the whole run: skipping a line could corrupt an accumulator's invariant,
/// so there is no per-line recovery.
#[derive(Debug, Error)]
pub enum ParseError {
    #[error("line did not match required pattern: {line:?}")]
    Unmatched { line: String },

    #[error("field '{field}' is not numeric: {value:?}")]
    NotNumeric { field: String, value: String },
}

/// A stateful line-classification strategy, the sole extension point of the
/// pipeline.
///
/// `feed` sees every complete new line in file order; the effect of line N
/// is visible when line N+1 is processed, which is what multi-line stitching
/// and rate computations rely on. `flush` runs once after the last line and
/// emits whatever the parser accumulated. `interval` is the time since the
/// previous successful run when one is known; rate-producing parsers divide
/// by it and emit nothing rate-shaped on a first run.
pub trait LineParser: Send {
    fn feed(&mut self, line: &str) -> Result<Vec<MetricRecord>, ParseError>;
    fn flush(&mut self, interval: Option<Duration>) -> Result<Vec<MetricRecord>, ParseError>;
}

/// Folds a line sequence through a parser, strictly sequential and
/// order-preserving, collecting everything the parser emits.
pub struct ParserEngine<'a> {
    parser: &'a mut dyn LineParser,
    records: Vec<MetricRecord>,
    lines_seen: u64,
}

impl<'a> ParserEngine<'a> {
    pub fn new(parser: &'a mut dyn LineParser) -> Self {
        Self {
            parser,
            records: Vec::new(),
            lines_seen: 0,
        }
    }

    pub fn feed(&mut self, line: &str) -> Result<(), ParseError> {
        let produced = self.parser.feed(line)?;
        self.records.extend(produced);
        self.lines_seen += 1;
        Ok(())
    }

    pub fn lines_seen(&self) -> u64 {
        self.lines_seen
    }

    pub fn finish(mut self, interval: Option<Duration>) -> Result<Vec<MetricRecord>, ParseError> {
        let tail = self.parser.flush(interval)?;
        self.records.extend(tail);
        Ok(self.records)
    }
}

/// Compile a parser from its configuration. Used both at validation time
/// and when building the parser selected for a run, so a config that
/// validates is guaranteed to build.
pub fn compile(config: &ParserConfig) -> Result<Box<dyn LineParser>, BuildError> {
    match config {
        ParserConfig::RegexCount(c) => Ok(Box::new(RegexCountParser::from_config(c)?)),
        ParserConfig::FieldExtract(c) => Ok(Box::new(FieldExtractParser::from_config(c)?)),
    }
}

/// Build the parser selected by name from the configured parser map.
pub fn build(
    name: &str,
    parsers: &HashMap<String, ParserConfig>,
) -> Result<Box<dyn LineParser>, BuildError> {
    let config = parsers
        .get(name)
        .ok_or_else(|| BuildError::UnknownParser(name.to_string()))?;
    compile(config)
}
