//! Batch log tailer: each invocation reads the lines appended to a log file
//! since the previous invocation, folds them through a configured parser, and
//! pushes the resulting metrics to a monitoring backend.

pub mod cli;
pub mod config;
pub mod metrics;
pub mod parser;
pub mod run;
pub mod state;
pub mod tail;
