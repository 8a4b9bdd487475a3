//! Extraction of structured models from Bison-style parser generator output.
//!
//! * [`report`] reconstructs the LALR automaton from a `.output` report.
//! * [`annotation`] collects the rule/semantic-step annotations embedded in
//!   a grammar source file.
//! * [`patch`] splices a state-tracing hook into the generated parser.

pub mod annotation;
pub mod automaton;
pub mod config;
pub mod export;
pub mod patch;
pub mod report;
pub mod types;

pub use crate::config::Config;
