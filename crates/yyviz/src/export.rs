//! Running the pipelines against the file layout described by a [`Config`].

use crate::{
    annotation::{self, AnnotationError, Grammar},
    automaton::Automaton,
    config::Config,
    patch::{self, PatchError, TraceHook},
    report::{self, ReportError},
};
use serde::Serialize;
use std::{fs, io, path::Path};

#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("failed to read the parser report")]
    Report(#[from] ReportError),

    #[error("failed to extract grammar annotations")]
    Annotation(#[from] AnnotationError),

    #[error("failed to patch the generated parser")]
    Patch(#[from] PatchError),

    #[error("failed to serialize the model")]
    Serialize(#[from] serde_json::Error),

    #[error("failed to write {}", path)]
    Write {
        path: String,
        #[source]
        source: io::Error,
    },
}

/// Writes `value` as indented JSON, creating the parent directory if needed.
///
/// The document is fully serialized before the file is touched.
pub fn write_json<T>(path: &Path, value: &T) -> Result<(), ExportError>
where
    T: ?Sized + Serialize,
{
    let mut json = serde_json::to_string_pretty(value)?;
    json.push('\n');

    let write_err = |source| ExportError::Write {
        path: path.display().to_string(),
        source,
    };
    if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
        fs::create_dir_all(dir).map_err(write_err)?;
    }
    fs::write(path, json).map_err(write_err)?;

    tracing::debug!("wrote {}", path.display());
    Ok(())
}

/// Parses the report and writes the automaton model.
pub fn extract_states(config: &Config) -> Result<Automaton, ExportError> {
    let automaton = report::parse_file(config.report_path())?;
    write_json(&config.states_output_path(), &automaton)?;
    Ok(automaton)
}

/// Scans the grammar source and writes the rule model.
pub fn extract_grammar(config: &Config) -> Result<Grammar, ExportError> {
    let grammar = annotation::extract_file(config.grammar_path(), config.markers())?;
    write_json(&config.grammar_output_path(), &grammar)?;
    Ok(grammar)
}

/// Splices the trace hook into the generated parser source.
pub fn patch_parser(config: &Config) -> Result<(), ExportError> {
    let hook = TraceHook::stack_print(&config.hook_fn);
    patch::patch_file(config.parser_source_path(), &hook, config.backup)?;
    Ok(())
}
