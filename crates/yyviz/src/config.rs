//! Locations and settings shared by the extraction pipelines.

use crate::{annotation::Markers, patch::DEFAULT_HOOK_FN};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone)]
pub struct Config {
    root_dir: Option<PathBuf>,
    pub(crate) report: PathBuf,
    pub(crate) states_output: PathBuf,
    pub(crate) grammar: PathBuf,
    pub(crate) grammar_output: PathBuf,
    pub(crate) parser_source: PathBuf,
    pub(crate) markers: Markers,
    pub(crate) hook_fn: String,
    pub(crate) backup: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    /// Creates a configuration following the default file layout:
    ///
    /// | input         | output                 |
    /// |---------------|------------------------|
    /// | `parser.output` | `States/states.json`  |
    /// | `parser.y`      | `Grammar/grammar.json` |
    /// | `y.tab.c`       | (patched in place)     |
    pub fn new() -> Self {
        Self {
            root_dir: None,
            report: PathBuf::from("parser.output"),
            states_output: PathBuf::from("States/states.json"),
            grammar: PathBuf::from("parser.y"),
            grammar_output: PathBuf::from("Grammar/grammar.json"),
            parser_source: PathBuf::from("y.tab.c"),
            markers: Markers::default(),
            hook_fn: DEFAULT_HOOK_FN.to_owned(),
            backup: true,
        }
    }

    /// Resolve relative paths against `root_dir` instead of the working directory.
    pub fn with_root_dir(root_dir: impl Into<PathBuf>) -> Self {
        Self {
            root_dir: Some(root_dir.into()),
            ..Self::new()
        }
    }

    pub fn report(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.report = path.into();
        self
    }

    pub fn states_output(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.states_output = path.into();
        self
    }

    pub fn grammar(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.grammar = path.into();
        self
    }

    pub fn grammar_output(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.grammar_output = path.into();
        self
    }

    pub fn parser_source(&mut self, path: impl Into<PathBuf>) -> &mut Self {
        self.parser_source = path.into();
        self
    }

    pub fn start_marker(&mut self, marker: impl Into<String>) -> &mut Self {
        self.markers.start = marker.into();
        self
    }

    pub fn end_marker(&mut self, marker: impl Into<String>) -> &mut Self {
        self.markers.end = marker.into();
        self
    }

    /// Set the name of the function the trace hook calls.
    pub fn hook_fn(&mut self, name: impl Into<String>) -> &mut Self {
        self.hook_fn = name.into();
        self
    }

    /// Whether to keep a `.bak` copy of the generated parser before patching it.
    pub fn backup(&mut self, enabled: bool) -> &mut Self {
        self.backup = enabled;
        self
    }

    pub fn markers(&self) -> &Markers {
        &self.markers
    }

    pub fn report_path(&self) -> PathBuf {
        self.resolve(&self.report)
    }

    pub fn states_output_path(&self) -> PathBuf {
        self.resolve(&self.states_output)
    }

    pub fn grammar_path(&self) -> PathBuf {
        self.resolve(&self.grammar)
    }

    pub fn grammar_output_path(&self) -> PathBuf {
        self.resolve(&self.grammar_output)
    }

    pub fn parser_source_path(&self) -> PathBuf {
        self.resolve(&self.parser_source)
    }

    fn resolve(&self, path: &Path) -> PathBuf {
        match &self.root_dir {
            Some(root) if path.is_relative() => root.join(path),
            _ => path.to_owned(),
        }
    }
}
