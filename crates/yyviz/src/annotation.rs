//! Extraction of rule annotations embedded in a grammar source file.
//!
//! Grammar actions are instrumented with two kinds of logging calls:
//!
//! ```text
//! log_rule("E -> E + E", 3);
//! log_semantic_step("push(result)", 3, 1);
//! ```
//!
//! Only the region delimited by the start/end marker lines is scanned.

use crate::{automaton::RuleID, types::Map};
use indexmap::map::Entry;
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use serde::Serialize;
use std::{fs, io, path::Path, str::FromStr};

pub const DEFAULT_START_MARKER: &str = "// GRAMMAR RULES START";
pub const DEFAULT_END_MARKER: &str = "// GRAMMAR RULES END";

static LOG_RULE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"log_rule\(\s*"([^"]+)"\s*,\s*([0-9]+)\s*\)"#).unwrap());

static LOG_SEMANTIC_STEP: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"log_semantic_step\(\s*"([^"]+)"\s*,\s*([0-9]+)\s*,\s*([0-9]+)\s*\)"#).unwrap()
});

#[derive(Debug, thiserror::Error)]
pub enum AnnotationError {
    #[error("IO error: {}", _0)]
    Io(#[from] io::Error),

    #[error("line {line}: `{text}' is not a valid rule or step number")]
    InvalidNumber { line: usize, text: String },
}

/// The marker lines delimiting the annotated region.
///
/// A line counts as a marker if it contains the marker text anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Markers {
    pub start: String,
    pub end: String,
}

impl Default for Markers {
    fn default() -> Self {
        Self {
            start: DEFAULT_START_MARKER.to_owned(),
            end: DEFAULT_END_MARKER.to_owned(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemanticStep {
    pub step_no: u32,
    pub instr: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Rule {
    pub rule_no: RuleID,

    /// Empty when the rule is only known through its semantic steps.
    pub text: String,
    pub semantic_steps: Vec<SemanticStep>,
}

impl Rule {
    fn new(rule_no: RuleID) -> Self {
        Self {
            rule_no,
            text: String::new(),
            semantic_steps: vec![],
        }
    }
}

/// The annotated rules, ordered by rule number.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Grammar {
    rules: Vec<Rule>,
}

impl Grammar {
    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.iter()
    }

    pub fn rule(&self, rule_no: RuleID) -> Option<&Rule> {
        self.rules
            .binary_search_by_key(&rule_no, |r| r.rule_no)
            .ok()
            .map(|i| &self.rules[i])
    }

    /// Rules that have semantic steps but no `log_rule` declaration.
    pub fn unannotated_rules(&self) -> impl Iterator<Item = &Rule> + '_ {
        self.rules.iter().filter(|r| r.text.is_empty())
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }
}

pub fn extract_file(path: impl AsRef<Path>, markers: &Markers) -> Result<Grammar, AnnotationError> {
    let source = fs::read_to_string(path)?;
    extract(&source, markers)
}

pub fn extract(source: &str, markers: &Markers) -> Result<Grammar, AnnotationError> {
    let span = tracing::trace_span!("extract_annotations");
    let _entered = span.enter();

    let mut rules = Map::<RuleID, Rule>::default();
    let mut inside = false;
    for (i, line) in source.lines().enumerate() {
        let lineno = i + 1;
        if line.contains(&*markers.start) {
            tracing::trace!("{}: region start", lineno);
            inside = true;
            continue;
        }
        if line.contains(&*markers.end) {
            tracing::trace!("{}: region end", lineno);
            break;
        }
        if !inside {
            continue;
        }

        for caps in LOG_RULE.captures_iter(line) {
            let rule_no = RuleID::from_raw(number(&caps, 2, lineno)?);
            let text = &caps[1];
            tracing::trace!("{}: rule {} = {:?}", lineno, rule_no, text);
            match rules.entry(rule_no) {
                Entry::Vacant(entry) => {
                    entry.insert(Rule {
                        text: text.to_owned(),
                        ..Rule::new(rule_no)
                    });
                }
                // created by an earlier semantic step: the label stays empty.
                Entry::Occupied(entry) if entry.get().text.is_empty() => {
                    tracing::debug!(
                        "{}: rule {} declared after its semantic steps, ignoring {:?}",
                        lineno,
                        rule_no,
                        text
                    );
                }
                Entry::Occupied(mut entry) => {
                    let rule = entry.get_mut();
                    if rule.text != text {
                        tracing::debug!(
                            "{}: rule {} redeclared ({:?} -> {:?})",
                            lineno,
                            rule_no,
                            rule.text,
                            text
                        );
                    }
                    rule.text = text.to_owned();
                }
            }
        }

        for caps in LOG_SEMANTIC_STEP.captures_iter(line) {
            let rule_no = RuleID::from_raw(number(&caps, 2, lineno)?);
            let step_no = number(&caps, 3, lineno)?;
            tracing::trace!("{}: rule {} step {}", lineno, rule_no, step_no);
            rules
                .entry(rule_no)
                .or_insert_with(|| Rule::new(rule_no))
                .semantic_steps
                .push(SemanticStep {
                    step_no,
                    instr: caps[1].to_owned(),
                });
        }
    }

    let grammar = finalize(rules);
    tracing::debug!("extracted {} rules", grammar.len());
    Ok(grammar)
}

fn finalize(rules: Map<RuleID, Rule>) -> Grammar {
    let mut rules: Vec<Rule> = rules.into_values().collect();
    rules.sort_by_key(|r| r.rule_no);
    for rule in &mut rules {
        rule.semantic_steps.sort_by_key(|s| s.step_no);
    }
    Grammar { rules }
}

fn number<T: FromStr>(caps: &Captures<'_>, group: usize, line: usize) -> Result<T, AnnotationError> {
    let text = &caps[group];
    text.parse().map_err(|_| AnnotationError::InvalidNumber {
        line,
        text: text.to_owned(),
    })
}
