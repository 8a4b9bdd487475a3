//! Reconstruction of the LALR automaton from a parser generator report.
//!
//! The report (`bison -v`'s `.output` file) has no formal grammar. Every line
//! is classified against an ordered table of patterns and the first match
//! wins. Lines that match nothing are skipped, so decorative text, the
//! grammar listing and conflict summaries before the first `State N` header
//! never contribute to the result.

use crate::automaton::{
    Automaton, DefaultAction, Goto, Item, Reduce, RuleID, Shift, State, StateID, END_OF_INPUT,
};
use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use std::{fs, io, path::Path, str::FromStr};

#[derive(Debug, thiserror::Error)]
pub enum ReportError {
    #[error("IO error: {}", _0)]
    Io(#[from] io::Error),

    #[error("line {line}: `{text}' is not a valid state or rule number")]
    InvalidNumber { line: usize, text: String },
}

#[derive(Debug, Copy, Clone, PartialEq, Eq)]
enum LineKind {
    Item,
    EndShift,
    Shift,
    ConflictReduce,
    DefaultReduce,
    DefaultAccept,
    Reduce,
    Goto,
}

// Numbers are ASCII digit runs; `\d` would also accept other scripts' digits.
static HEADER: Lazy<Regex> = Lazy::new(|| Regex::new(r"^State\s+([0-9]+)\s*$").unwrap());

/// Patterns for the lines inside a state, tried in declaration order.
///
/// The order is significant: `$end` must be caught before the generic shift,
/// `$default` before the plain lookahead reduce, and shifts before gotos.
const LINE_PATTERNS: &[(LineKind, &str)] = &[
    (LineKind::Item, r"^\s*([0-9]+)\s+(.*)$"),
    (
        LineKind::EndShift,
        r"^\s*\$end\s+shift, and go to state\s+([0-9]+)",
    ),
    (LineKind::Shift, r"^\s*(\S+)\s+shift, and go to state\s+([0-9]+)"),
    (
        LineKind::ConflictReduce,
        r"^\s*(\S+)\s+\[reduce using rule\s+([0-9]+)\s+\(([^)]+)\)\]",
    ),
    (
        LineKind::DefaultReduce,
        r"^\s*\$default\s+reduce using rule\s+([0-9]+)\s+\(([^)]+)\)",
    ),
    (LineKind::DefaultAccept, r"^\s*\$default\s+accept"),
    (
        LineKind::Reduce,
        r"^\s*(\S+)\s+reduce using rule\s+([0-9]+)\s+\(([^)]+)\)",
    ),
    (LineKind::Goto, r"^\s*(\S+)\s+go to state\s+([0-9]+)"),
];

static LINE_TABLE: Lazy<Vec<(LineKind, Regex)>> = Lazy::new(|| {
    LINE_PATTERNS
        .iter()
        .map(|&(kind, pattern)| (kind, Regex::new(pattern).unwrap()))
        .collect()
});

pub fn parse_file(path: impl AsRef<Path>) -> Result<Automaton, ReportError> {
    let source = fs::read_to_string(path)?;
    parse(&source)
}

/// Parses the whole text of a report into its states, in header order.
pub fn parse(source: &str) -> Result<Automaton, ReportError> {
    let span = tracing::trace_span!("parse_report");
    let _entered = span.enter();

    let mut scanner = Scanner::default();
    for (i, line) in source.lines().enumerate() {
        scanner.feed(i + 1, line)?;
    }
    let automaton = scanner.finish();

    tracing::debug!("parsed {} states", automaton.len());
    Ok(automaton)
}

#[derive(Debug, Default)]
struct Scanner {
    states: Vec<State>,
    current: Option<Pending>,
}

#[derive(Debug)]
struct Pending {
    state: State,
    // set by the first action line; item-shaped lines after it are not items.
    in_actions: bool,
}

impl Scanner {
    fn feed(&mut self, lineno: usize, line: &str) -> Result<(), ReportError> {
        if let Some(caps) = HEADER.captures(line) {
            let id = StateID::from_raw(number(&caps, 1, lineno)?);
            tracing::trace!("{}: enter state {}", lineno, id);
            self.flush();
            self.current = Some(Pending {
                state: State::new(id),
                in_actions: false,
            });
            return Ok(());
        }

        // Nothing before the first header is part of the automaton.
        let Some(current) = &mut self.current else {
            return Ok(());
        };
        let Some((kind, caps)) = classify(line, !current.in_actions) else {
            tracing::trace!("{}: skip {:?}", lineno, line);
            return Ok(());
        };
        tracing::trace!("{}: {:?}", lineno, kind);

        let state = &mut current.state;
        match kind {
            LineKind::Item => {
                state.items.push(Item {
                    rule: RuleID::from_raw(number(&caps, 1, lineno)?),
                    item: caps[2].trim().to_owned(),
                });
                return Ok(());
            }

            LineKind::EndShift => state.shifts.push(Shift {
                symbol: END_OF_INPUT.to_owned(),
                to: StateID::from_raw(number(&caps, 1, lineno)?),
            }),
            LineKind::Shift => state.shifts.push(Shift {
                symbol: caps[1].to_owned(),
                to: StateID::from_raw(number(&caps, 2, lineno)?),
            }),

            LineKind::ConflictReduce | LineKind::Reduce => state.reduces.push(Reduce {
                symbol: caps[1].to_owned(),
                rule: RuleID::from_raw(number(&caps, 2, lineno)?),
                lhs: caps[3].to_owned(),
                conflict: kind == LineKind::ConflictReduce,
            }),

            LineKind::DefaultReduce => {
                let action = DefaultAction::Reduce {
                    rule: RuleID::from_raw(number(&caps, 1, lineno)?),
                    lhs: caps[2].to_owned(),
                };
                if let Some(prev) = state.default.replace(action) {
                    tracing::debug!("{}: overriding default action {:?}", lineno, prev);
                }
            }
            LineKind::DefaultAccept => {
                if let Some(prev) = state.default.replace(DefaultAction::Accept) {
                    tracing::debug!("{}: overriding default action {:?}", lineno, prev);
                }
            }

            LineKind::Goto => state.gotos.push(Goto {
                symbol: caps[1].to_owned(),
                to: StateID::from_raw(number(&caps, 2, lineno)?),
            }),
        }
        current.in_actions = true;

        Ok(())
    }

    fn flush(&mut self) {
        if let Some(pending) = self.current.take() {
            self.states.push(pending.state);
        }
    }

    fn finish(mut self) -> Automaton {
        self.flush();
        Automaton::new(self.states)
    }
}

fn classify(line: &str, accepts_items: bool) -> Option<(LineKind, Captures<'_>)> {
    LINE_TABLE
        .iter()
        .filter(|(kind, _)| accepts_items || *kind != LineKind::Item)
        .find_map(|(kind, re)| re.captures(line).map(|caps| (*kind, caps)))
}

fn number<T: FromStr>(caps: &Captures<'_>, group: usize, line: usize) -> Result<T, ReportError> {
    let text = &caps[group];
    text.parse().map_err(|_| ReportError::InvalidNumber {
        line,
        text: text.to_owned(),
    })
}
