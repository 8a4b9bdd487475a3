//! The LALR automaton model reconstructed from a parser report.

use serde::Serialize;
use std::fmt;

/// The identifier of an automaton state, as numbered by the parser generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct StateID {
    raw: u32,
}
impl StateID {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }
    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.raw
    }
}
impl fmt::Display for StateID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The number of a grammar rule, as assigned by the parser generator.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
#[repr(transparent)]
pub struct RuleID {
    raw: u32,
}
impl RuleID {
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        Self { raw }
    }
    #[inline]
    pub const fn into_raw(self) -> u32 {
        self.raw
    }
}
impl fmt::Display for RuleID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.raw, f)
    }
}

/// The pseudo-symbol the report uses for the end of input.
pub const END_OF_INPUT: &str = "$end";

/// A dotted production item, kept verbatim from the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Item {
    pub rule: RuleID,
    pub item: String,
}

/// A transition on a terminal symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Shift {
    pub symbol: String,
    pub to: StateID,
}

/// A transition on a nonterminal symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Goto {
    pub symbol: String,
    pub to: StateID,
}

/// A reduction taken on a particular lookahead symbol.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Reduce {
    pub symbol: String,
    pub rule: RuleID,
    pub lhs: String,

    /// Whether the report marked this reduction as losing a conflict
    /// (`[reduce using rule N (X)]`).
    #[serde(skip_serializing_if = "is_false")]
    pub conflict: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

/// The action taken when no other entry matches the lookahead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum DefaultAction {
    Reduce { rule: RuleID, lhs: String },
    Accept,
}

/// A state of the LALR automaton.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    pub state: StateID,
    pub items: Vec<Item>,
    pub shifts: Vec<Shift>,
    pub reduces: Vec<Reduce>,
    pub gotos: Vec<Goto>,
    pub default: Option<DefaultAction>,
}

impl State {
    pub fn new(id: StateID) -> Self {
        Self {
            state: id,
            items: vec![],
            shifts: vec![],
            reduces: vec![],
            gotos: vec![],
            default: None,
        }
    }

    pub fn id(&self) -> StateID {
        self.state
    }

    /// Returns `true` if the report listed a conflicting reduction in this state.
    pub fn has_conflict(&self) -> bool {
        self.reduces.iter().any(|r| r.conflict)
    }
}

/// The states of an automaton, in the order their headers appear in the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Automaton {
    states: Vec<State>,
}

impl Automaton {
    pub fn new(states: Vec<State>) -> Self {
        Self { states }
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter()
    }

    /// Looks up a state by its identifier.
    ///
    /// Identifiers are not deduplicated, so the first state in report order wins.
    pub fn state(&self, id: StateID) -> Option<&State> {
        self.states.iter().find(|s| s.state == id)
    }

    pub fn conflicted_states(&self) -> impl Iterator<Item = &State> + '_ {
        self.states.iter().filter(|s| s.has_conflict())
    }

    pub fn into_states(self) -> Vec<State> {
        self.states
    }

    pub fn display(&self) -> impl fmt::Display + '_ {
        DisplayAutomaton { automaton: self }
    }
}

impl<'a> IntoIterator for &'a Automaton {
    type Item = &'a State;
    type IntoIter = std::slice::Iter<'a, State>;

    fn into_iter(self) -> Self::IntoIter {
        self.states.iter()
    }
}

struct DisplayAutomaton<'a> {
    automaton: &'a Automaton,
}

impl fmt::Display for DisplayAutomaton<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, state) in self.automaton.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }

            writeln!(f, "#### State {:02}", state.state)?;
            writeln!(f, "## items")?;
            for item in &state.items {
                writeln!(f, "- ({}) {}", item.rule, item.item)?;
            }
            writeln!(f, "## actions")?;
            for shift in &state.shifts {
                writeln!(f, "- {} => shift({})", shift.symbol, shift.to)?;
            }
            for reduce in &state.reduces {
                if reduce.conflict {
                    writeln!(
                        f,
                        "- {} => reduce({}, {}) [conflict]",
                        reduce.symbol, reduce.rule, reduce.lhs
                    )?;
                } else {
                    writeln!(
                        f,
                        "- {} => reduce({}, {})",
                        reduce.symbol, reduce.rule, reduce.lhs
                    )?;
                }
            }
            match &state.default {
                Some(DefaultAction::Reduce { rule, lhs }) => {
                    writeln!(f, "- $default => reduce({}, {})", rule, lhs)?;
                }
                Some(DefaultAction::Accept) => writeln!(f, "- $default => accept")?,
                None => (),
            }
            writeln!(f, "## gotos")?;
            for goto in &state.gotos {
                writeln!(f, "- {} => goto({})", goto.symbol, goto.to)?;
            }
        }
        Ok(())
    }
}
