use std::{env, fs, path::PathBuf};
use tracing::Level;
use yyviz::{
    annotation::{self, Markers},
    automaton::{DefaultAction, RuleID, State, StateID},
    report,
};

fn fixture(name: &str) -> PathBuf {
    PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap())
        .join("tests/fixtures")
        .join(name)
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(Level::TRACE)
        .with_test_writer()
        .try_init();
}

macro_rules! define_tests {
    ($($name:ident),*$(,)?) => {$(
        #[test]
        fn $name() {
            init_tracing();
            let path = fixture(concat!(stringify!($name), ".output"));
            let source = fs::read_to_string(&path).unwrap();
            let automaton = report::parse(&source).unwrap();

            let headers: Vec<u32> = source
                .lines()
                .filter_map(|line| line.strip_prefix("State "))
                .filter_map(|rest| rest.trim_end().parse().ok())
                .collect();
            let ids: Vec<u32> = automaton.iter().map(|s| s.id().into_raw()).collect();
            assert_eq!(ids, headers);

            for state in &automaton {
                assert!(!state.items.is_empty(), "state {} has no items", state.id());
            }
        }
    )*};
}

define_tests! {
    calc,
    decl,
}

#[test]
fn calc_details() {
    let automaton = report::parse_file(fixture("calc.output")).unwrap();
    assert_eq!(automaton.len(), 15);

    let s1 = automaton.state(StateID::from_raw(1)).unwrap();
    let shifts: Vec<_> = s1
        .shifts
        .iter()
        .map(|s| (s.symbol.as_str(), s.to.into_raw()))
        .collect();
    assert_eq!(shifts, [("$end", 2), ("NUM", 3), ("'\\n'", 4), ("'('", 5)]);
    let gotos: Vec<_> = s1
        .gotos
        .iter()
        .map(|g| (g.symbol.as_str(), g.to.into_raw()))
        .collect();
    assert_eq!(gotos, [("line", 6), ("exp", 7)]);
    assert!(s1.default.is_none());

    let s0 = automaton.state(StateID::from_raw(0)).unwrap();
    assert_eq!(
        s0.default,
        Some(DefaultAction::Reduce {
            rule: RuleID::from_raw(1),
            lhs: "input".into(),
        })
    );

    assert_eq!(
        automaton.state(StateID::from_raw(2)).unwrap().default,
        Some(DefaultAction::Accept)
    );

    let s13 = automaton.state(StateID::from_raw(13)).unwrap();
    assert_eq!(s13.items.len(), 3);
    assert_eq!(s13.items[1].item, "| exp '+' exp .");

    let conflicted: Vec<_> = automaton.conflicted_states().map(State::id).collect();
    assert_eq!(conflicted, [StateID::from_raw(8)]);
    let s8 = automaton.state(StateID::from_raw(8)).unwrap();
    assert_eq!(s8.reduces.len(), 2);
    assert!(s8.default.is_none());
}

#[test]
fn decl_details() {
    let automaton = report::parse_file(fixture("decl.output")).unwrap();
    assert_eq!(automaton.len(), 15);

    let s2 = automaton.state(StateID::from_raw(2)).unwrap();
    assert_eq!(s2.items.len(), 2);
    assert_eq!(s2.reduces.len(), 1);
    assert_eq!(s2.reduces[0].symbol, "$end");
    assert!(!s2.reduces[0].conflict);
    assert_eq!(s2.gotos[0].symbol, "decl");

    let s1 = automaton.state(StateID::from_raw(1)).unwrap();
    assert_eq!(s1.shifts[0].symbol, "$end");
    assert_eq!(s1.shifts[0].to, StateID::from_raw(3));
}

#[test]
fn calc_annotations() {
    let grammar = annotation::extract_file(fixture("calc.y"), &Markers::default()).unwrap();

    let rule_nos: Vec<_> = grammar.iter().map(|r| r.rule_no.into_raw()).collect();
    assert_eq!(rule_nos, [1, 2, 3, 4, 5, 6, 7, 8]);

    let r4 = grammar.rule(RuleID::from_raw(4)).unwrap();
    assert_eq!(r4.text, "line -> exp '\\\\n'");
    let steps: Vec<_> = r4
        .semantic_steps
        .iter()
        .map(|s| (s.step_no, s.instr.as_str()))
        .collect();
    assert_eq!(steps, [(1, "eval($1)"), (2, "print($1)")]);

    let r8 = grammar.rule(RuleID::from_raw(8)).unwrap();
    assert_eq!(r8.text, "");
    assert_eq!(r8.semantic_steps[0].instr, "$$ = $2");

    assert!(grammar.rule(RuleID::from_raw(99)).is_none());
    assert_eq!(
        grammar
            .unannotated_rules()
            .map(|r| r.rule_no.into_raw())
            .collect::<Vec<_>>(),
        [8]
    );
}

#[test]
fn calc_json_roundtrip() {
    let automaton = report::parse_file(fixture("calc.output")).unwrap();
    let json = serde_json::to_string_pretty(&automaton).unwrap();
    let value: serde_json::Value = serde_json::from_str(&json).unwrap();

    let states = value.as_array().unwrap();
    assert_eq!(states.len(), 15);
    assert_eq!(states[8]["reduces"][0]["conflict"], true);
    assert_eq!(states[13]["default"]["lhs"], "exp");
    assert!(states[3]["gotos"].as_array().unwrap().is_empty());
}
