use crate::automaton::{Automaton, BuildOptions, LookaheadMode, ShiftReducePolicy};
use crate::grammar::{Grammar, GrammarBuilder};

use super::*;

fn expression_grammar() -> Grammar {
    GrammarBuilder::new()
        .terminals(&["id", "plus"])
        .production("S", &["E"])
        .production("E", &["E", "plus", "T"])
        .production("E", &["T"])
        .production("T", &["id"])
        .build()
        .unwrap()
}

fn expression_tables(options: BuildOptions) -> (Grammar, Automaton, CompactTables) {
    let grammar = expression_grammar();
    let automaton = Automaton::build_with(&grammar, options);
    let tables = CompactTables::from_automaton(&automaton, &grammar);
    (grammar, automaton, tables)
}

#[test]
fn test_tables_match_automaton() {
    let (grammar, automaton, tables) = expression_tables(BuildOptions::default());
    let symbols = grammar.symbols();

    assert_eq!(tables.n_states(), automaton.len());
    for state in automaton.states() {
        for symbol in 0..symbols.len() {
            let expected = automaton.transition(state.id, symbol);
            if symbols.is_terminal(symbol) {
                assert_eq!(tables.shift(state.id, symbol), expected);
                assert_eq!(tables.goto(state.id, symbol), None);
            } else {
                assert_eq!(tables.goto(state.id, symbol), expected);
                assert_eq!(tables.shift(state.id, symbol), None);
            }
        }
        assert_eq!(tables.reduce(state.id), state.reduce);
    }

    for production in grammar.production_ids() {
        assert_eq!(tables.lhs(production), grammar.production(production).lhs());
        assert_eq!(tables.rhs_len(production), grammar.production(production).len());
    }
}

#[test]
fn test_segment_layout() {
    let (_, _, tables) = expression_tables(BuildOptions::default());

    // every segment ends in the sentinel pair
    for table in [&tables.shift, &tables.goto] {
        for offset in table.switch().iter().copied().filter(|x| *x != NONE) {
            let tail = &table.entries()[offset as usize..];
            let end = tail.iter().position(|(symbol, _)| *symbol == NONE).unwrap();
            assert_eq!(tail[end], (NONE, NONE));
        }
    }

    let summary = tables.summary();
    assert_eq!(summary.states, 6);
    assert_eq!(summary.shift_switch, 3);
    assert_eq!(summary.shift_entries, 6);
    assert_eq!(summary.goto_switch, 2);
    assert_eq!(summary.goto_entries, 5);
    assert_eq!(summary.reduce_entries, 4);
    assert_eq!(summary.shift_reduce_conflicts, 1);
    assert!(summary.to_string().contains("6 states, 4 productions"));
}

#[test]
fn test_prefer_reduce_drops_shift() {
    let (grammar, automaton, tables) = expression_tables(BuildOptions {
        shift_reduce: ShiftReducePolicy::PreferReduce,
        ..BuildOptions::default()
    });
    let plus = grammar.symbols().lookup("plus").unwrap();
    let conflict = automaton.conflicts()[0].state;

    assert!(automaton.transition(conflict, plus).is_some());
    assert_eq!(tables.shift(conflict, plus), None);
    assert!(tables.reduce(conflict).is_some());

    // under SLR the reduce does not claim `plus`, so the shift stays
    let (_, _, tables) = expression_tables(BuildOptions {
        lookahead: LookaheadMode::Slr,
        shift_reduce: ShiftReducePolicy::PreferReduce,
        ..BuildOptions::default()
    });
    assert!(tables.shift(conflict, plus).is_some());
}

#[test]
fn test_lookahead_bits() {
    let (grammar, _, tables) = expression_tables(BuildOptions {
        lookahead: LookaheadMode::Slr,
        ..BuildOptions::default()
    });
    let symbols = grammar.symbols();
    let id = symbols.lookup("id").unwrap();
    let plus = symbols.lookup("plus").unwrap();
    let e_plus_t = ProductionId::new(1);

    assert!(tables.lookahead(e_plus_t, plus));
    assert!(tables.lookahead(e_plus_t, crate::grammar::END));
    assert!(!tables.lookahead(e_plus_t, id));

    // out of range symbols must not read into the next production's row
    let s_e = ProductionId::new(0);
    assert!(tables.lookahead.contains(e_plus_t, crate::grammar::END));
    assert!(!tables.lookahead.contains(s_e, 64));
    assert!(!tables.lookahead(s_e, 64));
    let e = symbols.lookup("E").unwrap();
    assert!(!tables.lookahead(e_plus_t, e));
}

#[test]
fn test_lookahead_bits_past_first_word() {
    let names: Vec<String> = (0..70).map(|x| format!("t{}", x)).collect();
    let names: Vec<&str> = names.iter().map(|x| x.as_str()).collect();
    let grammar = GrammarBuilder::new()
        .terminals(&names)
        .production("S", &["A", "t66"])
        .production("A", &["t1"])
        .build()
        .unwrap();
    let automaton = Automaton::build_with(
        &grammar,
        BuildOptions {
            lookahead: LookaheadMode::Slr,
            ..BuildOptions::default()
        },
    );
    let tables = CompactTables::from_automaton(&automaton, &grammar);
    let t66 = grammar.symbols().lookup("t66").unwrap();
    assert_eq!(t66, 67);

    assert_eq!(tables.lookahead.words_per_row, 2);
    let a = ProductionId::new(1);
    assert!(tables.lookahead(a, t66));
    for symbol in (0..grammar.symbols().n_terminals()).filter(|x| *x != t66) {
        assert!(!tables.lookahead(a, symbol), "unexpected lookahead {}", symbol);
    }
}

#[test]
fn test_binary_round_trip() {
    let (_, _, tables) = expression_tables(BuildOptions::default());

    let mut bytes: Vec<u8> = Vec::new();
    tables.write_bin(&mut bytes).unwrap();
    assert_eq!(&bytes[..8], b"LRTBL001");

    let loaded = CompactTables::read_bin(&mut bytes.as_slice()).unwrap();
    assert_eq!(loaded, tables);
}

#[test]
fn test_binary_rejects_corruption() {
    let (_, _, tables) = expression_tables(BuildOptions::default());
    let mut bytes: Vec<u8> = Vec::new();
    tables.write_bin(&mut bytes).unwrap();

    let mut bad_magic = bytes.clone();
    bad_magic[0] = b'X';
    assert!(matches!(
        CompactTables::read_bin(&mut bad_magic.as_slice()),
        Err(TableIoError::BadMagic)
    ));

    let truncated = &bytes[..bytes.len() - 3];
    assert!(matches!(
        CompactTables::read_bin(&mut &truncated[..]),
        Err(TableIoError::Truncated)
    ));

    let mut broken = tables.clone();
    broken.reduce[0] = 99;
    let mut bytes: Vec<u8> = Vec::new();
    broken.write_bin(&mut bytes).unwrap();
    assert!(matches!(
        CompactTables::read_bin(&mut bytes.as_slice()),
        Err(TableIoError::Inconsistent(_))
    ));
}

#[test]
fn test_validate_shape() {
    let (_, _, tables) = expression_tables(BuildOptions::default());
    assert!(tables.validate().is_ok());

    let mut broken = tables.clone();
    broken.productions.rhs_len.pop();
    assert!(broken.validate().is_err());
}
