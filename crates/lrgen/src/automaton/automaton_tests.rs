use crate::grammar::{Grammar, GrammarBuilder, ProductionId};

use super::*;

fn expression_grammar() -> Grammar {
    GrammarBuilder::new()
        .terminals(&["id", "plus"])
        .production("S", &["E"])
        .production("E", &["E", "plus", "T"])
        .production("E", &["T"])
        .production("T", &["id"])
        .build()
        .expect("expression grammar is valid")
}

fn dangling_else_grammar() -> Grammar {
    GrammarBuilder::new()
        .terminals(&["if", "cond", "then", "else", "other"])
        .production("S", &["if", "cond", "then", "S"])
        .production("S", &["if", "cond", "then", "S", "else", "S"])
        .production("S", &["other"])
        .build()
        .unwrap()
}

fn item(production: usize, dot: u32) -> Item {
    Item {
        production: ProductionId::new(production),
        dot,
    }
}

fn set(items: &[Item]) -> ItemSet {
    items.iter().copied().collect()
}

#[test]
fn test_item_cursor() {
    let grammar = expression_grammar();
    let plus = grammar.symbols().lookup("plus").unwrap();
    let e = grammar.symbols().lookup("E").unwrap();

    let root = Item::root(ProductionId::new(1));
    assert_eq!(root.next_symbol(&grammar), Some(e));
    assert_eq!(root.advance().next_symbol(&grammar), Some(plus));
    assert!(!root.advance().advance().is_complete(&grammar));
    assert!(root.advance().advance().advance().is_complete(&grammar));
    assert_eq!(root.advance().advance().advance().next_symbol(&grammar), None);
    assert_eq!(root.advance().display(&grammar), "E -> E . plus T");
    assert_eq!(root, item(1, 0));
}

#[test]
fn test_closure_left_recursive() {
    let grammar = expression_grammar();
    let kernel = set(&[item(0, 0)]);

    let closed = closure(&grammar, &kernel);
    assert_eq!(closed, set(&[item(0, 0), item(1, 0), item(2, 0), item(3, 0)]));

    // idempotent
    assert_eq!(closure(&grammar, &closed), closed);
}

#[test]
fn test_closure_mutual_recursion() {
    let grammar = GrammarBuilder::new()
        .terminals(&["x", "y", "z", "w"])
        .production("A", &["B", "x"])
        .production("A", &["y"])
        .production("B", &["A", "z"])
        .production("B", &["w"])
        .build()
        .unwrap();

    let closed = closure(&grammar, &set(&[item(0, 0)]));
    assert_eq!(closed.len(), 4);
    assert_eq!(closure(&grammar, &closed), closed);

    // nothing to expand after a terminal
    let after = set(&[item(0, 1)]);
    assert_eq!(closure(&grammar, &after), after);
}

#[test]
fn test_closure_idempotent_on_every_state() {
    let grammar = dangling_else_grammar();
    let automaton = Automaton::build(&grammar);

    for state in automaton.states() {
        let full: ItemSet = state.items().copied().collect();
        assert_eq!(closure(&grammar, &state.kernel), full);
        assert_eq!(closure(&grammar, &full), full);
        assert!(state.kernel.is_disjoint(&state.closure));
    }
}

#[test]
fn test_root_state() {
    let grammar = expression_grammar();
    let automaton = Automaton::build(&grammar);

    let root = automaton.state(StateId::new(0));
    assert_eq!(root.kernel, set(&[item(0, 0)]));
    assert_eq!(root.closure, set(&[item(1, 0), item(2, 0), item(3, 0)]));
    assert_eq!(root.parent, None);
    assert_eq!(root.reduce, None);
}

#[test]
fn test_state_dedup() {
    let grammar = expression_grammar();
    let automaton = Automaton::build(&grammar);
    let id = grammar.symbols().lookup("id").unwrap();

    // T -> id . is reached from the root and from E -> E plus . T
    let kernel = set(&[item(3, 1)]);
    let matching: Vec<&State> = automaton
        .states()
        .iter()
        .filter(|x| x.kernel == kernel)
        .collect();
    assert_eq!(matching.len(), 1);

    let target = matching[0].id;
    let sources: Vec<StateId> = automaton
        .states()
        .iter()
        .filter(|x| x.transitions.get(&id) == Some(&target))
        .map(|x| x.id)
        .collect();
    assert_eq!(sources.len(), 2);
    assert!(automaton.reused_kernels() >= 1);

    // no two states share a kernel
    for (i, a) in automaton.states().iter().enumerate() {
        for b in &automaton.states()[i + 1..] {
            assert_ne!(a.kernel, b.kernel);
        }
    }
    assert_eq!(automaton.len(), 6);
}

#[test]
fn test_transitions_follow_kernels() {
    let grammar = expression_grammar();
    let automaton = Automaton::build(&grammar);

    for state in automaton.states() {
        for (symbol, next) in &state.transitions {
            let expected: ItemSet = state
                .items()
                .filter(|x| x.next_symbol(&grammar) == Some(*symbol))
                .map(|x| x.advance())
                .collect();
            assert_eq!(automaton.state(*next).kernel, expected);
        }
    }
}

#[test]
fn test_viable_prefix() {
    let grammar = expression_grammar();
    let automaton = Automaton::build(&grammar);
    let symbols = grammar.symbols();
    let e = symbols.lookup("E").unwrap();
    let plus = symbols.lookup("plus").unwrap();

    let after_e = automaton.transition(StateId::new(0), e).unwrap();
    let after_plus = automaton.transition(after_e, plus).unwrap();
    assert_eq!(automaton.viable_prefix(after_plus), vec![e, plus]);
    assert_eq!(automaton.state(after_plus).parent, Some((after_e, plus)));
}

#[test]
fn test_lr0_shift_reduce_reported() {
    let grammar = expression_grammar();
    let automaton = Automaton::build(&grammar);

    // S -> E . and E -> E . plus T share a state
    assert_eq!(automaton.shift_reduce_count(), 1);
    assert_eq!(automaton.reduce_reduce_count(), 0);

    let conflict = &automaton.conflicts()[0];
    assert_eq!(conflict.kind, ConflictKind::ShiftReduce);
    assert_eq!(
        conflict.productions,
        vec![ProductionId::new(0), ProductionId::new(1)]
    );
    assert_eq!(conflict.symbols, vec![grammar.symbols().lookup("plus").unwrap()]);
}

#[test]
fn test_slr_removes_spurious_conflict() {
    let grammar = expression_grammar();
    let options = BuildOptions {
        lookahead: LookaheadMode::Slr,
        ..BuildOptions::default()
    };
    let automaton = Automaton::build_with(&grammar, options);

    assert!(automaton.conflicts().is_empty());
    let follow_s: Vec<usize> = automaton.lookahead(ProductionId::new(0)).iter().collect();
    assert_eq!(follow_s, vec![0]);
}

#[test]
fn test_dangling_else_conflict() {
    let grammar = dangling_else_grammar();
    let options = BuildOptions {
        lookahead: LookaheadMode::Slr,
        ..BuildOptions::default()
    };
    let automaton = Automaton::build_with(&grammar, options);
    let else_ = grammar.symbols().lookup("else").unwrap();

    let conflicts: Vec<&Conflict> = automaton
        .conflicts()
        .iter()
        .filter(|x| x.kind == ConflictKind::ShiftReduce)
        .collect();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0].symbols, vec![else_]);

    let state = automaton.state(conflicts[0].state);
    assert_eq!(state.reduce, Some(ProductionId::new(0)));
    assert!(state.transitions.contains_key(&else_));
}

#[test]
fn test_reduce_reduce_policy() {
    // A and B both derive `x`, so S -> x is ambiguous between them
    let grammar = GrammarBuilder::new()
        .terminals(&["x"])
        .production("S", &["A"])
        .production("S", &["B"])
        .production("A", &["x"])
        .production("B", &["x"])
        .build()
        .unwrap();

    let automaton = Automaton::build(&grammar);
    assert_eq!(automaton.reduce_reduce_count(), 1);
    let conflict = &automaton.conflicts()[0];
    assert_eq!(
        conflict.productions,
        vec![ProductionId::new(2), ProductionId::new(3)]
    );
    assert_eq!(
        automaton.state(conflict.state).reduce,
        Some(ProductionId::new(2))
    );

    let options = BuildOptions {
        reduce_reduce: ReduceReducePolicy::KeepLast,
        lookahead: LookaheadMode::Slr,
        ..BuildOptions::default()
    };
    let automaton = Automaton::build_with(&grammar, options);
    let conflict = &automaton.conflicts()[0];
    assert_eq!(conflict.kind, ConflictKind::ReduceReduce);
    assert_eq!(conflict.symbols, vec![0]);
    assert_eq!(
        automaton.state(conflict.state).reduce,
        Some(ProductionId::new(3))
    );
}

#[test]
fn test_epsilon_production_reduces_in_root() {
    let grammar = GrammarBuilder::new()
        .terminals(&["a"])
        .production("L", &["a", "L"])
        .production("L", &[])
        .build()
        .unwrap();
    let automaton = Automaton::build(&grammar);

    assert_eq!(
        automaton.state(StateId::new(0)).reduce,
        Some(ProductionId::new(1))
    );
}

#[test]
fn test_report_lists_states() {
    let grammar = expression_grammar();
    let automaton = Automaton::build(&grammar);
    let report = automaton.report(&grammar);

    assert!(report.starts_with("A0: V[]\n"));
    assert!(report.contains("I:\tS -> . E"));
    assert!(report.contains("reduce(3)"));
    assert!(report.contains("shift-reduce"));
}
