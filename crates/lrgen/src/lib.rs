pub mod automaton;
pub mod grammar;
pub mod parser;
pub mod scanner;
pub mod tables;

use automaton::{Automaton, BuildOptions, Conflict};
use grammar::Grammar;
use tables::CompactTables;

/// Everything one table generation produces. Conflict statistics live here
/// rather than in any shared state, so builds are independent.
#[derive(Debug, Clone)]
pub struct Generated {
    pub automaton: Automaton,
    pub tables: CompactTables,
}

impl Generated {
    pub fn conflicts(&self) -> &[Conflict] {
        self.automaton.conflicts()
    }
}

pub fn generate(grammar: &Grammar, options: BuildOptions) -> Generated {
    let automaton = Automaton::build_with(grammar, options);
    let tables = CompactTables::from_automaton(&automaton, grammar);
    Generated { automaton, tables }
}
