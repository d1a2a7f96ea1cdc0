// FIRST and FOLLOW sets, used to restrict reduce decisions to the
// terminals that can actually follow a completed production (SLR)

use std::fmt::Write;

use bit_set::BitSet;

use super::{Grammar, SymbolId, END};

/// FIRST sets over terminals, plus the set of nullable nonterminals.
#[derive(Debug, Clone)]
pub struct FirstSets {
    // indexed by symbol id; terminals map to themselves
    first: Vec<BitSet>,
    nullable: BitSet,
    n_terminals: usize,
}

impl FirstSets {
    pub fn compute(grammar: &Grammar) -> FirstSets {
        let symbols = grammar.symbols();
        let n_terminals = symbols.n_terminals() as usize;
        let n_symbols = symbols.len() as usize;

        let mut first: Vec<BitSet> = (0..n_symbols)
            .map(|_| BitSet::with_capacity(n_terminals))
            .collect();
        for t in symbols.terminals() {
            first[t as usize].insert(t as usize);
        }

        let nullable = Self::compute_nullable(grammar);

        // n^2 in size of grammar; fine for the grammar sizes we handle
        loop {
            let mut changed = false;
            for production in grammar.productions() {
                let lhs = production.lhs() as usize;
                for symbol in production.rhs().iter().copied() {
                    let symbol = symbol as usize;
                    if symbol != lhs {
                        let addition = first[symbol].clone();
                        let before = first[lhs].len();
                        first[lhs].union_with(&addition);
                        changed |= first[lhs].len() != before;
                    }

                    if !nullable.contains(symbol) {
                        break;
                    }
                }
            }

            if !changed {
                break;
            }
        }

        FirstSets {
            first,
            nullable,
            n_terminals,
        }
    }

    fn compute_nullable(grammar: &Grammar) -> BitSet {
        let mut nullable = BitSet::with_capacity(grammar.symbols().len() as usize);
        loop {
            let mut changed = false;
            for production in grammar.productions() {
                let all_nullable = production
                    .rhs()
                    .iter()
                    .all(|x| nullable.contains(*x as usize));

                if all_nullable {
                    changed |= nullable.insert(production.lhs() as usize);
                }
            }

            if !changed {
                break;
            }
        }

        nullable
    }

    pub fn first(&self, symbol: SymbolId) -> &BitSet {
        &self.first[symbol as usize]
    }

    pub fn is_nullable(&self, symbol: SymbolId) -> bool {
        self.nullable.contains(symbol as usize)
    }

    /// FIRST of a symbol string, and whether the whole string can derive epsilon.
    pub fn first_of_sequence(&self, sequence: &[SymbolId]) -> (BitSet, bool) {
        let mut result = BitSet::with_capacity(self.n_terminals);
        for symbol in sequence.iter().copied() {
            result.union_with(&self.first[symbol as usize]);
            if !self.is_nullable(symbol) {
                return (result, false);
            }
        }
        (result, true)
    }
}

/// FOLLOW sets, indexed by nonterminal position.
#[derive(Debug, Clone)]
pub struct FollowSets {
    follow: Vec<BitSet>,
    n_terminals: u32,
}

impl FollowSets {
    pub fn compute(grammar: &Grammar, first: &FirstSets) -> FollowSets {
        let symbols = grammar.symbols();
        let n_terminals = symbols.n_terminals();
        let mut follow: Vec<BitSet> = (0..symbols.n_nonterminals())
            .map(|_| BitSet::with_capacity(n_terminals as usize))
            .collect();

        follow[symbols.nonterminal_index(grammar.start())].insert(END as usize);

        loop {
            let mut changed = false;
            for production in grammar.productions() {
                let lhs = symbols.nonterminal_index(production.lhs());
                let rhs = production.rhs();
                for (i, symbol) in rhs.iter().copied().enumerate() {
                    if !symbols.is_nonterminal(symbol) {
                        continue;
                    }
                    let target = symbols.nonterminal_index(symbol);

                    let (mut addition, rest_nullable) = first.first_of_sequence(&rhs[i + 1..]);
                    if rest_nullable {
                        addition.union_with(&follow[lhs]);
                    }

                    let before = follow[target].len();
                    follow[target].union_with(&addition);
                    changed |= follow[target].len() != before;
                }
            }

            if !changed {
                break;
            }
        }

        FollowSets {
            follow,
            n_terminals,
        }
    }

    pub fn follow(&self, nonterminal: SymbolId) -> &BitSet {
        &self.follow[(nonterminal - self.n_terminals) as usize]
    }
}

/// One line per symbol. Nonterminals also list FIRST and FOLLOW, and are
/// marked when nullable.
pub fn symbol_table(grammar: &Grammar) -> String {
    let symbols = grammar.symbols();
    let first = FirstSets::compute(grammar);
    let follow = FollowSets::compute(grammar, &first);
    let names = |set: &BitSet| {
        set.iter()
            .map(|x| symbols.name(x as SymbolId))
            .collect::<Vec<_>>()
            .join(" ")
    };

    let mut out = String::new();
    for t in symbols.terminals() {
        let _ = writeln!(out, "{:<4}{}", t, symbols.name(t));
    }
    for nt in symbols.nonterminals() {
        let _ = write!(
            out,
            "{:<4}{:<16} first[{}] follow[{}]",
            nt,
            symbols.name(nt),
            names(first.first(nt)),
            names(follow.follow(nt))
        );
        if first.is_nullable(nt) {
            out.push_str(" nullable");
        }
        out.push('\n');
    }
    out
}
