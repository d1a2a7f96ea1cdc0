// Flattened shift/goto/reduce tables. Transitions are stored as per-state
// segments in one contiguous array, so lookups are a short linear scan and
// the whole thing serializes as a handful of flat vectors.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::automaton::{Automaton, ShiftReducePolicy, StateId};
use crate::grammar::{Grammar, ProductionId, SymbolId};

pub mod io;

#[cfg(test)]
mod tables_tests;

pub use io::TableIoError;

/// Marks "no entry" in every table, and terminates each segment.
pub const NONE: u32 = u32::MAX;

/// Per-state segments of (symbol, next state) pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentTable {
    // state -> offset of its segment in `entries`, or NONE
    switch: Vec<u32>,
    entries: Vec<(u32, u32)>,
}

impl SegmentTable {
    fn from_rows<I>(rows: I) -> SegmentTable
    where
        I: IntoIterator<Item = Vec<(SymbolId, StateId)>>,
    {
        let mut switch = Vec::new();
        let mut entries = Vec::new();

        for row in rows {
            if row.is_empty() {
                switch.push(NONE);
                continue;
            }
            switch.push(entries.len() as u32);
            entries.extend(row.iter().map(|(symbol, next)| (*symbol, next.raw())));
            entries.push((NONE, NONE));
        }

        SegmentTable { switch, entries }
    }

    pub(crate) fn from_raw_parts(switch: Vec<u32>, entries: Vec<(u32, u32)>) -> SegmentTable {
        SegmentTable { switch, entries }
    }

    pub fn lookup(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.segment(state)
            .find(|(x, _)| *x == symbol)
            .map(|(_, next)| next)
    }

    /// The (symbol, next state) pairs of one state, sentinel excluded.
    pub fn segment(&self, state: StateId) -> impl Iterator<Item = (SymbolId, StateId)> + '_ {
        let start = match self.switch.get(state.index()) {
            Some(&offset) if offset != NONE => offset as usize,
            _ => self.entries.len(),
        };
        self.entries[start..]
            .iter()
            .take_while(|(symbol, _)| *symbol != NONE)
            .map(|(symbol, next)| (*symbol, StateId::from_raw(*next)))
    }

    pub fn switch(&self) -> &[u32] {
        &self.switch
    }

    pub fn entries(&self) -> &[(u32, u32)] {
        &self.entries
    }

    /// States with at least one entry.
    pub fn occupied(&self) -> usize {
        self.switch.iter().filter(|x| **x != NONE).count()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductionTable {
    pub lhs: Vec<u32>,
    pub rhs_len: Vec<u32>,
}

/// One bit row per production over the terminals.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LookaheadTable {
    pub words_per_row: u32,
    pub words: Vec<u64>,
}

impl LookaheadTable {
    /// Symbols past the end of the row are never contained.
    pub fn contains(&self, production: ProductionId, symbol: SymbolId) -> bool {
        if symbol as usize >= self.words_per_row as usize * 64 {
            return false;
        }
        let row = production.index() * self.words_per_row as usize;
        match self.words.get(row + symbol as usize / 64) {
            Some(word) => (word >> (symbol % 64)) & 1 == 1,
            None => false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CompactTables {
    pub n_terminals: u32,
    pub n_nonterminals: u32,
    pub start: SymbolId,
    pub shift: SegmentTable,
    pub goto: SegmentTable,
    /// state -> production id, or NONE
    pub reduce: Vec<u32>,
    pub productions: ProductionTable,
    pub lookahead: LookaheadTable,
    pub shift_reduce_conflicts: u32,
    pub reduce_reduce_conflicts: u32,
}

impl CompactTables {
    pub fn from_automaton(automaton: &Automaton, grammar: &Grammar) -> CompactTables {
        let symbols = grammar.symbols();
        let policy = automaton.options().shift_reduce;

        let shift_rows = automaton.states().iter().map(|state| {
            state
                .transitions
                .iter()
                .filter(|(symbol, _)| symbols.is_terminal(**symbol))
                .filter(|(symbol, _)| match (policy, state.reduce) {
                    (ShiftReducePolicy::PreferReduce, Some(p)) => {
                        !automaton.lookahead(p).contains(**symbol as usize)
                    }
                    _ => true,
                })
                .map(|(symbol, next)| (*symbol, *next))
                .collect::<Vec<_>>()
        });
        let shift = SegmentTable::from_rows(shift_rows);

        let goto_rows = automaton.states().iter().map(|state| {
            state
                .transitions
                .iter()
                .filter(|(symbol, _)| symbols.is_nonterminal(**symbol))
                .map(|(symbol, next)| (*symbol, *next))
                .collect::<Vec<_>>()
        });
        let goto = SegmentTable::from_rows(goto_rows);

        let reduce: Vec<u32> = automaton
            .states()
            .iter()
            .map(|x| x.reduce.map_or(NONE, |p| p.raw()))
            .collect();

        let productions = ProductionTable {
            lhs: grammar.productions().iter().map(|x| x.lhs()).collect(),
            rhs_len: grammar.productions().iter().map(|x| x.len() as u32).collect(),
        };

        let words_per_row = (symbols.n_terminals() as usize).div_ceil(64);
        let mut words = vec![0u64; words_per_row * grammar.productions().len()];
        for production in grammar.production_ids() {
            for symbol in automaton.lookahead(production).iter() {
                words[production.index() * words_per_row + symbol / 64] |= 1u64 << (symbol % 64);
            }
        }

        let tables = CompactTables {
            n_terminals: symbols.n_terminals(),
            n_nonterminals: symbols.n_nonterminals(),
            start: grammar.start(),
            shift,
            goto,
            reduce,
            productions,
            lookahead: LookaheadTable {
                words_per_row: words_per_row as u32,
                words,
            },
            shift_reduce_conflicts: automaton.shift_reduce_count() as u32,
            reduce_reduce_conflicts: automaton.reduce_reduce_count() as u32,
        };
        log::debug!("{}", tables.summary());
        tables
    }

    pub fn shift(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.shift.lookup(state, symbol)
    }

    pub fn goto(&self, state: StateId, nonterminal: SymbolId) -> Option<StateId> {
        self.goto.lookup(state, nonterminal)
    }

    pub fn reduce(&self, state: StateId) -> Option<ProductionId> {
        match self.reduce.get(state.index()) {
            Some(&p) if p != NONE => Some(ProductionId::from_raw(p)),
            _ => None,
        }
    }

    pub fn lhs(&self, production: ProductionId) -> SymbolId {
        self.productions.lhs[production.index()]
    }

    pub fn rhs_len(&self, production: ProductionId) -> usize {
        self.productions.rhs_len[production.index()] as usize
    }

    pub fn lookahead(&self, production: ProductionId, symbol: SymbolId) -> bool {
        self.is_terminal(symbol) && self.lookahead.contains(production, symbol)
    }

    pub fn n_states(&self) -> usize {
        self.reduce.len()
    }

    pub fn n_productions(&self) -> usize {
        self.productions.lhs.len()
    }

    pub fn is_terminal(&self, symbol: SymbolId) -> bool {
        symbol < self.n_terminals
    }

    pub fn summary(&self) -> TableSummary {
        TableSummary {
            states: self.n_states(),
            productions: self.n_productions(),
            shift_switch: self.shift.occupied(),
            shift_entries: self.shift.entries.len(),
            goto_switch: self.goto.occupied(),
            goto_entries: self.goto.entries.len(),
            reduce_entries: self.reduce.iter().filter(|x| **x != NONE).count(),
            shift_reduce_conflicts: self.shift_reduce_conflicts as usize,
            reduce_reduce_conflicts: self.reduce_reduce_conflicts as usize,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableSummary {
    pub states: usize,
    pub productions: usize,
    pub shift_switch: usize,
    pub shift_entries: usize,
    pub goto_switch: usize,
    pub goto_entries: usize,
    pub reduce_entries: usize,
    pub shift_reduce_conflicts: usize,
    pub reduce_reduce_conflicts: usize,
}

impl fmt::Display for TableSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{} states, {} productions", self.states, self.productions)?;
        writeln!(
            f,
            "shift: {} switch entries, {} segment entries",
            self.shift_switch, self.shift_entries
        )?;
        writeln!(
            f,
            "goto: {} switch entries, {} segment entries",
            self.goto_switch, self.goto_entries
        )?;
        writeln!(f, "reduce: {} entries", self.reduce_entries)?;
        write!(
            f,
            "{} shift-reduce conflicts, {} reduce-reduce conflicts",
            self.shift_reduce_conflicts, self.reduce_reduce_conflicts
        )
    }
}
