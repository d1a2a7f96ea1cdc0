use std::collections::{HashMap, HashSet};

use bit_set::BitSet;
use lrgen_util::make_type_idx;
use thiserror::Error;

pub mod first_follow;
pub mod loader;

use first_follow::FirstSets;


// everything is just indices: terminals occupy [0, n_terminals),
// nonterminals occupy [n_terminals, n_terminals + n_nonterminals)
pub type SymbolId = u32;

/// Reserved end-of-input terminal, always id 0.
pub const END: SymbolId = 0;
pub const END_NAME: &str = "$end";

make_type_idx!(ProductionId, Production);

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("symbol `{0}` is undefined")]
    UndefinedSymbol(String),
    #[error("terminal `{0}` cannot be declared as a production head")]
    TerminalAsHead(String),
    #[error("nonterminal `{0}` has no productions")]
    NoProductions(String),
    #[error("symbol `{0}` is declared more than once")]
    DuplicateSymbol(String),
    #[error("grammar declares no nonterminals")]
    NoNonterminals,
    #[error("symbol id {0} is outside of the symbol space")]
    SymbolOutOfRange(SymbolId),
    #[error("`$end` cannot appear on the right-hand side of a production")]
    EndInProduction,
}

/// Fixed partition of symbol ids into terminals and nonterminals.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SymbolSpace {
    n_terminals: u32,
    n_nonterminals: u32,
    names: Vec<String>,
}

impl SymbolSpace {
    /// `terminals` excludes the end terminal, which is inserted at id 0.
    pub fn new<S: AsRef<str>>(
        terminals: &[S],
        nonterminals: &[S],
    ) -> Result<SymbolSpace, GrammarError> {
        let names: Vec<String> = std::iter::once(END_NAME)
            .chain(terminals.iter().map(|x| x.as_ref()))
            .chain(nonterminals.iter().map(|x| x.as_ref()))
            .map(|x| x.to_string())
            .collect();

        let mut seen: HashSet<&str> = HashSet::new();
        for name in &names {
            if !seen.insert(name.as_str()) {
                return Err(GrammarError::DuplicateSymbol(name.clone()));
            }
        }

        Ok(SymbolSpace {
            n_terminals: terminals.len() as u32 + 1,
            n_nonterminals: nonterminals.len() as u32,
            names,
        })
    }

    pub fn n_terminals(&self) -> u32 {
        self.n_terminals
    }

    pub fn n_nonterminals(&self) -> u32 {
        self.n_nonterminals
    }

    pub fn len(&self) -> u32 {
        self.n_terminals + self.n_nonterminals
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_terminal(&self, symbol: SymbolId) -> bool {
        symbol < self.n_terminals
    }

    pub fn is_nonterminal(&self, symbol: SymbolId) -> bool {
        self.n_terminals <= symbol && symbol < self.len()
    }

    /// Zero-based position of a nonterminal among the nonterminals.
    pub fn nonterminal_index(&self, symbol: SymbolId) -> usize {
        debug_assert!(self.is_nonterminal(symbol));
        (symbol - self.n_terminals) as usize
    }

    pub fn name(&self, symbol: SymbolId) -> &str {
        self.names
            .get(symbol as usize)
            .map(|x| x.as_str())
            .unwrap_or("<invalid>")
    }

    pub fn lookup(&self, name: &str) -> Option<SymbolId> {
        self.names
            .iter()
            .position(|x| x == name)
            .map(|x| x as SymbolId)
    }

    pub fn terminals(&self) -> impl Iterator<Item = SymbolId> {
        0..self.n_terminals
    }

    pub fn nonterminals(&self) -> impl Iterator<Item = SymbolId> {
        self.n_terminals..self.len()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Production {
    lhs: SymbolId,
    rhs: Vec<SymbolId>,
}

impl Production {
    pub fn new(lhs: SymbolId, rhs: Vec<SymbolId>) -> Production {
        Production { lhs, rhs }
    }

    pub fn lhs(&self) -> SymbolId {
        self.lhs
    }

    pub fn rhs(&self) -> &[SymbolId] {
        &self.rhs
    }

    pub fn len(&self) -> usize {
        self.rhs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rhs.is_empty()
    }
}

/// Frozen context-free grammar. Never mutated after construction.
#[derive(Debug, Clone)]
pub struct Grammar {
    symbols: SymbolSpace,
    productions: Vec<Production>,
    // nonterminal index -> productions, in declaration order
    by_nonterminal: Vec<Vec<ProductionId>>,
    start: SymbolId,
}

impl Grammar {
    /// Validates a grammar given directly in symbol ids.
    pub fn from_parts(
        symbols: SymbolSpace,
        productions: Vec<Production>,
        start: SymbolId,
    ) -> Result<Grammar, GrammarError> {
        if symbols.n_nonterminals() == 0 {
            return Err(GrammarError::NoNonterminals);
        }
        if !symbols.is_nonterminal(start) {
            return Err(GrammarError::TerminalAsHead(symbols.name(start).to_string()));
        }

        let mut by_nonterminal: Vec<Vec<ProductionId>> =
            vec![Vec::new(); symbols.n_nonterminals() as usize];

        for (i, production) in productions.iter().enumerate() {
            if production.lhs >= symbols.len() {
                return Err(GrammarError::SymbolOutOfRange(production.lhs));
            }
            if symbols.is_terminal(production.lhs) {
                return Err(GrammarError::TerminalAsHead(
                    symbols.name(production.lhs).to_string(),
                ));
            }
            for symbol in production.rhs.iter().copied() {
                if symbol >= symbols.len() {
                    return Err(GrammarError::SymbolOutOfRange(symbol));
                }
                if symbol == END {
                    return Err(GrammarError::EndInProduction);
                }
            }

            by_nonterminal[symbols.nonterminal_index(production.lhs)].push(ProductionId::new(i));
        }

        for nt in symbols.nonterminals() {
            if by_nonterminal[symbols.nonterminal_index(nt)].is_empty() {
                return Err(GrammarError::NoProductions(symbols.name(nt).to_string()));
            }
        }

        let grammar = Grammar {
            symbols,
            productions,
            by_nonterminal,
            start,
        };

        for symbol in grammar.unreachable_symbols() {
            log::warn!(
                "{} ({}) is unreachable",
                grammar.symbols.name(symbol),
                symbol
            );
        }
        for symbol in grammar.cyclic_nonterminals() {
            log::warn!(
                "{} ({}) derives itself; parses through it cannot finish",
                grammar.symbols.name(symbol),
                symbol
            );
        }

        Ok(grammar)
    }

    pub fn symbols(&self) -> &SymbolSpace {
        &self.symbols
    }

    pub fn productions(&self) -> &[Production] {
        &self.productions
    }

    pub fn production(&self, id: ProductionId) -> &Production {
        &self.productions[id]
    }

    pub fn production_ids(&self) -> impl Iterator<Item = ProductionId> {
        (0..self.productions.len()).map(ProductionId::new)
    }

    pub fn productions_of(&self, nt: SymbolId) -> &[ProductionId] {
        &self.by_nonterminal[self.symbols.nonterminal_index(nt)]
    }

    pub fn start(&self) -> SymbolId {
        self.start
    }

    pub fn start_productions(&self) -> &[ProductionId] {
        self.productions_of(self.start)
    }

    pub fn is_terminal(&self, symbol: SymbolId) -> bool {
        self.symbols.is_terminal(symbol)
    }

    pub fn is_nonterminal(&self, symbol: SymbolId) -> bool {
        self.symbols.is_nonterminal(symbol)
    }

    /// Symbols that no derivation from the start symbol can produce.
    /// The end terminal is never reported.
    pub fn unreachable_symbols(&self) -> Vec<SymbolId> {
        let mut reached = BitSet::with_capacity(self.symbols.len() as usize);
        let mut stack: Vec<SymbolId> = vec![self.start];
        reached.insert(self.start as usize);

        while let Some(nt) = stack.pop() {
            for p in self.productions_of(nt) {
                for symbol in self.productions[*p].rhs.iter().copied() {
                    if reached.insert(symbol as usize) && self.symbols.is_nonterminal(symbol) {
                        stack.push(symbol);
                    }
                }
            }
        }

        (1..self.symbols.len())
            .filter(|x| !reached.contains(*x as usize))
            .collect()
    }

    /// Nonterminals `A` with `A =>+ A`: a chain of productions whose other
    /// right-hand side symbols are all nullable leads back to `A`.
    pub fn cyclic_nonterminals(&self) -> Vec<SymbolId> {
        let first = FirstSets::compute(self);

        // A -> B when some production A -> x B y has x and y nullable
        let mut unit: Vec<BitSet> = self
            .symbols
            .nonterminals()
            .map(|_| BitSet::with_capacity(self.symbols.n_nonterminals() as usize))
            .collect();
        for production in &self.productions {
            let rhs = &production.rhs;
            for (i, symbol) in rhs.iter().copied().enumerate() {
                let rest_nullable = rhs
                    .iter()
                    .enumerate()
                    .all(|(j, x)| j == i || first.is_nullable(*x));
                if self.symbols.is_nonterminal(symbol) && rest_nullable {
                    unit[self.symbols.nonterminal_index(production.lhs)]
                        .insert(self.symbols.nonterminal_index(symbol));
                }
            }
        }

        self.symbols
            .nonterminals()
            .filter(|nt| {
                let origin = self.symbols.nonterminal_index(*nt);
                let mut seen = BitSet::with_capacity(unit.len());
                let mut stack: Vec<usize> = unit[origin].iter().collect();
                while let Some(x) = stack.pop() {
                    if x == origin {
                        return true;
                    }
                    if seen.insert(x) {
                        stack.extend(unit[x].iter());
                    }
                }
                false
            })
            .collect()
    }

    pub fn display_production(&self, id: ProductionId) -> String {
        let production = &self.productions[id];
        let mut out = format!("{} ->", self.symbols.name(production.lhs));
        if production.rhs.is_empty() {
            out.push_str(" %empty");
        }
        for symbol in &production.rhs {
            out.push(' ');
            out.push_str(self.symbols.name(*symbol));
        }
        out
    }
}

/// Builds a [`Grammar`] from symbol names. The first declared nonterminal
/// becomes the start symbol.
#[derive(Debug, Default)]
pub struct GrammarBuilder {
    terminals: Vec<String>,
    nonterminals: Vec<String>,
    productions: Vec<(String, Vec<String>)>,
}

impl GrammarBuilder {
    pub fn new() -> GrammarBuilder {
        GrammarBuilder::default()
    }

    pub fn terminal(&mut self, name: &str) -> &mut Self {
        self.terminals.push(name.to_string());
        self
    }

    pub fn terminals(&mut self, names: &[&str]) -> &mut Self {
        for name in names {
            self.terminal(name);
        }
        self
    }

    /// Declaring the same nonterminal twice is a no-op.
    pub fn nonterminal(&mut self, name: &str) -> &mut Self {
        if !self.nonterminals.iter().any(|x| x == name) {
            self.nonterminals.push(name.to_string());
        }
        self
    }

    /// Adds `lhs -> rhs`; nonterminals that were not declared yet are
    /// declared in order of first appearance as a head.
    pub fn production(&mut self, lhs: &str, rhs: &[&str]) -> &mut Self {
        if !self.nonterminals.iter().any(|x| x == lhs) && !self.terminals.iter().any(|x| x == lhs) {
            self.nonterminals.push(lhs.to_string());
        }
        self.productions.push((
            lhs.to_string(),
            rhs.iter().map(|x| x.to_string()).collect(),
        ));
        self
    }

    pub fn build(&self) -> Result<Grammar, GrammarError> {
        let symbols = SymbolSpace::new(&self.terminals, &self.nonterminals)?;
        let productions = {
            let name_to_symbol: HashMap<&str, SymbolId> = (0..symbols.len())
                .map(|x| (symbols.name(x), x))
                .collect();

            let resolve = |name: &str| -> Result<SymbolId, GrammarError> {
                name_to_symbol
                    .get(name)
                    .copied()
                    .ok_or_else(|| GrammarError::UndefinedSymbol(name.to_string()))
            };

            let mut productions: Vec<Production> = Vec::with_capacity(self.productions.len());
            for (lhs, rhs) in &self.productions {
                let lhs = resolve(lhs)?;
                let rhs = rhs
                    .iter()
                    .map(|x| resolve(x))
                    .collect::<Result<Vec<_>, _>>()?;

                let production = Production::new(lhs, rhs);
                if productions.contains(&production) {
                    log::warn!(
                        "dropping duplicate production for {}",
                        symbols.name(production.lhs)
                    );
                    continue;
                }
                productions.push(production);
            }
            productions
        };

        let start = symbols
            .nonterminals()
            .next()
            .ok_or(GrammarError::NoNonterminals)?;
        Grammar::from_parts(symbols, productions, start)
    }
}
