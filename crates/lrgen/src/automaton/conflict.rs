use std::fmt;

use crate::grammar::{Grammar, ProductionId, SymbolId};

use super::StateId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConflictKind {
    ShiftReduce,
    ReduceReduce,
}

impl fmt::Display for ConflictKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKind::ShiftReduce => write!(f, "shift-reduce"),
            ConflictKind::ReduceReduce => write!(f, "reduce-reduce"),
        }
    }
}

/// Diagnostic only; a conflict never blocks table emission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Conflict {
    pub state: StateId,
    pub kind: ConflictKind,
    /// Competing productions, in the order they were encountered.
    pub productions: Vec<ProductionId>,
    /// Terminals on which the actions collide. For a shift-reduce conflict
    /// under LR(0) this is every shifted terminal.
    pub symbols: Vec<SymbolId>,
}

impl Conflict {
    pub fn describe(&self, grammar: &Grammar) -> String {
        let symbols = grammar.symbols();
        let mut out = format!("state {} has a {} conflict", self.state, self.kind);
        if !self.symbols.is_empty() {
            let names: Vec<&str> = self.symbols.iter().map(|x| symbols.name(*x)).collect();
            out.push_str(&format!(" on {}", names.join(", ")));
        }
        out.push(':');
        for production in &self.productions {
            out.push_str(&format!(
                "\n\t{:3} {}",
                production,
                grammar.display_production(*production)
            ));
        }
        out
    }
}

/// Whether reduce decisions consider lookahead when reporting conflicts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LookaheadMode {
    /// Every completed item reduces regardless of the next terminal.
    #[default]
    Lr0,
    /// Reduce only on terminals in FOLLOW(lhs).
    Slr,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShiftReducePolicy {
    #[default]
    PreferShift,
    /// Drop shifts on the terminals the reduce production accepts as lookahead.
    PreferReduce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ReduceReducePolicy {
    #[default]
    KeepFirst,
    KeepLast,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BuildOptions {
    pub lookahead: LookaheadMode,
    pub shift_reduce: ShiftReducePolicy,
    pub reduce_reduce: ReduceReducePolicy,
}
