use thiserror::Error;

use crate::automaton::StateId;
use crate::grammar::{ProductionId, SymbolId};

mod lr;
mod trace;


pub use lr::{LrParser, ParseRun};
pub use trace::{NullSink, TraceAction, TraceEvent, TraceSink, WriterSink};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Rejection {
    #[error("no action defined in state {state} for symbol {symbol} (`{text}`)")]
    NoAction {
        state: StateId,
        symbol: SymbolId,
        text: String,
    },
    #[error("production {production} does not reduce on symbol {symbol} in state {state}")]
    LookaheadMismatch {
        state: StateId,
        production: ProductionId,
        symbol: SymbolId,
    },
    #[error("no goto defined in state {state} for nonterminal {nonterminal}")]
    MissingGoto {
        state: StateId,
        nonterminal: SymbolId,
    },
    #[error("reducing production {production} pops {needed} states but the stack holds {available}")]
    StackUnderflow {
        production: ProductionId,
        needed: usize,
        available: usize,
    },
    #[error(
        "production {production} reduced into state {state} again on symbol {symbol} \
         without consuming input"
    )]
    ReduceCycle {
        state: StateId,
        production: ProductionId,
        symbol: SymbolId,
    },
}

impl Rejection {
    /// True when the tables themselves are inconsistent or were built from a
    /// cyclic grammar, as opposed to the input not being in the language.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            Rejection::MissingGoto { .. }
                | Rejection::StackUnderflow { .. }
                | Rejection::ReduceCycle { .. }
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    /// Needs the next token.
    Reading,
    /// Will push this state and consume the current token.
    Shifting(StateId),
    /// Will pop and goto for this production without consuming.
    Reducing(ProductionId),
    Accepted,
    Rejected(Rejection),
}

impl Phase {
    pub fn is_done(&self) -> bool {
        matches!(self, Phase::Accepted | Phase::Rejected(_))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseOutcome {
    Accepted,
    Rejected(Rejection),
}

impl ParseOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, ParseOutcome::Accepted)
    }

    pub fn rejection(&self) -> Option<&Rejection> {
        match self {
            ParseOutcome::Accepted => None,
            ParseOutcome::Rejected(rejection) => Some(rejection),
        }
    }
}
