// Table-driven shift-reduce stack machine

use std::collections::HashSet;

use crate::automaton::StateId;
use crate::grammar::{ProductionId, END};
use crate::scanner::{Token, TokenStream};
use crate::tables::CompactTables;

use super::{ParseOutcome, Phase, Rejection, TraceAction, TraceEvent, TraceSink};

/// Holds only a borrow of the tables, so one parser can run any number of
/// independent token streams, one after the other or from several threads.
#[derive(Debug, Clone, Copy)]
pub struct LrParser<'t> {
    tables: &'t CompactTables,
    lookahead_check: bool,
}

impl<'t> LrParser<'t> {
    pub fn new(tables: &'t CompactTables) -> LrParser<'t> {
        LrParser {
            tables,
            lookahead_check: false,
        }
    }

    /// Refuse a reduce unless the current symbol is in the production's
    /// lookahead set.
    pub fn with_lookahead_check(mut self, enabled: bool) -> LrParser<'t> {
        self.lookahead_check = enabled;
        self
    }

    pub fn tables(&self) -> &'t CompactTables {
        self.tables
    }

    pub fn run<S: TokenStream>(&self, stream: S) -> ParseRun<'t, S> {
        ParseRun {
            parser: *self,
            stream,
            stack: vec![StateId::new(0)],
            current: Token::end(),
            phase: Phase::Reading,
            reduced: HashSet::new(),
            read_depth: 1,
        }
    }

    pub fn parse<S: TokenStream>(&self, stream: S, sink: &mut dyn TraceSink) -> ParseOutcome {
        let mut run = self.run(stream);
        run.finish(sink)
    }
}

/// The per-stream state of one parse.
pub struct ParseRun<'t, S: TokenStream> {
    parser: LrParser<'t>,
    stream: S,
    // grows as needed, never bounded
    stack: Vec<StateId>,
    current: Token,
    phase: Phase,
    // (stack depth, top state) after each reduce since the last read
    reduced: HashSet<(usize, StateId)>,
    read_depth: usize,
}

impl<'t, S: TokenStream> ParseRun<'t, S> {
    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn stack(&self) -> &[StateId] {
        &self.stack
    }

    /// The token currently being acted on.
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Performs one phase transition. Does nothing once accepted or rejected.
    pub fn step(&mut self, sink: &mut dyn TraceSink) -> &Phase {
        match std::mem::replace(&mut self.phase, Phase::Reading) {
            Phase::Reading => {
                self.current = self.stream.advance();
                self.reduced.clear();
                self.read_depth = self.stack.len();
                self.phase = self.decide();
            }
            Phase::Shifting(next) => {
                self.stack.push(next);
                self.emit(sink, TraceAction::Shift);
                self.phase = Phase::Reading;
            }
            Phase::Reducing(production) => {
                self.phase = self.reduce(production, sink);
            }
            done @ (Phase::Accepted | Phase::Rejected(_)) => {
                self.phase = done;
                return &self.phase;
            }
        }

        if let Phase::Rejected(rejection) = &self.phase {
            if rejection.is_internal() {
                log::error!("{}", rejection);
            } else {
                log::debug!("{}", rejection);
            }
            self.emit(sink, TraceAction::Reject);
        }
        &self.phase
    }

    /// Steps until the run is accepted or rejected.
    pub fn finish(&mut self, sink: &mut dyn TraceSink) -> ParseOutcome {
        while !self.step(sink).is_done() {}
        match &self.phase {
            Phase::Rejected(rejection) => ParseOutcome::Rejected(rejection.clone()),
            _ => ParseOutcome::Accepted,
        }
    }

    fn top(&self) -> StateId {
        // the root state is never popped
        self.stack[self.stack.len() - 1]
    }

    /// Shift wins whenever the tables hold one; otherwise reduce.
    fn decide(&self) -> Phase {
        let tables = self.parser.tables;
        let state = self.top();
        let symbol = self.current.symbol;

        if let Some(next) = tables.shift(state, symbol) {
            return Phase::Shifting(next);
        }

        match tables.reduce(state) {
            None => Phase::Rejected(Rejection::NoAction {
                state,
                symbol,
                text: self.current.text.clone(),
            }),
            Some(production)
                if self.parser.lookahead_check && !tables.lookahead(production, symbol) =>
            {
                Phase::Rejected(Rejection::LookaheadMismatch {
                    state,
                    production,
                    symbol,
                })
            }
            Some(production) => Phase::Reducing(production),
        }
    }

    fn reduce(&mut self, production: ProductionId, sink: &mut dyn TraceSink) -> Phase {
        let tables = self.parser.tables;
        let needed = tables.rhs_len(production);
        let lhs = tables.lhs(production);

        let available = self.stack.len() - 1;
        if available < needed {
            return Phase::Rejected(Rejection::StackUnderflow {
                production,
                needed,
                available,
            });
        }

        // END handed out while tokens remain is not the end of the input
        if lhs == tables.start
            && self.current.symbol == END
            && available == needed
            && !self.stream.has_more()
        {
            self.stack.truncate(1);
            self.emit(sink, TraceAction::Accept);
            return Phase::Accepted;
        }

        let reducing = self.top();
        self.stack.truncate(self.stack.len() - needed);
        let state = self.top();
        match tables.goto(state, lhs) {
            // a complete sentence followed by more input
            None if lhs == tables.start => Phase::Rejected(Rejection::NoAction {
                state: reducing,
                symbol: self.current.symbol,
                text: self.current.text.clone(),
            }),
            None => Phase::Rejected(Rejection::MissingGoto {
                state,
                nonterminal: lhs,
            }),
            Some(next) => {
                self.stack.push(next);
                self.emit(sink, TraceAction::Reduce(production));

                // a cyclic grammar reduces forever without consuming input,
                // either in place or by stacking empty reduces
                let depth = self.stack.len();
                if depth > self.read_depth + tables.n_states()
                    || !self.reduced.insert((depth, next))
                {
                    return Phase::Rejected(Rejection::ReduceCycle {
                        state: next,
                        production,
                        symbol: self.current.symbol,
                    });
                }

                // same symbol again: several reduces may precede the next shift
                self.decide()
            }
        }
    }

    fn emit(&self, sink: &mut dyn TraceSink, action: TraceAction) {
        sink.record(&TraceEvent {
            symbol: self.current.symbol,
            text: self.current.text.clone(),
            action,
            stack_depth: self.stack.len(),
        });
    }
}
