// LR(0) canonical collection: states are identified by their kernel item
// set, built breadth-first from the root kernel with a FIFO work queue
// (same shape as subset construction for NFA -> DFA)

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::fmt::Write;

use bit_set::BitSet;
use lrgen_util::make_type_idx;

use crate::grammar::first_follow::{FirstSets, FollowSets};
use crate::grammar::{Grammar, ProductionId, SymbolId};

mod conflict;
mod item;

#[cfg(test)]
mod automaton_tests;

pub use conflict::{
    BuildOptions, Conflict, ConflictKind, LookaheadMode, ReduceReducePolicy, ShiftReducePolicy,
};
pub use item::{closure, Item, ItemSet};

make_type_idx!(StateId, State);

#[derive(Debug, Clone)]
pub struct State {
    pub id: StateId,
    /// Items that seeded this state; unique across the automaton.
    pub kernel: ItemSet,
    /// Items added by closure, disjoint from the kernel.
    pub closure: ItemSet,
    pub transitions: BTreeMap<SymbolId, StateId>,
    /// (parent state, symbol) this state was first reached by; `None` only for the root.
    pub parent: Option<(StateId, SymbolId)>,
    /// Every production completed in this state, in encounter order.
    pub reduce_candidates: Vec<ProductionId>,
    /// The reduce action kept for the tables.
    pub reduce: Option<ProductionId>,
}

impl State {
    /// Kernel items first, then closure items.
    pub fn items(&self) -> impl Iterator<Item = &Item> {
        self.kernel.iter().chain(self.closure.iter())
    }
}

struct PendingKernel {
    parent: Option<(StateId, SymbolId)>,
    kernel: ItemSet,
}

#[derive(Debug, Clone)]
pub struct Automaton {
    states: Vec<State>,
    conflicts: Vec<Conflict>,
    options: BuildOptions,
    // per production: terminals on which it may reduce
    lookahead: Vec<BitSet>,
    reused_kernels: usize,
}

impl Automaton {
    pub fn build(grammar: &Grammar) -> Automaton {
        Self::build_with(grammar, BuildOptions::default())
    }

    pub fn build_with(grammar: &Grammar, options: BuildOptions) -> Automaton {
        let lookahead = Self::production_lookahead(grammar, options.lookahead);

        let mut states: Vec<State> = Vec::new();
        let mut conflicts: Vec<Conflict> = Vec::new();
        let mut reused_kernels: usize = 0;

        // kernel -> state id
        let mut kernels: HashMap<ItemSet, StateId> = HashMap::new();

        let mut work_queue: VecDeque<PendingKernel> = VecDeque::new();
        work_queue.push_back(PendingKernel {
            parent: None,
            kernel: grammar
                .start_productions()
                .iter()
                .map(|x| Item::root(*x))
                .collect(),
        });

        while let Some(pending) = work_queue.pop_front() {
            if let Some(existing) = kernels.get(&pending.kernel).copied() {
                if let Some((parent, symbol)) = pending.parent {
                    states[parent].transitions.insert(symbol, existing);
                }
                reused_kernels += 1;
                continue;
            }

            let id = StateId::new(states.len());
            let closure_items: ItemSet = closure(grammar, &pending.kernel)
                .difference(&pending.kernel)
                .copied()
                .collect();

            // completed items reduce, the rest are grouped by the symbol after the dot
            let mut reduce_candidates: Vec<ProductionId> = Vec::new();
            let mut successors: BTreeMap<SymbolId, ItemSet> = BTreeMap::new();
            for item in pending.kernel.iter().chain(closure_items.iter()) {
                match item.next_symbol(grammar) {
                    None => {
                        if !reduce_candidates.contains(&item.production) {
                            reduce_candidates.push(item.production);
                        }
                    }
                    Some(symbol) => {
                        successors.entry(symbol).or_default().insert(item.advance());
                    }
                }
            }

            let reduce = match options.reduce_reduce {
                ReduceReducePolicy::KeepFirst => reduce_candidates.first().copied(),
                ReduceReducePolicy::KeepLast => reduce_candidates.last().copied(),
            };

            let shifts: Vec<SymbolId> = successors
                .keys()
                .copied()
                .filter(|x| grammar.is_terminal(*x))
                .collect();

            let state_conflicts = Self::detect_conflicts(
                id,
                &reduce_candidates,
                &shifts,
                &successors,
                &lookahead,
                options.lookahead,
            );
            for conflict in &state_conflicts {
                log::warn!("{}", conflict.describe(grammar));
            }
            conflicts.extend(state_conflicts);

            for (symbol, kernel) in successors {
                work_queue.push_back(PendingKernel {
                    parent: Some((id, symbol)),
                    kernel,
                });
            }

            if let Some((parent, symbol)) = pending.parent {
                states[parent].transitions.insert(symbol, id);
            }
            kernels.insert(pending.kernel.clone(), id);
            states.push(State {
                id,
                kernel: pending.kernel,
                closure: closure_items,
                transitions: BTreeMap::new(),
                parent: pending.parent,
                reduce_candidates,
                reduce,
            });
        }

        log::debug!(
            "built {} states ({} kernels reused, {} conflicts)",
            states.len(),
            reused_kernels,
            conflicts.len()
        );

        Automaton {
            states,
            conflicts,
            options,
            lookahead,
            reused_kernels,
        }
    }

    fn production_lookahead(grammar: &Grammar, mode: LookaheadMode) -> Vec<BitSet> {
        match mode {
            LookaheadMode::Lr0 => {
                let all: BitSet = grammar.symbols().terminals().map(|x| x as usize).collect();
                vec![all; grammar.productions().len()]
            }
            LookaheadMode::Slr => {
                let first = FirstSets::compute(grammar);
                let follow = FollowSets::compute(grammar, &first);
                grammar
                    .productions()
                    .iter()
                    .map(|x| follow.follow(x.lhs()).clone())
                    .collect()
            }
        }
    }

    fn detect_conflicts(
        state: StateId,
        reduce_candidates: &[ProductionId],
        shifts: &[SymbolId],
        successors: &BTreeMap<SymbolId, ItemSet>,
        lookahead: &[BitSet],
        mode: LookaheadMode,
    ) -> Vec<Conflict> {
        let mut conflicts = Vec::new();
        if reduce_candidates.is_empty() {
            return conflicts;
        }

        if reduce_candidates.len() > 1 {
            // terminals claimed by more than one reduce
            let mut seen = BitSet::new();
            let mut overlap = BitSet::new();
            for production in reduce_candidates {
                let set = &lookahead[production.index()];
                overlap.union_with(&seen.intersection(set).collect());
                seen.union_with(set);
            }
            let symbols = match mode {
                LookaheadMode::Lr0 => Vec::new(),
                LookaheadMode::Slr => overlap.iter().map(|x| x as SymbolId).collect(),
            };

            conflicts.push(Conflict {
                state,
                kind: ConflictKind::ReduceReduce,
                productions: reduce_candidates.to_vec(),
                symbols,
            });
        }

        let reducible: BitSet = reduce_candidates.iter().fold(BitSet::new(), |mut acc, x| {
            acc.union_with(&lookahead[x.index()]);
            acc
        });
        let colliding: Vec<SymbolId> = shifts
            .iter()
            .copied()
            .filter(|x| reducible.contains(*x as usize))
            .collect();

        if !colliding.is_empty() {
            let mut productions = reduce_candidates.to_vec();
            for symbol in &colliding {
                for item in &successors[symbol] {
                    if !productions.contains(&item.production) {
                        productions.push(item.production);
                    }
                }
            }

            conflicts.push(Conflict {
                state,
                kind: ConflictKind::ShiftReduce,
                productions,
                symbols: colliding,
            });
        }

        conflicts
    }

    pub fn states(&self) -> &[State] {
        &self.states
    }

    pub fn state(&self, id: StateId) -> &State {
        &self.states[id]
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn transition(&self, state: StateId, symbol: SymbolId) -> Option<StateId> {
        self.states[state].transitions.get(&symbol).copied()
    }

    /// Finds the state whose kernel is exactly `kernel`.
    pub fn find_kernel(&self, kernel: &ItemSet) -> Option<StateId> {
        self.states.iter().find(|x| &x.kernel == kernel).map(|x| x.id)
    }

    pub fn conflicts(&self) -> &[Conflict] {
        &self.conflicts
    }

    pub fn shift_reduce_count(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|x| x.kind == ConflictKind::ShiftReduce)
            .count()
    }

    pub fn reduce_reduce_count(&self) -> usize {
        self.conflicts
            .iter()
            .filter(|x| x.kind == ConflictKind::ReduceReduce)
            .count()
    }

    pub fn options(&self) -> BuildOptions {
        self.options
    }

    /// Terminals on which `production` may reduce.
    pub fn lookahead(&self, production: ProductionId) -> &BitSet {
        &self.lookahead[production.index()]
    }

    /// How many pending kernels resolved to an already existing state.
    pub fn reused_kernels(&self) -> usize {
        self.reused_kernels
    }

    /// Symbols along the back-links from the root to `state`.
    pub fn viable_prefix(&self, state: StateId) -> Vec<SymbolId> {
        let mut prefix = Vec::new();
        let mut current = state;
        while let Some((parent, symbol)) = self.states[current].parent {
            prefix.push(symbol);
            current = parent;
        }
        prefix.reverse();
        prefix
    }

    /// Human readable listing of every state.
    pub fn report(&self, grammar: &Grammar) -> String {
        let symbols = grammar.symbols();
        let mut out = String::new();

        for state in &self.states {
            let prefix: Vec<&str> = self
                .viable_prefix(state.id)
                .iter()
                .map(|x| symbols.name(*x))
                .collect();
            let _ = write!(out, "A{}: V[{}]", state.id, prefix.join(" "));
            if let Some((parent, symbol)) = state.parent {
                let _ = write!(out, " = goto(A{}, {})", parent, symbols.name(symbol));
            }
            out.push('\n');

            for item in state.items() {
                let marker = if state.kernel.contains(item) { "I:" } else { "" };
                let _ = write!(out, "{}\t{:<32}", marker, item.display(grammar));
                match item.next_symbol(grammar) {
                    None => {
                        let _ = write!(out, " reduce({})", item.production);
                        if state.reduce != Some(item.production) {
                            out.push_str(" [discarded]");
                        }
                    }
                    Some(symbol) => {
                        if let Some(next) = state.transitions.get(&symbol) {
                            let _ = write!(out, " goto(A{}, {})", next, symbols.name(symbol));
                        }
                        if grammar.is_terminal(symbol) {
                            out.push_str("\tshift");
                        }
                    }
                }
                out.push('\n');
            }
            out.push('\n');
        }

        for conflict in &self.conflicts {
            out.push_str(&conflict.describe(grammar));
            out.push('\n');
        }

        out
    }
}
