use std::collections::{BTreeSet, VecDeque};

use crate::grammar::{Grammar, ProductionId, SymbolId};

/// A production with a dot marking how much of it has been recognized.
/// The right-hand side stays owned by the grammar; an item is only a cursor.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Debug)]
pub struct Item {
    pub production: ProductionId,
    pub dot: u32,
}

/// Kernels and closures are compared as sets, never positionally.
pub type ItemSet = BTreeSet<Item>;

impl Item {
    /// The dot-0 item of a production.
    pub fn root(production: ProductionId) -> Item {
        Item { production, dot: 0 }
    }

    pub fn next_symbol(&self, grammar: &Grammar) -> Option<SymbolId> {
        grammar
            .production(self.production)
            .rhs()
            .get(self.dot as usize)
            .copied()
    }

    pub fn is_complete(&self, grammar: &Grammar) -> bool {
        self.dot as usize >= grammar.production(self.production).len()
    }

    pub fn advance(&self) -> Item {
        Item {
            production: self.production,
            dot: self.dot + 1,
        }
    }

    pub fn display(&self, grammar: &Grammar) -> String {
        let production = grammar.production(self.production);
        let symbols = grammar.symbols();
        let mut out = format!("{} ->", symbols.name(production.lhs()));
        for (i, symbol) in production.rhs().iter().enumerate() {
            if i == self.dot as usize {
                out.push_str(" .");
            }
            out.push(' ');
            out.push_str(symbols.name(*symbol));
        }
        if self.is_complete(grammar) {
            out.push_str(" .");
        }
        out
    }
}

/// Fixpoint expansion of `items`: for each item whose next symbol is a
/// nonterminal, add the dot-0 item of every production of that nonterminal.
/// The result includes `items` themselves.
pub fn closure(grammar: &Grammar, items: &ItemSet) -> ItemSet {
    let mut result: ItemSet = items.clone();
    let mut queue: VecDeque<Item> = items.iter().copied().collect();

    while let Some(item) = queue.pop_front() {
        let Some(next) = item.next_symbol(grammar) else {
            continue;
        };
        if !grammar.is_nonterminal(next) {
            continue;
        }

        for production in grammar.productions_of(next) {
            let root = Item::root(*production);
            // presence check keeps left recursion from looping
            if result.insert(root) {
                queue.push_back(root);
            }
        }
    }

    result
}
