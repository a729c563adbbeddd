//! Block reachability
//!
//! For every function, the control-flow graph is rebuilt from the block
//! terminators into a [`DiGraphMap`] and walked from the entry block. Result
//! ids defined in blocks the walk never visits are collected so their
//! decorations can be pruned.
use std::collections::BTreeSet;

use log::trace;
use petgraph::{prelude::DiGraphMap, visit::Dfs};
use spvinstr::{Function, Id, Module};

/// Control-flow graph of `function`, nodes are block labels.
///
/// Edges follow [`BasicBlock::structured_successors`](spvinstr::BasicBlock::structured_successors):
/// merge blocks and continue targets are reachable from their header even
/// when no branch leads to them.
pub fn control_flow_graph(function: &Function) -> DiGraphMap<Id, ()> {
    let mut cfg = DiGraphMap::new();
    for block in &function.blocks {
        cfg.add_node(block.label);
    }
    for block in &function.blocks {
        for successor in block.structured_successors() {
            cfg.add_edge(block.label, successor, ());
        }
    }
    cfg
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reachability {
    /// Labels of the blocks reachable from their function's entry block.
    pub reachable: BTreeSet<Id>,
    /// Result ids defined (as local variable or instruction) in an
    /// unreachable block.
    pub unreachable_definitions: BTreeSet<Id>,
}

impl Reachability {
    pub fn analyze(module: &Module) -> Self {
        let mut result = Self::default();
        for function in &module.functions {
            result.add_function(function);
        }
        result
    }

    fn add_function(&mut self, function: &Function) {
        // Declarations without a body have nothing to prune.
        let Some(entry) = function.blocks.first() else {
            return;
        };

        let cfg = control_flow_graph(function);
        let mut visited = BTreeSet::new();
        let mut dfs = Dfs::new(&cfg, entry.label);
        while let Some(label) = dfs.next(&cfg) {
            visited.insert(label);
        }

        let mut dead_blocks = 0usize;
        for block in &function.blocks {
            if visited.contains(&block.label) {
                continue;
            }
            dead_blocks += 1;
            self.unreachable_definitions.extend(block.definitions());
        }

        trace!(
            "Function {}: {} reachable block(s), {} unreachable",
            function.id(),
            visited.len(),
            dead_blocks
        );
        self.reachable.extend(visited);
    }

    #[inline]
    pub fn is_unreachable_definition(&self, id: Id) -> bool {
        self.unreachable_definitions.contains(&id)
    }
}
