//! Decoration pruning
use std::collections::BTreeSet;

use log::debug;
use spvinstr::{Decoration, DecorationStore, Id};

/// Whether `decoration` targets (directly, or as the struct of a member
/// decoration) an id of `unreachable`.
#[inline]
pub fn is_unreachable_target(decoration: &Decoration, unreachable: &BTreeSet<Id>) -> bool {
    unreachable.contains(&decoration.target.id())
}

/// Remove every decoration whose target is in `unreachable`. Survivors keep
/// their order. Returns the number of records removed.
pub fn prune_decorations(store: &mut DecorationStore, unreachable: &BTreeSet<Id>) -> usize {
    if unreachable.is_empty() {
        return 0;
    }
    let removed = store.remove_if(|decoration| is_unreachable_target(decoration, unreachable));
    if removed > 0 {
        debug!("Pruned {} decoration(s) on unreachable definitions", removed);
    }
    removed
}
