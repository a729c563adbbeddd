//! Decorations
//!
//! Decorations are metadata records stored at module scope, each bound to a
//! target id (`OpDecorate`) or to a member of a struct type
//! (`OpMemberDecorate`). The [`DecorationStore`] keeps them in emission order;
//! the [`DecorationIndex`] answers "which records target this id" without
//! rescanning the whole store for every query.
use std::collections::BTreeMap;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::{SmallVec, smallvec};

use crate::{modules::operand::Id, spirv::DecorationKind};

/// What a decoration is attached to.
#[derive(Debug, Clone, Copy, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum DecorationTarget {
    /// `OpDecorate %id ...`
    Id(Id),
    /// `OpMemberDecorate %struct_type member ...`
    Member(Id, u32),
}

impl DecorationTarget {
    /// The id in first position, for both single- and member-target records.
    #[inline]
    pub fn id(&self) -> Id {
        match self {
            DecorationTarget::Id(id) | DecorationTarget::Member(id, _) => *id,
        }
    }
}

/// A single decoration record.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Decoration {
    pub target: DecorationTarget,
    pub kind: DecorationKind,
    pub params: SmallVec<[u32; 2]>,
}

impl Decoration {
    /// Single-target decoration without parameters.
    pub fn new(target: Id, kind: DecorationKind) -> Self {
        Self {
            target: DecorationTarget::Id(target),
            kind,
            params: SmallVec::new(),
        }
    }

    /// Single-target decoration with one parameter word.
    pub fn with_param(target: Id, kind: DecorationKind, param: u32) -> Self {
        Self {
            target: DecorationTarget::Id(target),
            kind,
            params: smallvec![param],
        }
    }

    /// Member decoration with one parameter word.
    pub fn member(struct_type: Id, member: u32, kind: DecorationKind, param: u32) -> Self {
        Self {
            target: DecorationTarget::Member(struct_type, member),
            kind,
            params: smallvec![param],
        }
    }

    /// First parameter word, `0` when the decoration carries none.
    #[inline]
    pub fn first_param(&self) -> u32 {
        self.params.first().copied().unwrap_or(0)
    }
}

impl std::fmt::Display for Decoration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.target {
            DecorationTarget::Id(id) => write!(f, "OpDecorate {} {}", id, self.kind)?,
            DecorationTarget::Member(id, member) => {
                write!(f, "OpMemberDecorate {} {} {}", id, member, self.kind)?
            }
        }
        for param in &self.params {
            write!(f, " {}", param)?;
        }
        Ok(())
    }
}

/// Ordered, module-scoped collection of decoration records.
#[derive(Debug, Clone, Default, Hash, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct DecorationStore {
    records: Vec<Decoration>,
}

impl DecorationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, decoration: Decoration) {
        self.records.push(decoration);
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Decoration> {
        self.records.iter()
    }

    pub fn get(&self, position: usize) -> Option<&Decoration> {
        self.records.get(position)
    }

    /// Records whose target id is `target`, by linear scan.
    pub fn for_target(&self, target: Id) -> impl Iterator<Item = &Decoration> {
        self.records
            .iter()
            .filter(move |decoration| decoration.target.id() == target)
    }

    /// Remove every record matching `predicate`; survivors keep their
    /// relative order. Returns the number of removed records.
    pub fn remove_if(&mut self, mut predicate: impl FnMut(&Decoration) -> bool) -> usize {
        let before = self.records.len();
        self.records.retain(|decoration| !predicate(decoration));
        before - self.records.len()
    }
}

impl FromIterator<Decoration> for DecorationStore {
    fn from_iter<T: IntoIterator<Item = Decoration>>(iter: T) -> Self {
        Self {
            records: iter.into_iter().collect(),
        }
    }
}

impl<'a> IntoIterator for &'a DecorationStore {
    type Item = &'a Decoration;
    type IntoIter = std::slice::Iter<'a, Decoration>;

    fn into_iter(self) -> Self::IntoIter {
        self.records.iter()
    }
}

/// Target id to record positions, built once over a [`DecorationStore`].
///
/// Queries answer exactly what a linear scan of the store filtered on the
/// same predicate would answer, in store order.
pub struct DecorationIndex<'a> {
    store: &'a DecorationStore,
    by_target: BTreeMap<Id, SmallVec<[usize; 4]>>,
}

impl<'a> DecorationIndex<'a> {
    pub fn new(store: &'a DecorationStore) -> Self {
        Self::new_filtered(store, |_| true)
    }

    /// Index only the records accepted by `keep`. Used to query a store as it
    /// will look once a pending removal has been applied.
    pub fn new_filtered(store: &'a DecorationStore, mut keep: impl FnMut(&Decoration) -> bool) -> Self {
        let mut by_target: BTreeMap<Id, SmallVec<[usize; 4]>> = BTreeMap::new();
        for (position, decoration) in store.records.iter().enumerate() {
            if keep(decoration) {
                by_target
                    .entry(decoration.target.id())
                    .or_default()
                    .push(position);
            }
        }

        Self { store, by_target }
    }

    /// All indexed records whose target id is `target`, in store order.
    pub fn for_target(&self, target: Id) -> impl Iterator<Item = &'a Decoration> + '_ {
        let store = self.store;
        self.by_target
            .get(&target)
            .into_iter()
            .flat_map(|positions| positions.iter())
            .map(move |&position| &store.records[position])
    }

    /// Single-target records on `target` of one of the given kinds.
    pub fn on_id<'k>(
        &'k self,
        target: Id,
        kinds: &'k [DecorationKind],
    ) -> impl Iterator<Item = &'a Decoration> + 'k {
        self.for_target(target).filter(move |decoration| {
            matches!(decoration.target, DecorationTarget::Id(_)) && kinds.contains(&decoration.kind)
        })
    }

    /// Member records on `struct_type`'s `member` of one of the given kinds.
    pub fn on_member<'k>(
        &'k self,
        struct_type: Id,
        member: u32,
        kinds: &'k [DecorationKind],
    ) -> impl Iterator<Item = &'a Decoration> + 'k {
        self.for_target(struct_type).filter(move |decoration| {
            decoration.target == DecorationTarget::Member(struct_type, member)
                && kinds.contains(&decoration.kind)
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DecorationStore {
        [
            Decoration::with_param(Id(5), DecorationKind::ArrayStride, 16),
            Decoration::member(Id(6), 0, DecorationKind::Offset, 0),
            Decoration::member(Id(6), 1, DecorationKind::Offset, 8),
            Decoration::new(Id(9), DecorationKind::RelaxedPrecision),
            Decoration::member(Id(6), 1, DecorationKind::MatrixStride, 16),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn index_matches_linear_scan() {
        let store = sample();
        let index = DecorationIndex::new(&store);
        for target in [Id(5), Id(6), Id(9), Id(42)] {
            let scanned: Vec<_> = store.for_target(target).collect();
            let indexed: Vec<_> = index.for_target(target).collect();
            assert_eq!(scanned, indexed);
        }
    }

    #[test]
    fn member_queries_filter_on_member_and_kind() {
        let store = sample();
        let index = DecorationIndex::new(&store);
        let kinds = [DecorationKind::Offset, DecorationKind::MatrixStride];
        let params: Vec<_> = index.on_member(Id(6), 1, &kinds).map(|d| d.first_param()).collect();
        assert_eq!(params, vec![8, 16]);
        assert_eq!(index.on_id(Id(6), &kinds).count(), 0);
        assert_eq!(index.on_id(Id(5), &[DecorationKind::ArrayStride]).count(), 1);
    }

    #[test]
    fn filtered_index_hides_rejected_records() {
        let store = sample();
        let index = DecorationIndex::new_filtered(&store, |d| d.target.id() != Id(6));
        assert_eq!(index.for_target(Id(6)).count(), 0);
        assert_eq!(index.for_target(Id(5)).count(), 1);
    }

    #[test]
    fn remove_if_preserves_order() {
        let mut store = sample();
        assert_eq!(store.remove_if(|d| d.target.id() == Id(6)), 3);
        let targets: Vec<_> = store.iter().map(|d| d.target.id()).collect();
        assert_eq!(targets, vec![Id(5), Id(9)]);
    }
}
