//! Table merge engine.
//!
//! Two copies of a table are merged by their business key ([`Record::unique_key`]).
//! Rows that only exist on one side are taken as-is, identical twins are
//! collapsed automatically, and genuine collisions are handed back to the
//! caller as [`MergeConflict`]s. The caller answers them with
//! [`MergeSolution`]s and calls the merge again with the grown solution map;
//! settled collisions are never decided twice.
//!
//! Every successful merge renumbers the surviving rows densely and reports
//! the renumbering as [`IdChanges`], which must be applied to the dependent
//! tables of both sides before they are merged in turn.

mod generic;
mod id_changes;
mod solver;
mod tables;
mod tag_map;
mod user_mark;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::model::Table;

pub use generic::{
    add_solutions, prepare_merge_solution, solve_equality_conflict, try_merge_with_solver,
    Resolved,
};
pub use id_changes::{update_ids, ForeignKey};
pub use solver::{choose_newest, choose_side, prefer_titled, ConflictSolver};
pub use tables::{merge_bookmarks, merge_input_fields, merge_locations, merge_notes, merge_tags};
pub use tag_map::merge_tag_maps;
pub use user_mark::{merge_user_marks, MarkingMerge, MergedMarkings, UserMarkBlockRange};

/// Which input a row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MergeSide {
    Left,
    Right,
}

impl MergeSide {
    pub fn opposite(self) -> Self {
        match self {
            MergeSide::Left => MergeSide::Right,
            MergeSide::Right => MergeSide::Left,
        }
    }
}

/// Key of a collision.
///
/// Table merges use the shared business key; the highlight merge numbers its
/// overlaps instead. The string form is the business key verbatim, or `#<n>`
/// for numbered keys (no business key starts with `#`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub enum ConflictKey {
    Business(String),
    Synthetic(u64),
}

impl fmt::Display for ConflictKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConflictKey::Business(key) => f.write_str(key),
            ConflictKey::Synthetic(n) => write!(f, "#{}", n),
        }
    }
}

impl From<String> for ConflictKey {
    fn from(s: String) -> Self {
        match s.strip_prefix('#').and_then(|n| n.parse().ok()) {
            Some(n) => ConflictKey::Synthetic(n),
            None => ConflictKey::Business(s),
        }
    }
}

impl From<ConflictKey> for String {
    fn from(key: ConflictKey) -> Self {
        key.to_string()
    }
}

/// Two rows that claim the same identity but hold different data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeConflict<T> {
    pub left: T,
    pub right: T,
}

/// The answer to a [`MergeConflict`].
///
/// The discarded row is kept so that references to it can still be
/// redirected to the winner.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MergeSolution<T> {
    pub side: MergeSide,
    pub solution: T,
    pub discarded: T,
}

/// Unresolved collisions of one merge call.
pub type Conflicts<T> = BTreeMap<ConflictKey, MergeConflict<T>>;

/// Answers to collisions, accumulated across merge calls.
pub type Solutions<T> = BTreeMap<ConflictKey, MergeSolution<T>>;

/// Old id to new id, per side, produced by one merge step.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdChanges {
    pub left: BTreeMap<i64, i64>,
    pub right: BTreeMap<i64, i64>,
}

impl IdChanges {
    pub fn side(&self, side: MergeSide) -> &BTreeMap<i64, i64> {
        match side {
            MergeSide::Left => &self.left,
            MergeSide::Right => &self.right,
        }
    }

    pub fn side_mut(&mut self, side: MergeSide) -> &mut BTreeMap<i64, i64> {
        match side {
            MergeSide::Left => &mut self.left,
            MergeSide::Right => &mut self.right,
        }
    }

    /// Record a renumbering; unchanged ids are not recorded.
    pub fn record(&mut self, side: MergeSide, old: i64, new: i64) {
        if old != new {
            self.side_mut(side).insert(old, new);
        }
    }

    /// The id `old` of `side` ends up with.
    pub fn resolve(&self, side: MergeSide, old: i64) -> i64 {
        self.side(side).get(&old).copied().unwrap_or(old)
    }

    pub fn is_empty(&self) -> bool {
        self.left.is_empty() && self.right.is_empty()
    }
}

/// Result of a merge call: merged output, or collisions that need answers.
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome<M, T> {
    Merged(M),
    Conflicts(Conflicts<T>),
}

impl<M, T> MergeOutcome<M, T> {
    pub fn is_merged(&self) -> bool {
        matches!(self, MergeOutcome::Merged(_))
    }
}

/// A merged table and the renumbering that produced it.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedTable<T> {
    pub records: Table<T>,
    pub changes: IdChanges,
}

/// Outcome of merging one plain table.
pub type TableMerge<T> = MergeOutcome<MergedTable<T>, T>;
