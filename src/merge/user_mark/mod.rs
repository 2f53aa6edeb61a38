//! Highlight merge (UserMark together with its BlockRange spans).
//!
//! Highlights made independently on two devices carry different GUIDs, so a
//! key lookup cannot find them. Two highlights collide when any of their
//! spans overlap within the same location and paragraph; touching spans
//! count as overlapping.
//!
//! # Algorithm
//!
//! 1. Join every highlight with its spans.
//! 2. Splice in the caller's answers: the winner goes into its slot, the
//!    discarded twin's slot is cleared.
//! 3. Bucket all spans by `(LocationId, Identifier)`, sort each bucket by
//!    start token and sweep forward while spans still overlap. Overlaps
//!    between the two sides become conflicts over the whole highlights.
//! 4. Equal highlights (same location, same spans) are answered
//!    automatically once; anything left is returned to the caller.
//! 5. Interleave the survivors, renumber, and split back into tables.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, warn};

use super::{
    add_solutions, solve_equality_conflict, ConflictKey, Conflicts, IdChanges, MergeConflict,
    MergeOutcome, MergeSide, Solutions,
};
use crate::error::MergeResult;
use crate::model::{BlockRange, Record, Table, UserMark};

/// A highlight with all of its spans.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserMarkBlockRange {
    pub user_mark: UserMark,
    pub block_ranges: Vec<BlockRange>,
}

impl UserMarkBlockRange {
    fn spans(&self) -> Vec<(i64, i64, Option<i64>, Option<i64>)> {
        let mut spans: Vec<_> = self.block_ranges.iter().map(BlockRange::span).collect();
        spans.sort();
        spans
    }
}

impl Record for UserMarkBlockRange {
    fn id(&self) -> i64 {
        self.user_mark.user_mark_id
    }

    /// Renumber the highlight and re-point its spans.
    fn set_id(&mut self, id: i64) {
        self.user_mark.user_mark_id = id;
        for range in &mut self.block_ranges {
            range.user_mark_id = id;
        }
    }

    fn unique_key(&self) -> String {
        self.user_mark.unique_key()
    }

    /// Same place, same spans. Colour and style may differ.
    fn equals(&self, other: &Self) -> bool {
        self.user_mark.location_id == other.user_mark.location_id && self.spans() == other.spans()
    }
}

/// Merged highlights and spans, with the highlight renumbering.
#[derive(Debug, Clone, PartialEq)]
pub struct MergedMarkings {
    pub user_marks: Table<UserMark>,
    pub block_ranges: Table<BlockRange>,
    pub changes: IdChanges,
}

/// Outcome of the highlight merge.
pub type MarkingMerge = MergeOutcome<MergedMarkings, UserMarkBlockRange>;

/// A discarded highlight that must follow its winner's final id.
#[derive(Debug, Clone, Copy)]
struct Redirect {
    side: MergeSide,
    id: i64,
    target_side: MergeSide,
    target: i64,
}

/// A span tagged with the side and highlight it belongs to.
#[derive(Debug, Clone, Copy)]
struct SideSpan<'a> {
    side: MergeSide,
    owner: i64,
    range: &'a BlockRange,
}

/// Merge the highlights of both sides. Location ids must already be merged.
///
/// Answers in `solutions` are spliced in before overlaps are searched;
/// automatic answers for equal highlights are added to `solutions`.
/// Conflicts are keyed by a counter that starts after the largest key
/// already in `solutions`.
pub fn merge_user_marks(
    left_marks: &[Option<UserMark>],
    left_ranges: &[Option<BlockRange>],
    right_marks: &[Option<UserMark>],
    right_ranges: &[Option<BlockRange>],
    solutions: &mut Solutions<UserMarkBlockRange>,
) -> MergeResult<MarkingMerge> {
    let mut left = join(left_marks, left_ranges);
    let mut right = join(right_marks, right_ranges);
    let mut redirects = Vec::new();

    splice(&mut left, &mut right, solutions, &mut redirects);
    let mut conflicts = detect_overlaps(&left, &right, next_key(solutions));

    if !conflicts.is_empty() {
        let answers = solve_equality_conflict(&conflicts)?;
        if !answers.is_empty() {
            debug!(solved = answers.len(), "collapsing equal highlights");
            splice(&mut left, &mut right, &answers, &mut redirects);
            add_solutions(solutions, answers)?;
            conflicts = detect_overlaps(&left, &right, next_key(solutions));
        }
    }

    if !conflicts.is_empty() {
        debug!(conflicts = conflicts.len(), "overlapping highlights need answers");
        return Ok(MergeOutcome::Conflicts(conflicts));
    }

    Ok(MergeOutcome::Merged(split(&left, &right, &redirects)))
}

/// Pair every highlight with its spans. Empty slots and id 0 stay empty.
fn join(marks: &[Option<UserMark>], ranges: &[Option<BlockRange>]) -> Table<UserMarkBlockRange> {
    let mut joined: Table<UserMarkBlockRange> = marks
        .iter()
        .map(|mark| {
            mark.as_ref()
                .filter(|mark| mark.user_mark_id != 0)
                .map(|mark| UserMarkBlockRange {
                    user_mark: mark.clone(),
                    block_ranges: Vec::new(),
                })
        })
        .collect();

    for range in ranges.iter().flatten() {
        match slot_mut(&mut joined, range.user_mark_id) {
            Some(Some(owner)) => owner.block_ranges.push(range.clone()),
            _ => warn!(
                block_range_id = range.block_range_id,
                user_mark_id = range.user_mark_id,
                "dropping span without highlight"
            ),
        }
    }

    joined
}

fn slot_mut<T>(table: &mut Table<T>, id: i64) -> Option<&mut Option<T>> {
    usize::try_from(id).ok().and_then(|index| table.get_mut(index))
}

fn slot<T>(table: &[Option<T>], id: i64) -> Option<&T> {
    usize::try_from(id)
        .ok()
        .and_then(|index| table.get(index))
        .and_then(Option::as_ref)
}

/// Write each winner into its slot and clear the discarded twin's slot.
fn splice(
    left: &mut Table<UserMarkBlockRange>,
    right: &mut Table<UserMarkBlockRange>,
    solutions: &Solutions<UserMarkBlockRange>,
    redirects: &mut Vec<Redirect>,
) {
    for solution in solutions.values() {
        let (winners, losers) = match solution.side {
            MergeSide::Left => (&mut *left, &mut *right),
            MergeSide::Right => (&mut *right, &mut *left),
        };

        let winner_id = solution.solution.id();
        let Some(winner) = slot_mut(winners, winner_id).filter(|_| winner_id != 0) else {
            warn!(user_mark_id = winner_id, "ignoring solution with unknown highlight id");
            continue;
        };
        *winner = Some(solution.solution.clone());

        let discarded_id = solution.discarded.id();
        if let Some(slot) = slot_mut(losers, discarded_id) {
            *slot = None;
        }
        redirects.push(Redirect {
            side: solution.side.opposite(),
            id: discarded_id,
            target_side: solution.side,
            target: winner_id,
        });
    }
}

/// First free synthetic key.
fn next_key(solutions: &Solutions<UserMarkBlockRange>) -> u64 {
    solutions
        .keys()
        .filter_map(|key| match key {
            ConflictKey::Synthetic(n) => Some(n + 1),
            ConflictKey::Business(_) => None,
        })
        .max()
        .unwrap_or(0)
}

/// Find highlights of opposite sides whose spans overlap.
fn detect_overlaps(
    left: &[Option<UserMarkBlockRange>],
    right: &[Option<UserMarkBlockRange>],
    first_key: u64,
) -> Conflicts<UserMarkBlockRange> {
    let mut buckets: BTreeMap<(i64, i64), Vec<SideSpan<'_>>> = BTreeMap::new();
    for (side, table) in [(MergeSide::Left, left), (MergeSide::Right, right)] {
        for mark in table.iter().flatten() {
            for range in &mark.block_ranges {
                buckets
                    .entry((mark.user_mark.location_id, range.identifier))
                    .or_default()
                    .push(SideSpan {
                        side,
                        owner: mark.id(),
                        range,
                    });
            }
        }
    }

    let mut pairs: BTreeSet<(i64, i64)> = BTreeSet::new();
    let mut conflicts = Conflicts::new();
    let mut key = first_key;

    for spans in buckets.values_mut() {
        spans.sort_by_key(|span| span.range.start());

        for (i, current) in spans.iter().enumerate() {
            for candidate in &spans[i + 1..] {
                if current.range.end() < candidate.range.start() {
                    break;
                }
                if current.side == candidate.side {
                    continue;
                }

                let (l, r) = match current.side {
                    MergeSide::Left => (current, candidate),
                    MergeSide::Right => (candidate, current),
                };
                if !pairs.insert((l.owner, r.owner)) {
                    continue;
                }

                let left_mark = slot(left, l.owner);
                let right_mark = slot(right, r.owner);
                let (Some(left_mark), Some(right_mark)) = (left_mark, right_mark) else {
                    continue;
                };
                conflicts.insert(
                    ConflictKey::Synthetic(key),
                    MergeConflict {
                        left: left_mark.clone(),
                        right: right_mark.clone(),
                    },
                );
                key += 1;
            }
        }
    }

    conflicts
}

/// Interleave both sides slot by slot, renumber, and split into tables.
fn split(
    left: &[Option<UserMarkBlockRange>],
    right: &[Option<UserMarkBlockRange>],
    redirects: &[Redirect],
) -> MergedMarkings {
    let mut user_marks: Table<UserMark> = vec![None];
    let mut block_ranges: Table<BlockRange> = vec![None];
    let mut changes = IdChanges::default();

    for index in 0..left.len().max(right.len()) {
        for (side, table) in [(MergeSide::Left, left), (MergeSide::Right, right)] {
            let Some(Some(mark)) = table.get(index) else {
                continue;
            };
            let new_id = user_marks.len() as i64;
            changes.record(side, mark.id(), new_id);

            let mut mark = mark.clone();
            mark.set_id(new_id);
            for mut range in mark.block_ranges {
                range.block_range_id = block_ranges.len() as i64;
                block_ranges.push(Some(range));
            }
            user_marks.push(Some(mark.user_mark));
        }
    }

    for redirect in redirects {
        // A later answer may have revived the discarded slot.
        if slot(side_table(left, right, redirect.side), redirect.id).is_some() {
            continue;
        }
        match surviving_target(left, right, redirects, redirect) {
            Some((side, id)) => {
                let target = changes.resolve(side, id);
                changes.record(redirect.side, redirect.id, target);
            }
            None => warn!(
                user_mark_id = redirect.id,
                "discarded highlight has no surviving winner"
            ),
        }
    }

    MergedMarkings {
        user_marks,
        block_ranges,
        changes,
    }
}

fn side_table<'a, T>(
    left: &'a [Option<T>],
    right: &'a [Option<T>],
    side: MergeSide,
) -> &'a [Option<T>] {
    match side {
        MergeSide::Left => left,
        MergeSide::Right => right,
    }
}

/// Follow `redirect` through later answers until it reaches a highlight that
/// is still in place. A winner may itself have been discarded by another
/// answer; cycles end the walk.
fn surviving_target(
    left: &[Option<UserMarkBlockRange>],
    right: &[Option<UserMarkBlockRange>],
    redirects: &[Redirect],
    redirect: &Redirect,
) -> Option<(MergeSide, i64)> {
    let mut current = (redirect.target_side, redirect.target);
    let mut seen = BTreeSet::new();
    while seen.insert(current) {
        let (side, id) = current;
        if slot(side_table(left, right, side), id).is_some() {
            return Some(current);
        }
        let next = redirects.iter().rev().find(|r| (r.side, r.id) == current)?;
        current = (next.target_side, next.target);
    }
    None
}

#[cfg(test)]
mod tests;
