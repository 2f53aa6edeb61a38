//! Tests for the highlight merge.

use super::*;
use crate::merge::{choose_side, MergeSolution};
use crate::model::verify_table;
use proptest::prelude::*;

fn mark(id: i64, location_id: i64, guid: &str) -> UserMark {
    UserMark {
        user_mark_id: id,
        color_index: 1,
        location_id,
        style_index: 0,
        user_mark_guid: guid.to_string(),
        version: 1,
    }
}

fn range(id: i64, user_mark_id: i64, identifier: i64, start: i64, end: i64) -> BlockRange {
    BlockRange {
        block_range_id: id,
        block_type: 2,
        identifier,
        start_token: Some(start),
        end_token: Some(end),
        user_mark_id,
    }
}

fn table<T>(rows: Vec<T>) -> Table<T> {
    std::iter::once(None).chain(rows.into_iter().map(Some)).collect()
}

#[derive(Debug)]
struct Side {
    marks: Table<UserMark>,
    ranges: Table<BlockRange>,
}

fn side(marks: Vec<UserMark>, ranges: Vec<BlockRange>) -> Side {
    Side {
        marks: table(marks),
        ranges: table(ranges),
    }
}

fn run(
    left: &Side,
    right: &Side,
    solutions: &mut Solutions<UserMarkBlockRange>,
) -> MarkingMerge {
    merge_user_marks(&left.marks, &left.ranges, &right.marks, &right.ranges, solutions).unwrap()
}

fn merged(outcome: MarkingMerge) -> MergedMarkings {
    match outcome {
        MergeOutcome::Merged(merged) => merged,
        MergeOutcome::Conflicts(conflicts) => panic!("unexpected conflicts: {:?}", conflicts),
    }
}

fn conflicts(outcome: MarkingMerge) -> Conflicts<UserMarkBlockRange> {
    match outcome {
        MergeOutcome::Conflicts(conflicts) => conflicts,
        MergeOutcome::Merged(merged) => panic!("unexpected merge: {:?}", merged),
    }
}

fn guids(merged: &MergedMarkings) -> Vec<&str> {
    merged
        .user_marks
        .iter()
        .flatten()
        .map(|m| m.user_mark_guid.as_str())
        .collect()
}

#[test]
fn test_touching_spans_conflict() {
    let left = side(vec![mark(1, 1, "L")], vec![range(1, 1, 1, 0, 5)]);
    let right = side(vec![mark(1, 1, "R")], vec![range(1, 1, 1, 5, 10)]);
    let mut solutions = Solutions::new();

    let conflicts = conflicts(run(&left, &right, &mut solutions));

    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[&ConflictKey::Synthetic(0)];
    assert_eq!(conflict.left.user_mark.user_mark_guid, "L");
    assert_eq!(conflict.right.user_mark.user_mark_guid, "R");
}

#[test]
fn test_separate_spans_are_both_kept() {
    let left = side(vec![mark(1, 1, "L")], vec![range(1, 1, 1, 0, 4)]);
    let right = side(vec![mark(1, 1, "R")], vec![range(1, 1, 1, 5, 10)]);
    let mut solutions = Solutions::new();

    let merged = merged(run(&left, &right, &mut solutions));

    assert_eq!(guids(&merged), vec!["L", "R"]);
    assert_eq!(merged.changes.right.get(&1), Some(&2));
    assert!(merged.changes.left.is_empty());
    let owners: Vec<_> = merged.block_ranges.iter().flatten().map(|r| r.user_mark_id).collect();
    assert_eq!(owners, vec![1, 2]);
    assert!(verify_table("UserMark", &merged.user_marks).is_ok());
    assert!(verify_table("BlockRange", &merged.block_ranges).is_ok());
}

#[test]
fn test_other_paragraph_or_location_does_not_conflict() {
    let left = side(
        vec![mark(1, 1, "L1"), mark(2, 2, "L2")],
        vec![range(1, 1, 1, 0, 5), range(2, 2, 3, 0, 5)],
    );
    let right = side(
        vec![mark(1, 1, "R1"), mark(2, 3, "R2")],
        vec![range(1, 1, 2, 0, 5), range(2, 2, 3, 0, 5)],
    );
    let mut solutions = Solutions::new();

    let merged = merged(run(&left, &right, &mut solutions));
    assert_eq!(guids(&merged), vec!["L1", "R1", "L2", "R2"]);
}

#[test]
fn test_same_side_overlaps_are_ignored() {
    let left = side(
        vec![mark(1, 1, "A"), mark(2, 1, "B")],
        vec![range(1, 1, 1, 0, 5), range(2, 2, 1, 3, 8)],
    );
    let right = side(vec![], vec![]);
    let mut solutions = Solutions::new();

    let merged = merged(run(&left, &right, &mut solutions));
    assert_eq!(guids(&merged), vec!["A", "B"]);
    assert!(merged.changes.is_empty());
}

#[test]
fn test_conflict_holds_whole_highlights_in_side_order() {
    let left = side(
        vec![mark(1, 1, "L")],
        vec![range(1, 1, 1, 0, 2), range(2, 1, 2, 5, 9)],
    );
    let right = side(
        vec![mark(1, 1, "R")],
        vec![range(1, 1, 2, 0, 6), range(2, 1, 3, 0, 6)],
    );
    let mut solutions = Solutions::new();

    let conflicts = conflicts(run(&left, &right, &mut solutions));

    assert_eq!(conflicts.len(), 1);
    let conflict = conflicts.values().next().unwrap();
    assert_eq!(conflict.left.user_mark.user_mark_guid, "L");
    assert_eq!(conflict.left.block_ranges.len(), 2);
    assert_eq!(conflict.right.block_ranges.len(), 2);
}

#[test]
fn test_pair_is_reported_once() {
    let left = side(
        vec![mark(1, 1, "L")],
        vec![range(1, 1, 1, 0, 5), range(2, 1, 2, 0, 5)],
    );
    let right = side(
        vec![mark(1, 1, "R")],
        vec![range(1, 1, 1, 1, 2), range(2, 1, 2, 1, 3)],
    );
    let mut solutions = Solutions::new();

    assert_eq!(conflicts(run(&left, &right, &mut solutions)).len(), 1);
}

#[test]
fn test_equal_highlights_are_collapsed() {
    let left = side(
        vec![mark(1, 1, "X"), mark(2, 1, "A")],
        vec![range(1, 1, 2, 0, 3), range(2, 2, 1, 0, 5)],
    );
    let mut right_mark = mark(1, 1, "B");
    right_mark.color_index = 4;
    let right = side(vec![right_mark], vec![range(1, 1, 1, 0, 5)]);
    let mut solutions = Solutions::new();

    let merged = merged(run(&left, &right, &mut solutions));

    assert_eq!(guids(&merged), vec!["X", "A"]);
    assert_eq!(merged.changes.right.get(&1), Some(&2));
    assert!(merged.changes.left.is_empty());
    assert_eq!(solutions.len(), 1);
    assert!(solutions.contains_key(&ConflictKey::Synthetic(0)));
}

#[test]
fn test_answer_is_spliced_and_redirected() {
    let left = side(
        vec![mark(1, 2, "C"), mark(2, 1, "A")],
        vec![range(1, 1, 1, 0, 1), range(2, 2, 1, 0, 5)],
    );
    let right = side(
        vec![mark(1, 3, "E"), mark(2, 1, "B")],
        vec![range(1, 1, 1, 0, 1), range(2, 2, 1, 3, 8)],
    );
    let mut solutions = Solutions::new();

    let first = conflicts(run(&left, &right, &mut solutions));
    let (key, conflict) = first.into_iter().next().unwrap();
    solutions.insert(
        key,
        MergeSolution {
            side: MergeSide::Right,
            solution: conflict.right,
            discarded: conflict.left,
        },
    );

    let merged = merged(run(&left, &right, &mut solutions));

    assert_eq!(guids(&merged), vec!["C", "E", "B"]);
    assert_eq!(merged.changes.right.get(&1), Some(&2));
    assert_eq!(merged.changes.right.get(&2), Some(&3));
    // The discarded left highlight follows the surviving right one.
    assert_eq!(merged.changes.left.get(&2), Some(&3));
    assert_eq!(merged.block_ranges.iter().flatten().count(), 3);

    let again = run(&left, &right, &mut solutions);
    assert_eq!(again, MergeOutcome::Merged(merged));
    assert_eq!(solutions.len(), 1);
}

#[test]
fn test_keys_continue_after_existing_answers() {
    let left = side(
        vec![mark(1, 1, "A"), mark(2, 2, "X")],
        vec![range(1, 1, 1, 0, 5), range(2, 2, 1, 0, 5)],
    );
    let right = side(
        vec![mark(1, 1, "B"), mark(2, 2, "Y")],
        vec![range(1, 1, 1, 3, 8), range(2, 2, 1, 2, 3)],
    );
    let mut solutions = Solutions::new();
    let a = UserMarkBlockRange {
        user_mark: mark(1, 1, "A"),
        block_ranges: vec![range(1, 1, 1, 0, 5)],
    };
    let b = UserMarkBlockRange {
        user_mark: mark(1, 1, "B"),
        block_ranges: vec![range(1, 1, 1, 3, 8)],
    };
    solutions.insert(
        ConflictKey::Synthetic(4),
        MergeSolution {
            side: MergeSide::Left,
            solution: a,
            discarded: b,
        },
    );

    let conflicts = conflicts(run(&left, &right, &mut solutions));

    assert_eq!(conflicts.len(), 1);
    let conflict = &conflicts[&ConflictKey::Synthetic(5)];
    assert_eq!(conflict.left.user_mark.user_mark_guid, "X");
    assert_eq!(conflict.right.user_mark.user_mark_guid, "Y");
}

#[test]
fn test_orphan_spans_and_empty_slots_are_dropped() {
    let left = Side {
        marks: vec![Some(mark(0, 1, "zero")), Some(mark(1, 1, "A"))],
        ranges: table(vec![range(1, 1, 1, 0, 5), range(2, 9, 1, 0, 5)]),
    };
    let right = side(vec![], vec![]);
    let mut solutions = Solutions::new();

    let merged = merged(run(&left, &right, &mut solutions));

    assert_eq!(guids(&merged), vec!["A"]);
    assert_eq!(merged.block_ranges.iter().flatten().count(), 1);
}

#[test]
fn test_chained_answers_follow_final_winner() {
    let left = side(
        vec![mark(1, 1, "C"), mark(2, 1, "A"), mark(3, 1, "X")],
        vec![range(1, 1, 1, 10, 12), range(2, 2, 1, 0, 5), range(3, 3, 2, 0, 5)],
    );
    let right = side(vec![mark(1, 1, "B")], vec![range(1, 1, 1, 4, 11)]);
    let mut solutions = Solutions::new();

    let first = conflicts(run(&left, &right, &mut solutions));
    assert_eq!(first.len(), 2);
    for (key, conflict) in first {
        // B beats A, then C beats B.
        let side = match conflict.left.user_mark.user_mark_guid.as_str() {
            "A" => MergeSide::Right,
            _ => MergeSide::Left,
        };
        let (solution, discarded) = match side {
            MergeSide::Left => (conflict.left, conflict.right),
            MergeSide::Right => (conflict.right, conflict.left),
        };
        solutions.insert(
            key,
            MergeSolution {
                side,
                solution,
                discarded,
            },
        );
    }

    let merged = merged(run(&left, &right, &mut solutions));

    assert_eq!(guids(&merged), vec!["C", "X"]);
    assert_eq!(merged.changes.left.get(&3), Some(&2));
    // A was replaced by B, which was replaced by C.
    let a = merged.changes.resolve(MergeSide::Left, 2);
    assert_eq!(a, 1);
    assert_eq!(merged.user_marks[1].as_ref().unwrap().user_mark_guid, "C");
    assert_eq!(merged.changes.resolve(MergeSide::Right, 1), 1);

    let again = run(&left, &right, &mut solutions);
    assert_eq!(again, MergeOutcome::Merged(merged));
}

#[test]
fn test_answer_with_unknown_winner_is_ignored() {
    let left = side(vec![mark(1, 1, "L")], vec![range(1, 1, 1, 0, 5)]);
    let right = side(vec![mark(1, 1, "R")], vec![range(1, 1, 1, 3, 8)]);
    let mut bogus = UserMarkBlockRange {
        user_mark: mark(1, 1, "L"),
        block_ranges: vec![range(1, 1, 1, 0, 5)],
    };
    bogus.set_id(i64::MAX);
    let mut solutions = Solutions::new();
    solutions.insert(
        ConflictKey::Synthetic(0),
        MergeSolution {
            side: MergeSide::Left,
            solution: bogus,
            discarded: UserMarkBlockRange {
                user_mark: mark(1, 1, "R"),
                block_ranges: vec![range(1, 1, 1, 3, 8)],
            },
        },
    );

    let conflicts = conflicts(run(&left, &right, &mut solutions));

    assert_eq!(conflicts.len(), 1);
    assert!(conflicts.contains_key(&ConflictKey::Synthetic(1)));
}

/// One span per highlight. Left spans start on even tokens and right spans on
/// odd ones, so no pair is ever equal.
fn arb_side(prefix: &'static str, parity: i64) -> impl Strategy<Value = Side> {
    proptest::collection::vec((1..3i64, 1..4i64, 0..8i64, 0..4i64), 0..8).prop_map(
        move |spans| {
            let mut marks = Vec::new();
            let mut ranges = Vec::new();
            for (i, (location, identifier, start, len)) in spans.into_iter().enumerate() {
                let id = i as i64 + 1;
                let start = start * 2 + parity;
                marks.push(mark(id, location, &format!("{}{}", prefix, id)));
                ranges.push(range(id, id, identifier, start, start + len));
            }
            side(marks, ranges)
        },
    )
}

proptest! {
    #[test]
    fn answered_overlaps_merge_into_dense_tables(
        left in arb_side("L", 0),
        right in arb_side("R", 1),
        keep_left in any::<bool>(),
    ) {
        let keep = if keep_left { MergeSide::Left } else { MergeSide::Right };
        let mut solutions = Solutions::new();
        if let MergeOutcome::Conflicts(conflicts) = run(&left, &right, &mut solutions) {
            add_solutions(&mut solutions, choose_side(&conflicts, keep)).unwrap();
        }

        let merged = merged(run(&left, &right, &mut solutions));

        prop_assert!(verify_table("UserMark", &merged.user_marks).is_ok());
        prop_assert!(verify_table("BlockRange", &merged.block_ranges).is_ok());
        prop_assert!(merged.user_marks.iter().skip(1).all(Option::is_some));
        prop_assert!(merged.block_ranges.iter().skip(1).all(Option::is_some));

        for answer in solutions.values() {
            let discarded = answer.discarded.id();
            let id = merged.changes.resolve(answer.side.opposite(), discarded);
            let survivor = usize::try_from(id)
                .ok()
                .and_then(|index| merged.user_marks.get(index))
                .and_then(Option::as_ref);
            prop_assert!(survivor.is_some());

            let guid = survivor.map(|mark| mark.user_mark_guid.as_str());
            let winners: Vec<&str> = solutions
                .values()
                .filter(|other| other.discarded.id() == discarded)
                .map(|other| other.solution.user_mark.user_mark_guid.as_str())
                .collect();
            prop_assert!(guid.map_or(false, |guid| winners.contains(&guid)));
        }

        let again = run(&left, &right, &mut solutions);
        prop_assert_eq!(again, MergeOutcome::Merged(merged));
    }
}
