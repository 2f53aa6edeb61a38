//! Key-based duplicate detection shared by all plain tables.

use std::collections::HashMap;
use tracing::{debug, warn};

use super::{
    ConflictKey, Conflicts, IdChanges, MergeConflict, MergeOutcome, MergeSide, MergeSolution,
    MergedTable, Solutions, TableMerge,
};
use crate::error::{MergeError, MergeResult};
use crate::model::{Record, Table};

/// A row that made it into the merged set, with the twin it replaced.
#[derive(Debug, Clone)]
pub struct Resolved<T> {
    pub side: MergeSide,
    pub record: T,
    pub discarded: Option<T>,
    /// Rows with the same key dropped from either input, by side and id.
    pub duplicates: Vec<(MergeSide, i64)>,
}

impl<T> Resolved<T> {
    fn new(side: MergeSide, record: T) -> Self {
        Resolved {
            side,
            record,
            discarded: None,
            duplicates: Vec::new(),
        }
    }
}

impl<T> From<MergeSolution<T>> for Resolved<T> {
    fn from(solution: MergeSolution<T>) -> Self {
        Resolved {
            side: solution.side,
            record: solution.solution,
            discarded: Some(solution.discarded),
            duplicates: Vec::new(),
        }
    }
}

/// Collect both sides by unique key.
///
/// A right row whose key is held by a left row is replaced by its solution
/// when one exists, and reported as a conflict otherwise. A repeated key
/// within one side keeps the later row; the dropped row follows it.
pub(crate) fn merge<T: Record>(
    left: &[Option<T>],
    right: &[Option<T>],
    solutions: &Solutions<T>,
) -> Result<HashMap<String, Resolved<T>>, Conflicts<T>> {
    let mut resolved: HashMap<String, Resolved<T>> = HashMap::new();

    for record in left.iter().flatten() {
        let key = record.unique_key();
        let mut entry = Resolved::new(MergeSide::Left, record.clone());
        if let Some(previous) = resolved.remove(&key) {
            warn!(key = %key, "duplicate key within left side, keeping the later row");
            entry.duplicates = previous.duplicates;
            entry.duplicates.push((MergeSide::Left, previous.record.id()));
        }
        resolved.insert(key, entry);
    }

    let mut conflicts = Conflicts::new();
    for record in right.iter().flatten() {
        let key = record.unique_key();
        let Some(existing) = resolved.get_mut(&key) else {
            resolved.insert(key, Resolved::new(MergeSide::Right, record.clone()));
            continue;
        };

        if existing.side == MergeSide::Right && existing.discarded.is_none() {
            warn!(key = %key, "duplicate key within right side, keeping the later row");
            let dropped = std::mem::replace(&mut existing.record, record.clone());
            existing.duplicates.push((MergeSide::Right, dropped.id()));
            continue;
        }
        if existing.discarded.is_some() {
            warn!(key = %key, "duplicate key within right side, keeping the settled row");
            existing.duplicates.push((MergeSide::Right, record.id()));
            continue;
        }

        let conflict_key = ConflictKey::Business(key);
        if let Some(solution) = solutions.get(&conflict_key) {
            let duplicates = std::mem::take(&mut existing.duplicates);
            *existing = Resolved {
                duplicates,
                ..Resolved::from(solution.clone())
            };
        } else if !conflicts.contains_key(&conflict_key) {
            let conflict = MergeConflict {
                left: existing.record.clone(),
                right: record.clone(),
            };
            conflicts.insert(conflict_key, conflict);
        }
    }

    if conflicts.is_empty() {
        Ok(resolved)
    } else {
        Err(conflicts)
    }
}

/// Merge `left` and `right`, letting `solver` answer collisions until none
/// are left or the solver stops making progress.
///
/// Answers from the solver are added to `solutions`, so calling this again
/// with the same map never decides a settled collision twice.
pub fn try_merge_with_solver<T, F>(
    left: &[Option<T>],
    right: &[Option<T>],
    solutions: &mut Solutions<T>,
    solver: F,
) -> MergeResult<TableMerge<T>>
where
    T: Record,
    F: Fn(&Conflicts<T>) -> MergeResult<Solutions<T>>,
{
    merge_from(left, right, solutions, solver, 1)
}

/// Like [`try_merge_with_solver`], numbering the merged rows from `first_id`.
pub(crate) fn merge_from<T, F>(
    left: &[Option<T>],
    right: &[Option<T>],
    solutions: &mut Solutions<T>,
    solver: F,
    first_id: usize,
) -> MergeResult<TableMerge<T>>
where
    T: Record,
    F: Fn(&Conflicts<T>) -> MergeResult<Solutions<T>>,
{
    let mut previous: Option<usize> = None;
    loop {
        let conflicts = match merge(left, right, solutions) {
            Ok(resolved) => {
                let (records, changes) = prepare_merge_solution(resolved, first_id);
                return Ok(MergeOutcome::Merged(MergedTable { records, changes }));
            }
            Err(conflicts) => conflicts,
        };

        if previous.map_or(false, |count| conflicts.len() >= count) {
            debug!(conflicts = conflicts.len(), "solver made no progress");
            return Ok(MergeOutcome::Conflicts(conflicts));
        }
        previous = Some(conflicts.len());

        let answers = solver(&conflicts)?;
        if answers.is_empty() {
            return Ok(MergeOutcome::Conflicts(conflicts));
        }
        add_solutions(solutions, answers)?;
    }
}

/// Add `answers` to `solutions`.
///
/// An answer for a key that already has a different answer is an error:
/// two authorities disagree and neither may silently win.
pub fn add_solutions<T: Record>(
    solutions: &mut Solutions<T>,
    answers: Solutions<T>,
) -> MergeResult<()> {
    for (key, answer) in answers {
        match solutions.get(&key) {
            Some(existing) if *existing != answer => {
                return Err(MergeError::ConflictingSolution {
                    key: key.to_string(),
                });
            }
            Some(_) => {}
            None => {
                solutions.insert(key, answer);
            }
        }
    }
    Ok(())
}

/// Turn the resolved rows into a dense table numbered from `first_id`.
///
/// Rows are ordered by original id, left before right on equal ids. Every
/// renumbered row is recorded on its own side, and a discarded twin or a
/// dropped duplicate is recorded on its side so references to it follow the
/// winner.
pub fn prepare_merge_solution<T: Record>(
    resolved: HashMap<String, Resolved<T>>,
    first_id: usize,
) -> (Table<T>, IdChanges) {
    let mut entries: Vec<(String, Resolved<T>)> = resolved.into_iter().collect();
    entries.sort_by(|(key_a, a), (key_b, b)| {
        a.record
            .id()
            .cmp(&b.record.id())
            .then(a.side.cmp(&b.side))
            .then_with(|| key_a.cmp(key_b))
    });

    let mut table: Table<T> = vec![None; first_id.max(1)];
    let mut changes = IdChanges::default();

    for (_, entry) in entries {
        let new_id = table.len() as i64;
        let mut record = entry.record;

        changes.record(entry.side, record.id(), new_id);
        if let Some(discarded) = &entry.discarded {
            changes.record(entry.side.opposite(), discarded.id(), new_id);
        }
        for &(side, id) in &entry.duplicates {
            changes.record(side, id, new_id);
        }

        record.set_id(new_id);
        table.push(Some(record));
    }

    (table, changes)
}

/// Keep the left row of every conflict whose two rows are equal.
///
/// Conflicts with differing rows are not answered.
pub fn solve_equality_conflict<T: Record>(conflicts: &Conflicts<T>) -> MergeResult<Solutions<T>> {
    Ok(conflicts
        .iter()
        .filter(|(_, conflict)| conflict.left.equals(&conflict.right))
        .map(|(key, conflict)| {
            let solution = MergeSolution {
                side: MergeSide::Left,
                solution: conflict.left.clone(),
                discarded: conflict.right.clone(),
            };
            (key.clone(), solution)
        })
        .collect())
}
