//! Automatic conflict-resolution strategies.
//!
//! Every strategy maps a set of conflicts to answers for them. They can be
//! selected by name, e.g. from a JSON request: `disabled`, `chooseLeft`,
//! `chooseRight`, `chooseNewest`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::{ConflictKey, Conflicts, MergeConflict, MergeSide, MergeSolution, Solutions};
use crate::error::{MergeError, MergeResult};
use crate::model::{Location, Record};

/// A named strategy for answering conflicts without asking anyone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
pub enum ConflictSolver {
    /// Leave conflicts for the caller.
    #[default]
    Disabled,
    ChooseLeft,
    ChooseRight,
    /// Keep the row with the later last-modified timestamp.
    ChooseNewest,
}

impl ConflictSolver {
    pub fn name(self) -> &'static str {
        match self {
            ConflictSolver::Disabled => "disabled",
            ConflictSolver::ChooseLeft => "chooseLeft",
            ConflictSolver::ChooseRight => "chooseRight",
            ConflictSolver::ChooseNewest => "chooseNewest",
        }
    }

    /// Answer `conflicts`. `Disabled` answers nothing.
    pub fn solve<T: Record>(self, conflicts: &Conflicts<T>) -> MergeResult<Solutions<T>> {
        match self {
            ConflictSolver::Disabled => Ok(Solutions::new()),
            ConflictSolver::ChooseLeft => Ok(choose_side(conflicts, MergeSide::Left)),
            ConflictSolver::ChooseRight => Ok(choose_side(conflicts, MergeSide::Right)),
            ConflictSolver::ChooseNewest => choose_newest(conflicts),
        }
    }
}

impl FromStr for ConflictSolver {
    type Err = MergeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [
            ConflictSolver::Disabled,
            ConflictSolver::ChooseLeft,
            ConflictSolver::ChooseRight,
            ConflictSolver::ChooseNewest,
        ]
        .into_iter()
        .find(|solver| solver.name() == s)
        .ok_or_else(|| MergeError::General(format!("Unknown conflict solver: {}", s)))
    }
}

fn keep<T: Clone>(conflict: &MergeConflict<T>, side: MergeSide) -> MergeSolution<T> {
    let (solution, discarded) = match side {
        MergeSide::Left => (&conflict.left, &conflict.right),
        MergeSide::Right => (&conflict.right, &conflict.left),
    };
    MergeSolution {
        side,
        solution: solution.clone(),
        discarded: discarded.clone(),
    }
}

/// Always keep `side`.
pub fn choose_side<T: Record>(conflicts: &Conflicts<T>, side: MergeSide) -> Solutions<T> {
    conflicts
        .iter()
        .map(|(key, conflict)| (key.clone(), keep(conflict, side)))
        .collect()
}

/// Keep the row modified last; equal timestamps keep the left row.
///
/// Fails for record types without a timestamp and for unparsable values.
pub fn choose_newest<T: Record>(conflicts: &Conflicts<T>) -> MergeResult<Solutions<T>> {
    let mut solutions = Solutions::new();
    for (key, conflict) in conflicts {
        let left = timestamp(key, &conflict.left)?;
        let right = timestamp(key, &conflict.right)?;
        let side = if right > left {
            MergeSide::Right
        } else {
            MergeSide::Left
        };
        solutions.insert(key.clone(), keep(conflict, side));
    }
    Ok(solutions)
}

/// Keep the location that has a title; two untitled locations keep the right one.
pub fn prefer_titled(conflicts: &Conflicts<Location>) -> MergeResult<Solutions<Location>> {
    Ok(conflicts
        .iter()
        .map(|(key, conflict)| {
            let side = if conflict.left.has_title() {
                MergeSide::Left
            } else {
                MergeSide::Right
            };
            (key.clone(), keep(conflict, side))
        })
        .collect())
}

fn timestamp<T: Record>(key: &ConflictKey, record: &T) -> MergeResult<DateTime<Utc>> {
    let value = record
        .last_modified()
        .ok_or_else(|| MergeError::UnsupportedStrategy {
            strategy: ConflictSolver::ChooseNewest.name().to_string(),
            key: key.to_string(),
            reason: "record has no last-modified timestamp".to_string(),
        })?;
    parse_timestamp(value).ok_or_else(|| MergeError::InvalidTimestamp {
        key: key.to_string(),
        value: value.to_string(),
    })
}

/// Parse a timestamp.
/// Handles both RFC3339 format (2020-04-09T05:47:26+00:00) and
/// SQLite format (2020-04-09 05:47:26.000).
fn parse_timestamp(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .ok()
        .or_else(|| {
            chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S%.f")
                .ok()
                .map(|naive| naive.and_utc())
        })
}
