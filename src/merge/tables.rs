//! Merge entry points for the plain tables.

use tracing::debug;

use super::generic::merge_from;
use super::{
    prefer_titled, solve_equality_conflict, try_merge_with_solver, MergeOutcome, MergeSide,
    MergedTable, Solutions, TableMerge,
};
use crate::error::MergeResult;
use crate::model::{Bookmark, InputField, Location, Note, Record, Table, Tag};

/// Id the built-in default tag holds in every merged database.
const DEFAULT_TAG_ID: i64 = 1;

pub fn merge_bookmarks(
    left: &[Option<Bookmark>],
    right: &[Option<Bookmark>],
    solutions: &mut Solutions<Bookmark>,
) -> MergeResult<TableMerge<Bookmark>> {
    try_merge_with_solver(left, right, solutions, solve_equality_conflict)
}

pub fn merge_notes(
    left: &[Option<Note>],
    right: &[Option<Note>],
    solutions: &mut Solutions<Note>,
) -> MergeResult<TableMerge<Note>> {
    try_merge_with_solver(left, right, solutions, solve_equality_conflict)
}

/// Merge locations. Twins that differ only in their title keep the titled one.
pub fn merge_locations(
    left: &[Option<Location>],
    right: &[Option<Location>],
    solutions: &mut Solutions<Location>,
) -> MergeResult<TableMerge<Location>> {
    try_merge_with_solver(left, right, solutions, prefer_titled)
}

/// Merge input fields.
///
/// Input fields carry no id, so the result is ordered by unique key and no
/// id changes are reported.
pub fn merge_input_fields(
    left: &[Option<InputField>],
    right: &[Option<InputField>],
    solutions: &mut Solutions<InputField>,
) -> MergeResult<TableMerge<InputField>> {
    let merged = match try_merge_with_solver(left, right, solutions, solve_equality_conflict)? {
        MergeOutcome::Merged(merged) => merged,
        conflicts => return Ok(conflicts),
    };

    let mut fields: Vec<InputField> = merged.records.into_iter().flatten().collect();
    fields.sort_by_key(InputField::unique_key);

    let mut records: Table<InputField> = vec![None];
    records.extend(fields.into_iter().map(Some));
    Ok(MergeOutcome::Merged(MergedTable {
        records,
        changes: Default::default(),
    }))
}

/// Merge tags.
///
/// The built-in default tag exists in every database, so it is kept out of
/// the merge and placed at id 1 whenever either side has it. Both sides'
/// copies are redirected there.
pub fn merge_tags(
    left: &[Option<Tag>],
    right: &[Option<Tag>],
    solutions: &mut Solutions<Tag>,
) -> MergeResult<TableMerge<Tag>> {
    let (left_default, left) = split_default_tag(left);
    let (right_default, right) = split_default_tag(right);
    let default = left_default.clone().or_else(|| right_default.clone());
    let first_id = if default.is_some() { 2 } else { 1 };

    let outcome = merge_from(&left, &right, solutions, solve_equality_conflict, first_id)?;
    let mut merged = match outcome {
        MergeOutcome::Merged(merged) => merged,
        conflicts => return Ok(conflicts),
    };

    if let Some(mut default) = default {
        debug!(tag = %default.name, "keeping default tag at its reserved id");
        if let Some(tag) = &left_default {
            merged.changes.record(MergeSide::Left, tag.tag_id, DEFAULT_TAG_ID);
        }
        if let Some(tag) = &right_default {
            merged.changes.record(MergeSide::Right, tag.tag_id, DEFAULT_TAG_ID);
        }
        default.set_id(DEFAULT_TAG_ID);
        merged.records[1] = Some(default);
    }

    Ok(MergeOutcome::Merged(merged))
}

/// Separate the default tag from the others, keeping positions intact.
fn split_default_tag(tags: &[Option<Tag>]) -> (Option<Tag>, Table<Tag>) {
    let default = tags.iter().flatten().find(|tag| tag.is_default()).cloned();
    let rest = tags
        .iter()
        .map(|tag| tag.clone().filter(|tag| !tag.is_default()))
        .collect();
    (default, rest)
}
