//! Whole-database merge.
//!
//! Merges the tables of two user-data databases in dependency order and
//! carries every renumbering into the tables that reference it. When a
//! table has collisions that no configured strategy answers, the merge
//! stops there and hands them back; the caller adds answers to
//! [`MergeSolutions`] and sends the same request again.

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{MergeError, MergeResult};
use crate::merge::{
    add_solutions, merge_bookmarks, merge_input_fields, merge_locations, merge_notes,
    merge_tag_maps, merge_tags, merge_user_marks, ConflictSolver, Conflicts, ForeignKey,
    MergeOutcome, Solutions, UserMarkBlockRange,
};
use crate::model::{Bookmark, Database, InputField, Location, Note, Record, Tag};
use crate::prepare::{prepare_database_post_merge, prepare_databases_pre_merge};

/// Merge configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MergeOptions {
    /// Strategy for bookmarks sharing a publication and slot
    #[serde(default)]
    pub bookmark_solver: ConflictSolver,
    /// Strategy for input fields holding different values
    #[serde(default)]
    pub input_field_solver: ConflictSolver,
    /// Strategy for overlapping highlights
    #[serde(default)]
    pub marking_solver: ConflictSolver,
    /// Strategy for notes edited on both sides
    #[serde(default)]
    pub note_solver: ConflictSolver,
    /// Run the edition migration, location cleanup and duplicate-highlight check (default: true)
    #[serde(default = "default_prepare_databases")]
    pub prepare_databases: bool,
}

fn default_prepare_databases() -> bool {
    true
}

impl Default for MergeOptions {
    fn default() -> Self {
        MergeOptions {
            bookmark_solver: ConflictSolver::default(),
            input_field_solver: ConflictSolver::default(),
            marking_solver: ConflictSolver::default(),
            note_solver: ConflictSolver::default(),
            prepare_databases: default_prepare_databases(),
        }
    }
}

/// Answers gathered so far, one map per table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MergeSolutions {
    #[serde(default)]
    pub location: Solutions<Location>,
    #[serde(default)]
    pub bookmark: Solutions<Bookmark>,
    #[serde(default)]
    pub input_field: Solutions<InputField>,
    #[serde(default)]
    pub tag: Solutions<Tag>,
    #[serde(default)]
    pub user_mark: Solutions<UserMarkBlockRange>,
    #[serde(default)]
    pub note: Solutions<Note>,
}

impl MergeSolutions {
    pub fn len(&self) -> usize {
        self.location.len()
            + self.bookmark.len()
            + self.input_field.len()
            + self.tag.len()
            + self.user_mark.len()
            + self.note.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Collisions of the table the merge stopped at.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "table", content = "conflicts")]
pub enum PendingConflicts {
    Location(Conflicts<Location>),
    Bookmark(Conflicts<Bookmark>),
    InputField(Conflicts<InputField>),
    Tag(Conflicts<Tag>),
    UserMark(Conflicts<UserMarkBlockRange>),
    Note(Conflicts<Note>),
}

impl PendingConflicts {
    pub fn table(&self) -> &'static str {
        match self {
            PendingConflicts::Location(_) => "Location",
            PendingConflicts::Bookmark(_) => "Bookmark",
            PendingConflicts::InputField(_) => "InputField",
            PendingConflicts::Tag(_) => "Tag",
            PendingConflicts::UserMark(_) => "UserMark",
            PendingConflicts::Note(_) => "Note",
        }
    }

    pub fn len(&self) -> usize {
        match self {
            PendingConflicts::Location(c) => c.len(),
            PendingConflicts::Bookmark(c) => c.len(),
            PendingConflicts::InputField(c) => c.len(),
            PendingConflicts::Tag(c) => c.len(),
            PendingConflicts::UserMark(c) => c.len(),
            PendingConflicts::Note(c) => c.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Statistics about one merge call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "uniffi", derive(uniffi::Record))]
pub struct MergeStats {
    /// Number of tables merged before finishing or stopping
    pub tables_merged: u32,
    /// Answers added by built-in rules and configured strategies
    pub conflicts_solved_automatically: u32,
    /// Collisions handed back to the caller
    pub pending_conflicts: u32,
    /// Bible locations moved to the study edition
    pub locations_migrated: u32,
    /// Duplicate locations collapsed inside either input
    pub duplicate_locations_removed: u32,
    /// Legacy-edition highlight copies removed after merging
    pub duplicate_user_marks_removed: u32,
}

/// Result of a whole-database merge.
#[derive(Debug, Clone, PartialEq)]
pub enum DatabaseMerge {
    Merged(Database),
    Conflicts(PendingConflicts),
}

/// Input for the merge operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeInput {
    pub left: Database,
    pub right: Database,
    #[serde(default)]
    pub options: MergeOptions,
    /// Answers from earlier rounds
    #[serde(default)]
    pub solutions: MergeSolutions,
}

/// Output of the merge operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MergeOutput {
    /// Whether every table was merged. When false, `conflicts` needs answers.
    pub success: bool,
    /// The merged database
    pub database: Option<Database>,
    /// Collisions of the table the merge stopped at
    pub conflicts: Option<PendingConflicts>,
    /// All answers so far, including automatic ones; send them back with the next round
    pub solutions: MergeSolutions,
    pub stats: MergeStats,
}

/// Why the table sequence stopped early.
enum Interrupt {
    Pending(PendingConflicts),
    Failed(MergeError),
}

impl From<MergeError> for Interrupt {
    fn from(err: MergeError) -> Self {
        Interrupt::Failed(err)
    }
}

/// Merge two databases.
///
/// Neither input is modified. Answers computed along the way are added to
/// `solutions`, so the next call only needs the caller's new answers on top.
pub fn merge_database_tables(
    left: &Database,
    right: &Database,
    options: &MergeOptions,
    solutions: &mut MergeSolutions,
    stats: &mut MergeStats,
) -> MergeResult<DatabaseMerge> {
    left.verify()?;
    right.verify()?;
    *stats = MergeStats::default();

    let mut left = left.clone();
    let mut right = right.clone();
    if options.prepare_databases {
        let report = prepare_databases_pre_merge(&mut left, &mut right);
        stats.locations_migrated = report.locations_migrated;
        stats.duplicate_locations_removed = report.duplicate_locations_removed;
    }

    let known = solutions.len();
    let result = merge_tables(&mut left, &mut right, options, solutions, stats);
    stats.conflicts_solved_automatically = solutions.len().saturating_sub(known) as u32;

    let mut merged = match result {
        Ok(merged) => merged,
        Err(Interrupt::Failed(err)) => return Err(err),
        Err(Interrupt::Pending(conflicts)) => {
            info!(
                table = conflicts.table(),
                conflicts = conflicts.len(),
                "merge stopped on conflicts"
            );
            stats.pending_conflicts = conflicts.len() as u32;
            return Ok(DatabaseMerge::Conflicts(conflicts));
        }
    };

    if options.prepare_databases {
        stats.duplicate_user_marks_removed = prepare_database_post_merge(&mut merged)?;
    }

    info!(tables = stats.tables_merged, "merge complete");
    Ok(DatabaseMerge::Merged(merged))
}

fn merge_tables(
    left: &mut Database,
    right: &mut Database,
    options: &MergeOptions,
    solutions: &mut MergeSolutions,
    stats: &mut MergeStats,
) -> Result<Database, Interrupt> {
    let mut merged = Database::default();

    let locations = settle(ConflictSolver::Disabled, &mut solutions.location, |s| {
        merge_locations(&left.location, &right.location, s)
    })?
    .or_pending(PendingConflicts::Location)?;
    locations.changes.apply(left, right, ForeignKey::LOCATION_DEPENDENTS);
    merged.location = locations.records;
    finished("Location", stats);

    let bookmarks = settle(options.bookmark_solver, &mut solutions.bookmark, |s| {
        merge_bookmarks(&left.bookmark, &right.bookmark, s)
    })?
    .or_pending(PendingConflicts::Bookmark)?;
    merged.bookmark = bookmarks.records;
    finished("Bookmark", stats);

    let input_fields = settle(options.input_field_solver, &mut solutions.input_field, |s| {
        merge_input_fields(&left.input_field, &right.input_field, s)
    })?
    .or_pending(PendingConflicts::InputField)?;
    merged.input_field = input_fields.records;
    finished("InputField", stats);

    let tags = settle(ConflictSolver::Disabled, &mut solutions.tag, |s| {
        merge_tags(&left.tag, &right.tag, s)
    })?
    .or_pending(PendingConflicts::Tag)?;
    tags.changes.apply(left, right, ForeignKey::TAG_DEPENDENTS);
    merged.tag = tags.records;
    finished("Tag", stats);

    let markings = settle(options.marking_solver, &mut solutions.user_mark, |s| {
        merge_user_marks(
            &left.user_mark,
            &left.block_range,
            &right.user_mark,
            &right.block_range,
            s,
        )
    })?
    .or_pending(PendingConflicts::UserMark)?;
    markings.changes.apply(left, right, ForeignKey::USER_MARK_DEPENDENTS);
    merged.user_mark = markings.user_marks;
    merged.block_range = markings.block_ranges;
    finished("UserMark", stats);

    let notes = settle(options.note_solver, &mut solutions.note, |s| {
        merge_notes(&left.note, &right.note, s)
    })?
    .or_pending(PendingConflicts::Note)?;
    notes.changes.apply(left, right, ForeignKey::NOTE_DEPENDENTS);
    merged.note = notes.records;
    finished("Note", stats);

    merged.tag_map = merge_tag_maps(&left.tag_map, &right.tag_map);
    finished("TagMap", stats);

    Ok(merged)
}

fn finished(table: &str, stats: &mut MergeStats) {
    stats.tables_merged += 1;
    debug!(table, "table merged");
}

/// Run `merge`; when it reports conflicts, let `strategy` answer them and
/// run it once more.
fn settle<M, T, F>(
    strategy: ConflictSolver,
    solutions: &mut Solutions<T>,
    merge: F,
) -> MergeResult<MergeOutcome<M, T>>
where
    T: Record,
    F: Fn(&mut Solutions<T>) -> MergeResult<MergeOutcome<M, T>>,
{
    let outcome = merge(solutions)?;
    let answers = match &outcome {
        MergeOutcome::Conflicts(conflicts) => strategy.solve(conflicts)?,
        MergeOutcome::Merged(_) => Solutions::new(),
    };
    if answers.is_empty() {
        return Ok(outcome);
    }
    debug!(strategy = strategy.name(), answers = answers.len(), "applying conflict strategy");
    add_solutions(solutions, answers)?;
    merge(solutions)
}

impl<M, T> MergeOutcome<M, T> {
    fn or_pending(self, wrap: fn(Conflicts<T>) -> PendingConflicts) -> Result<M, Interrupt> {
        match self {
            MergeOutcome::Merged(merged) => Ok(merged),
            MergeOutcome::Conflicts(conflicts) => Err(Interrupt::Pending(wrap(conflicts))),
        }
    }
}

/// Main entry point: merge two databases, continuing from earlier answers.
pub fn merge_databases(input: MergeInput) -> MergeResult<MergeOutput> {
    let mut solutions = input.solutions;
    let mut stats = MergeStats::default();

    let outcome = merge_database_tables(
        &input.left,
        &input.right,
        &input.options,
        &mut solutions,
        &mut stats,
    )?;

    let (database, conflicts) = match outcome {
        DatabaseMerge::Merged(database) => (Some(database), None),
        DatabaseMerge::Conflicts(conflicts) => (None, Some(conflicts)),
    };

    Ok(MergeOutput {
        success: database.is_some(),
        database,
        conflicts,
        solutions,
        stats,
    })
}

/// Merge a JSON string input and return JSON string output.
/// Convenience function for FFI.
pub fn merge_databases_json(input_json: &str) -> MergeResult<String> {
    let input: MergeInput = serde_json::from_str(input_json)?;
    let output = merge_databases(input)?;
    let output_json = serde_json::to_string(&output)?;
    Ok(output_json)
}
