//! Table rows of a JW Library user-data database.
//!
//! Every table is held as a dense array indexed by id: index 0 is always
//! `None`, and every other index holds either the row whose id equals the
//! index or `None`. The archive layer that fills these arrays lives outside
//! this crate.

mod block_range;
mod bookmark;
mod input_field;
mod location;
mod note;
mod tag;
mod tag_map;
mod user_mark;

use serde::{Deserialize, Serialize};
use std::fmt::Debug;

use crate::error::{MergeError, MergeResult};

pub use block_range::BlockRange;
pub use bookmark::Bookmark;
pub use input_field::InputField;
pub use location::Location;
pub use note::Note;
pub use tag::{Tag, DEFAULT_TAG_NAME, DEFAULT_TAG_TYPE};
pub use tag_map::TagMap;
pub use user_mark::UserMark;

/// A table as held in memory: dense, 1-based, index 0 absent.
pub type Table<T> = Vec<Option<T>>;

/// The capabilities every table row offers to the merge engine.
pub trait Record: Clone + Debug + PartialEq {
    /// Position of the row within its table. 0 means "no id".
    fn id(&self) -> i64;

    fn set_id(&mut self, id: i64);

    /// Business identity used to find the same row on the other side.
    fn unique_key(&self) -> String;

    /// Value equality ignoring the id.
    fn equals(&self, other: &Self) -> bool;

    /// Last-modified timestamp, for types that carry one.
    fn last_modified(&self) -> Option<&str> {
        None
    }
}

/// Render a nullable column for use inside a unique key.
pub(crate) fn key_part<T: ToString>(value: &Option<T>) -> String {
    value.as_ref().map(ToString::to_string).unwrap_or_default()
}

/// Check that `table` satisfies the dense, id-indexed layout.
///
/// Tables whose rows carry no id (like [`InputField`]) are not checked.
pub fn verify_table<T: Record>(name: &str, table: &[Option<T>]) -> MergeResult<()> {
    for (index, row) in table.iter().enumerate() {
        let Some(row) = row else { continue };
        let matches = usize::try_from(row.id()).map_or(false, |id| id == index);
        if index == 0 || !matches {
            return Err(MergeError::InvalidTable {
                table: name.to_string(),
                index,
                id: row.id(),
            });
        }
    }
    Ok(())
}

/// Build a dense table from rows, placing each row at the index of its id.
///
/// Rows with an id below 1 are dropped.
#[cfg(test)]
pub(crate) fn table_from_rows<T: Record>(rows: impl IntoIterator<Item = T>) -> Table<T> {
    let mut table: Table<T> = vec![None];
    for row in rows {
        let Ok(index) = usize::try_from(row.id()) else { continue };
        if index == 0 {
            continue;
        }
        if table.len() <= index {
            table.resize(index + 1, None);
        }
        table[index] = Some(row);
    }
    table
}

/// The tables of one user-data database that take part in a merge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Database {
    #[serde(default)]
    pub block_range: Table<BlockRange>,
    #[serde(default)]
    pub bookmark: Table<Bookmark>,
    #[serde(default)]
    pub input_field: Table<InputField>,
    #[serde(default)]
    pub location: Table<Location>,
    #[serde(default)]
    pub note: Table<Note>,
    #[serde(default)]
    pub tag: Table<Tag>,
    #[serde(default)]
    pub tag_map: Table<TagMap>,
    #[serde(default)]
    pub user_mark: Table<UserMark>,
}

impl Database {
    /// Check every id-carrying table for the dense layout.
    pub fn verify(&self) -> MergeResult<()> {
        verify_table("BlockRange", &self.block_range)?;
        verify_table("Bookmark", &self.bookmark)?;
        verify_table("Location", &self.location)?;
        verify_table("Note", &self.note)?;
        verify_table("Tag", &self.tag)?;
        verify_table("TagMap", &self.tag_map)?;
        verify_table("UserMark", &self.user_mark)?;
        Ok(())
    }
}
