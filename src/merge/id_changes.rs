//! Propagation of renumbered ids into dependent tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::IdChanges;
use crate::model::Database;

/// A foreign-key column that references another table's id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ForeignKey {
    BookmarkLocation,
    BookmarkPublicationLocation,
    InputFieldLocation,
    NoteLocation,
    NoteUserMark,
    TagMapLocation,
    TagMapNote,
    TagMapTag,
    UserMarkLocation,
}

impl ForeignKey {
    /// Columns referencing Location.
    pub const LOCATION_DEPENDENTS: &'static [ForeignKey] = &[
        ForeignKey::BookmarkLocation,
        ForeignKey::BookmarkPublicationLocation,
        ForeignKey::InputFieldLocation,
        ForeignKey::NoteLocation,
        ForeignKey::TagMapLocation,
        ForeignKey::UserMarkLocation,
    ];

    /// Columns referencing Tag.
    pub const TAG_DEPENDENTS: &'static [ForeignKey] = &[ForeignKey::TagMapTag];

    /// Columns referencing UserMark. BlockRange is merged together with
    /// UserMark and renumbered there.
    pub const USER_MARK_DEPENDENTS: &'static [ForeignKey] = &[ForeignKey::NoteUserMark];

    /// Columns referencing Note.
    pub const NOTE_DEPENDENTS: &'static [ForeignKey] = &[ForeignKey::TagMapNote];
}

/// Rewrite `key` in every row of `db` according to `changes`.
/// Values without an entry are left untouched.
pub fn update_ids(db: &mut Database, changes: &BTreeMap<i64, i64>, key: ForeignKey) {
    if changes.is_empty() {
        return;
    }
    match key {
        ForeignKey::BookmarkLocation => remap(&mut db.bookmark, changes, |r| &mut r.location_id),
        ForeignKey::BookmarkPublicationLocation => {
            remap(&mut db.bookmark, changes, |r| &mut r.publication_location_id)
        }
        ForeignKey::InputFieldLocation => {
            remap(&mut db.input_field, changes, |r| &mut r.location_id)
        }
        ForeignKey::NoteLocation => remap_nullable(&mut db.note, changes, |r| &mut r.location_id),
        ForeignKey::NoteUserMark => remap_nullable(&mut db.note, changes, |r| &mut r.user_mark_id),
        ForeignKey::TagMapLocation => {
            remap_nullable(&mut db.tag_map, changes, |r| &mut r.location_id)
        }
        ForeignKey::TagMapNote => remap_nullable(&mut db.tag_map, changes, |r| &mut r.note_id),
        ForeignKey::TagMapTag => remap(&mut db.tag_map, changes, |r| &mut r.tag_id),
        ForeignKey::UserMarkLocation => remap(&mut db.user_mark, changes, |r| &mut r.location_id),
    }
}

impl IdChanges {
    /// Apply the left changes to `left` and the right changes to `right`,
    /// for every column in `keys`.
    pub fn apply(&self, left: &mut Database, right: &mut Database, keys: &[ForeignKey]) {
        for &key in keys {
            update_ids(left, &self.left, key);
            update_ids(right, &self.right, key);
        }
    }
}

fn remap<T>(rows: &mut [Option<T>], changes: &BTreeMap<i64, i64>, field: fn(&mut T) -> &mut i64) {
    for row in rows.iter_mut().flatten() {
        let value = field(row);
        if let Some(&new) = changes.get(&*value) {
            *value = new;
        }
    }
}

fn remap_nullable<T>(
    rows: &mut [Option<T>],
    changes: &BTreeMap<i64, i64>,
    field: fn(&mut T) -> &mut Option<i64>,
) {
    for row in rows.iter_mut().flatten() {
        if let Some(value) = field(row).as_mut() {
            if let Some(&new) = changes.get(&*value) {
                *value = new;
            }
        }
    }
}
