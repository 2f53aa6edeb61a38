//! TagMap merge.
//!
//! Positions are scoped per tag, so rows are grouped by tag, de-duplicated,
//! and renumbered group by group. Twins are exact duplicates by
//! construction, so this merge has no conflicts.

use std::collections::{BTreeMap, HashSet};
use tracing::debug;

use crate::model::{Record, Table, TagMap};

/// Merge two TagMap tables whose foreign keys have already been updated.
///
/// Within a tag the relative order of both sides is preserved: rows are
/// sorted by position, then by original id, left before right.
pub fn merge_tag_maps(left: &[Option<TagMap>], right: &[Option<TagMap>]) -> Table<TagMap> {
    let mut groups: BTreeMap<i64, Vec<TagMap>> = BTreeMap::new();
    for row in left.iter().chain(right).flatten() {
        groups.entry(row.tag_id).or_default().push(row.clone());
    }

    let mut result: Table<TagMap> = vec![None];
    for (tag_id, mut rows) in groups {
        let mut seen = HashSet::new();
        rows.retain(|row| seen.insert(row.unique_key()));
        rows.sort_by_key(|row| (row.position, row.tag_map_id));

        debug!(tag_id, rows = rows.len(), "renumbering tag positions");
        for (position, mut row) in rows.into_iter().enumerate() {
            row.position = position as i64;
            row.tag_map_id = result.len() as i64;
            result.push(Some(row));
        }
    }

    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::verify_table;

    fn note_tag(id: i64, tag_id: i64, note_id: i64, position: i64) -> TagMap {
        TagMap {
            tag_map_id: id,
            playlist_item_id: None,
            location_id: None,
            note_id: Some(note_id),
            tag_id,
            position,
        }
    }

    #[test]
    fn test_positions_are_scoped_per_tag() {
        let left = vec![None, Some(note_tag(1, 4, 1, 0))];
        let right = vec![None, Some(note_tag(1, 4, 2, 0))];

        let merged = merge_tag_maps(&left, &right);

        assert_eq!(merged.len(), 3);
        let first = merged[1].as_ref().unwrap();
        let second = merged[2].as_ref().unwrap();
        assert_eq!((first.note_id, first.position), (Some(1), 0));
        assert_eq!((second.note_id, second.position), (Some(2), 1));
    }

    #[test]
    fn test_duplicates_are_dropped() {
        let left = vec![None, Some(note_tag(1, 4, 1, 0)), Some(note_tag(2, 4, 2, 1))];
        let right = vec![None, Some(note_tag(1, 4, 2, 0))];

        let merged = merge_tag_maps(&left, &right);

        assert_eq!(merged.iter().flatten().count(), 2);
        assert!(verify_table("TagMap", &merged).is_ok());
    }

    #[test]
    fn test_groups_keep_relative_order() {
        let left = vec![
            None,
            Some(note_tag(1, 2, 1, 5)),
            Some(note_tag(2, 1, 3, 0)),
            Some(note_tag(3, 2, 2, 1)),
        ];
        let right = vec![None, Some(note_tag(1, 2, 9, 3))];

        let merged = merge_tag_maps(&left, &right);
        let rows: Vec<_> = merged
            .iter()
            .flatten()
            .map(|r| (r.tag_map_id, r.tag_id, r.note_id, r.position))
            .collect();

        assert_eq!(
            rows,
            vec![
                (1, 1, Some(3), 0),
                (2, 2, Some(2), 0),
                (3, 2, Some(9), 1),
                (4, 2, Some(1), 2),
            ]
        );
    }
}
