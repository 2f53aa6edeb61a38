//! Database-wide passes that run around the table merges.
//!
//! Before merging, bible locations of a device that still uses the legacy
//! edition are re-keyed to the study edition when the other device proves
//! the switch happened, and duplicate locations inside each database are
//! collapsed. After merging, a highlight that still exists twice because of
//! the edition switch is reduced to its study-edition copy.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::{debug, info, warn};

use crate::error::{MergeError, MergeResult};
use crate::merge::{update_ids, ForeignKey, MergeSide};
use crate::model::{Database, Location, Record, Table, UserMark};

/// Key symbol of the legacy bible edition.
pub const LEGACY_BIBLE_KEY: &str = "nwt";

/// Key symbol of the study bible edition.
pub const STUDY_BIBLE_KEY: &str = "nwtsty";

/// What the pre-merge pass changed.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrepareReport {
    /// Locations re-keyed from the legacy to the study edition
    pub locations_migrated: u32,
    /// Locations dropped as in-database duplicates, both sides together
    pub duplicate_locations_removed: u32,
}

/// Prepare both databases for merging.
///
/// Runs the edition migration, then collapses duplicate locations on each
/// side and points that side's dependent rows at the survivors.
pub fn prepare_databases_pre_merge(left: &mut Database, right: &mut Database) -> PrepareReport {
    let mut report = PrepareReport {
        locations_migrated: migrate_bible_edition(left, right),
        ..PrepareReport::default()
    };

    for db in [left, right] {
        let before = db.location.iter().flatten().count();
        let (locations, changes) = cleanup_duplicate_locations(&db.location);
        report.duplicate_locations_removed += (before - locations.iter().flatten().count()) as u32;

        db.location = locations;
        for &key in ForeignKey::LOCATION_DEPENDENTS {
            update_ids(db, &changes, key);
        }
    }

    debug!(
        migrated = report.locations_migrated,
        removed = report.duplicate_locations_removed,
        "databases prepared for merge"
    );
    report
}

/// Re-key legacy-edition bible locations on the side that lags behind.
///
/// A side lags in a language when a highlight with the same GUID sits on a
/// legacy-edition location there and on a study-edition location on the
/// other side. Only simple book/chapter locations are rewritten; locations
/// with a document or track cannot be remapped safely.
///
/// Returns the number of rewritten locations.
pub fn migrate_bible_edition(left: &mut Database, right: &mut Database) -> u32 {
    let left_editions = highlight_editions(left);
    let right_editions = highlight_editions(right);

    let mut lagging: BTreeSet<(MergeSide, Option<i64>)> = BTreeSet::new();
    for (guid, (left_key, left_language)) in &left_editions {
        let Some((right_key, right_language)) = right_editions.get(guid) else {
            continue;
        };
        if left_language != right_language {
            continue;
        }
        match (left_key.as_str(), right_key.as_str()) {
            (LEGACY_BIBLE_KEY, STUDY_BIBLE_KEY) => {
                lagging.insert((MergeSide::Left, *left_language));
            }
            (STUDY_BIBLE_KEY, LEGACY_BIBLE_KEY) => {
                lagging.insert((MergeSide::Right, *right_language));
            }
            _ => {}
        }
    }

    let mut migrated = 0;
    for (side, language) in lagging {
        let db = match side {
            MergeSide::Left => &mut *left,
            MergeSide::Right => &mut *right,
        };
        let count = migrate_locations(&mut db.location, language);
        info!(side = ?side, language = ?language, locations = count, "migrating bible edition");
        migrated += count;
    }
    migrated
}

/// Key symbol and language of every highlight's location, by GUID.
fn highlight_editions(db: &Database) -> HashMap<String, (String, Option<i64>)> {
    db.user_mark
        .iter()
        .flatten()
        .filter_map(|mark| {
            let location = location(&db.location, mark.location_id)?;
            let key = location.key_symbol.clone()?;
            Some((mark.user_mark_guid.clone(), (key, location.meps_language)))
        })
        .collect()
}

fn migrate_locations(locations: &mut [Option<Location>], language: Option<i64>) -> u32 {
    let mut count = 0;
    for location in locations.iter_mut().flatten() {
        if location.is_simple()
            && location.meps_language == language
            && location.key_symbol.as_deref() == Some(LEGACY_BIBLE_KEY)
        {
            location.key_symbol = Some(STUDY_BIBLE_KEY.to_string());
            count += 1;
        }
    }
    count
}

fn location(locations: &[Option<Location>], id: i64) -> Option<&Location> {
    usize::try_from(id)
        .ok()
        .and_then(|index| locations.get(index))
        .and_then(Option::as_ref)
}

/// Collapse locations of one database that share a unique key.
///
/// The first duplicate with a title survives, otherwise the first one.
/// Survivors keep their relative order and are renumbered densely. Returns
/// the new table and the old-to-new id map, which covers dropped ids too.
pub fn cleanup_duplicate_locations(
    locations: &[Option<Location>],
) -> (Table<Location>, BTreeMap<i64, i64>) {
    let mut order: Vec<String> = Vec::new();
    let mut groups: HashMap<String, Vec<&Location>> = HashMap::new();
    for location in locations.iter().flatten() {
        let key = location.unique_key();
        let group = groups.entry(key.clone()).or_default();
        if group.is_empty() {
            order.push(key);
        }
        group.push(location);
    }

    let mut table: Table<Location> = vec![None];
    let mut changes = BTreeMap::new();
    for key in &order {
        let group = &groups[key];
        let survivor = group
            .iter()
            .find(|location| location.has_title())
            .unwrap_or(&group[0]);

        let new_id = table.len() as i64;
        for location in group {
            if location.location_id != new_id {
                changes.insert(location.location_id, new_id);
            }
        }
        if group.len() > 1 {
            debug!(key = %key, duplicates = group.len() - 1, "collapsing duplicate locations");
        }

        let mut survivor = (*survivor).clone();
        survivor.set_id(new_id);
        table.push(Some(survivor));
    }

    (table, changes)
}

/// Remove highlights left twice by the edition migration.
///
/// Exactly two highlights may share a GUID when one sits on a legacy-edition
/// location and the other on a study-edition one: the legacy copy and its
/// spans are deleted and notes follow the surviving copy. Any other
/// duplicate fails the merge.
///
/// Returns the number of removed highlights.
pub fn prepare_database_post_merge(db: &mut Database) -> MergeResult<u32> {
    let mut by_guid: BTreeMap<&str, Vec<&UserMark>> = BTreeMap::new();
    for mark in db.user_mark.iter().flatten() {
        by_guid.entry(&mark.user_mark_guid).or_default().push(mark);
    }

    let mut removals: BTreeMap<i64, i64> = BTreeMap::new();
    for (guid, marks) in &by_guid {
        match marks.as_slice() {
            [_] => {}
            [first, second] => {
                let (legacy, survivor) = match (edition(db, first), edition(db, second)) {
                    (Some(LEGACY_BIBLE_KEY), Some(STUDY_BIBLE_KEY)) => (first, second),
                    (Some(STUDY_BIBLE_KEY), Some(LEGACY_BIBLE_KEY)) => (second, first),
                    _ => {
                        return Err(MergeError::DuplicateUserMark {
                            guid: guid.to_string(),
                            count: 2,
                        })
                    }
                };
                warn!(
                    guid = %guid,
                    user_mark_id = legacy.user_mark_id,
                    "removing legacy-edition duplicate highlight"
                );
                removals.insert(legacy.user_mark_id, survivor.user_mark_id);
            }
            _ => {
                return Err(MergeError::DuplicateUserMark {
                    guid: guid.to_string(),
                    count: marks.len(),
                })
            }
        }
    }

    if removals.is_empty() {
        return Ok(0);
    }

    for slot in db.user_mark.iter_mut() {
        if slot.as_ref().map_or(false, |mark| removals.contains_key(&mark.user_mark_id)) {
            *slot = None;
        }
    }
    for slot in db.block_range.iter_mut() {
        if slot.as_ref().map_or(false, |range| removals.contains_key(&range.user_mark_id)) {
            *slot = None;
        }
    }
    update_ids(db, &removals, ForeignKey::NoteUserMark);

    Ok(removals.len() as u32)
}

fn edition<'a>(db: &'a Database, mark: &UserMark) -> Option<&'a str> {
    location(&db.location, mark.location_id)?.key_symbol.as_deref()
}
