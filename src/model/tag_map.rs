use serde::{Deserialize, Serialize};

use super::{key_part, Record};

/// Attaches a tag to exactly one target at a user-ordered position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TagMap {
    pub tag_map_id: i64,
    pub playlist_item_id: Option<i64>,
    pub location_id: Option<i64>,
    pub note_id: Option<i64>,
    pub tag_id: i64,
    /// Order within the tag, starting at 0.
    pub position: i64,
}

impl Record for TagMap {
    fn id(&self) -> i64 {
        self.tag_map_id
    }

    fn set_id(&mut self, id: i64) {
        self.tag_map_id = id;
    }

    fn unique_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            key_part(&self.playlist_item_id),
            key_part(&self.location_id),
            key_part(&self.note_id),
            self.tag_id
        )
    }

    fn equals(&self, other: &Self) -> bool {
        self.playlist_item_id == other.playlist_item_id
            && self.location_id == other.location_id
            && self.note_id == other.note_id
            && self.tag_id == other.tag_id
            && self.position == other.position
    }
}
