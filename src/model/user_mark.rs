use serde::{Deserialize, Serialize};

use super::Record;

/// A coloured highlight placed on a location. Its spans are [`super::BlockRange`] rows.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct UserMark {
    pub user_mark_id: i64,
    pub color_index: i64,
    pub location_id: i64,
    pub style_index: i64,
    /// Stable across devices; survives renumbering.
    pub user_mark_guid: String,
    pub version: i64,
}

impl Record for UserMark {
    fn id(&self) -> i64 {
        self.user_mark_id
    }

    fn set_id(&mut self, id: i64) {
        self.user_mark_id = id;
    }

    fn unique_key(&self) -> String {
        self.user_mark_guid.clone()
    }

    fn equals(&self, other: &Self) -> bool {
        self.color_index == other.color_index
            && self.location_id == other.location_id
            && self.style_index == other.style_index
            && self.user_mark_guid == other.user_mark_guid
            && self.version == other.version
    }
}
