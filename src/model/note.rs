use serde::{Deserialize, Serialize};

use super::Record;

/// A user note, optionally attached to a highlight or a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Note {
    pub note_id: i64,
    pub guid: String,
    pub user_mark_id: Option<i64>,
    pub location_id: Option<i64>,
    pub title: Option<String>,
    pub content: Option<String>,
    pub last_modified: String,
    pub block_type: i64,
    pub block_identifier: Option<i64>,
}

impl Record for Note {
    fn id(&self) -> i64 {
        self.note_id
    }

    fn set_id(&mut self, id: i64) {
        self.note_id = id;
    }

    fn unique_key(&self) -> String {
        self.guid.clone()
    }

    fn equals(&self, other: &Self) -> bool {
        self.guid == other.guid
            && self.user_mark_id == other.user_mark_id
            && self.location_id == other.location_id
            && self.title == other.title
            && self.content == other.content
            && self.last_modified == other.last_modified
            && self.block_type == other.block_type
            && self.block_identifier == other.block_identifier
    }

    fn last_modified(&self) -> Option<&str> {
        Some(self.last_modified.as_str()).filter(|s| !s.is_empty())
    }
}
