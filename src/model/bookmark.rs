use serde::{Deserialize, Serialize};

use super::Record;

/// One of the numbered bookmark slots of a publication.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Bookmark {
    pub bookmark_id: i64,
    /// Location the bookmark points to.
    pub location_id: i64,
    /// Location of the publication the slot belongs to.
    pub publication_location_id: i64,
    pub slot: i64,
    pub title: String,
    pub snippet: Option<String>,
    pub block_type: i64,
    pub block_identifier: Option<i64>,
}

impl Record for Bookmark {
    fn id(&self) -> i64 {
        self.bookmark_id
    }

    fn set_id(&mut self, id: i64) {
        self.bookmark_id = id;
    }

    fn unique_key(&self) -> String {
        format!("{}_{}", self.publication_location_id, self.slot)
    }

    fn equals(&self, other: &Self) -> bool {
        self.location_id == other.location_id
            && self.publication_location_id == other.publication_location_id
            && self.slot == other.slot
            && self.title == other.title
            && self.snippet == other.snippet
            && self.block_type == other.block_type
            && self.block_identifier == other.block_identifier
    }
}
