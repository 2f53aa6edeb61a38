use serde::{Deserialize, Serialize};

use super::Record;

/// Type of the built-in tag every database ships with.
pub const DEFAULT_TAG_TYPE: i64 = 0;

/// Name of the built-in tag every database ships with.
pub const DEFAULT_TAG_NAME: &str = "Favorite";

/// A user-defined tag (or the built-in favourites list).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Tag {
    pub tag_id: i64,
    pub tag_type: i64,
    pub name: String,
}

impl Tag {
    /// True for the built-in tag that exists in every database.
    pub fn is_default(&self) -> bool {
        self.tag_type == DEFAULT_TAG_TYPE && self.name == DEFAULT_TAG_NAME
    }
}

impl Record for Tag {
    fn id(&self) -> i64 {
        self.tag_id
    }

    fn set_id(&mut self, id: i64) {
        self.tag_id = id;
    }

    fn unique_key(&self) -> String {
        format!("{}_{}", self.tag_type, self.name)
    }

    fn equals(&self, other: &Self) -> bool {
        self.tag_type == other.tag_type && self.name == other.name
    }
}
