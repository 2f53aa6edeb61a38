use serde::{Deserialize, Serialize};

use super::Record;

/// Text a user typed into a form field of a publication.
///
/// The table has no id column; rows are identified by location and tag only.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct InputField {
    pub location_id: i64,
    pub text_tag: String,
    pub value: String,
}

impl Record for InputField {
    fn id(&self) -> i64 {
        0
    }

    fn set_id(&mut self, _id: i64) {}

    fn unique_key(&self) -> String {
        format!("{}_{}", self.location_id, self.text_tag)
    }

    fn equals(&self, other: &Self) -> bool {
        self == other
    }
}
