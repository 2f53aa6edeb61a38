use serde::{Deserialize, Serialize};

use super::{key_part, Record};

/// A token interval within one paragraph or verse, owned by a [`super::UserMark`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct BlockRange {
    pub block_range_id: i64,
    pub block_type: i64,
    /// Paragraph or verse number the span belongs to.
    pub identifier: i64,
    pub start_token: Option<i64>,
    pub end_token: Option<i64>,
    pub user_mark_id: i64,
}

impl BlockRange {
    /// Start of the span; a missing token counts as the first token.
    pub fn start(&self) -> i64 {
        self.start_token.unwrap_or(0)
    }

    /// End of the span; a missing token counts as the first token.
    pub fn end(&self) -> i64 {
        self.end_token.unwrap_or(0)
    }

    /// Span content without ownership or id, for comparing span sets.
    pub(crate) fn span(&self) -> (i64, i64, Option<i64>, Option<i64>) {
        (
            self.block_type,
            self.identifier,
            self.start_token,
            self.end_token,
        )
    }
}

impl Record for BlockRange {
    fn id(&self) -> i64 {
        self.block_range_id
    }

    fn set_id(&mut self, id: i64) {
        self.block_range_id = id;
    }

    fn unique_key(&self) -> String {
        format!(
            "{}_{}_{}_{}",
            self.user_mark_id,
            self.identifier,
            key_part(&self.start_token),
            key_part(&self.end_token)
        )
    }

    fn equals(&self, other: &Self) -> bool {
        self.user_mark_id == other.user_mark_id && self.span() == other.span()
    }
}
