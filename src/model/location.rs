use serde::{Deserialize, Serialize};

use super::{key_part, Record};

/// A place in a publication: a bible chapter, a document, or a media track.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Location {
    pub location_id: i64,
    pub book_number: Option<i64>,
    pub chapter_number: Option<i64>,
    pub document_id: Option<i64>,
    pub track: Option<i64>,
    pub issue_tag_number: i64,
    /// Publication symbol, e.g. `nwtsty`.
    pub key_symbol: Option<String>,
    pub meps_language: Option<i64>,
    pub location_type: i64,
    /// Cached display title; not part of the location's identity.
    pub title: Option<String>,
}

impl Location {
    /// True when the location has a non-empty title.
    pub fn has_title(&self) -> bool {
        self.title.as_deref().map_or(false, |t| !t.is_empty())
    }

    /// A plain book/chapter reference without document or track.
    pub fn is_simple(&self) -> bool {
        self.book_number.is_some() && self.document_id.is_none() && self.track.is_none()
    }
}

impl Record for Location {
    fn id(&self) -> i64 {
        self.location_id
    }

    fn set_id(&mut self, id: i64) {
        self.location_id = id;
    }

    fn unique_key(&self) -> String {
        format!(
            "{}_{}_{}_{}_{}_{}_{}_{}",
            key_part(&self.book_number),
            key_part(&self.chapter_number),
            key_part(&self.document_id),
            key_part(&self.track),
            self.issue_tag_number,
            key_part(&self.key_symbol),
            key_part(&self.meps_language),
            self.location_type
        )
    }

    fn equals(&self, other: &Self) -> bool {
        self.book_number == other.book_number
            && self.chapter_number == other.chapter_number
            && self.document_id == other.document_id
            && self.track == other.track
            && self.issue_tag_number == other.issue_tag_number
            && self.key_symbol == other.key_symbol
            && self.meps_language == other.meps_language
            && self.location_type == other.location_type
            && self.title == other.title
    }
}
