//! UniFFI API module for Swift and Kotlin bindings.
//!
//! This module exposes the merge via UniFFI for mobile platforms.
//! All functions use JSON strings for input/output to simplify cross-language marshalling.

use crate::error::MergeError;

/// Get the version of the jwlmerge-core library.
#[uniffi::export]
pub fn get_core_version() -> String {
    crate::get_core_version().to_string()
}

/// Merge two user-data databases.
///
/// # Arguments
/// * `input_json` - JSON string with format:
///   ```json
///   {
///     "left": {"Location": [null, {...}], "UserMark": [...], ...},
///     "right": {"Location": [null, {...}], ...},
///     "options": {"note_solver": "chooseNewest", "prepare_databases": true},
///     "solutions": {
///       "bookmark": {"12_0": {"side": "right", "solution": {...}, "discarded": {...}}}
///     }
///   }
///   ```
///
/// # Returns
/// JSON string with format:
///   ```json
///   {
///     "success": false,
///     "database": null,
///     "conflicts": {"table": "Bookmark", "conflicts": {"12_0": {"left": {...}, "right": {...}}}},
///     "solutions": {...},
///     "stats": {"tables_merged": 1, "pending_conflicts": 1, ...}
///   }
///   ```
#[uniffi::export]
pub fn merge_databases_json(input_json: String) -> Result<String, MergeError> {
    crate::database_merge::merge_databases_json(&input_json)
}
