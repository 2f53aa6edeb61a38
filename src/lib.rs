//! jwlmerge Core Library
//!
//! Cross-platform merge engine for JW Library user data, including:
//! - **merge**: key-based duplicate detection, conflict answers, id renumbering,
//!   tag positions and overlapping highlights
//! - **prepare**: bible edition migration, duplicate-location cleanup and the
//!   post-merge duplicate-highlight check
//! - **database_merge**: merges whole databases table by table
//!
//! This library accepts data as JSON and returns results as JSON.
//! Each platform reads the backup archive and its SQLite database itself
//! and calls this library for the merge logic.
//!
//! # Example (conceptual)
//! ```ignore
//! let left = read_user_data(left_backup);
//! let right = read_user_data(right_backup);
//! let mut request = MergeInput { left, right, options, solutions };
//! loop {
//!     let output = merge_databases(request.clone())?;
//!     if output.success {
//!         break write_user_data(output.database);
//!     }
//!     request.solutions = ask_user(output.conflicts, output.solutions);
//! }
//! ```

pub mod database_merge;
pub mod error;
pub mod merge;
pub mod model;
pub mod prepare;

pub use database_merge::{
    merge_database_tables, merge_databases, merge_databases_json, DatabaseMerge, MergeInput,
    MergeOptions, MergeOutput, MergeSolutions, MergeStats, PendingConflicts,
};
pub use error::{MergeError, MergeResult};
pub use merge::{
    ConflictKey, ConflictSolver, Conflicts, IdChanges, MergeConflict, MergeOutcome, MergeSide,
    MergeSolution, Solutions,
};
pub use model::{Database, Record, Table};
pub use prepare::{prepare_database_post_merge, prepare_databases_pre_merge, PrepareReport};

/// Version of this library.
pub fn get_core_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}

// WASM bindings
#[cfg(feature = "wasm")]
pub mod wasm;

#[cfg(feature = "wasm")]
pub use wasm::*;

// C FFI exports for .NET P/Invoke
#[cfg(feature = "ffi")]
pub mod ffi;

// UniFFI bindings for Swift/Kotlin
#[cfg(feature = "uniffi")]
pub mod uniffi_api;

#[cfg(feature = "uniffi")]
pub use uniffi_api::*;

// UniFFI scaffolding - generates the FFI glue code
#[cfg(feature = "uniffi")]
uniffi::setup_scaffolding!();
