//! # notabene-core
//!
//! Core types, traits, and query logic for notabene.
//!
//! This crate provides the domain models, the error taxonomy, the repository
//! traits that storage backends implement, and the storage-independent parts
//! of listing: note list parameters, task bucketing, task ordering and task
//! statistics.

pub mod error;
pub mod models;
pub mod notes_query;
pub mod sort;
pub mod tasks;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use notes_query::{NoteListQuery, NoteSortField};
pub use sort::{cmp_case_insensitive, cmp_nulls_last, SortOrder};
pub use tasks::{bucket, compare_tasks, TaskBucket, TaskFilter, TaskListQuery, TaskSortField};
pub use traits::*;
