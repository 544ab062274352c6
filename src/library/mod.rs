//! Library management on top of a [`CollectionStore`].
//!
//! The managers borrow a store for the duration of an operation:
//!
//! - [`ProjectManager`]: create, rename, duplicate, merge, export and import projects
//! - [`TagManager`]: tag usage, renames and merges across all papers
//! - [`SearchEngine`]: relevance-ranked paper search with filters
//!
//! [`CollectionStore`]: crate::storage::CollectionStore

mod projects;
mod search;
mod tags;

pub use projects::{ProjectExport, ProjectManager};
pub use search::{FilterOptions, ScoredPaper, SearchEngine, SearchFilters};
pub use tags::{TagManager, TagStatistics};

use thiserror::Error;

use crate::storage::StoreError;

/// Rejected library operations
#[derive(Error, Debug)]
pub enum LibraryError {
    #[error("Project name cannot be empty")]
    EmptyProjectName,

    #[error("Project '{0}' already exists")]
    DuplicateProject(String),

    #[error("Project not found")]
    ProjectNotFound,

    #[error("One or both projects not found")]
    ProjectsNotFound,

    #[error("Missing required project data")]
    MissingProjectData,

    #[error("Paper not found")]
    PaperNotFound,

    #[error("Invalid tag")]
    InvalidTag,

    #[error("Tag names cannot be empty")]
    EmptyTagName,

    #[error("Invalid new tag name")]
    InvalidNewTagName,

    #[error(transparent)]
    Store(#[from] StoreError),
}
