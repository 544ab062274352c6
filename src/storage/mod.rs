//! Durable storage of papers and projects.
//!
//! [`CollectionStore`] is the contract the rest of the crate relies on. An
//! implementation only provides access to a [`LibraryData`] snapshot and a
//! way to persist it; every collection operation is a provided method built
//! on those three primitives.
//!
//! - [`MemoryStore`]: keeps everything in memory, for tests and embedding
//! - [`JsonFileStore`]: one JSON document on disk with rolling backups

mod json_file;
mod memory;

pub use json_file::{JsonFileStore, DATABASE_FILE};
pub use memory::MemoryStore;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use thiserror::Error;

use crate::models::{now_rfc3339, Author, CitationStyle, PaperRecord, Project};

/// Storage failures
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Name of the project every fresh collection starts with
pub const DEFAULT_PROJECT_NAME: &str = "My Papers";

const DATA_VERSION: &str = "1.0";

/// The whole persisted collection.
///
/// Missing keys in a stored document fall back to empty values, so older or
/// hand-edited files still load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LibraryData {
    #[serde(default = "default_version")]
    pub version: String,

    #[serde(default = "now_rfc3339")]
    pub created: String,

    #[serde(default = "now_rfc3339")]
    pub last_modified: String,

    #[serde(default)]
    pub projects: Vec<Project>,

    /// Papers keyed by id
    #[serde(default)]
    pub papers: BTreeMap<String, PaperRecord>,
}

fn default_version() -> String {
    DATA_VERSION.to_string()
}

impl LibraryData {
    /// A collection with no projects and no papers
    pub fn empty() -> Self {
        let now = now_rfc3339();
        Self {
            version: default_version(),
            created: now.clone(),
            last_modified: now,
            projects: Vec::new(),
            papers: BTreeMap::new(),
        }
    }
}

impl Default for LibraryData {
    /// An empty collection holding the default project
    fn default() -> Self {
        let mut data = Self::empty();
        data.projects.push(Project::new(DEFAULT_PROJECT_NAME));
        data
    }
}

/// Partial update of a stored paper. `None` fields are left untouched.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PaperUpdate {
    pub title: Option<String>,
    pub authors: Option<Vec<Author>>,
    pub container_title: Option<Vec<String>>,
    pub publisher: Option<String>,
    pub volume: Option<String>,
    pub issue: Option<String>,
    pub page: Option<String>,
    pub url: Option<String>,
    pub r#abstract: Option<String>,
    pub work_type: Option<String>,
    pub citations: Option<BTreeMap<CitationStyle, String>>,
    /// Replaces all tags; entries are normalized
    pub tags: Option<Vec<String>>,
    pub notes: Option<String>,
}

impl PaperUpdate {
    pub fn notes(notes: impl Into<String>) -> Self {
        Self {
            notes: Some(notes.into()),
            ..Self::default()
        }
    }

    pub fn tags<I, S>(tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            tags: Some(tags.into_iter().map(Into::into).collect()),
            ..Self::default()
        }
    }

    pub fn title(title: impl Into<String>) -> Self {
        Self {
            title: Some(title.into()),
            ..Self::default()
        }
    }

    fn apply(self, record: &mut PaperRecord) {
        if let Some(title) = self.title {
            record.title = title;
        }
        if let Some(authors) = self.authors {
            record.authors = authors;
        }
        if let Some(container_title) = self.container_title {
            record.container_title.0 = container_title;
        }
        if let Some(publisher) = self.publisher {
            record.publisher = publisher;
        }
        if let Some(volume) = self.volume {
            record.volume = volume;
        }
        if let Some(issue) = self.issue {
            record.issue = issue;
        }
        if let Some(page) = self.page {
            record.page = page;
        }
        if let Some(url) = self.url {
            record.url = url;
        }
        if let Some(abstract_text) = self.r#abstract {
            record.r#abstract = abstract_text;
        }
        if let Some(work_type) = self.work_type {
            record.work_type = work_type;
        }
        if let Some(citations) = self.citations {
            record.citations = citations;
        }
        if let Some(tags) = self.tags {
            record.set_tags(tags);
        }
        if let Some(notes) = self.notes {
            record.notes = notes;
        }
    }
}

/// Fill in what a stored paper must have: an id, an `added_date`, and
/// normalized tags without duplicates or empties.
pub(crate) fn prepare_for_insert(record: &mut PaperRecord) {
    if record.id.trim().is_empty() {
        record.id = uuid::Uuid::new_v4().to_string();
    }
    if record.added_date.is_none() {
        record.added_date = Some(now_rfc3339());
    }
    let tags = std::mem::take(&mut record.tags);
    record.set_tags(tags);
}

/// Keyed storage for papers and the projects that reference them.
///
/// Every mutating method persists before returning.
pub trait CollectionStore {
    fn data(&self) -> &LibraryData;

    fn data_mut(&mut self) -> &mut LibraryData;

    /// Write the current state to durable storage
    fn persist(&mut self) -> Result<(), StoreError>;

    // ===== Papers =====

    /// Store a paper, replacing any paper with the same id. A missing id is
    /// generated, a missing `added_date` is stamped and tags are normalized.
    fn add_paper(&mut self, mut record: PaperRecord) -> Result<PaperRecord, StoreError> {
        prepare_for_insert(&mut record);

        self.data_mut()
            .papers
            .insert(record.id.clone(), record.clone());
        self.persist()?;
        tracing::info!("Added paper: {}", record.id);
        Ok(record)
    }

    fn get_paper(&self, id: &str) -> Option<&PaperRecord> {
        self.data().papers.get(id)
    }

    /// Apply `update` to a stored paper and stamp `modified`.
    /// Returns `None` when no paper has this id.
    fn update_paper(
        &mut self,
        id: &str,
        update: PaperUpdate,
    ) -> Result<Option<PaperRecord>, StoreError> {
        let Some(record) = self.data_mut().papers.get_mut(id) else {
            return Ok(None);
        };
        update.apply(record);
        record.modified = Some(now_rfc3339());
        let updated = record.clone();

        self.persist()?;
        Ok(Some(updated))
    }

    /// Delete a paper and every project reference to it
    fn delete_paper(&mut self, id: &str) -> Result<bool, StoreError> {
        let data = self.data_mut();
        if data.papers.remove(id).is_none() {
            return Ok(false);
        }
        for project in &mut data.projects {
            project.remove_paper(id);
        }

        self.persist()?;
        tracing::info!("Deleted paper: {}", id);
        Ok(true)
    }

    fn all_papers(&self) -> Vec<&PaperRecord> {
        self.data().papers.values().collect()
    }

    /// Sorted, distinct tags across all papers
    fn all_tags(&self) -> Vec<String> {
        self.data()
            .papers
            .values()
            .flat_map(|p| p.tags.iter().cloned())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect()
    }

    // ===== Projects =====

    fn projects(&self) -> &[Project] {
        &self.data().projects
    }

    fn get_project(&self, id: &str) -> Option<&Project> {
        self.data().projects.iter().find(|p| p.id == id)
    }

    fn insert_project(&mut self, project: Project) -> Result<Project, StoreError> {
        self.data_mut().projects.push(project.clone());
        self.persist()?;
        tracing::info!("Created project: {}", project.name);
        Ok(project)
    }

    /// Apply `change` to a project and stamp `modified`
    fn modify_project(
        &mut self,
        id: &str,
        change: &mut dyn FnMut(&mut Project),
    ) -> Result<Option<Project>, StoreError> {
        let Some(project) = self.data_mut().projects.iter_mut().find(|p| p.id == id) else {
            return Ok(None);
        };
        change(project);
        project.touch();
        let updated = project.clone();

        self.persist()?;
        Ok(Some(updated))
    }

    /// Delete a project. Its papers are deleted too, unless another project
    /// still references them.
    fn delete_project(&mut self, id: &str) -> Result<bool, StoreError> {
        let data = self.data_mut();
        let Some(index) = data.projects.iter().position(|p| p.id == id) else {
            return Ok(false);
        };
        let project = data.projects.remove(index);

        let still_referenced: HashSet<&String> =
            data.projects.iter().flat_map(|p| p.papers.iter()).collect();
        let orphaned: Vec<String> = project
            .papers
            .iter()
            .filter(|paper_id| !still_referenced.contains(paper_id))
            .cloned()
            .collect();
        for paper_id in &orphaned {
            data.papers.remove(paper_id);
        }

        self.persist()?;
        tracing::info!(
            "Deleted project: {} ({} papers removed)",
            project.name,
            orphaned.len()
        );
        Ok(true)
    }

    /// Store a paper and reference it from a project.
    /// Returns `None` when the project does not exist.
    fn add_paper_to_project(
        &mut self,
        project_id: &str,
        record: PaperRecord,
    ) -> Result<Option<PaperRecord>, StoreError> {
        if self.get_project(project_id).is_none() {
            return Ok(None);
        }

        let record = self.add_paper(record)?;
        let added = self
            .data_mut()
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .is_some_and(|p| p.add_paper(&record.id));
        if added {
            self.persist()?;
        }
        Ok(Some(record))
    }

    /// Drop a project's reference to a paper; the paper itself stays
    fn remove_paper_from_project(
        &mut self,
        project_id: &str,
        paper_id: &str,
    ) -> Result<bool, StoreError> {
        let removed = self
            .data_mut()
            .projects
            .iter_mut()
            .find(|p| p.id == project_id)
            .is_some_and(|p| p.remove_paper(paper_id));
        if removed {
            self.persist()?;
        }
        Ok(removed)
    }

    /// Papers referenced by a project, in project order. Dangling ids are skipped.
    fn papers_in_project(&self, project_id: &str) -> Vec<&PaperRecord> {
        let Some(project) = self.get_project(project_id) else {
            return Vec::new();
        };
        project
            .papers
            .iter()
            .filter_map(|id| self.data().papers.get(id))
            .collect()
    }
}
