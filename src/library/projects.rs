//! Project management.

use serde::{Deserialize, Serialize};

use super::LibraryError;
use crate::models::{now_rfc3339, PaperRecord, Project, ProjectStats};
use crate::storage::{prepare_for_insert, CollectionStore};

/// A project with its papers inlined, as written by
/// [`ProjectManager::export_project`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProjectExport {
    pub project: Project,
    pub papers: Vec<PaperRecord>,
    #[serde(default = "now_rfc3339")]
    pub exported: String,
    #[serde(default = "default_export_format")]
    pub format: String,
}

fn default_export_format() -> String {
    "json".to_string()
}

/// Project operations with name validation
pub struct ProjectManager<'a, S: CollectionStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: CollectionStore + ?Sized> ProjectManager<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Create an empty project. Names are trimmed and must be unique,
    /// ignoring case.
    pub fn create_project(&mut self, name: &str) -> Result<Project, LibraryError> {
        let name = self.checked_name(name, None)?;
        Ok(self.store.insert_project(Project::new(name))?)
    }

    pub fn rename_project(&mut self, id: &str, new_name: &str) -> Result<Project, LibraryError> {
        if self.store.get_project(id).is_none() {
            return Err(LibraryError::ProjectNotFound);
        }
        let name = self.checked_name(new_name, Some(id))?;

        self.store
            .modify_project(id, &mut |project: &mut Project| project.name = name.clone())?
            .ok_or(LibraryError::ProjectNotFound)
    }

    /// Delete a project and the papers no other project references
    pub fn delete_project(&mut self, id: &str) -> Result<(), LibraryError> {
        if self.store.delete_project(id)? {
            Ok(())
        } else {
            Err(LibraryError::ProjectNotFound)
        }
    }

    /// Create a new project referencing the same papers.
    /// The name defaults to "{name} (Copy)".
    pub fn duplicate_project(
        &mut self,
        id: &str,
        new_name: Option<&str>,
    ) -> Result<Project, LibraryError> {
        let original = self
            .store
            .get_project(id)
            .cloned()
            .ok_or(LibraryError::ProjectNotFound)?;

        let name = match new_name.filter(|n| !n.trim().is_empty()) {
            Some(name) => name.to_string(),
            None => format!("{} (Copy)", original.name),
        };

        let mut copy = Project::new(self.checked_name(&name, None)?);
        for paper_id in &original.papers {
            copy.add_paper(paper_id);
        }
        Ok(self.store.insert_project(copy)?)
    }

    /// Move every paper of `source_id` into `target_id`, then delete the
    /// source project. Papers survive because the target references them.
    pub fn merge_projects(
        &mut self,
        source_id: &str,
        target_id: &str,
    ) -> Result<Project, LibraryError> {
        let (Some(source), Some(_)) = (
            self.store.get_project(source_id).cloned(),
            self.store.get_project(target_id),
        ) else {
            return Err(LibraryError::ProjectsNotFound);
        };
        if source_id == target_id {
            return Ok(source);
        }

        let target = self
            .store
            .modify_project(target_id, &mut |target: &mut Project| {
                for paper_id in &source.papers {
                    target.add_paper(paper_id);
                }
            })?
            .ok_or(LibraryError::ProjectsNotFound)?;

        self.store.delete_project(source_id)?;
        tracing::info!(
            "Merged project {} into {} ({} papers)",
            source.name,
            target.name,
            source.papers.len()
        );
        Ok(target)
    }

    pub fn export_project(&self, id: &str) -> Result<ProjectExport, LibraryError> {
        let project = self
            .store
            .get_project(id)
            .cloned()
            .ok_or(LibraryError::ProjectNotFound)?;

        Ok(ProjectExport {
            papers: self.store.papers_in_project(id).into_iter().cloned().collect(),
            project,
            exported: now_rfc3339(),
            format: default_export_format(),
        })
    }

    /// Import an export document as a new project under the exported name
    pub fn import_project(&mut self, export: ProjectExport) -> Result<Project, LibraryError> {
        let mut project = Project::new(self.checked_name(&export.project.name, None)?);

        let data = self.store.data_mut();
        for mut paper in export.papers {
            prepare_for_insert(&mut paper);
            project.add_paper(&paper.id);
            data.papers.insert(paper.id.clone(), paper);
        }

        tracing::info!(
            "Imported project {} ({} papers)",
            project.name,
            project.papers.len()
        );
        Ok(self.store.insert_project(project)?)
    }

    /// Import from an untyped JSON document. Both `project` and `papers`
    /// must be present.
    pub fn import_json(&mut self, value: serde_json::Value) -> Result<Project, LibraryError> {
        if value.get("project").is_none() || value.get("papers").is_none() {
            return Err(LibraryError::MissingProjectData);
        }
        let export: ProjectExport =
            serde_json::from_value(value).map_err(|_| LibraryError::MissingProjectData)?;
        self.import_project(export)
    }

    /// Counts by year, journal and work type over a project's papers
    pub fn project_statistics(&self, id: &str) -> Result<ProjectStats, LibraryError> {
        let project = self
            .store
            .get_project(id)
            .ok_or(LibraryError::ProjectNotFound)?;
        let papers = self.store.papers_in_project(id);

        let mut stats = ProjectStats {
            total_papers: papers.len(),
            created: project.created.clone(),
            modified: project.modified.clone(),
            ..ProjectStats::default()
        };
        for paper in papers {
            if let Some(year) = paper.year() {
                *stats.years.entry(year).or_default() += 1;
            }
            if let Some(journal) = paper.journal() {
                *stats.journals.entry(journal.to_string()).or_default() += 1;
            }
            let work_type = if paper.work_type.is_empty() {
                "unknown"
            } else {
                paper.work_type.as_str()
            };
            *stats.types.entry(work_type.to_string()).or_default() += 1;
        }
        Ok(stats)
    }

    /// Projects whose name contains `query`, ignoring case.
    /// An empty query matches every project.
    pub fn search_projects(&self, query: &str) -> Vec<&Project> {
        let query = query.to_lowercase();
        self.store
            .projects()
            .iter()
            .filter(|p| query.is_empty() || p.name.to_lowercase().contains(&query))
            .collect()
    }

    fn checked_name(&self, name: &str, except_id: Option<&str>) -> Result<String, LibraryError> {
        let name = name.trim();
        if name.is_empty() {
            return Err(LibraryError::EmptyProjectName);
        }

        let lowered = name.to_lowercase();
        let taken = self
            .store
            .projects()
            .iter()
            .filter(|p| Some(p.id.as_str()) != except_id)
            .any(|p| p.name.to_lowercase() == lowered);
        if taken {
            return Err(LibraryError::DuplicateProject(name.to_string()));
        }
        Ok(name.to_string())
    }
}
