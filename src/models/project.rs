//! Projects: named collections that reference papers by id.

use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A user-defined collection of papers.
///
/// Papers are referenced, not embedded; the same paper may appear in any
/// number of projects.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Project {
    pub id: String,

    #[serde(default = "default_project_name")]
    pub name: String,

    #[serde(default = "now_rfc3339")]
    pub created: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,

    /// Paper ids, in insertion order
    #[serde(default)]
    pub papers: Vec<String>,
}

fn default_project_name() -> String {
    "Unnamed Project".to_string()
}

pub(crate) fn now_rfc3339() -> String {
    Utc::now().to_rfc3339()
}

impl Project {
    pub fn new(name: impl Into<String>) -> Self {
        let now = now_rfc3339();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            created: now.clone(),
            modified: Some(now),
            papers: Vec::new(),
        }
    }

    pub fn contains(&self, paper_id: &str) -> bool {
        self.papers.iter().any(|p| p == paper_id)
    }

    /// Add a paper reference. Returns false if it was already present.
    pub fn add_paper(&mut self, paper_id: &str) -> bool {
        if self.contains(paper_id) {
            return false;
        }
        self.papers.push(paper_id.to_string());
        self.touch();
        true
    }

    /// Remove a paper reference. Returns false if it was not present.
    pub fn remove_paper(&mut self, paper_id: &str) -> bool {
        let before = self.papers.len();
        self.papers.retain(|p| p != paper_id);
        let removed = self.papers.len() != before;
        if removed {
            self.touch();
        }
        removed
    }

    pub fn touch(&mut self) {
        self.modified = Some(now_rfc3339());
    }
}

/// Aggregate counts over the papers of one project
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectStats {
    pub total_papers: usize,
    pub years: BTreeMap<i32, usize>,
    pub journals: BTreeMap<String, usize>,
    pub types: BTreeMap<String, usize>,
    pub created: String,
    pub modified: Option<String>,
}
