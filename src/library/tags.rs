//! Tags across the whole collection.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use super::LibraryError;
use crate::models::{normalize_tag, now_rfc3339, PaperRecord};
use crate::storage::{CollectionStore, PaperUpdate};

/// Phrases that become tag suggestions when they occur in a paper's text
const SUGGESTION_KEYWORDS: &[&str] = &[
    "machine learning",
    "deep learning",
    "neural network",
    "artificial intelligence",
    "computer vision",
    "natural language processing",
    "data mining",
    "big data",
    "algorithm",
    "optimization",
    "classification",
    "regression",
    "clustering",
    "statistics",
    "analysis",
    "model",
    "method",
    "approach",
    "framework",
    "system",
    "application",
    "evaluation",
    "performance",
    "comparison",
    "review",
    "survey",
    "study",
    "research",
    "experiment",
    "case study",
];

/// Usage summary over all tags
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TagStatistics {
    pub total_tags: usize,
    pub total_usage: usize,
    /// Rounded to two decimals
    pub average_usage: f64,
    pub most_used: Option<(String, usize)>,
    pub least_used: Option<(String, usize)>,
}

/// Tag operations; bulk operations return the number of papers changed
pub struct TagManager<'a, S: CollectionStore + ?Sized> {
    store: &'a mut S,
}

impl<'a, S: CollectionStore + ?Sized> TagManager<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    pub fn all_tags(&self) -> Vec<String> {
        self.store.all_tags()
    }

    pub fn tag_usage_counts(&self) -> BTreeMap<String, usize> {
        let mut counts = BTreeMap::new();
        for tag in self.store.all_papers().into_iter().flat_map(|p| p.tags.iter()) {
            *counts.entry(tag.clone()).or_default() += 1;
        }
        counts
    }

    /// Most used tags first; ties in alphabetical order
    pub fn popular_tags(&self, limit: usize) -> Vec<String> {
        let mut counts: Vec<(String, usize)> = self.tag_usage_counts().into_iter().collect();
        counts.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));
        counts.into_iter().take(limit).map(|(tag, _)| tag).collect()
    }

    pub fn papers_by_tag(&self, tag: &str) -> Vec<&PaperRecord> {
        self.store
            .all_papers()
            .into_iter()
            .filter(|p| p.tags.iter().any(|t| t == tag))
            .collect()
    }

    pub fn add_tag_to_paper(
        &mut self,
        paper_id: &str,
        tag: &str,
    ) -> Result<PaperRecord, LibraryError> {
        let paper = self
            .store
            .get_paper(paper_id)
            .ok_or(LibraryError::PaperNotFound)?;
        let tag = normalize_tag(tag).ok_or(LibraryError::InvalidTag)?;

        if paper.tags.contains(&tag) {
            return Ok(paper.clone());
        }
        let mut tags = paper.tags.clone();
        tags.push(tag);
        self.update_tags(paper_id, tags)
    }

    pub fn remove_tag_from_paper(
        &mut self,
        paper_id: &str,
        tag: &str,
    ) -> Result<PaperRecord, LibraryError> {
        let paper = self
            .store
            .get_paper(paper_id)
            .ok_or(LibraryError::PaperNotFound)?;

        if !paper.tags.iter().any(|t| t == tag) {
            return Ok(paper.clone());
        }
        let tags: Vec<String> = paper.tags.iter().filter(|t| *t != tag).cloned().collect();
        self.update_tags(paper_id, tags)
    }

    /// Rename `old_tag` on every paper. The new name is normalized; papers
    /// that already carry it keep a single copy.
    pub fn rename_tag(&mut self, old_tag: &str, new_tag: &str) -> Result<usize, LibraryError> {
        if old_tag.is_empty() || new_tag.is_empty() {
            return Err(LibraryError::EmptyTagName);
        }
        let new_tag = normalize_tag(new_tag).ok_or(LibraryError::InvalidNewTagName)?;
        if old_tag == new_tag {
            return Ok(0);
        }

        self.retag(|tags| {
            if !tags.iter().any(|t| t == old_tag) {
                return None;
            }
            let mut renamed: Vec<String> = Vec::with_capacity(tags.len());
            for tag in tags {
                let tag = if tag == old_tag { &new_tag } else { tag };
                if !renamed.contains(tag) {
                    renamed.push(tag.clone());
                }
            }
            Some(renamed)
        })
    }

    pub fn delete_tag(&mut self, tag: &str) -> Result<usize, LibraryError> {
        if tag.is_empty() {
            return Err(LibraryError::EmptyTagName);
        }

        self.retag(|tags| {
            tags.iter()
                .any(|t| t == tag)
                .then(|| tags.iter().filter(|t| *t != tag).cloned().collect())
        })
    }

    /// Replace every tag in `sources` by `target` on the papers carrying any
    /// of them
    pub fn merge_tags<T: AsRef<str>>(
        &mut self,
        sources: &[T],
        target: &str,
    ) -> Result<usize, LibraryError> {
        if sources.is_empty() || target.is_empty() {
            return Err(LibraryError::EmptyTagName);
        }
        let target = normalize_tag(target).ok_or(LibraryError::InvalidNewTagName)?;
        let sources: BTreeSet<&str> = sources.iter().map(|s| s.as_ref()).collect();

        self.retag(|tags| {
            if !tags.iter().any(|t| sources.contains(t.as_str())) {
                return None;
            }
            let mut merged: Vec<String> = tags
                .iter()
                .filter(|t| !sources.contains(t.as_str()))
                .cloned()
                .collect();
            if !merged.contains(&target) {
                merged.push(target.clone());
            }
            Some(merged)
        })
    }

    pub fn tag_statistics(&self) -> TagStatistics {
        let counts = self.tag_usage_counts();
        if counts.is_empty() {
            return TagStatistics::default();
        }

        let total_usage: usize = counts.values().sum();
        let average = total_usage as f64 / counts.len() as f64;

        let most_used = counts.iter().max_by_key(|(_, count)| **count);
        let least_used = counts.iter().min_by_key(|(_, count)| **count);

        TagStatistics {
            total_tags: counts.len(),
            total_usage,
            average_usage: (average * 100.0).round() / 100.0,
            most_used: most_used.map(|(tag, count)| (tag.clone(), *count)),
            least_used: least_used.map(|(tag, count)| (tag.clone(), *count)),
        }
    }

    /// Suggest tags from a paper's title, abstract and journal. A keyword
    /// similar to an existing popular tag is replaced by that tag.
    pub fn suggest_tags(&self, paper: &PaperRecord, limit: usize) -> Vec<String> {
        let text = format!(
            "{} {} {}",
            paper.title,
            paper.r#abstract,
            paper.journal().unwrap_or_default()
        )
        .to_lowercase();

        let popular = self.popular_tags(20);
        let mut suggestions: Vec<String> = Vec::new();
        for keyword in SUGGESTION_KEYWORDS.iter().filter(|k| text.contains(*k)) {
            let suggestion = popular
                .iter()
                .find(|tag| tags_similar(keyword, tag))
                .cloned()
                .unwrap_or_else(|| keyword.to_string());
            if !suggestions.contains(&suggestion) {
                suggestions.push(suggestion);
            }
        }
        suggestions.truncate(limit);
        suggestions
    }

    fn update_tags(
        &mut self,
        paper_id: &str,
        tags: Vec<String>,
    ) -> Result<PaperRecord, LibraryError> {
        self.store
            .update_paper(paper_id, PaperUpdate::tags(tags))?
            .ok_or(LibraryError::PaperNotFound)
    }

    /// Apply `change` to every paper's tags; `None` leaves a paper alone.
    /// Persists once when anything changed.
    fn retag<F>(&mut self, mut change: F) -> Result<usize, LibraryError>
    where
        F: FnMut(&[String]) -> Option<Vec<String>>,
    {
        let mut updated = 0;
        for paper in self.store.data_mut().papers.values_mut() {
            if let Some(tags) = change(&paper.tags) {
                paper.tags = tags;
                paper.modified = Some(now_rfc3339());
                updated += 1;
            }
        }

        if updated > 0 {
            self.store.persist()?;
            tracing::info!("Updated tags on {} papers", updated);
        }
        Ok(updated)
    }
}

/// Containment either way, or more than half of the shorter tag's words shared
fn tags_similar(a: &str, b: &str) -> bool {
    if a.is_empty() || b.is_empty() {
        return false;
    }
    if a.contains(b) || b.contains(a) {
        return true;
    }

    let words_a: BTreeSet<&str> = a.split_whitespace().collect();
    let words_b: BTreeSet<&str> = b.split_whitespace().collect();
    let shorter = words_a.len().min(words_b.len());
    if shorter == 0 {
        return false;
    }
    let overlap = words_a.intersection(&words_b).count();
    overlap as f64 / shorter as f64 > 0.5
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::PaperBuilder;
    use crate::storage::MemoryStore;

    /// `(id, "comma,separated,tags")`
    fn store_with_tags(papers: &[(&str, &str)]) -> MemoryStore {
        let mut store = MemoryStore::new();
        for (id, tags) in papers {
            let tags = tags.split(',').filter(|t| !t.is_empty());
            store
                .add_paper(PaperBuilder::new(*id).tags(tags).build())
                .unwrap();
        }
        store
    }

    #[test]
    fn test_add_and_remove_tag() {
        let mut store = store_with_tags(&[("10.1000/a", "")]);
        let mut tags = TagManager::new(&mut store);

        let paper = tags.add_tag_to_paper("10.1000/a", "  Quantum  Sensing ").unwrap();
        assert_eq!(paper.tags, vec!["quantum sensing"]);
        assert!(paper.modified.is_some());

        assert!(matches!(
            tags.add_tag_to_paper("10.1000/a", "c++"),
            Err(LibraryError::InvalidTag)
        ));
        assert!(matches!(
            tags.add_tag_to_paper("missing", "x"),
            Err(LibraryError::PaperNotFound)
        ));

        let paper = tags.remove_tag_from_paper("10.1000/a", "quantum sensing").unwrap();
        assert!(paper.tags.is_empty());
    }

    #[test]
    fn test_usage_and_popular_tags() {
        let mut store = store_with_tags(&[
            ("10.1000/a", "ml,bio"),
            ("10.1000/b", "ml"),
            ("10.1000/c", "ml,chem,bio"),
        ]);
        let tags = TagManager::new(&mut store);

        let counts = tags.tag_usage_counts();
        assert_eq!(counts.get("ml"), Some(&3));
        assert_eq!(counts.get("chem"), Some(&1));
        assert_eq!(tags.popular_tags(2), vec!["ml", "bio"]);
        assert_eq!(tags.papers_by_tag("bio").len(), 2);

        let stats = tags.tag_statistics();
        assert_eq!(stats.total_tags, 3);
        assert_eq!(stats.total_usage, 6);
        assert_eq!(stats.average_usage, 2.0);
        assert_eq!(stats.most_used, Some(("ml".to_string(), 3)));
        assert_eq!(stats.least_used, Some(("chem".to_string(), 1)));
    }

    #[test]
    fn test_rename_tag_deduplicates() {
        let mut store = store_with_tags(&[
            ("10.1000/a", "ml,machine learning"),
            ("10.1000/b", "ml"),
            ("10.1000/c", "bio"),
        ]);
        let mut tags = TagManager::new(&mut store);

        assert_eq!(tags.rename_tag("ml", "Machine Learning").unwrap(), 2);
        assert_eq!(tags.rename_tag("bio", "bio").unwrap(), 0);
        assert!(matches!(tags.rename_tag("", "x"), Err(LibraryError::EmptyTagName)));
        assert!(matches!(
            tags.rename_tag("bio", "bio/chem"),
            Err(LibraryError::InvalidNewTagName)
        ));
        drop(tags);

        assert_eq!(
            store.get_paper("10.1000/a").unwrap().tags,
            vec!["machine learning"]
        );
    }

    #[test]
    fn test_merge_and_delete_tags() {
        let mut store = store_with_tags(&[
            ("10.1000/a", "nn,dl"),
            ("10.1000/b", "dl,vision"),
            ("10.1000/c", "bio"),
        ]);
        let mut tags = TagManager::new(&mut store);

        assert_eq!(tags.merge_tags(&["nn", "dl"], "deep learning").unwrap(), 2);
        assert_eq!(tags.delete_tag("vision").unwrap(), 1);
        assert_eq!(tags.delete_tag("vision").unwrap(), 0);
        drop(tags);

        assert_eq!(store.get_paper("10.1000/a").unwrap().tags, vec!["deep learning"]);
        assert_eq!(store.get_paper("10.1000/b").unwrap().tags, vec!["deep learning"]);
        assert_eq!(store.get_paper("10.1000/c").unwrap().tags, vec!["bio"]);
    }

    #[test]
    fn test_suggest_tags_prefers_existing_tags() {
        let mut store = store_with_tags(&[("10.1000/a", "deep learning models")]);
        let tags = TagManager::new(&mut store);

        let paper = PaperBuilder::new("10.1000/new")
            .title("A survey of deep learning for protein folding")
            .build();
        let suggestions = tags.suggest_tags(&paper, 5);
        assert_eq!(suggestions, vec!["deep learning models", "survey"]);
    }

    #[test]
    fn test_tags_similar() {
        assert!(tags_similar("neural network", "network"));
        assert!(tags_similar("deep neural models", "deep neural nets"));
        assert!(!tags_similar("biology", "chemistry"));
    }
}
