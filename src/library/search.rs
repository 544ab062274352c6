//! Relevance-ranked search over stored papers.
//!
//! A query matches case-insensitively as a substring of each field. Every
//! matching field adds its weight to the paper's score:
//!
//! | Field    | Weight |
//! |----------|--------|
//! | title    | 10, plus 5 when the query is a whole word |
//! | authors  | 7 |
//! | abstract | 5 |
//! | journal  | 4 |
//! | tags     | 4 |
//! | notes    | 2 |
//! | DOI      | 1 |

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

use crate::models::PaperRecord;
use crate::storage::CollectionStore;

const TITLE_WEIGHT: u32 = 10;
const TITLE_WHOLE_WORD_BONUS: u32 = 5;
const AUTHORS_WEIGHT: u32 = 7;
const ABSTRACT_WEIGHT: u32 = 5;
const JOURNAL_WEIGHT: u32 = 4;
const TAGS_WEIGHT: u32 = 4;
const NOTES_WEIGHT: u32 = 2;
const DOI_WEIGHT: u32 = 1;

const MAX_SUGGESTIONS: usize = 10;

/// Narrowing applied after the text query. Unset fields do not filter.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchFilters {
    pub year: Option<i32>,
    pub tag: Option<String>,
    pub journal: Option<String>,
    pub work_type: Option<String>,
    /// Inclusive lower bound; papers without a year are excluded
    pub year_from: Option<i32>,
    /// Inclusive upper bound; papers without a year are excluded
    pub year_to: Option<i32>,
    #[serde(default)]
    pub has_abstract: bool,
    #[serde(default)]
    pub has_notes: bool,
}

impl SearchFilters {
    pub fn matches(&self, paper: &PaperRecord) -> bool {
        let year = paper.year();

        if self.year.is_some() && year != self.year {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !paper.tags.contains(tag) {
                return false;
            }
        }
        if let Some(journal) = &self.journal {
            if paper.journal() != Some(journal.as_str()) {
                return false;
            }
        }
        if let Some(work_type) = &self.work_type {
            if &paper.work_type != work_type {
                return false;
            }
        }
        if self.year_from.is_some() || self.year_to.is_some() {
            let Some(year) = year else {
                return false;
            };
            if self.year_from.is_some_and(|from| year < from)
                || self.year_to.is_some_and(|to| year > to)
            {
                return false;
            }
        }
        if self.has_abstract && paper.r#abstract.trim().is_empty() {
            return false;
        }
        if self.has_notes && paper.notes.trim().is_empty() {
            return false;
        }
        true
    }
}

/// A search hit
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredPaper<'a> {
    pub paper: &'a PaperRecord,
    /// Zero when no text query was given
    pub score: u32,
}

/// Distinct values present in the collection, for building filter menus
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FilterOptions {
    /// Newest first
    pub years: Vec<i32>,
    pub journals: Vec<String>,
    pub types: Vec<String>,
    pub tags: Vec<String>,
}

/// Read-only search over a store
pub struct SearchEngine<'a, S: CollectionStore + ?Sized> {
    store: &'a S,
}

impl<'a, S: CollectionStore + ?Sized> SearchEngine<'a, S> {
    pub fn new(store: &'a S) -> Self {
        Self { store }
    }

    /// Search every paper, best matches first
    pub fn search(&self, query: &str, filters: &SearchFilters) -> Vec<ScoredPaper<'a>> {
        rank(self.store.all_papers(), query, filters)
    }

    /// Search the papers of one project
    pub fn search_in_project(
        &self,
        project_id: &str,
        query: &str,
        filters: &SearchFilters,
    ) -> Vec<ScoredPaper<'a>> {
        rank(self.store.papers_in_project(project_id), query, filters)
    }

    /// Words from titles and author names (longer than two characters), and
    /// tags, that start with `partial`. Needs at least two characters.
    pub fn search_suggestions(&self, partial: &str) -> Vec<String> {
        let partial = partial.to_lowercase();
        if partial.chars().count() < 2 {
            return Vec::new();
        }

        let mut suggestions = BTreeSet::new();
        for paper in self.store.all_papers() {
            let words = paper
                .title
                .split_whitespace()
                .chain(paper.author_names().iter().flat_map(|n| n.split_whitespace()))
                .map(str::to_lowercase)
                .filter(|w| w.chars().count() > 2 && w.starts_with(&partial))
                .collect::<Vec<_>>();
            suggestions.extend(words);

            suggestions.extend(
                paper
                    .tags
                    .iter()
                    .map(|t| t.to_lowercase())
                    .filter(|t| t.starts_with(&partial)),
            );
        }

        suggestions.into_iter().take(MAX_SUGGESTIONS).collect()
    }

    pub fn filter_options(&self) -> FilterOptions {
        let papers = self.store.all_papers();

        let years: BTreeSet<i32> = papers.iter().filter_map(|p| p.year()).collect();
        let journals: BTreeSet<&str> = papers
            .iter()
            .filter_map(|p| p.journal())
            .filter(|j| !j.is_empty())
            .collect();
        let types: BTreeSet<&str> = papers
            .iter()
            .map(|p| {
                if p.work_type.is_empty() {
                    "unknown"
                } else {
                    p.work_type.as_str()
                }
            })
            .collect();

        FilterOptions {
            years: years.into_iter().rev().collect(),
            journals: journals.into_iter().map(String::from).collect(),
            types: types.into_iter().map(String::from).collect(),
            tags: self.store.all_tags(),
        }
    }
}

fn rank<'a>(
    papers: Vec<&'a PaperRecord>,
    query: &str,
    filters: &SearchFilters,
) -> Vec<ScoredPaper<'a>> {
    let query = query.trim().to_lowercase();
    let whole_word = whole_word_pattern(&query);

    let mut hits: Vec<ScoredPaper<'a>> = papers
        .into_iter()
        .filter_map(|paper| {
            let score = if query.is_empty() {
                0
            } else {
                match relevance_score(paper, &query, whole_word.as_ref()) {
                    0 => return None,
                    score => score,
                }
            };
            Some(ScoredPaper { paper, score })
        })
        .filter(|hit| filters.matches(hit.paper))
        .collect();

    // stable: equal scores keep store order
    hits.sort_by(|a, b| b.score.cmp(&a.score));
    tracing::debug!("Search {:?} matched {} papers", query, hits.len());
    hits
}

fn whole_word_pattern(query: &str) -> Option<Regex> {
    if query.is_empty() {
        return None;
    }
    Regex::new(&format!(r"(?i)\b{}\b", regex::escape(query))).ok()
}

/// Weighted field matches of an already lower-cased query
fn relevance_score(paper: &PaperRecord, query: &str, whole_word: Option<&Regex>) -> u32 {
    let contains = |field: &str| field.to_lowercase().contains(query);
    let mut score = 0;

    if contains(&paper.title) {
        score += TITLE_WEIGHT;
        if whole_word.is_some_and(|re| re.is_match(&paper.title)) {
            score += TITLE_WHOLE_WORD_BONUS;
        }
    }
    if contains(&paper.author_names().join(" ")) {
        score += AUTHORS_WEIGHT;
    }
    if contains(&paper.r#abstract) {
        score += ABSTRACT_WEIGHT;
    }
    if contains(paper.journal().unwrap_or_default()) {
        score += JOURNAL_WEIGHT;
    }
    if contains(&paper.tags.join(" ")) {
        score += TAGS_WEIGHT;
    }
    if contains(&paper.notes) {
        score += NOTES_WEIGHT;
    }
    if contains(&paper.doi) {
        score += DOI_WEIGHT;
    }
    score
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Author, DateParts, PaperBuilder, Project};
    use crate::storage::MemoryStore;

    fn sample_store() -> MemoryStore {
        let mut store = MemoryStore::new();
        let papers = vec![
            PaperBuilder::new("10.1038/nature12373")
                .doi("10.1038/nature12373")
                .title("Nanometre-scale thermometry in a living cell")
                .author(Author::from_parts(Some("G.".into()), Some("Kucsko".into()), None).unwrap())
                .container_title(vec!["Nature".to_string()])
                .published_print(DateParts::new(2013, Some(8), None))
                .work_type("journal-article")
                .abstract_text("Sensitive probing of temperature variations on nanometre scales.")
                .tags(["quantum sensing", "thermometry"])
                .build(),
            PaperBuilder::new("10.1126/science.1058040")
                .doi("10.1126/science.1058040")
                .title("Thermal conductance of cells")
                .container_title(vec!["Science".to_string()])
                .published_online(DateParts::new(2001, None, None))
                .work_type("journal-article")
                .notes("cell biology background reading")
                .build(),
            PaperBuilder::new("10.1000/book")
                .doi("10.1000/book")
                .title("A history of measurement")
                .work_type("book")
                .build(),
        ];
        for paper in papers {
            store.add_paper(paper).unwrap();
        }
        store
    }

    fn ids(hits: &[ScoredPaper<'_>]) -> Vec<String> {
        hits.iter().map(|h| h.paper.id.clone()).collect()
    }

    #[test]
    fn test_relevance_scoring() {
        let store = sample_store();
        let nature = store.get_paper("10.1038/nature12373").unwrap();

        let score = |q: &str| relevance_score(nature, q, whole_word_pattern(q).as_ref());
        assert_eq!(score("thermometry"), 10 + 5 + 4);
        assert_eq!(score("thermo"), 10 + 4);
        assert_eq!(score("kucsko"), 7);
        assert_eq!(score("nature"), 4 + 1);
        assert_eq!(score("absent"), 0);
    }

    #[test]
    fn test_search_orders_by_score() {
        let store = sample_store();
        let engine = SearchEngine::new(&store);

        let hits = engine.search("CELL", &SearchFilters::default());
        // living cell: title + whole word; cells: title only, plus notes
        assert_eq!(ids(&hits), vec!["10.1038/nature12373", "10.1126/science.1058040"]);
        assert_eq!(hits[0].score, 15);
        assert_eq!(hits[1].score, 12);
    }

    #[test]
    fn test_empty_query_returns_everything() {
        let store = sample_store();
        let hits = SearchEngine::new(&store).search("", &SearchFilters::default());
        assert_eq!(hits.len(), 3);
        assert!(hits.iter().all(|h| h.score == 0));
    }

    #[test]
    fn test_filters() {
        let store = sample_store();
        let engine = SearchEngine::new(&store);

        let by_year = SearchFilters {
            year: Some(2001),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&engine.search("", &by_year)), vec!["10.1126/science.1058040"]);

        let range = SearchFilters {
            year_from: Some(2010),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&engine.search("", &range)), vec!["10.1038/nature12373"]);

        let typed = SearchFilters {
            work_type: Some("book".to_string()),
            ..SearchFilters::default()
        };
        assert_eq!(ids(&engine.search("", &typed)), vec!["10.1000/book"]);

        let with_notes = SearchFilters {
            has_notes: true,
            tag: Some("thermometry".to_string()),
            ..SearchFilters::default()
        };
        assert!(engine.search("", &with_notes).is_empty());

        let journal = SearchFilters {
            journal: Some("Nature".to_string()),
            has_abstract: true,
            ..SearchFilters::default()
        };
        assert_eq!(ids(&engine.search("cell", &journal)), vec!["10.1038/nature12373"]);
    }

    #[test]
    fn test_search_in_project() {
        let mut store = sample_store();
        let project = store.insert_project(Project::new("Books")).unwrap();
        store
            .add_paper_to_project(&project.id, store.get_paper("10.1000/book").unwrap().clone())
            .unwrap();

        let engine = SearchEngine::new(&store);
        let hits = engine.search_in_project(&project.id, "", &SearchFilters::default());
        assert_eq!(ids(&hits), vec!["10.1000/book"]);
        assert!(engine
            .search_in_project(&project.id, "thermal", &SearchFilters::default())
            .is_empty());
    }

    #[test]
    fn test_filter_options() {
        let store = sample_store();
        let options = SearchEngine::new(&store).filter_options();
        assert_eq!(options.years, vec![2013, 2001]);
        assert_eq!(options.journals, vec!["Nature", "Science"]);
        assert_eq!(options.types, vec!["book", "journal-article"]);
        assert_eq!(options.tags, vec!["quantum sensing", "thermometry"]);
    }

    #[test]
    fn test_search_suggestions() {
        let store = sample_store();
        let engine = SearchEngine::new(&store);

        assert!(engine.search_suggestions("t").is_empty());
        assert_eq!(
            engine.search_suggestions("Th"),
            vec!["thermal", "thermometry"]
        );
        assert_eq!(engine.search_suggestions("ku"), vec!["kucsko"]);
        assert_eq!(engine.search_suggestions("quan"), vec!["quantum sensing"]);
    }
}
