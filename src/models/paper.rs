//! Paper record: the canonical normalized unit produced by a conversion.
//!
//! Field names serialize with the CSL/CrossRef spellings (`container-title`,
//! `published-print`, `DOI`, ...) so stored collections stay readable by other
//! CSL-aware tools.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::CitationStyle;

/// One contributor of a work.
///
/// Metadata services describe people with `given`/`family` and organizations
/// with a single literal `name`. Entries that only carry a given name are kept
/// as-is rather than guessed into another shape, and no populated field is
/// dropped.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Author {
    Person {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        given: Option<String>,
        family: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        name: Option<String>,
    },
    Literal {
        name: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        given: Option<String>,
    },
    GivenOnly {
        given: String,
    },
}

impl Author {
    /// Build an author from the loosely-shaped fields a service returned.
    ///
    /// Returns `None` when none of the three fields is populated.
    pub fn from_parts(
        given: Option<String>,
        family: Option<String>,
        name: Option<String>,
    ) -> Option<Self> {
        let given = given.filter(|s| !s.trim().is_empty());
        let family = family.filter(|s| !s.trim().is_empty());
        let name = name.filter(|s| !s.trim().is_empty());

        match (given, family, name) {
            (given, Some(family), name) => Some(Author::Person {
                given,
                family,
                name,
            }),
            (given, None, Some(name)) => Some(Author::Literal { name, given }),
            (Some(given), None, None) => Some(Author::GivenOnly { given }),
            (None, None, None) => None,
        }
    }

    /// Name as it would appear in running text ("Given Family")
    pub fn display_name(&self) -> String {
        match self {
            Author::Person {
                given: Some(given),
                family,
                ..
            } => format!("{} {}", given, family),
            Author::Person {
                given: None,
                family,
                ..
            } => family.clone(),
            Author::Literal { name, .. } => name.clone(),
            Author::GivenOnly { given } => given.clone(),
        }
    }

    pub fn given(&self) -> Option<&str> {
        match self {
            Author::Person { given, .. } | Author::Literal { given, .. } => given.as_deref(),
            Author::GivenOnly { given } => Some(given),
        }
    }

    pub fn family(&self) -> Option<&str> {
        match self {
            Author::Person { family, .. } => Some(family),
            _ => None,
        }
    }

    /// The literal name, when the source gave one
    pub fn name(&self) -> Option<&str> {
        match self {
            Author::Person { name, .. } => name.as_deref(),
            Author::Literal { name, .. } => Some(name),
            Author::GivenOnly { .. } => None,
        }
    }
}

/// Journal or book title(s). Always a sequence; the first entry is the journal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "OneOrMany")]
pub struct ContainerTitle(pub Vec<String>);

impl ContainerTitle {
    pub fn primary(&self) -> Option<&str> {
        self.0.first().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A field that services return either as a scalar or as a list.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl OneOrMany {
    /// First element of a list, or the scalar itself
    pub fn first(self) -> Option<String> {
        match self {
            OneOrMany::One(s) => Some(s),
            OneOrMany::Many(v) => v.into_iter().next(),
        }
    }

    pub fn into_vec(self) -> Vec<String> {
        match self {
            OneOrMany::One(s) if s.trim().is_empty() => Vec::new(),
            OneOrMany::One(s) => vec![s],
            OneOrMany::Many(v) => v,
        }
    }
}

impl From<OneOrMany> for ContainerTitle {
    fn from(value: OneOrMany) -> Self {
        ContainerTitle(value.into_vec())
    }
}

/// CSL date: `{"date-parts": [[year, month?, day?]]}`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateParts {
    #[serde(rename = "date-parts", default)]
    pub date_parts: Vec<Vec<Option<i32>>>,
}

impl DateParts {
    pub fn new(year: i32, month: Option<u32>, day: Option<u32>) -> Self {
        let mut parts = vec![Some(year)];
        if let Some(month) = month {
            parts.push(Some(month as i32));
            if let Some(day) = day {
                parts.push(Some(day as i32));
            }
        }
        Self {
            date_parts: vec![parts],
        }
    }

    /// `date_parts[0][0]`, when present
    pub fn year(&self) -> Option<i32> {
        self.date_parts.first()?.first().copied().flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.year().is_none()
    }
}

/// A resolved paper with metadata, citations in every style, and bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PaperRecord {
    /// DOI when available, otherwise a generated identifier
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub authors: Vec<Author>,

    #[serde(rename = "container-title", default)]
    pub container_title: ContainerTitle,

    #[serde(default)]
    pub publisher: String,

    #[serde(default)]
    pub volume: String,

    #[serde(default)]
    pub issue: String,

    #[serde(default)]
    pub page: String,

    #[serde(rename = "DOI", default)]
    pub doi: String,

    #[serde(rename = "URL", default)]
    pub url: String,

    #[serde(default)]
    pub r#abstract: String,

    #[serde(rename = "type", default)]
    pub work_type: String,

    #[serde(default)]
    pub subject: Vec<String>,

    #[serde(rename = "ISSN", default)]
    pub issn: Vec<String>,

    #[serde(rename = "ISBN", default)]
    pub isbn: Vec<String>,

    #[serde(
        rename = "published-print",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_date"
    )]
    pub published_print: Option<DateParts>,

    #[serde(
        rename = "published-online",
        default,
        skip_serializing_if = "Option::is_none",
        deserialize_with = "deserialize_date"
    )]
    pub published_online: Option<DateParts>,

    /// Empty when resolution failed, otherwise one entry per style
    #[serde(default)]
    pub citations: BTreeMap<CitationStyle, String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub notes: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_date: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_type: Option<String>,
}

/// `{}` and `{"date-parts": [[null]]}` both mean "no date"
fn deserialize_date<'de, D>(deserializer: D) -> Result<Option<DateParts>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value: Option<DateParts> = Option::deserialize(deserializer)?;
    Ok(value.filter(|d| !d.is_empty()))
}

impl PaperRecord {
    /// Create an empty record with the given id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            authors: Vec::new(),
            container_title: ContainerTitle::default(),
            publisher: String::new(),
            volume: String::new(),
            issue: String::new(),
            page: String::new(),
            doi: String::new(),
            url: String::new(),
            r#abstract: String::new(),
            work_type: String::new(),
            subject: Vec::new(),
            issn: Vec::new(),
            isbn: Vec::new(),
            published_print: None,
            published_online: None,
            citations: BTreeMap::new(),
            tags: Vec::new(),
            notes: String::new(),
            added_date: None,
            modified: None,
            error: None,
            error_type: None,
        }
    }

    /// Record standing in for an input that could not be converted.
    ///
    /// The offending input becomes the id so batch output stays aligned with
    /// batch input.
    pub fn error_marker(input: &str, message: &str, error_type: &str) -> Self {
        let id = if input.trim().is_empty() {
            uuid::Uuid::new_v4().to_string()
        } else {
            input.to_string()
        };
        let mut record = Self::new(id);
        record.doi = input.to_string();
        record.title = format!("Error: {}", message);
        record.error = Some(message.to_string());
        record.error_type = Some(error_type.to_string());
        record
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }

    /// Publication year, print date first, then online date
    pub fn year(&self) -> Option<i32> {
        self.published_print
            .as_ref()
            .and_then(DateParts::year)
            .or_else(|| self.published_online.as_ref().and_then(DateParts::year))
    }

    /// The journal (first container title)
    pub fn journal(&self) -> Option<&str> {
        self.container_title.primary()
    }

    /// Author display names, in source order
    pub fn author_names(&self) -> Vec<String> {
        self.authors.iter().map(Author::display_name).collect()
    }

    pub fn citation(&self, style: CitationStyle) -> Option<&str> {
        self.citations.get(&style).map(String::as_str)
    }

    /// Add a tag after normalizing it. Returns false if the tag was invalid or
    /// already present.
    pub fn add_tag(&mut self, tag: &str) -> bool {
        let Some(tag) = normalize_tag(tag) else {
            return false;
        };
        if self.tags.contains(&tag) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag: &str) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t != tag);
        self.tags.len() != before
    }

    /// Replace all tags, normalizing and dropping duplicates and empties
    pub fn set_tags<I, S>(&mut self, tags: I)
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.tags.clear();
        for tag in tags {
            self.add_tag(tag.as_ref());
        }
    }
}

/// Normalize a tag: trimmed, lowercase, single spaces, `[a-z0-9 _-]` only,
/// at most 50 characters. Returns `None` for tags that are empty or invalid.
pub fn normalize_tag(tag: &str) -> Option<String> {
    let normalized = tag
        .trim()
        .to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ");

    if normalized.is_empty() {
        return None;
    }

    if !normalized
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == ' ' || c == '-' || c == '_')
    {
        return None;
    }

    let truncated: String = normalized.chars().take(50).collect();
    let truncated = truncated.trim().to_string();
    if truncated.is_empty() {
        None
    } else {
        Some(truncated)
    }
}

/// Builder for constructing PaperRecord objects
#[derive(Debug, Clone)]
pub struct PaperBuilder {
    paper: PaperRecord,
}

impl PaperBuilder {
    /// Create a new builder with required fields
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            paper: PaperRecord::new(id),
        }
    }

    pub fn title(mut self, title: impl Into<String>) -> Self {
        self.paper.title = title.into();
        self
    }

    /// Append an author
    pub fn author(mut self, author: Author) -> Self {
        self.paper.authors.push(author);
        self
    }

    pub fn authors(mut self, authors: Vec<Author>) -> Self {
        self.paper.authors = authors;
        self
    }

    pub fn container_title(mut self, titles: Vec<String>) -> Self {
        self.paper.container_title = ContainerTitle(titles);
        self
    }

    pub fn publisher(mut self, publisher: impl Into<String>) -> Self {
        self.paper.publisher = publisher.into();
        self
    }

    pub fn volume(mut self, volume: impl Into<String>) -> Self {
        self.paper.volume = volume.into();
        self
    }

    pub fn issue(mut self, issue: impl Into<String>) -> Self {
        self.paper.issue = issue.into();
        self
    }

    pub fn page(mut self, page: impl Into<String>) -> Self {
        self.paper.page = page.into();
        self
    }

    pub fn doi(mut self, doi: impl Into<String>) -> Self {
        self.paper.doi = doi.into();
        self
    }

    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.paper.url = url.into();
        self
    }

    pub fn abstract_text(mut self, abstract_text: impl Into<String>) -> Self {
        self.paper.r#abstract = abstract_text.into();
        self
    }

    pub fn work_type(mut self, work_type: impl Into<String>) -> Self {
        self.paper.work_type = work_type.into();
        self
    }

    pub fn subject(mut self, subject: Vec<String>) -> Self {
        self.paper.subject = subject;
        self
    }

    pub fn issn(mut self, issn: Vec<String>) -> Self {
        self.paper.issn = issn;
        self
    }

    pub fn isbn(mut self, isbn: Vec<String>) -> Self {
        self.paper.isbn = isbn;
        self
    }

    pub fn published_print(mut self, date: DateParts) -> Self {
        self.paper.published_print = Some(date).filter(|d| !d.is_empty());
        self
    }

    pub fn published_online(mut self, date: DateParts) -> Self {
        self.paper.published_online = Some(date).filter(|d| !d.is_empty());
        self
    }

    pub fn citations(mut self, citations: BTreeMap<CitationStyle, String>) -> Self {
        self.paper.citations = citations;
        self
    }

    pub fn tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        self.paper.set_tags(tags);
        self
    }

    pub fn notes(mut self, notes: impl Into<String>) -> Self {
        self.paper.notes = notes.into();
        self
    }

    pub fn added_date(mut self, date: impl Into<String>) -> Self {
        self.paper.added_date = Some(date.into());
        self
    }

    /// Build the PaperRecord
    pub fn build(self) -> PaperRecord {
        self.paper
    }
}
