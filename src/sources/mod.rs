//! Bibliographic metadata sources.
//!
//! A [`MetadataSource`] turns a validated DOI into a normalized
//! [`PaperRecord`]. Two sources ship with the crate:
//!
//! - [`CrossRefSource`]: the CrossRef REST works endpoint (primary)
//! - [`CslJsonSource`]: CSL-JSON via DOI content negotiation (fallback)
//!
//! [`MetadataResolver`] chains them: any failure of the primary falls
//! through to the fallback, and only the fallback's failure is reported.
//!
//! Both services describe a work with nearly the same CSL vocabulary, so
//! their payloads share one deserialization type and one normalization path.

mod crossref;
mod csl;
mod resolver;

pub use crossref::CrossRefSource;
pub use csl::CslJsonSource;
pub use resolver::MetadataResolver;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use std::fmt;
use thiserror::Error;

use crate::models::{Author, ContainerTitle, DateParts, OneOrMany, PaperRecord};
use crate::utils::{clean_abstract, TransportError};

/// Default work type when a service omits one
const DEFAULT_WORK_TYPE: &str = "journal-article";

/// A service that can describe a work identified by DOI.
#[async_trait]
pub trait MetadataSource: Send + Sync + fmt::Debug {
    /// Short identifier used in logs ("crossref", "csl-json")
    fn id(&self) -> &str;

    /// Fetch and normalize metadata for `doi`
    async fn fetch(&self, doi: &str) -> Result<PaperRecord, MetadataError>;
}

/// Why metadata could not be obtained
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MetadataErrorKind {
    #[error("Request timed out. Please check your internet connection.")]
    Timeout,

    #[error("Could not connect to DOI service. Please check your internet connection.")]
    ConnectionFailure,

    #[error("DOI not found. Please verify the DOI is correct.")]
    NotFound,

    #[error("DOI service returned error: {status}")]
    ServiceError { status: u16 },

    #[error("DOI service returned invalid data format.")]
    UnexpectedFormat,
}

/// Metadata resolution failure for one DOI
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{kind}")]
pub struct MetadataError {
    pub kind: MetadataErrorKind,
    pub doi: String,
}

impl MetadataError {
    pub fn new(kind: MetadataErrorKind, doi: impl Into<String>) -> Self {
        Self {
            kind,
            doi: doi.into(),
        }
    }

    pub fn unexpected_format(doi: impl Into<String>) -> Self {
        Self::new(MetadataErrorKind::UnexpectedFormat, doi)
    }

    /// Map a transport failure onto the user-facing taxonomy
    pub fn from_transport(doi: impl Into<String>, err: &TransportError) -> Self {
        let kind = match err {
            TransportError::Timeout => MetadataErrorKind::Timeout,
            TransportError::Connection(_) | TransportError::Other(_) => {
                MetadataErrorKind::ConnectionFailure
            }
            TransportError::Status { status: 404 } => MetadataErrorKind::NotFound,
            TransportError::Status { status } => {
                MetadataErrorKind::ServiceError { status: *status }
            }
        };
        Self::new(kind, doi)
    }
}

/// Work description as returned by CrossRef (`message`) or as CSL-JSON.
///
/// Every field is optional; services disagree on which are scalars and which
/// are lists, and on whether numbers are quoted.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct RawWork {
    #[serde(default)]
    title: Option<OneOrMany>,

    #[serde(default)]
    author: Vec<RawAuthor>,

    #[serde(rename = "container-title", default)]
    container_title: Option<OneOrMany>,

    #[serde(default)]
    publisher: Option<Value>,

    #[serde(default)]
    volume: Option<Value>,

    #[serde(default)]
    issue: Option<Value>,

    #[serde(default)]
    page: Option<Value>,

    #[serde(rename = "DOI", default)]
    doi: Option<String>,

    #[serde(rename = "URL", default)]
    url: Option<String>,

    #[serde(default)]
    r#abstract: Option<String>,

    #[serde(rename = "type", default)]
    work_type: Option<String>,

    #[serde(default)]
    subject: Option<OneOrMany>,

    #[serde(rename = "ISSN", default)]
    issn: Option<OneOrMany>,

    #[serde(rename = "ISBN", default)]
    isbn: Option<OneOrMany>,

    #[serde(rename = "published-print", default)]
    published_print: Option<Value>,

    #[serde(rename = "published-online", default)]
    published_online: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct RawAuthor {
    #[serde(default)]
    given: Option<String>,
    #[serde(default)]
    family: Option<String>,
    #[serde(default)]
    name: Option<String>,
}

impl RawWork {
    /// Normalize into a record. `requested_doi` is used when the service
    /// does not echo the DOI back.
    pub(crate) fn into_record(self, requested_doi: &str) -> PaperRecord {
        let doi = self
            .doi
            .filter(|d| !d.trim().is_empty())
            .unwrap_or_else(|| requested_doi.to_string());

        let mut record = PaperRecord::new(doi.clone());
        record.doi = doi;
        record.title = self.title.and_then(OneOrMany::first).unwrap_or_default();
        record.authors = self
            .author
            .into_iter()
            .filter_map(|a| Author::from_parts(a.given, a.family, a.name))
            .collect();
        record.container_title =
            ContainerTitle(self.container_title.map(OneOrMany::into_vec).unwrap_or_default());
        record.publisher = scalar_text(self.publisher);
        record.volume = scalar_text(self.volume);
        record.issue = scalar_text(self.issue);
        record.page = scalar_text(self.page);
        record.url = self.url.unwrap_or_default();
        record.r#abstract = self.r#abstract.as_deref().map(clean_abstract).unwrap_or_default();
        record.work_type = self
            .work_type
            .filter(|t| !t.is_empty())
            .unwrap_or_else(|| DEFAULT_WORK_TYPE.to_string());
        record.subject = self.subject.map(OneOrMany::into_vec).unwrap_or_default();
        record.issn = self.issn.map(OneOrMany::into_vec).unwrap_or_default();
        record.isbn = self.isbn.map(OneOrMany::into_vec).unwrap_or_default();
        record.published_print = self.published_print.as_ref().and_then(date_from_value);
        record.published_online = self.published_online.as_ref().and_then(date_from_value);
        record
    }
}

/// Strings pass through, numbers are rendered, anything else is empty.
fn scalar_text(value: Option<Value>) -> String {
    match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        Some(Value::Array(items)) => items
            .into_iter()
            .next()
            .map(|v| scalar_text(Some(v)))
            .unwrap_or_default(),
        _ => String::new(),
    }
}

/// Read `{"date-parts": [[y, m, d]]}`, tolerating quoted numbers and nulls.
fn date_from_value(value: &Value) -> Option<DateParts> {
    let first = value.get("date-parts")?.as_array()?.first()?.as_array()?;

    let parts: Vec<Option<i32>> = first
        .iter()
        .map(|part| match part {
            Value::Number(n) => n.as_i64().and_then(|n| i32::try_from(n).ok()),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        })
        .collect();

    let date = DateParts {
        date_parts: vec![parts],
    };
    if date.is_empty() {
        None
    } else {
        Some(date)
    }
}

/// Parse a JSON body into `T`, reporting any failure as an unexpected format.
pub(crate) fn parse_json<T: for<'de> Deserialize<'de>>(
    doi: &str,
    body: &str,
) -> Result<T, MetadataError> {
    serde_json::from_str(body).map_err(|e| {
        tracing::debug!("Unparseable metadata for {}: {}", doi, e);
        MetadataError::unexpected_format(doi)
    })
}
