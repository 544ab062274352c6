//! Citation text via DOI content negotiation.
//!
//! Styles are rendered by the DOI resolver, not locally: each
//! [`CitationStyle`] is a fixed `Accept` header sent to
//! `{doi_resolver_base}{doi}`.
//!
//! [`CitationFormatter::format`] never fails. Any per-style problem becomes a
//! short placeholder string in place of the citation, so one unavailable
//! style cannot hold up the others.

use thiserror::Error;

use crate::models::CitationStyle;
use crate::utils::{
    collapse_whitespace, decode_html_entities, repair_mojibake, HttpClient, TransportError,
};

/// RIS records open with a `TY` tag
const RIS_MARKER: &str = "TY  -";

/// Why one style could not be rendered. Only ever surfaced as its message.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CitationFormatError {
    #[error("Unsupported citation format: {0}")]
    UnsupportedStyle(String),

    #[error("Format {0} not supported by publisher")]
    NotAcceptable(CitationStyle),

    #[error("DOI not found")]
    NotFound,

    #[error("Service error (HTTP {0})")]
    Service(u16),

    #[error("Connection error: {0}")]
    Connection(String),
}

impl CitationFormatError {
    /// Failures that may clear up on a later request
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            CitationFormatError::Service(_) | CitationFormatError::Connection(_)
        )
    }

    fn from_transport(style: CitationStyle, err: TransportError) -> Self {
        match err {
            TransportError::Status { status: 406 } => CitationFormatError::NotAcceptable(style),
            TransportError::Status { status: 404 } => CitationFormatError::NotFound,
            TransportError::Status { status } => CitationFormatError::Service(status),
            other => CitationFormatError::Connection(other.to_string()),
        }
    }
}

/// Fetches citation text for a DOI in one style at a time.
#[derive(Debug, Clone)]
pub struct CitationFormatter {
    client: HttpClient,
}

impl CitationFormatter {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }

    /// Citation for `doi` in the style named `style_key` ("APA", "BibTeX", ...).
    ///
    /// Always returns text; failures come back as placeholders.
    pub async fn format(&self, doi: &str, style_key: &str) -> String {
        match CitationStyle::from_key(style_key) {
            Some(style) => self.format_style(doi, style).await,
            None => CitationFormatError::UnsupportedStyle(style_key.to_string()).to_string(),
        }
    }

    /// Citation for `doi` in `style`, or a placeholder
    pub async fn format_style(&self, doi: &str, style: CitationStyle) -> String {
        self.try_format_style(doi, style)
            .await
            .unwrap_or_else(|e| e.to_string())
    }

    /// Cleaned citation for `doi` in `style`, or why it could not be fetched
    pub async fn try_format_style(
        &self,
        doi: &str,
        style: CitationStyle,
    ) -> Result<String, CitationFormatError> {
        match self.fetch(doi, style).await {
            Ok(text) => Ok(clean_citation(&text, style)),
            Err(e) => {
                tracing::warn!("No {} citation for {}: {}", style, doi, e);
                Err(e)
            }
        }
    }

    /// Raw response body for `doi` in `style`
    pub async fn fetch(
        &self,
        doi: &str,
        style: CitationStyle,
    ) -> Result<String, CitationFormatError> {
        let url = format!("{}{}", self.client.doi_resolver_base(), doi);
        self.client
            .get(&url, style.accept_header())
            .await
            .map(|response| response.body)
            .map_err(|e| CitationFormatError::from_transport(style, e))
    }
}

/// Clean up a citation body and check it looks like `style`.
///
/// Entities are decoded, mis-decoded punctuation repaired and whitespace
/// collapsed. BibTeX must start with `@` and RIS with `TY  -`, otherwise the
/// text is replaced by an "Invalid ... format" placeholder.
pub fn clean_citation(text: &str, style: CitationStyle) -> String {
    if text.trim().is_empty() {
        return "Citation not available".to_string();
    }

    let cleaned = collapse_whitespace(&repair_mojibake(&decode_html_entities(text)));

    match style {
        CitationStyle::Bibtex if !cleaned.starts_with('@') => "Invalid BibTeX format".to_string(),
        // whitespace collapse turns the RIS "TY  -" into "TY -"
        CitationStyle::Ris if !is_ris(text) => "Invalid RIS format".to_string(),
        _ => cleaned,
    }
}

fn is_ris(raw: &str) -> bool {
    let trimmed = raw.trim_start();
    trimmed.starts_with(RIS_MARKER) || collapse_whitespace(trimmed).starts_with("TY -")
}
