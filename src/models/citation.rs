//! Citation styles served by DOI content negotiation.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A citation style that the DOI resolver can render.
///
/// Each style maps to a fixed `Accept` header value. The declaration order is
/// the order in which styles are fetched and stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CitationStyle {
    #[serde(rename = "APA")]
    Apa,
    #[serde(rename = "IEEE")]
    Ieee,
    Nature,
    Science,
    Cell,
    #[serde(rename = "PNAS")]
    Pnas,
    #[serde(rename = "PLoS")]
    Plos,
    #[serde(rename = "MLA")]
    Mla,
    Chicago,
    Harvard,
    Vancouver,
    #[serde(rename = "BibTeX")]
    Bibtex,
    #[serde(rename = "RIS")]
    Ris,
    #[serde(rename = "JSON")]
    Json,
}

impl CitationStyle {
    /// Every supported style, in fetch order.
    pub const ALL: [CitationStyle; 14] = [
        CitationStyle::Apa,
        CitationStyle::Ieee,
        CitationStyle::Nature,
        CitationStyle::Science,
        CitationStyle::Cell,
        CitationStyle::Pnas,
        CitationStyle::Plos,
        CitationStyle::Mla,
        CitationStyle::Chicago,
        CitationStyle::Harvard,
        CitationStyle::Vancouver,
        CitationStyle::Bibtex,
        CitationStyle::Ris,
        CitationStyle::Json,
    ];

    /// The style key used in stored records ("APA", "BibTeX", ...)
    pub fn key(&self) -> &'static str {
        match self {
            CitationStyle::Apa => "APA",
            CitationStyle::Ieee => "IEEE",
            CitationStyle::Nature => "Nature",
            CitationStyle::Science => "Science",
            CitationStyle::Cell => "Cell",
            CitationStyle::Pnas => "PNAS",
            CitationStyle::Plos => "PLoS",
            CitationStyle::Mla => "MLA",
            CitationStyle::Chicago => "Chicago",
            CitationStyle::Harvard => "Harvard",
            CitationStyle::Vancouver => "Vancouver",
            CitationStyle::Bibtex => "BibTeX",
            CitationStyle::Ris => "RIS",
            CitationStyle::Json => "JSON",
        }
    }

    /// Human-readable name
    pub fn display_name(&self) -> &'static str {
        match self {
            CitationStyle::Apa => "APA Style",
            CitationStyle::Ieee => "IEEE Style",
            CitationStyle::Nature => "Nature Style",
            CitationStyle::Science => "Science Style",
            CitationStyle::Cell => "Cell Style",
            CitationStyle::Pnas => "PNAS Style",
            CitationStyle::Plos => "PLoS Style",
            CitationStyle::Mla => "MLA Style",
            CitationStyle::Chicago => "Chicago Style",
            CitationStyle::Harvard => "Harvard Style",
            CitationStyle::Vancouver => "Vancouver Style",
            CitationStyle::Bibtex => "BibTeX",
            CitationStyle::Ris => "RIS (EndNote/Mendeley)",
            CitationStyle::Json => "CSL-JSON",
        }
    }

    /// The `Accept` header sent to the DOI resolver for this style
    pub fn accept_header(&self) -> &'static str {
        match self {
            CitationStyle::Apa => "text/x-bibliography; style=apa; locale=en-US",
            CitationStyle::Ieee => "text/x-bibliography; style=ieee; locale=en-US",
            CitationStyle::Nature => "text/x-bibliography; style=nature; locale=en-US",
            CitationStyle::Science => "text/x-bibliography; style=science; locale=en-US",
            CitationStyle::Cell => "text/x-bibliography; style=cell; locale=en-US",
            CitationStyle::Pnas => "text/x-bibliography; style=pnas; locale=en-US",
            CitationStyle::Plos => "text/x-bibliography; style=plos; locale=en-US",
            CitationStyle::Mla => {
                "text/x-bibliography; style=modern-language-association; locale=en-US"
            }
            CitationStyle::Chicago => {
                "text/x-bibliography; style=chicago-author-date; locale=en-US"
            }
            CitationStyle::Harvard => {
                "text/x-bibliography; style=harvard-cite-them-right; locale=en-US"
            }
            CitationStyle::Vancouver => "text/x-bibliography; style=vancouver; locale=en-US",
            CitationStyle::Bibtex => "application/x-bibtex",
            CitationStyle::Ris => "application/x-research-info-systems",
            CitationStyle::Json => "application/vnd.citationstyles.csl+json",
        }
    }

    /// Look up a style by its key
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|style| style.key() == key)
    }
}

impl fmt::Display for CitationStyle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for CitationStyle {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_key(s).ok_or_else(|| format!("Unsupported citation format: {}", s))
    }
}
