//! DOI extraction from free-form input.
//!
//! Accepts bare DOIs, resolver URLs, publisher article URLs, labelled strings
//! (`doi:...`) and arbitrary pasted text containing a DOI somewhere.

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;

use super::validate::{clean_doi, is_valid_doi};

/// No usable DOI could be found in the input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InputError {
    #[error("DOI cannot be empty")]
    Empty,

    #[error("No DOI found in input: {0}")]
    NoDoiFound(String),
}

/// What to do with the capture of a publisher URL pattern
#[derive(Debug, Clone, Copy)]
enum UrlRule {
    /// The capture is already a DOI
    Resolver,
    /// Prepend a publisher-specific DOI prefix to the capture
    Prefixed(&'static str),
    /// Recognized, but the URL shape is too irregular to rebuild a DOI from
    Skip,
}

static URL_PATTERNS: Lazy<Vec<(Regex, UrlRule)>> = Lazy::new(|| {
    [
        (r"(?i)(?:https?://)?(?:dx\.)?doi\.org/(.+)", UrlRule::Resolver),
        (
            r"(?i)(?:https?://)?(?:www\.)?nature\.com/articles/([^/?]+)",
            UrlRule::Prefixed("10.1038/"),
        ),
        (
            r"(?i)(?:https?://)?science\.sciencemag\.org/content/[^/]+/[^/]+/[^/]+/science\.([^/?]+)",
            UrlRule::Prefixed("10.1126/science."),
        ),
        (
            r"(?i)(?:https?://)?www\.cell\.com/[^/]+/fulltext/S\d+-\d+\(\d+\)\d+-\d+",
            UrlRule::Skip,
        ),
        (
            r"(?i)(?:https?://)?www\.pnas\.org/content/\d+/\d+/e(\d+)",
            UrlRule::Prefixed("10.1073/pnas."),
        ),
        // sci-hub style mirrors put the DOI straight after the host
        (r"(?i)(?:https?://)?(?:sci-hub\.[^/]+/)?(.+)", UrlRule::Resolver),
    ]
    .into_iter()
    .map(|(pattern, rule)| (Regex::new(pattern).expect("valid URL regex"), rule))
    .collect()
});

/// Bare grammar, DOI inside a URL, DOI after a (possibly quoted) label
static TEXT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r"(?i)10\.\d{4,}/[^\s\]>,;]+",
        r"(?i)(?:doi\.org/|dx\.doi\.org/)?(10\.\d{4,}/[^\s\]>,;/?]+)",
        r#"(?i)doi[:\s]*["']?(10\.\d{4,}/[^\s\]>,;"']+)["']?"#,
    ]
    .into_iter()
    .map(|pattern| Regex::new(pattern).expect("valid text regex"))
    .collect()
});

const DOI_DOMAINS: [&str; 13] = [
    "doi.org",
    "dx.doi.org",
    "nature.com",
    "sciencemag.org",
    "cell.com",
    "pnas.org",
    "science.org",
    "springer.com",
    "wiley.com",
    "elsevier.com",
    "ieee.org",
    "acm.org",
    "sci-hub",
];

/// Extract a single DOI from arbitrary input.
///
/// Tries, in order: the cleaned input itself, publisher URL patterns, then a
/// scan of the raw text. Returns `None` when nothing validates.
pub fn extract_doi(input: &str) -> Option<String> {
    let input = input.trim();
    if input.is_empty() {
        return None;
    }

    let cleaned = clean_doi(input);
    if is_valid_doi(&cleaned) {
        return Some(cleaned);
    }

    if let Some(doi) = extract_doi_from_url(input) {
        return Some(doi);
    }

    extract_dois_from_text(input).into_iter().next()
}

/// Like [`extract_doi`] but reports why nothing was found
pub fn require_doi(input: &str) -> Result<String, InputError> {
    if input.trim().is_empty() {
        return Err(InputError::Empty);
    }
    extract_doi(input).ok_or_else(|| InputError::NoDoiFound(input.trim().to_string()))
}

/// Rebuild a DOI from a resolver or publisher URL
pub fn extract_doi_from_url(url: &str) -> Option<String> {
    if url.trim().is_empty() {
        return None;
    }

    let decoded = urlencoding::decode(url)
        .map(|s| s.into_owned())
        .unwrap_or_else(|_| url.to_string());

    for (regex, rule) in URL_PATTERNS.iter() {
        let Some(captures) = regex.captures(&decoded) else {
            continue;
        };

        let candidate = match rule {
            UrlRule::Skip => continue,
            UrlRule::Resolver => captures.get(1).map(|m| m.as_str().to_string()),
            UrlRule::Prefixed(prefix) => captures
                .get(1)
                .filter(|m| !m.as_str().is_empty())
                .map(|m| format!("{}{}", prefix, m.as_str())),
        };

        if let Some(candidate) = candidate {
            let cleaned = clean_doi(&candidate);
            if is_valid_doi(&cleaned) {
                tracing::debug!("Extracted DOI {} from URL", cleaned);
                return Some(cleaned);
            }
        }
    }

    None
}

/// All distinct DOIs embedded in `text`, in order of discovery
pub fn extract_dois_from_text(text: &str) -> Vec<String> {
    let mut found: Vec<String> = Vec::new();

    for regex in TEXT_PATTERNS.iter() {
        for captures in regex.captures_iter(text) {
            let Some(m) = captures.get(1).or_else(|| captures.get(0)) else {
                continue;
            };
            let cleaned = clean_doi(trim_enclosing(m.as_str()));
            if !cleaned.is_empty() && is_valid_doi(&cleaned) && !found.contains(&cleaned) {
                found.push(cleaned);
            }
        }
    }

    found
}

/// Drop trailing quotes and unbalanced closing parentheses picked up from
/// the text around a DOI. Balanced parentheses belong to the suffix.
fn trim_enclosing(candidate: &str) -> &str {
    let mut doi = candidate;
    loop {
        let mut trimmed = doi.trim_end_matches(['"', '\'']);
        if trimmed.ends_with(')') && trimmed.matches(')').count() > trimmed.matches('(').count() {
            trimmed = &trimmed[..trimmed.len() - 1];
        }
        if trimmed == doi {
            return doi;
        }
        doi = trimmed;
    }
}

/// Whether a URL points at a host that commonly carries DOIs
pub fn is_likely_doi_url(url: &str) -> bool {
    let url = url.to_lowercase();
    !url.is_empty() && DOI_DOMAINS.iter().any(|domain| url.contains(domain))
}
