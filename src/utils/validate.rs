//! DOI format validation and cleaning.
//!
//! All DOI handling in the crate goes through [`clean_doi`] so that the
//! extractor and the validator never disagree about what a clean DOI is.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::http::HttpClient;

/// A string that does not match the DOI grammar after cleaning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("Invalid DOI format: {doi}")]
pub struct FormatError {
    /// The cleaned candidate that failed
    pub doi: String,
    /// Advisory corrections that do validate; never applied automatically
    pub suggestions: Vec<String>,
}

/// Literal prefixes stripped before validation, most specific first.
/// Matching is case-insensitive and only the first hit is removed per pass.
pub const DOI_PREFIXES: [&str; 15] = [
    "https://doi.org/",
    "http://doi.org/",
    "https://dx.doi.org/",
    "http://dx.doi.org/",
    "https://www.doi.org/",
    "http://www.doi.org/",
    "doi.org/",
    "dx.doi.org/",
    "www.doi.org/",
    "doi:",
    "DOI:",
    "doi ",
    "DOI ",
    "doi=",
    "DOI=",
];

/// `10.NNNN+/<suffix>`, anchored at both ends
static DOI_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^10\.\d{4,}/[^\s\]>,;]+$").expect("valid DOI regex"));

/// Ordered rewrites tried by [`suggest_corrections`]
static CORRECTIONS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        // missing "10." directory indicator
        (r"^(\d+\.\d+/.+)$", "10.${1}"),
        // '.' or '_' where '/' belongs
        (r"10[._](\d+)[._](.+)", "10.${1}/${2}"),
        // whitespace around the separator
        (r"10\.\s*(\d+)\s*/\s*(.+)", "10.${1}/${2}"),
        (r"(?i)^doi:?\s*(.+)", "${1}"),
        // anything up to an embedded "/10."
        (r".*/10\.(\d+/.+)", "10.${1}"),
    ]
    .into_iter()
    .map(|(pattern, replacement)| {
        (
            Regex::new(pattern).expect("valid correction regex"),
            replacement,
        )
    })
    .collect()
});

/// One cleaning pass: trim, strip the first matching prefix, drop the query
/// string and fragment, drop trailing slashes.
fn clean_once(input: &str) -> String {
    let mut doi = input.trim();

    for prefix in DOI_PREFIXES {
        if doi.len() >= prefix.len()
            && doi.is_char_boundary(prefix.len())
            && doi[..prefix.len()].eq_ignore_ascii_case(prefix)
        {
            doi = &doi[prefix.len()..];
            break;
        }
    }

    if let Some((head, _)) = doi.split_once('?') {
        doi = head;
    }
    if let Some((head, _)) = doi.split_once('#') {
        doi = head;
    }

    doi.trim_end_matches('/').trim().to_string()
}

/// Normalize a DOI-ish string by removing resolver prefixes, labels, query
/// strings, fragments and trailing slashes.
///
/// Passes are repeated until nothing changes, so `clean_doi(clean_doi(x)) ==
/// clean_doi(x)` holds for every input. No case folding is applied.
pub fn clean_doi(input: &str) -> String {
    let mut current = clean_once(input);
    loop {
        let next = clean_once(&current);
        if next == current {
            return current;
        }
        current = next;
    }
}

/// Whether `doi` matches the DOI grammar after cleaning
pub fn is_valid_doi(doi: &str) -> bool {
    if doi.trim().is_empty() {
        return false;
    }
    DOI_REGEX.is_match(&clean_doi(doi))
}

/// Clean and validate, returning the clean DOI or a [`FormatError`] carrying
/// correction suggestions.
pub fn validate_doi(doi: &str) -> Result<String, FormatError> {
    let cleaned = clean_doi(doi);
    if DOI_REGEX.is_match(&cleaned) {
        Ok(cleaned)
    } else {
        Err(FormatError {
            doi: cleaned,
            suggestions: suggest_corrections(doi),
        })
    }
}

/// Best-effort corrections for a malformed DOI. Only candidates that differ
/// from the input and validate are returned, without duplicates.
pub fn suggest_corrections(invalid: &str) -> Vec<String> {
    let original = invalid.trim();
    if original.is_empty() {
        return Vec::new();
    }

    let mut suggestions: Vec<String> = Vec::new();
    for (regex, replacement) in CORRECTIONS.iter() {
        let corrected = regex.replace_all(original, *replacement);
        if corrected != original && is_valid_doi(&corrected) {
            let corrected = corrected.into_owned();
            if !suggestions.contains(&corrected) {
                suggestions.push(corrected);
            }
        }
    }
    suggestions
}

/// Structural components of a DOI
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DoiParts {
    pub full: String,
    /// `10.NNNN`
    pub prefix: String,
    pub suffix: String,
    /// Always `10` for registered DOIs
    pub directory_indicator: String,
    pub registrant_code: String,
}

/// Split a DOI into prefix, suffix and registrant code
pub fn doi_parts(doi: &str) -> Option<DoiParts> {
    let cleaned = validate_doi(doi).ok()?;
    let (prefix, suffix) = cleaned.split_once('/')?;
    let (directory_indicator, registrant_code) = prefix.split_once('.')?;

    Some(DoiParts {
        full: cleaned.clone(),
        prefix: prefix.to_string(),
        suffix: suffix.to_string(),
        directory_indicator: directory_indicator.to_string(),
        registrant_code: registrant_code.to_string(),
    })
}

/// Resolver URL for a DOI, or `None` if it does not validate
pub fn doi_url(resolver_base: &str, doi: &str) -> Option<String> {
    validate_doi(doi)
        .ok()
        .map(|cleaned| format!("{}{}", resolver_base, cleaned))
}

/// The cleaned DOI if valid, otherwise the input unchanged
pub fn format_for_display(doi: &str) -> String {
    validate_doi(doi).unwrap_or_else(|_| doi.to_string())
}

/// Result of validating one entry of a batch
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BatchValidation {
    pub doi: String,
    pub cleaned: String,
    pub valid_format: bool,
}

/// Format-check a list of DOIs without touching the network
pub fn validate_batch<S: AsRef<str>>(dois: &[S]) -> Vec<BatchValidation> {
    dois.iter()
        .map(|doi| {
            let doi = doi.as_ref();
            BatchValidation {
                doi: doi.to_string(),
                cleaned: clean_doi(doi),
                valid_format: is_valid_doi(doi),
            }
        })
        .collect()
}

/// Detailed validation outcome
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationReport {
    pub original: String,
    pub cleaned: String,
    pub valid_format: bool,
    /// `None` when no accessibility check was made
    pub accessible: Option<bool>,
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
    pub suggestions: Vec<String>,
}

/// Validate a DOI and collect errors, warnings and suggestions.
///
/// When a client is given and the format is valid, the DOI is also checked
/// with a `HEAD` request against the resolver; 2xx and 3xx count as
/// accessible.
pub async fn validate_comprehensive(doi: &str, client: Option<&HttpClient>) -> ValidationReport {
    let mut report = ValidationReport {
        original: doi.to_string(),
        cleaned: clean_doi(doi),
        ..Default::default()
    };

    if doi.trim().is_empty() {
        report.errors.push("DOI is empty".to_string());
        return report;
    }

    match validate_doi(doi) {
        Ok(_) => report.valid_format = true,
        Err(err) => {
            report.errors.push("Invalid DOI format".to_string());
            report.suggestions = err.suggestions;
        }
    }

    if !report.cleaned.contains('/') {
        report
            .warnings
            .push("DOI should contain a forward slash".to_string());
    }
    if !report.cleaned.starts_with("10.") {
        report.warnings.push("DOI should start with '10.'".to_string());
    }

    if let (true, Some(client)) = (report.valid_format, client) {
        let url = format!("{}{}", client.doi_resolver_base(), report.cleaned);
        match client.head(&url).await {
            Ok(status) => {
                let accessible = (200..400).contains(&status);
                report.accessible = Some(accessible);
                if !accessible {
                    report
                        .warnings
                        .push("DOI may not be accessible online".to_string());
                }
            }
            Err(err) => {
                tracing::debug!("Accessibility check for {} failed: {}", report.cleaned, err);
                report.accessible = Some(false);
                report
                    .warnings
                    .push("DOI may not be accessible online".to_string());
            }
        }
    }

    report
}
