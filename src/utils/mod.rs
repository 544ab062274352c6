//! Building blocks shared by the conversion pipeline.
//!
//! - [`extract_doi`]: pull a DOI out of a URL, prefixed string, or free text
//! - [`clean_doi`], [`is_valid_doi`], [`suggest_corrections`]: DOI grammar checks
//! - [`clean_abstract`], [`decode_html_entities`], [`repair_mojibake`]: text cleanup
//! - [`HttpClient`]: the one shared HTTP client, with retry on transient failures
//! - [`CacheService`]: optional on-disk cache of converted records
//! - [`ProgressReporter`]: one-way progress notifications for batch jobs
//! - [`init_logging`]: tracing subscriber setup
//!
//! # Extraction and validation
//!
//! ```rust
//! use doi_cite::utils::{extract_doi, is_valid_doi};
//!
//! let doi = extract_doi("https://www.nature.com/articles/nature12373").unwrap();
//! assert_eq!(doi, "10.1038/nature12373");
//! assert!(is_valid_doi(&doi));
//! ```
//!
//! # Retry with Backoff
//!
//! ```rust,no_run
//! use doi_cite::config::NetworkConfig;
//! use doi_cite::utils::{HttpClient, RetryConfig};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let client = HttpClient::new(&NetworkConfig::default())?
//!     .with_retry_config(RetryConfig::default().max_attempts(5));
//! let response = client
//!     .get("https://doi.org/10.1038/nature12373", "application/x-bibtex")
//!     .await?;
//! println!("{}", response.body);
//! # Ok(())
//! # }
//! ```

mod cache;
mod extract;
mod http;
mod logging;
mod progress;
mod retry;
mod text;
mod validate;

pub use cache::{CacheResult, CacheService, CacheStats};
pub use extract::{
    extract_doi, extract_doi_from_url, extract_dois_from_text, is_likely_doi_url, require_doi,
    InputError,
};
pub use http::{HttpClient, HttpResponse, TransportError};
pub use logging::{default_directive, init_logging};
pub use progress::{
    progress_channel, ProgressEvent, ProgressReceiver, ProgressReporter, ProgressSender,
};
pub use retry::{with_retry, RetryConfig, TransientError};
pub use text::{clean_abstract, collapse_whitespace, decode_html_entities, repair_mojibake};
pub use validate::{
    clean_doi, doi_parts, doi_url, format_for_display, is_valid_doi, suggest_corrections,
    validate_batch, validate_comprehensive, validate_doi, BatchValidation, DoiParts, FormatError,
    ValidationReport, DOI_PREFIXES,
};
