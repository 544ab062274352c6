//! DOI conversion: input to complete paper record.
//!
//! [`Converter`] runs the whole pipeline for one input: extract a DOI,
//! validate it, resolve metadata once, then fetch a citation in every style
//! and merge everything into one [`PaperRecord`].
//!
//! Batches never fail as a whole. Each input that cannot be converted is
//! replaced by an error-marker record at the same position.

mod fan_out;
mod worker;

pub use fan_out::{CollectedCitations, FanOut};
pub use worker::ConversionWorker;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::citation::CitationFormatter;
use crate::config::Config;
use crate::models::{now_rfc3339, CitationStyle, PaperRecord};
use crate::sources::{MetadataError, MetadataResolver};
use crate::utils::{
    clean_doi, require_doi, suggest_corrections, validate_doi, CacheResult, CacheService,
    FormatError, HttpClient, InputError, ProgressReporter, TransportError,
};

/// `error_type` of records for inputs skipped after cancellation
pub const CANCELLED_ERROR_TYPE: &str = "Cancelled";

/// Why a single conversion produced no record
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConvertError {
    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Format(#[from] FormatError),

    #[error(transparent)]
    Metadata(#[from] MetadataError),
}

impl ConvertError {
    /// Name stored in an error marker's `error_type`
    pub fn error_type(&self) -> &'static str {
        match self {
            ConvertError::Input(_) => "InputError",
            ConvertError::Format(_) => "FormatError",
            ConvertError::Metadata(_) => "MetadataError",
        }
    }
}

/// Outcome of a batch, one record per input in input order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub records: Vec<PaperRecord>,
    pub succeeded: usize,
    pub failed: usize,
}

impl BatchReport {
    pub fn from_records(records: Vec<PaperRecord>) -> Self {
        let failed = records.iter().filter(|r| r.is_error()).count();
        Self {
            succeeded: records.len() - failed,
            failed,
            records,
        }
    }

    /// Inputs that were never attempted because the batch was cancelled
    pub fn cancelled(&self) -> usize {
        self.records
            .iter()
            .filter(|r| r.error_type.as_deref() == Some(CANCELLED_ERROR_TYPE))
            .count()
    }
}

/// The conversion pipeline.
#[derive(Debug, Clone)]
pub struct Converter {
    resolver: MetadataResolver,
    formatter: CitationFormatter,
    fan_out: FanOut,
    cache: Option<CacheService>,
}

impl Converter {
    /// Sequential, uncached converter over one shared client
    pub fn new(client: HttpClient) -> Self {
        Self::with_parts(
            MetadataResolver::new(client.clone()),
            CitationFormatter::new(client),
        )
    }

    pub fn with_parts(resolver: MetadataResolver, formatter: CitationFormatter) -> Self {
        Self {
            resolver,
            formatter,
            fan_out: FanOut::default(),
            cache: None,
        }
    }

    /// Build a converter from application settings: client, fan-out and
    /// (when enabled) the record cache.
    pub fn from_config(config: &Config) -> Result<Self, TransportError> {
        let client = HttpClient::new(&config.network)?;
        let mut converter =
            Self::new(client).with_fan_out(FanOut::from_config(&config.citations));

        if config.cache.enabled {
            let cache = CacheService::from_config(config.cache.clone());
            match cache.initialize() {
                Ok(()) => converter = converter.with_cache(cache),
                Err(e) => tracing::warn!("Record cache unavailable: {}", e),
            }
        }
        Ok(converter)
    }

    pub fn with_fan_out(mut self, fan_out: FanOut) -> Self {
        self.fan_out = fan_out;
        self
    }

    pub fn with_cache(mut self, cache: CacheService) -> Self {
        self.cache = Some(cache);
        self
    }

    pub fn fan_out(&self) -> FanOut {
        self.fan_out
    }

    pub fn resolver(&self) -> &MetadataResolver {
        &self.resolver
    }

    pub fn formatter(&self) -> &CitationFormatter {
        &self.formatter
    }

    /// Convert one raw input into a complete record.
    ///
    /// Fails only when no DOI can be extracted, the DOI is malformed, or no
    /// metadata can be obtained. Citation failures are placeholders inside
    /// the record.
    pub async fn convert_one(&self, raw: &str) -> Result<PaperRecord, ConvertError> {
        let doi = doi_from_input(raw)?;

        if let Some(cache) = &self.cache {
            if let CacheResult::Hit(record) = cache.get_record(&doi) {
                return Ok(record);
            }
        }

        let mut record = self.resolver.resolve(&doi).await?;
        let collected = self.fan_out.collect(&self.formatter, &doi).await;
        let complete = collected.is_complete();
        let transient_failures = collected.transient_failures;
        record.citations = collected.citations;
        record.added_date = Some(now_rfc3339());
        record.tags.clear();
        record.notes.clear();

        tracing::info!("Converted {} ({} citation styles)", doi, record.citations.len());

        if let Some(cache) = &self.cache {
            // records with outage placeholders are refetched next time
            if complete {
                cache.set_record(&record);
            } else {
                tracing::debug!(
                    "Not caching {}: {} styles failed transiently",
                    doi,
                    transient_failures
                );
            }
        }
        Ok(record)
    }

    /// Convert every input, one record per input in input order
    pub async fn convert_many<S: AsRef<str>>(&self, inputs: &[S]) -> Vec<PaperRecord> {
        self.convert_batch(
            inputs,
            &ProgressReporter::quiet(inputs.len()),
            &CancellationToken::new(),
        )
        .await
        .records
    }

    /// Convert every input, reporting progress and honoring cancellation.
    ///
    /// Cancellation is checked before each input; an input already in flight
    /// finishes. Inputs skipped after cancellation still get an error marker.
    pub async fn convert_batch<S: AsRef<str>>(
        &self,
        inputs: &[S],
        progress: &ProgressReporter,
        cancel: &CancellationToken,
    ) -> BatchReport {
        progress.started();

        let mut records = Vec::with_capacity(inputs.len());
        for (index, input) in inputs.iter().enumerate() {
            let input = input.as_ref();

            if cancel.is_cancelled() {
                let message = "Conversion cancelled";
                progress.failed(index, input, message);
                records.push(PaperRecord::error_marker(
                    input,
                    message,
                    CANCELLED_ERROR_TYPE,
                ));
                continue;
            }

            match self.convert_one(input).await {
                Ok(record) => {
                    progress.converted(index, &record.id);
                    records.push(record);
                }
                Err(e) => {
                    let message = e.to_string();
                    tracing::warn!("Failed to convert {:?}: {}", input, message);
                    progress.failed(index, input, &message);
                    records.push(PaperRecord::error_marker(input, &message, e.error_type()));
                }
            }
        }

        progress.finish();
        BatchReport::from_records(records)
    }

    /// Check that `raw` holds a DOI the metadata services know about
    pub async fn validate_and_check(&self, raw: &str) -> (bool, String) {
        let result = match doi_from_input(raw) {
            Ok(doi) => self.resolver.resolve(&doi).await.map_err(ConvertError::from),
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => (true, "Valid DOI".to_string()),
            Err(e) => (false, e.to_string()),
        }
    }

    /// One citation without resolving metadata
    pub async fn citation_preview(&self, raw: &str, style_key: &str) -> String {
        match doi_from_input(raw) {
            Ok(doi) => self.formatter.format(&doi, style_key).await,
            Err(e) => format!("Preview not available: {}", e),
        }
    }

    /// Style keys in fetch order
    pub fn available_formats() -> Vec<&'static str> {
        CitationStyle::ALL.iter().map(CitationStyle::key).collect()
    }

    pub fn is_format_supported(style_key: &str) -> bool {
        CitationStyle::from_key(style_key).is_some()
    }
}

/// Extract and validate a DOI from raw input.
///
/// Input that was evidently meant as a DOI but is malformed yields a
/// [`FormatError`] with suggestions; anything else without a DOI is an
/// [`InputError`].
fn doi_from_input(raw: &str) -> Result<String, ConvertError> {
    match require_doi(raw) {
        Ok(doi) => Ok(validate_doi(&doi)?),
        Err(InputError::Empty) => Err(InputError::Empty.into()),
        Err(not_found) => {
            let looks_like_doi =
                clean_doi(raw).starts_with("10.") || !suggest_corrections(raw).is_empty();
            match validate_doi(raw) {
                Err(format_error) if looks_like_doi => Err(format_error.into()),
                _ => Err(not_found.into()),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{CacheConfig, NetworkConfig};

    #[test]
    fn test_doi_from_input() {
        assert_eq!(
            doi_from_input("https://doi.org/10.1038/nature12373").unwrap(),
            "10.1038/nature12373"
        );
        assert_eq!(
            doi_from_input("   "),
            Err(ConvertError::Input(InputError::Empty))
        );
        assert!(matches!(
            doi_from_input("hello world"),
            Err(ConvertError::Input(InputError::NoDoiFound(_)))
        ));

        match doi_from_input("10.1038.nature12373") {
            Err(ConvertError::Format(e)) => {
                assert_eq!(e.suggestions, vec!["10.1038/nature12373".to_string()]);
            }
            other => panic!("expected format error, got {:?}", other),
        }
    }

    #[test]
    fn test_error_types() {
        assert_eq!(ConvertError::from(InputError::Empty).error_type(), "InputError");
        assert_eq!(ConvertError::from(InputError::Empty).to_string(), "DOI cannot be empty");
    }

    #[test]
    fn test_available_formats() {
        let formats = Converter::available_formats();
        assert_eq!(formats.len(), 14);
        assert_eq!(formats[0], "APA");
        assert_eq!(formats[13], "JSON");
        assert!(Converter::is_format_supported("Vancouver"));
        assert!(!Converter::is_format_supported("vancouver"));
    }

    #[test]
    fn test_batch_report_counts() {
        let ok = PaperRecord::new("10.1000/a");
        let bad = PaperRecord::error_marker("junk", "No DOI found", "InputError");
        let skipped =
            PaperRecord::error_marker("10.1000/b", "Conversion cancelled", CANCELLED_ERROR_TYPE);

        let report = BatchReport::from_records(vec![ok, bad, skipped]);
        assert_eq!(report.succeeded, 1);
        assert_eq!(report.failed, 2);
        assert_eq!(report.cancelled(), 1);
    }

    #[tokio::test]
    async fn test_preview_of_garbage_input() {
        let converter = Converter::new(HttpClient::new(&NetworkConfig::default()).unwrap());
        let preview = converter.citation_preview("no doi here", "APA").await;
        assert_eq!(preview, "Preview not available: No DOI found in input: no doi here");

        let (valid, message) = converter.validate_and_check("").await;
        assert!(!valid);
        assert_eq!(message, "DOI cannot be empty");
    }

    #[tokio::test]
    async fn test_transient_citation_failures_are_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let mut server = mockito::Server::new_async().await;
        let _metadata = server
            .mock("GET", "/works/10.1000/x")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"DOI":"10.1000/x","title":["Cached paper"]}}"#)
            .create_async()
            .await;
        let outage = server
            .mock("GET", "/10.1000/x")
            .with_status(503)
            .create_async()
            .await;

        let config = NetworkConfig {
            doi_resolver_base: format!("{}/", server.url()),
            crossref_works_base: format!("{}/works/", server.url()),
            retry_attempts: 1,
            ..NetworkConfig::default()
        };
        let cache = CacheService::from_config(CacheConfig {
            enabled: true,
            directory: Some(dir.path().to_path_buf()),
            ttl_seconds: 60,
        });
        let converter = Converter::new(HttpClient::new(&config).unwrap()).with_cache(cache.clone());

        let first = converter.convert_one("10.1000/x").await.unwrap();
        assert_eq!(first.citation(CitationStyle::Apa), Some("Service error (HTTP 503)"));
        assert!(matches!(cache.get_record("10.1000/x"), CacheResult::Miss));

        outage.remove_async().await;
        let _recovered = server
            .mock("GET", "/10.1000/x")
            .with_status(200)
            .with_body("Real citation.")
            .create_async()
            .await;

        let second = converter.convert_one("10.1000/x").await.unwrap();
        assert_eq!(second.citation(CitationStyle::Apa), Some("Real citation."));
        assert!(matches!(cache.get_record("10.1000/x"), CacheResult::Hit(_)));
    }

    #[tokio::test]
    async fn test_cancelled_batch_marks_every_input() {
        let converter = Converter::new(HttpClient::new(&NetworkConfig::default()).unwrap());
        let cancel = CancellationToken::new();
        cancel.cancel();

        let inputs = ["10.1000/a", "10.1000/b"];
        let report = converter
            .convert_batch(&inputs, &ProgressReporter::quiet(2), &cancel)
            .await;

        assert_eq!(report.records.len(), 2);
        assert_eq!(report.cancelled(), 2);
        assert_eq!(report.records[1].id, "10.1000/b");
    }
}
