//! Primary/fallback metadata resolution.

use std::sync::Arc;

use super::{CrossRefSource, CslJsonSource, MetadataError, MetadataSource};
use crate::models::PaperRecord;
use crate::utils::HttpClient;

/// Resolves a DOI through a primary source, falling back to a second one.
///
/// The fallback is a different service, not a retry: transport-level retries
/// already happen inside [`HttpClient`].
#[derive(Debug, Clone)]
pub struct MetadataResolver {
    primary: Arc<dyn MetadataSource>,
    fallback: Option<Arc<dyn MetadataSource>>,
}

impl MetadataResolver {
    /// CrossRef first, then CSL-JSON content negotiation, sharing one client
    pub fn new(client: HttpClient) -> Self {
        Self {
            primary: Arc::new(CrossRefSource::new(client.clone())),
            fallback: Some(Arc::new(CslJsonSource::new(client))),
        }
    }

    /// Use custom sources
    pub fn with_sources(
        primary: Arc<dyn MetadataSource>,
        fallback: Option<Arc<dyn MetadataSource>>,
    ) -> Self {
        Self { primary, fallback }
    }

    /// Resolve metadata for an already validated DOI
    pub async fn resolve(&self, doi: &str) -> Result<PaperRecord, MetadataError> {
        match self.primary.fetch(doi).await {
            Ok(record) => Ok(record),
            Err(primary_err) => {
                let Some(fallback) = &self.fallback else {
                    return Err(primary_err);
                };
                tracing::warn!(
                    "{} failed for {} ({}), trying {}",
                    self.primary.id(),
                    doi,
                    primary_err,
                    fallback.id()
                );
                fallback.fetch(doi).await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MetadataErrorKind;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug)]
    struct StaticSource {
        id: &'static str,
        result: Result<PaperRecord, MetadataErrorKind>,
        calls: AtomicUsize,
    }

    impl StaticSource {
        fn ok(id: &'static str, title: &str) -> Arc<Self> {
            let mut record = PaperRecord::new("10.1000/x");
            record.title = title.to_string();
            Arc::new(Self {
                id,
                result: Ok(record),
                calls: AtomicUsize::new(0),
            })
        }

        fn failing(id: &'static str, kind: MetadataErrorKind) -> Arc<Self> {
            Arc::new(Self {
                id,
                result: Err(kind),
                calls: AtomicUsize::new(0),
            })
        }
    }

    #[async_trait]
    impl MetadataSource for StaticSource {
        fn id(&self) -> &str {
            self.id
        }

        async fn fetch(&self, doi: &str) -> Result<PaperRecord, MetadataError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.result
                .clone()
                .map_err(|kind| MetadataError::new(kind, doi))
        }
    }

    #[tokio::test]
    async fn test_primary_success_skips_fallback() {
        let primary = StaticSource::ok("primary", "from primary");
        let fallback = StaticSource::ok("fallback", "from fallback");
        let resolver = MetadataResolver::with_sources(primary.clone(), Some(fallback.clone()));

        let record = resolver.resolve("10.1000/x").await.unwrap();
        assert_eq!(record.title, "from primary");
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_primary_failure_uses_fallback() {
        let primary = StaticSource::failing("primary", MetadataErrorKind::Timeout);
        let fallback = StaticSource::ok("fallback", "from fallback");
        let resolver = MetadataResolver::with_sources(primary.clone(), Some(fallback.clone()));

        let record = resolver.resolve("10.1000/x").await.unwrap();
        assert_eq!(record.title, "from fallback");
        assert_eq!(primary.calls.load(Ordering::SeqCst), 1);
        assert_eq!(fallback.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_fallback_error_is_reported() {
        let primary = StaticSource::failing("primary", MetadataErrorKind::Timeout);
        let fallback = StaticSource::failing("fallback", MetadataErrorKind::NotFound);
        let resolver = MetadataResolver::with_sources(primary, Some(fallback));

        let err = resolver.resolve("10.1000/x").await.unwrap_err();
        assert_eq!(err.kind, MetadataErrorKind::NotFound);
        assert_eq!(err.doi, "10.1000/x");
    }

    #[tokio::test]
    async fn test_without_fallback() {
        let primary = StaticSource::failing("primary", MetadataErrorKind::UnexpectedFormat);
        let resolver = MetadataResolver::with_sources(primary, None);

        let err = resolver.resolve("10.1000/x").await.unwrap_err();
        assert_eq!(err.kind, MetadataErrorKind::UnexpectedFormat);
    }
}
