//! CSL-JSON metadata via DOI content negotiation.

use async_trait::async_trait;

use super::{parse_json, MetadataError, MetadataSource, RawWork};
use crate::models::{CitationStyle, PaperRecord};
use crate::utils::HttpClient;

/// Media types accepted as a JSON metadata body
const JSON_MEDIA_TYPES: [&str; 2] = ["application/json", "application/vnd.citationstyles.csl+json"];

/// `GET {doi_resolver_base}{doi}` asking for CSL-JSON.
///
/// Resolvers sometimes answer with a landing page instead of data, so the
/// response `Content-Type` must advertise JSON before the body is parsed.
#[derive(Debug, Clone)]
pub struct CslJsonSource {
    client: HttpClient,
}

impl CslJsonSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

fn is_json_content_type(content_type: Option<&str>) -> bool {
    content_type
        .map(|ct| ct.to_ascii_lowercase())
        .is_some_and(|ct| JSON_MEDIA_TYPES.iter().any(|t| ct.contains(t)))
}

#[async_trait]
impl MetadataSource for CslJsonSource {
    fn id(&self) -> &str {
        "csl-json"
    }

    async fn fetch(&self, doi: &str) -> Result<PaperRecord, MetadataError> {
        let url = format!("{}{}", self.client.doi_resolver_base(), doi);

        let response = self
            .client
            .get(&url, CitationStyle::Json.accept_header())
            .await
            .map_err(|e| MetadataError::from_transport(doi, &e))?;

        if !is_json_content_type(response.content_type.as_deref()) {
            tracing::debug!(
                "Resolver returned {:?} instead of JSON for {}",
                response.content_type,
                doi
            );
            return Err(MetadataError::unexpected_format(doi));
        }

        let work: RawWork = parse_json(doi, &response.body)?;
        Ok(work.into_record(doi))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::NetworkConfig;
    use crate::sources::MetadataErrorKind;

    fn source_for(server: &mockito::ServerGuard) -> CslJsonSource {
        let config = NetworkConfig {
            doi_resolver_base: format!("{}/", server.url()),
            retry_attempts: 1,
            ..NetworkConfig::default()
        };
        CslJsonSource::new(HttpClient::new(&config).unwrap())
    }

    #[test]
    fn test_json_content_types() {
        assert!(is_json_content_type(Some("application/json; charset=utf-8")));
        assert!(is_json_content_type(Some(
            "application/vnd.citationstyles.csl+json"
        )));
        assert!(!is_json_content_type(Some("text/html")));
        assert!(!is_json_content_type(None));
    }

    #[tokio::test]
    async fn test_fetch_csl_json() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/10.5555/csl")
            .match_header("accept", "application/vnd.citationstyles.csl+json")
            .with_status(200)
            .with_header("content-type", "application/vnd.citationstyles.csl+json")
            .with_body(
                r#"{"DOI":"10.5555/csl","title":"Plain title",
                    "author":[{"family":"Doe","given":"Jane"}],
                    "abstract":"<p>Short &lt;abstract&gt;</p>"}"#,
            )
            .create_async()
            .await;

        let record = source_for(&server).fetch("10.5555/csl").await.unwrap();
        assert_eq!(record.title, "Plain title");
        assert_eq!(record.authors[0].display_name(), "Jane Doe");
        assert_eq!(record.r#abstract, "Short <abstract>");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_fetch_rejects_html() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("GET", "/10.5555/html")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("{\"title\":\"looks like json\"}")
            .create_async()
            .await;

        let err = source_for(&server).fetch("10.5555/html").await.unwrap_err();
        assert_eq!(err.kind, MetadataErrorKind::UnexpectedFormat);
    }
}
