//! CrossRef REST metadata source.

use async_trait::async_trait;
use serde::Deserialize;

use super::{parse_json, MetadataError, MetadataSource, RawWork};
use crate::models::PaperRecord;
use crate::utils::HttpClient;

/// CrossRef works endpoint: `GET {crossref_works_base}{doi}`.
///
/// The work itself sits under the response's `message` key.
#[derive(Debug, Clone)]
pub struct CrossRefSource {
    client: HttpClient,
}

impl CrossRefSource {
    pub fn new(client: HttpClient) -> Self {
        Self { client }
    }
}

#[derive(Debug, Deserialize)]
struct CRResponse {
    message: RawWork,
}

#[async_trait]
impl MetadataSource for CrossRefSource {
    fn id(&self) -> &str {
        "crossref"
    }

    async fn fetch(&self, doi: &str) -> Result<PaperRecord, MetadataError> {
        let url = format!("{}{}", self.client.crossref_works_base(), doi);

        let response = self
            .client
            .get(&url, "application/json")
            .await
            .map_err(|e| MetadataError::from_transport(doi, &e))?;

        let data: CRResponse = parse_json(doi, &response.body)?;
        Ok(data.message.into_record(doi))
    }
}
