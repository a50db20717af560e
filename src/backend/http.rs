//! HTTP search backend (Elasticsearch / OpenSearch compatible)

use std::time::Duration;

use reqwest::blocking::Client;
use tracing::{debug, error};

use super::SearchBackend;
use crate::config::BackendConfig;
use crate::dsl::{SearchRequest, SearchResponse};
use crate::error::BackendError;

/// Posts request bodies to `<url>/<index>/_search`
#[derive(Debug, Clone)]
pub struct HttpSearchBackend {
    client: Client,
    base_url: String,
}

impl HttpSearchBackend {
    /// Build a client from configuration; the timeout applies per request
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.url.trim_end_matches('/').to_string(),
        })
    }

    /// Search endpoint for `index`
    pub fn endpoint(&self, index: &str) -> String {
        format!("{}/{}/_search", self.base_url, index)
    }
}

impl SearchBackend for HttpSearchBackend {
    fn search(&self, request: &SearchRequest) -> Result<SearchResponse, BackendError> {
        let url = self.endpoint(&request.index);
        let body = request.body();
        debug!(%url, body = %body, "Search request");

        let response = self.client.post(&url).json(&body).send()?;
        let status = response.status();
        if !status.is_success() {
            let text = response.text().unwrap_or_default();
            error!(%url, status = status.as_u16(), body = %text, "Search backend rejected request");
            return Err(BackendError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        response
            .json::<SearchResponse>()
            .map_err(|e| BackendError::Decode(e.to_string()))
    }
}
