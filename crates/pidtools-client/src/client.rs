//! Typed client for the DataCite REST API `/dois` endpoint.
//!
//! | Method | Path | Success | Operation |
//! |--------|------|---------|-----------|
//! | GET    | `{service_url}/{doi}` | 200, 410 | Fetch record (410 carries a tombstone) |
//! | POST   | `{service_url}` | 201 | Create draft |
//! | PUT    | `{service_url}/{doi}` | 200 | Update metadata or submit event |
//! | DELETE | `{service_url}/{doi}` | 204 | Delete draft |
//!
//! Every response is checked for 401 before the operation's own status
//! handling.

use std::time::Duration;

use async_trait::async_trait;
use pidtools_core::Doi;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{RequestBuilder, Response, StatusCode};
use url::Url;

use crate::config::{ConfigError, DataCiteConfig};
use crate::error::{RepositoryError, RepositoryOperation};
use crate::repository::DoiRepository;
use crate::types::{DoiDocument, DoiRecord, JSONAPI_MEDIA_TYPE};

/// Client for a DataCite-style `/dois` endpoint.
#[derive(Debug, Clone)]
pub struct DataCiteClient {
    http: reqwest::Client,
    service_url: Url,
}

impl DataCiteClient {
    /// Create a new client from configuration.
    pub fn new(config: DataCiteConfig) -> Result<Self, RepositoryError> {
        config.validate()?;

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(JSONAPI_MEDIA_TYPE));
        let mut auth = HeaderValue::from_str(&format!("Basic {}", config.basic_auth_token().as_str()))
            .map_err(|_| ConfigError::InvalidCredentials)?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let mut builder = reqwest::Client::builder().default_headers(headers);
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let http = builder
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            http,
            service_url: config.service_url,
        })
    }

    /// The configured `/dois` endpoint.
    pub fn service_url(&self) -> &Url {
        &self.service_url
    }

    fn collection_url(&self) -> &str {
        self.service_url.as_str().trim_end_matches('/')
    }

    fn record_url(&self, doi: &Doi) -> String {
        format!("{}/{}", self.collection_url(), doi)
    }

    /// Send a request and apply the cross-cutting 401 check.
    async fn send(
        &self,
        operation: RepositoryOperation,
        doi: &str,
        request: RequestBuilder,
    ) -> Result<Response, RepositoryError> {
        let resp = request.send().await.map_err(|source| {
            tracing::warn!(%operation, doi, error = %source, "DataCite request failed");
            RepositoryError::Transport {
                operation,
                doi: doi.to_string(),
                source,
            }
        })?;

        if resp.status() == StatusCode::UNAUTHORIZED {
            tracing::warn!(%operation, doi, "DataCite rejected credentials");
            return Err(RepositoryError::Authentication {
                operation,
                doi: doi.to_string(),
            });
        }
        Ok(resp)
    }

    /// Turn any status outside `accepted` into `UnexpectedStatus`.
    async fn expect_status(
        operation: RepositoryOperation,
        doi: &str,
        resp: Response,
        accepted: &[StatusCode],
    ) -> Result<Response, RepositoryError> {
        if accepted.contains(&resp.status()) {
            return Ok(resp);
        }
        let status = resp.status().as_u16();
        let body = resp.text().await.unwrap_or_default();
        tracing::warn!(%operation, doi, status, "DataCite returned unexpected status");
        Err(RepositoryError::UnexpectedStatus {
            operation,
            doi: doi.to_string(),
            status,
            body,
        })
    }

    async fn decode_record(
        operation: RepositoryOperation,
        doi: &str,
        resp: Response,
    ) -> Result<DoiRecord, RepositoryError> {
        let decode_error = |detail: String| RepositoryError::Decode {
            operation,
            doi: doi.to_string(),
            detail,
        };

        let body = resp.text().await.map_err(|e| decode_error(e.to_string()))?;
        if body.trim().is_empty() {
            return Err(decode_error("empty response body".to_string()));
        }
        let document: DoiDocument =
            serde_json::from_str(&body).map_err(|e| decode_error(e.to_string()))?;
        DoiRecord::from_document(document).map_err(|e| decode_error(e.to_string()))
    }
}

#[async_trait]
impl DoiRepository for DataCiteClient {
    async fn get(&self, doi: &Doi) -> Result<DoiRecord, RepositoryError> {
        let operation = RepositoryOperation::Get;
        let url = self.record_url(doi);
        tracing::debug!(method = "GET", %url, %doi, "fetching DOI record");

        let resp = self.send(operation, doi.as_str(), self.http.get(&url)).await?;
        let resp =
            Self::expect_status(operation, doi.as_str(), resp, &[StatusCode::OK, StatusCode::GONE])
                .await?;
        Self::decode_record(operation, doi.as_str(), resp).await
    }

    async fn create(&self, payload: &DoiDocument) -> Result<DoiRecord, RepositoryError> {
        let operation = RepositoryOperation::Create;
        let url = self.collection_url();
        tracing::debug!(method = "POST", %url, "creating DOI");

        let request = self
            .http
            .post(url)
            .header(CONTENT_TYPE, JSONAPI_MEDIA_TYPE)
            .json(payload);
        let resp = self.send(operation, "", request).await?;
        let resp = Self::expect_status(operation, "", resp, &[StatusCode::CREATED]).await?;
        Self::decode_record(operation, "", resp).await
    }

    async fn update(&self, doi: &Doi, payload: &DoiDocument) -> Result<DoiRecord, RepositoryError> {
        let operation = RepositoryOperation::Update;
        let url = self.record_url(doi);
        tracing::debug!(method = "PUT", %url, %doi, "updating DOI");

        let request = self
            .http
            .put(&url)
            .header(CONTENT_TYPE, JSONAPI_MEDIA_TYPE)
            .json(payload);
        let resp = self.send(operation, doi.as_str(), request).await?;
        let resp = Self::expect_status(operation, doi.as_str(), resp, &[StatusCode::OK]).await?;
        Self::decode_record(operation, doi.as_str(), resp).await
    }

    async fn delete(&self, doi: &Doi) -> Result<(), RepositoryError> {
        let operation = RepositoryOperation::Delete;
        let url = self.record_url(doi);
        tracing::debug!(method = "DELETE", %url, %doi, "deleting DOI");

        let resp = self.send(operation, doi.as_str(), self.http.delete(&url)).await?;
        Self::expect_status(operation, doi.as_str(), resp, &[StatusCode::NO_CONTENT]).await?;
        Ok(())
    }
}
