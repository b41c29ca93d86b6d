//! HttpFormVersionApi -- concrete [`FormVersionApi`] over the backend's REST API.
//!
//! Endpoints, relative to the configured base URL:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | fetch     | `GET  /form-versions/{id}/` |
//! | update    | `PUT  /form-versions/{id}/` |
//! | publish   | `POST /form-versions/{id}/publish/` |
//! | create    | `POST /forms/{form_id}/versions/` |
//!
//! The API token is wrapped in [`SecretString`] and only exposed when the
//! `Authorization` header is built.

use std::time::Duration;

use reqwest::RequestBuilder;
use secrecy::{ExposeSecret, SecretString};
use serde::de::DeserializeOwned;
use tracing::debug;

use formflow_core::repository::FormVersionApi;
use formflow_types::config::ApiConfig;
use formflow_types::error::ServiceError;
use formflow_types::wire::{CreateVersionOptions, FormVersion, PublishedVersion, SaveRequest};

use super::error::{from_decode_error, from_send_error, from_status};

/// Form-version backend client.
///
/// Does not derive `Debug` so the token can never end up in a log line.
pub struct HttpFormVersionApi {
    client: reqwest::Client,
    base_url: String,
    token: Option<SecretString>,
}

impl HttpFormVersionApi {
    /// Create a client for the configured backend.
    ///
    /// `token`, when present, is sent as a bearer token on every request.
    pub fn new(config: &ApiConfig, token: Option<SecretString>) -> reqwest::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token.expose_secret()),
            None => request,
        }
    }

    /// Send a request and decode a JSON success body.
    async fn execute<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ServiceError> {
        let response = self
            .authorize(request)
            .header("accept", "application/json")
            .send()
            .await
            .map_err(from_send_error)?;

        let status = response.status();
        debug!(status = status.as_u16(), url = %response.url(), "Form backend responded");

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(from_status(status, &body));
        }

        response
            .json::<T>()
            .await
            .map_err(|e| from_decode_error(status, e))
    }
}

impl FormVersionApi for HttpFormVersionApi {
    async fn fetch_form_version(&self, id: i64) -> Result<FormVersion, ServiceError> {
        let url = self.url(&format!("/form-versions/{id}/"));
        self.execute(self.client.get(&url)).await
    }

    async fn update_form_version(
        &self,
        id: i64,
        request: &SaveRequest,
    ) -> Result<SaveRequest, ServiceError> {
        let url = self.url(&format!("/form-versions/{id}/"));
        self.execute(self.client.put(&url).json(request)).await
    }

    async fn publish_form_version(&self, id: i64) -> Result<PublishedVersion, ServiceError> {
        let url = self.url(&format!("/form-versions/{id}/publish/"));
        self.execute(self.client.post(&url)).await
    }

    async fn create_form_version(
        &self,
        form_id: i64,
        options: CreateVersionOptions,
    ) -> Result<FormVersion, ServiceError> {
        let url = self.url(&format!("/forms/{form_id}/versions/"));
        self.execute(self.client.post(&url).json(&options)).await
    }
}
