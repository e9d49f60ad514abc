//! HTTP transport for the upkit upload pipeline.
//!
//! Provides a minimal reqwest client with configurable auth (Bearer token or
//! X-API-Key) that posts one multipart form per file and returns the response
//! body as the server-assigned address. The CLI plugs it into `UploadPipeline`.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, StatusCode};
use upkit_core::{MultipartPayload, TransportError, UploadTransport};

pub use upkit_core::transport::{TIMEOUT_STATUS_TEXT, UNKNOWN_ERROR_STATUS_TEXT};

/// Authentication strategy for the upload endpoint.
#[derive(Clone, Debug)]
pub enum Auth {
    /// No credentials.
    None,
    /// `Authorization: Bearer {token}`
    Bearer(String),
    /// `X-API-Key: {key}`
    XApiKey(String),
}

/// Multipart HTTP transport with configurable auth.
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpTransport {
    pub fn new(base_url: String, auth: Auth) -> Result<Self> {
        Self::with_timeout(base_url, auth, Duration::from_secs(60))
    }

    pub fn with_timeout(base_url: String, auth: Auth, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            auth,
        })
    }

    /// Create a transport from environment: UPKIT_API_URL (or API_URL), and
    /// optionally UPKIT_API_KEY (X-API-Key) or UPKIT_TOKEN (Bearer).
    pub fn from_env() -> Result<Self> {
        let base_url = std::env::var("UPKIT_API_URL")
            .or_else(|_| std::env::var("API_URL"))
            .unwrap_or_else(|_| "http://localhost:3000".to_string());

        let auth = if let Ok(key) = std::env::var("UPKIT_API_KEY") {
            Auth::XApiKey(key)
        } else if let Ok(token) = std::env::var("UPKIT_TOKEN") {
            Auth::Bearer(token)
        } else {
            Auth::None
        };

        Self::new(base_url, auth)
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Resolve an endpoint: absolute URLs are used as-is, paths are joined to the base URL.
    pub fn build_url(&self, endpoint: &str) -> String {
        if endpoint.starts_with("http://") || endpoint.starts_with("https://") {
            endpoint.to_string()
        } else if endpoint.starts_with('/') {
            format!("{}{}", self.base_url, endpoint)
        } else {
            format!("{}/{}", self.base_url, endpoint)
        }
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            Auth::None => request,
            Auth::Bearer(token) => request.header("Authorization", format!("Bearer {}", token)),
            Auth::XApiKey(key) => request.header("X-API-Key", key.as_str()),
        }
    }

    fn build_form(payload: MultipartPayload) -> Form {
        let length = payload.content.len() as u64;
        let content =
            Part::stream_with_length(payload.content, length).file_name(payload.file_name);
        let mut form = Form::new().part(payload.content_field, content);
        if let Some((field, encoded_name)) = payload.filename_part {
            form = form.text(field, encoded_name);
        }
        form
    }
}

/// Status text for a non-success response, mirroring the HTTP reason phrase.
pub fn status_text(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map(str::to_string)
        .unwrap_or_else(|| status.as_str().to_string())
}

fn request_error(err: &reqwest::Error) -> TransportError {
    if err.is_timeout() {
        return TransportError::network(TIMEOUT_STATUS_TEXT);
    }
    match err.status() {
        Some(status) => TransportError::new(Some(status.as_u16()), status_text(status)),
        None => TransportError::network(UNKNOWN_ERROR_STATUS_TEXT),
    }
}

#[async_trait]
impl UploadTransport for HttpTransport {
    async fn post_multipart(
        &self,
        endpoint: &str,
        payload: MultipartPayload,
    ) -> Result<String, TransportError> {
        let url = self.build_url(endpoint);
        let request = self
            .client
            .post(&url)
            .multipart(Self::build_form(payload));
        let request = self.apply_auth(request);

        let response = request.send().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to send upload request");
            request_error(&e)
        })?;

        let status = response.status();
        if !status.is_success() {
            tracing::debug!(url = %url, status = %status, "Upload request rejected");
            return Err(TransportError::new(Some(status.as_u16()), status_text(status)));
        }

        response.text().await.map_err(|e| {
            tracing::warn!(url = %url, error = %e, "Failed to read upload response");
            request_error(&e)
        })
    }
}
