//! Transport collaborator trait
//!
//! The pipeline issues exactly one multipart POST per admitted file through an
//! [`UploadTransport`]. Implementations return the server-assigned address as
//! text, or a [`TransportError`] whose status text keys the failure reason.

use async_trait::async_trait;
use bytes::Bytes;

/// Status text for failures that carry no HTTP response.
pub const UNKNOWN_ERROR_STATUS_TEXT: &str = "Unknown Error";

/// Status text for requests that ran out of time.
pub const TIMEOUT_STATUS_TEXT: &str = "Timeout";

/// Multipart body for one file upload.
#[derive(Debug, Clone)]
pub struct MultipartPayload {
    /// Field carrying the file content.
    pub content_field: String,
    pub file_name: String,
    pub content: Bytes,
    /// Optional `(field, encoded file name)` text part.
    pub filename_part: Option<(String, String)>,
}

/// Any non-success upload outcome.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{status_text}")]
pub struct TransportError {
    /// HTTP status, when a response was received.
    pub status: Option<u16>,
    pub status_text: String,
}

impl TransportError {
    pub fn new(status: Option<u16>, status_text: impl Into<String>) -> Self {
        Self {
            status,
            status_text: status_text.into(),
        }
    }

    /// A failure before any response arrived.
    pub fn network(status_text: impl Into<String>) -> Self {
        Self::new(None, status_text)
    }
}

/// HTTP transport capable of multipart form submission.
#[async_trait]
pub trait UploadTransport: Send + Sync {
    /// POST `payload` to `endpoint`; returns the server address of the stored file.
    async fn post_multipart(
        &self,
        endpoint: &str,
        payload: MultipartPayload,
    ) -> Result<String, TransportError>;
}
