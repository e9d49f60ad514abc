//! Translation lookup for human-readable failure reasons
//!
//! The pipeline never formats reasons itself; it resolves a fixed key per
//! classification rule and `upload.{status_text}` for transport failures.

use std::collections::HashMap;
use std::path::Path;

use crate::error::UploadError;

pub const FILE_TYPE_ERROR_KEY: &str = "upload.fileTypeError";
pub const FILE_MIN_SIZE_ERROR_KEY: &str = "upload.fileMinSizeError";
pub const FILE_MAX_SIZE_ERROR_KEY: &str = "upload.fileMaxSizeError";

/// Key for a transport failure with the given status text.
pub fn transport_error_key(status_text: &str) -> String {
    format!("upload.{}", status_text)
}

/// Resolves translation keys to display strings.
pub trait Translator: Send + Sync {
    fn resolve(&self, key: &str) -> String;
}

/// Returns every key unchanged.
pub struct KeyTranslator;

impl Translator for KeyTranslator {
    fn resolve(&self, key: &str) -> String {
        key.to_string()
    }
}

/// Built-in English table. Unknown keys resolve to themselves.
#[derive(Debug, Clone)]
pub struct DefaultTranslator {
    entries: HashMap<String, String>,
}

impl Default for DefaultTranslator {
    fn default() -> Self {
        let entries = [
            (FILE_TYPE_ERROR_KEY, "file type error"),
            (FILE_MIN_SIZE_ERROR_KEY, "file min-size error"),
            (FILE_MAX_SIZE_ERROR_KEY, "file max-size error"),
            ("upload.Timeout", "upload timed out"),
            ("upload.Unknown Error", "network error"),
            ("upload.Bad Request", "bad request"),
            ("upload.Unauthorized", "not authorized to upload"),
            ("upload.Forbidden", "upload forbidden"),
            ("upload.Not Found", "upload address not found"),
            ("upload.Payload Too Large", "file too large for the server"),
            ("upload.Internal Server Error", "server error"),
            ("upload.Bad Gateway", "bad gateway"),
            ("upload.Service Unavailable", "service unavailable"),
            ("upload.Gateway Timeout", "gateway timeout"),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Self { entries }
    }
}

impl DefaultTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add or replace entries from a flat JSON object (`{"upload.Timeout": "..."}`).
    pub fn extend_from_json(&mut self, json: &str) -> Result<(), UploadError> {
        let table: HashMap<String, String> = serde_json::from_str(json)?;
        self.entries.extend(table);
        Ok(())
    }

    /// Built-in table overlaid with a JSON translation file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, UploadError> {
        let json = std::fs::read_to_string(path)?;
        let mut translator = Self::default();
        translator.extend_from_json(&json)?;
        Ok(translator)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }
}

impl Translator for DefaultTranslator {
    fn resolve(&self, key: &str) -> String {
        self.entries
            .get(key)
            .cloned()
            .unwrap_or_else(|| key.to_string())
    }
}
