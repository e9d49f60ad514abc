//! Configuration module
//!
//! The constraint set attached to an upload pipeline: target endpoint, accepted
//! extensions, size limits, selection mode, and multipart field names.

use std::env;

use crate::error::UploadError;

// Common constants
pub const DEFAULT_TARGET_URL: &str = "/rdk/service/common/upload";
pub const DEFAULT_CONTENT_FIELD: &str = "file";
pub const DEFAULT_FILENAME_FIELD: &str = "filename";

/// Bytes per mebibyte; size limits are configured in MiB.
pub const BYTES_PER_MIB: f64 = 1024.0 * 1024.0;

/// Upload pipeline configuration
#[derive(Clone, Debug, PartialEq)]
pub struct UploadConfig {
    pub target_url: String,
    /// Comma-separated accepted suffixes (e.g. ".png,.jpg"). Empty means
    /// unrestricted. Any other value applies the filter, so a list with no
    /// usable suffix (e.g. ",") rejects every file.
    pub file_type: String,
    /// When false, each new selection replaces every tracked file.
    pub multiple: bool,
    pub content_field: String,
    /// Multipart field carrying the encoded file name. Empty disables the field.
    pub filename_field: String,
    min_size_mb: Option<f64>,
    max_size_mb: Option<f64>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            target_url: DEFAULT_TARGET_URL.to_string(),
            file_type: String::new(),
            multiple: true,
            content_field: DEFAULT_CONTENT_FIELD.to_string(),
            filename_field: DEFAULT_FILENAME_FIELD.to_string(),
            min_size_mb: None,
            max_size_mb: None,
        }
    }
}

impl UploadConfig {
    /// Load configuration from the environment (and `.env` if present).
    ///
    /// Reads `UPKIT_TARGET_URL`, `UPKIT_FILE_TYPE`, `UPKIT_MULTIPLE`,
    /// `UPKIT_CONTENT_FIELD`, `UPKIT_FILENAME_FIELD`, `UPKIT_MIN_SIZE_MB` and
    /// `UPKIT_MAX_SIZE_MB`. Unset variables keep their defaults.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let mut config = Self {
            target_url: env::var("UPKIT_TARGET_URL")
                .unwrap_or_else(|_| DEFAULT_TARGET_URL.to_string()),
            file_type: env::var("UPKIT_FILE_TYPE").unwrap_or_default(),
            multiple: env::var("UPKIT_MULTIPLE")
                .unwrap_or_else(|_| "true".to_string())
                .to_lowercase()
                .parse()
                .unwrap_or(true),
            content_field: env::var("UPKIT_CONTENT_FIELD")
                .unwrap_or_else(|_| DEFAULT_CONTENT_FIELD.to_string()),
            filename_field: env::var("UPKIT_FILENAME_FIELD")
                .unwrap_or_else(|_| DEFAULT_FILENAME_FIELD.to_string()),
            ..Self::default()
        };

        if let Ok(raw) = env::var("UPKIT_MIN_SIZE_MB") {
            config.set_min_size(&raw);
        }
        if let Ok(raw) = env::var("UPKIT_MAX_SIZE_MB") {
            config.set_max_size(&raw);
        }

        config
    }

    pub fn with_target_url(mut self, target_url: impl Into<String>) -> Self {
        self.target_url = target_url.into();
        self
    }

    pub fn with_file_type(mut self, file_type: impl Into<String>) -> Self {
        self.file_type = file_type.into();
        self
    }

    pub fn with_multiple(mut self, multiple: bool) -> Self {
        self.multiple = multiple;
        self
    }

    pub fn with_min_size(mut self, min_size_mb: Option<f64>) -> Self {
        self.min_size_mb = min_size_mb;
        self
    }

    pub fn with_max_size(mut self, max_size_mb: Option<f64>) -> Self {
        self.max_size_mb = max_size_mb;
        self
    }

    /// Minimum size in MiB. A configured value of zero counts as unset.
    pub fn min_size(&self) -> Option<f64> {
        self.min_size_mb.filter(|v| *v != 0.0)
    }

    /// Maximum size in MiB. A configured value of zero counts as unset.
    pub fn max_size(&self) -> Option<f64> {
        self.max_size_mb.filter(|v| *v != 0.0)
    }

    /// Set the minimum size from user input.
    ///
    /// Non-numeric input is logged and the previous value kept.
    pub fn set_min_size(&mut self, raw: &str) {
        match parse_size("minSize", raw) {
            Ok(value) => self.min_size_mb = value,
            Err(e) => e.log(),
        }
    }

    /// Set the maximum size from user input.
    ///
    /// Non-numeric input is logged and the previous value kept.
    pub fn set_max_size(&mut self, raw: &str) {
        match parse_size("maxSize", raw) {
            Ok(value) => self.max_size_mb = value,
            Err(e) => e.log(),
        }
    }

    /// Whether file names are checked against [`Self::accepted_extensions`].
    pub fn restricts_file_type(&self) -> bool {
        !self.file_type.is_empty()
    }

    /// Accepted suffixes, trimmed and lowercased, blank entries dropped.
    pub fn accepted_extensions(&self) -> Vec<String> {
        self.file_type
            .split(',')
            .map(|s| s.trim().to_lowercase())
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// Filename field name to send, if any.
    pub fn filename_field(&self) -> Option<&str> {
        let field = self.filename_field.trim();
        (!field.is_empty()).then_some(field)
    }
}

fn parse_size(property: &str, raw: &str) -> Result<Option<f64>, UploadError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .map(Some)
        .ok_or_else(|| {
            UploadError::InvalidConfig(format!(
                "{} property must be a number, please input a number or number string (got {:?})",
                property, raw
            ))
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let config = UploadConfig::default();
        assert_eq!(config.target_url, "/rdk/service/common/upload");
        assert!(config.multiple);
        assert_eq!(config.content_field, "file");
        assert_eq!(config.filename_field(), Some("filename"));
        assert_eq!(config.min_size(), None);
        assert_eq!(config.max_size(), None);
        assert!(config.accepted_extensions().is_empty());
    }

    #[test]
    fn set_size_from_number_string() {
        let mut config = UploadConfig::default();
        config.set_min_size("0.5");
        config.set_max_size(" 10 ");
        assert_eq!(config.min_size(), Some(0.5));
        assert_eq!(config.max_size(), Some(10.0));
    }

    #[test]
    fn non_numeric_size_keeps_previous_value() {
        let mut config = UploadConfig::default().with_max_size(Some(2.0));
        config.set_max_size("big");
        assert_eq!(config.max_size(), Some(2.0));

        config.set_min_size("NaN");
        assert_eq!(config.min_size(), None);
    }

    #[test]
    fn empty_size_input_unsets() {
        let mut config = UploadConfig::default().with_min_size(Some(1.0));
        config.set_min_size("");
        assert_eq!(config.min_size(), None);
    }

    #[test]
    fn zero_size_counts_as_unset() {
        let config = UploadConfig::default()
            .with_min_size(Some(0.0))
            .with_max_size(Some(0.0));
        assert_eq!(config.min_size(), None);
        assert_eq!(config.max_size(), None);
    }

    #[test]
    fn separator_only_file_type_still_restricts() {
        let config = UploadConfig::default().with_file_type(" , ");
        assert!(config.restricts_file_type());
        assert!(config.accepted_extensions().is_empty());
        assert!(!UploadConfig::default().restricts_file_type());
    }

    #[test]
    fn accepted_extensions_are_trimmed_and_lowercased() {
        let config = UploadConfig::default().with_file_type(" .PNG, .jpg ,,");
        assert_eq!(config.accepted_extensions(), vec![".png", ".jpg"]);
    }

    #[test]
    fn blank_filename_field_is_disabled() {
        let mut config = UploadConfig::default();
        config.filename_field = "   ".to_string();
        assert_eq!(config.filename_field(), None);
    }
}
