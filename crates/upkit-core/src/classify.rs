//! Batch classification against the constraint set
//!
//! Rules run in a fixed order (type, min size, max size). A candidate rejected
//! by one rule is never seen by the next.

use crate::config::{UploadConfig, BYTES_PER_MIB};
use crate::models::{FileCandidate, TrackedFile};
use crate::translate::{
    Translator, FILE_MAX_SIZE_ERROR_KEY, FILE_MIN_SIZE_ERROR_KEY, FILE_TYPE_ERROR_KEY,
};

/// Result of classifying one batch. Every input appears in exactly one list.
#[derive(Debug, Default)]
pub struct Classification {
    pub valid: Vec<TrackedFile>,
    pub invalid: Vec<TrackedFile>,
}

impl Classification {
    pub fn len(&self) -> usize {
        self.valid.len() + self.invalid.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Check a name against one accepted suffix (already trimmed and lowercased).
///
/// The name needs at least one character before the suffix.
pub fn matches_extension(file_name: &str, suffix: &str) -> bool {
    let name = file_name.to_lowercase();
    name.chars().count() > suffix.chars().count() && name.ends_with(suffix)
}

/// Partition `batch` into valid (`pause`) and invalid (`error`) tracked files.
pub fn classify(
    batch: Vec<FileCandidate>,
    config: &UploadConfig,
    translator: &dyn Translator,
) -> Classification {
    let mut invalid = Vec::new();
    let mut files = batch;

    if config.restricts_file_type() {
        let extensions = config.accepted_extensions();
        files = reject_where(files, &mut invalid, translator, FILE_TYPE_ERROR_KEY, |f| {
            !extensions.iter().any(|ext| matches_extension(&f.name, ext))
        });
    }

    if let Some(min_size) = config.min_size() {
        let min_bytes = min_size * BYTES_PER_MIB;
        files = reject_where(files, &mut invalid, translator, FILE_MIN_SIZE_ERROR_KEY, |f| {
            (f.size as f64) < min_bytes
        });
    }

    if let Some(max_size) = config.max_size() {
        let max_bytes = max_size * BYTES_PER_MIB;
        files = reject_where(files, &mut invalid, translator, FILE_MAX_SIZE_ERROR_KEY, |f| {
            (f.size as f64) > max_bytes
        });
    }

    let valid = files.into_iter().map(TrackedFile::pending).collect();
    Classification { valid, invalid }
}

fn reject_where(
    files: Vec<FileCandidate>,
    invalid: &mut Vec<TrackedFile>,
    translator: &dyn Translator,
    reason_key: &str,
    reject: impl Fn(&FileCandidate) -> bool,
) -> Vec<FileCandidate> {
    let (rejected, kept): (Vec<_>, Vec<_>) = files.into_iter().partition(|f| reject(f));
    if !rejected.is_empty() {
        let reason = translator.resolve(reason_key);
        tracing::debug!(count = rejected.len(), reason = %reason, "Files rejected");
        invalid.extend(
            rejected
                .into_iter()
                .map(|f| TrackedFile::rejected(f, reason.clone())),
        );
    }
    kept
}
