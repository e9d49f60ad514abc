use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;
use upkit_core::{FileCandidate, FileState, TrackedFile, UploadConfig, UploadEvent};

/// Constraint flags shared by `upload` and `check`. Unset flags keep the
/// values loaded from the environment.
#[derive(Args, Debug, Default, Clone)]
pub struct ConstraintArgs {
    /// Upload endpoint (absolute URL or path joined to UPKIT_API_URL)
    #[arg(long)]
    pub target_url: Option<String>,
    /// Accepted suffixes, comma-separated (e.g. ".png,.jpg")
    #[arg(long)]
    pub file_type: Option<String>,
    /// Minimum file size in MiB
    #[arg(long)]
    pub min_size: Option<String>,
    /// Maximum file size in MiB
    #[arg(long)]
    pub max_size: Option<String>,
    /// Replace previously tracked files on each selection
    #[arg(long)]
    pub single: bool,
    /// Multipart field carrying the file content
    #[arg(long)]
    pub content_field: Option<String>,
    /// Multipart field carrying the encoded file name (empty to omit)
    #[arg(long)]
    pub filename_field: Option<String>,
}

impl ConstraintArgs {
    pub fn apply(&self, mut config: UploadConfig) -> UploadConfig {
        if let Some(target_url) = &self.target_url {
            config.target_url = target_url.clone();
        }
        if let Some(file_type) = &self.file_type {
            config.file_type = file_type.clone();
        }
        if let Some(raw) = &self.min_size {
            config.set_min_size(raw);
        }
        if let Some(raw) = &self.max_size {
            config.set_max_size(raw);
        }
        if self.single {
            config.multiple = false;
        }
        if let Some(field) = &self.content_field {
            config.content_field = field.clone();
        }
        if let Some(field) = &self.filename_field {
            config.filename_field = field.clone();
        }
        config
    }
}

/// Read every path into a candidate, in argument order.
pub async fn load_candidates(paths: &[PathBuf]) -> Result<Vec<FileCandidate>> {
    let mut candidates = Vec::with_capacity(paths.len());
    for path in paths {
        let candidate = FileCandidate::from_path(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        tracing::debug!(file = %path.display(), size = candidate.size, "Loaded file");
        candidates.push(candidate);
    }
    Ok(candidates)
}

/// One JSON line per event.
pub fn render_event(event: &UploadEvent) -> Result<String> {
    serde_json::to_string(event).context("Serialize event")
}

/// Final per-file report.
#[derive(Debug, Serialize, PartialEq)]
pub struct UploadSummary {
    pub uploaded: usize,
    pub failed: usize,
    pub rejected: usize,
    pub files: Vec<SummaryRow>,
}

#[derive(Debug, Serialize, PartialEq)]
pub struct SummaryRow {
    pub name: String,
    pub state: FileState,
    pub url: String,
    pub reason: String,
}

impl UploadSummary {
    pub fn new(valid: &[TrackedFile], invalid: &[TrackedFile]) -> Self {
        let count = |state: FileState| valid.iter().filter(|f| f.state == state).count();
        Self {
            uploaded: count(FileState::Success),
            failed: count(FileState::Error),
            rejected: invalid.len(),
            files: valid
                .iter()
                .chain(invalid.iter())
                .map(|f| SummaryRow {
                    name: truncate_string(&f.name, 60),
                    state: f.state,
                    url: f.url.clone(),
                    reason: f.reason.clone(),
                })
                .collect(),
        }
    }

    pub fn has_failures(&self) -> bool {
        self.failed > 0 || self.rejected > 0
    }
}

/// Truncate a string to max_len characters, appending "..." if truncated.
pub fn truncate_string(s: &str, max_len: usize) -> String {
    if s.chars().count() <= max_len {
        s.to_string()
    } else {
        let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
        format!("{}...", kept)
    }
}

/// Display name for a path, falling back to the full path.
pub fn display_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| path.display().to_string())
}

/// Initialize tracing for CLI binaries. Logs go to stderr so stdout stays JSON.
pub fn init_tracing() {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(test)]
mod tests {
    use super::*;
    use upkit_core::{classify, DefaultTranslator};

    #[test]
    fn truncate_string_short() {
        assert_eq!(truncate_string("hello", 10), "hello");
        assert_eq!(truncate_string("", 5), "");
    }

    #[test]
    fn truncate_string_long() {
        assert_eq!(truncate_string("hello world", 8), "hello...");
        assert_eq!(truncate_string("abc", 2), "...");
    }

    #[test]
    fn truncate_string_counts_chars() {
        assert_eq!(truncate_string("报告报告报告.pdf", 6), "报告报...");
    }

    #[test]
    fn apply_overrides_only_given_flags() {
        let base = UploadConfig::default().with_file_type(".png");
        let args = ConstraintArgs {
            max_size: Some("2".to_string()),
            single: true,
            ..Default::default()
        };
        let config = args.apply(base);
        assert_eq!(config.file_type, ".png");
        assert_eq!(config.max_size(), Some(2.0));
        assert!(!config.multiple);
        assert_eq!(config.content_field, "file");
    }

    #[test]
    fn apply_keeps_size_on_bad_input() {
        let base = UploadConfig::default().with_min_size(Some(1.0));
        let args = ConstraintArgs {
            min_size: Some("one".to_string()),
            ..Default::default()
        };
        assert_eq!(args.apply(base).min_size(), Some(1.0));
    }

    #[test]
    fn render_event_is_tagged() {
        let config = UploadConfig::default().with_file_type(".png");
        let result = classify(
            vec![FileCandidate::new("a.txt", b"x".to_vec())],
            &config,
            &DefaultTranslator::new(),
        );
        let line = render_event(&UploadEvent::Remove(result.invalid[0].clone())).unwrap();
        let json: serde_json::Value = serde_json::from_str(&line).unwrap();
        assert_eq!(json["event"], "remove");
        assert_eq!(json["data"]["name"], "a.txt");
        assert_eq!(json["data"]["state"], "error");
        assert_eq!(json["data"]["reason"], "file type error");
    }

    #[test]
    fn summary_counts_outcomes() {
        let config = UploadConfig::default().with_file_type(".png");
        let mut result = classify(
            vec![
                FileCandidate::new("a.png", b"x".to_vec()),
                FileCandidate::new("b.png", b"x".to_vec()),
                FileCandidate::new("c.txt", b"x".to_vec()),
            ],
            &config,
            &DefaultTranslator::new(),
        );
        result.valid[0].state = FileState::Success;
        result.valid[0].url = "/files/a.png".to_string();
        result.valid[1].state = FileState::Error;

        let summary = UploadSummary::new(&result.valid, &result.invalid);
        assert_eq!(summary.uploaded, 1);
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.rejected, 1);
        assert!(summary.has_failures());
        assert_eq!(summary.files.len(), 3);
        assert_eq!(summary.files[0].url, "/files/a.png");
    }

    #[test]
    fn display_name_uses_file_name() {
        assert_eq!(display_name(Path::new("/tmp/a/b.png")), "b.png");
    }

    #[tokio::test]
    async fn load_candidates_reads_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let a = dir.path().join("a.png");
        let b = dir.path().join("b.txt");
        std::fs::write(&a, b"aaaa").unwrap();
        std::fs::write(&b, b"bb").unwrap();

        let candidates = load_candidates(&[a, b]).await.unwrap();
        let names: Vec<&str> = candidates.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["a.png", "b.txt"]);
        assert_eq!(candidates[0].size, 4);
        assert_eq!(candidates[1].size, 2);
    }

    #[tokio::test]
    async fn load_candidates_reports_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_candidates(&[dir.path().join("nope.png")])
            .await
            .unwrap_err();
        assert!(err.to_string().contains("nope.png"));
    }
}
