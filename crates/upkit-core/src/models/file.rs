use std::fmt;
use std::path::Path;

use bytes::Bytes;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identity of a tracked file, assigned at classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FileId(Uuid);

impl FileId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for FileId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FileId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// A file selected by the user. Immutable once selected.
#[derive(Debug, Clone)]
pub struct FileCandidate {
    pub name: String,
    pub content: Bytes,
    /// Size in bytes. Normally `content.len()`.
    pub size: u64,
}

impl FileCandidate {
    pub fn new(name: impl Into<String>, content: impl Into<Bytes>) -> Self {
        let content = content.into();
        Self {
            name: name.into(),
            size: content.len() as u64,
            content,
        }
    }

    /// Read a local file into a candidate named after its final path component.
    pub async fn from_path(path: impl AsRef<Path>) -> std::io::Result<Self> {
        let path = path.as_ref();
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                std::io::Error::new(
                    std::io::ErrorKind::InvalidInput,
                    format!("Invalid file name: {}", path.display()),
                )
            })?
            .to_string();
        let content = tokio::fs::read(path).await?;
        Ok(Self::new(name, content))
    }
}

/// Upload lifecycle state of a tracked file.
///
/// Valid files move `Pause -> Loading -> {Success, Error}`; invalid files are
/// created directly in `Error`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileState {
    Pause,
    Loading,
    Success,
    Error,
}

impl FileState {
    pub fn as_str(&self) -> &'static str {
        match self {
            FileState::Pause => "pause",
            FileState::Loading => "loading",
            FileState::Success => "success",
            FileState::Error => "error",
        }
    }

    /// Still waiting for, or in the middle of, an upload.
    pub fn is_unsettled(&self) -> bool {
        matches!(self, FileState::Pause | FileState::Loading)
    }
}

impl fmt::Display for FileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The pipeline's record of one file's upload lifecycle.
#[derive(Debug, Clone, Serialize)]
pub struct TrackedFile {
    pub id: FileId,
    pub name: String,
    /// Server-assigned address, set only on success.
    pub url: String,
    #[serde(skip)]
    pub file: FileCandidate,
    /// Human-readable cause, set only on error.
    pub reason: String,
    pub state: FileState,
}

impl TrackedFile {
    pub(crate) fn pending(file: FileCandidate) -> Self {
        Self {
            id: FileId::new(),
            name: file.name.clone(),
            url: String::new(),
            file,
            reason: String::new(),
            state: FileState::Pause,
        }
    }

    pub(crate) fn rejected(file: FileCandidate, reason: String) -> Self {
        Self {
            id: FileId::new(),
            name: file.name.clone(),
            url: String::new(),
            file,
            reason,
            state: FileState::Error,
        }
    }

    pub fn size(&self) -> u64 {
        self.file.size
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn candidate_size_follows_content() {
        let candidate = FileCandidate::new("a.png", vec![0u8; 1024]);
        assert_eq!(candidate.size, 1024);
        assert_eq!(candidate.name, "a.png");
    }

    #[test]
    fn tracked_file_serializes_without_content() {
        let file = TrackedFile::pending(FileCandidate::new("a.png", vec![1, 2, 3]));
        let json = serde_json::to_value(&file).unwrap();
        assert_eq!(json["name"], "a.png");
        assert_eq!(json["state"], "pause");
        assert_eq!(json["url"], "");
        assert!(json.get("file").is_none());
    }

    #[test]
    fn file_ids_are_unique() {
        assert_ne!(FileId::new(), FileId::new());
    }

    #[test]
    fn unsettled_states() {
        assert!(FileState::Pause.is_unsettled());
        assert!(FileState::Loading.is_unsettled());
        assert!(!FileState::Success.is_unsettled());
        assert!(!FileState::Error.is_unsettled());
    }

    #[tokio::test]
    async fn candidate_from_path_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.PDF");
        std::fs::write(&path, b"%PDF-1.4").unwrap();

        let candidate = FileCandidate::from_path(&path).await.unwrap();
        assert_eq!(candidate.name, "report.PDF");
        assert_eq!(candidate.size, 8);
        assert_eq!(&candidate.content[..], b"%PDF-1.4");
    }

    #[tokio::test]
    async fn candidate_from_missing_path_fails() {
        let dir = tempfile::tempdir().unwrap();
        let result = FileCandidate::from_path(dir.path().join("missing.png")).await;
        assert!(result.is_err());
    }
}
