use serde::Serialize;

use super::file::TrackedFile;

/// Observable pipeline output delivered to the host.
///
/// Batch-level events carry a snapshot of the whole valid set at emission time.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "event", content = "data", rename_all = "lowercase")]
pub enum UploadEvent {
    /// A submitted batch put at least one file in the upload backlog.
    Start(Vec<TrackedFile>),
    /// One upload finished, successfully or not.
    Progress(TrackedFile),
    /// Every valid file has reached `success` or `error`.
    Complete(Vec<TrackedFile>),
    /// A tracked file was removed on request.
    Remove(TrackedFile),
    /// Deprecated mirror of `Complete`, also fired when a removal empties the backlog.
    Update(Vec<TrackedFile>),
}

impl UploadEvent {
    pub fn name(&self) -> &'static str {
        match self {
            UploadEvent::Start(_) => "start",
            UploadEvent::Progress(_) => "progress",
            UploadEvent::Complete(_) => "complete",
            UploadEvent::Remove(_) => "remove",
            UploadEvent::Update(_) => "update",
        }
    }
}
