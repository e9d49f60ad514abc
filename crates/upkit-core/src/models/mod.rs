//! Domain models for the upload pipeline

pub mod event;
pub mod file;

pub use event::UploadEvent;
pub use file::{FileCandidate, FileId, FileState, TrackedFile};
