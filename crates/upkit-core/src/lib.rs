//! upkit Core Library
//!
//! This crate provides the upload pipeline shared by all upkit front ends: the
//! tracked-file model, the constraint set, the classifier, the upload queue state
//! machine, and the async pipeline driver that pushes files to a remote endpoint
//! with at most [`MAX_CONCURRENT_UPLOADS`] requests in flight.
//!
//! The HTTP transport and the translation lookup are collaborators consumed through
//! the [`UploadTransport`] and [`Translator`] traits.

pub mod classify;
pub mod config;
pub mod error;
pub mod models;
pub mod pipeline;
pub mod queue;
pub mod translate;
pub mod transport;

// Re-export commonly used types
pub use classify::{classify, Classification};
pub use config::UploadConfig;
pub use error::{LogLevel, UploadError};
pub use models::{FileCandidate, FileId, FileState, TrackedFile, UploadEvent};
pub use pipeline::{PipelineSnapshot, UploadPipeline};
pub use queue::{UploadJob, UploadQueue, MAX_CONCURRENT_UPLOADS};
pub use translate::{DefaultTranslator, KeyTranslator, Translator};
pub use transport::{MultipartPayload, TransportError, UploadTransport};
