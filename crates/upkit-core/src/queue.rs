//! Upload queue: the valid/invalid sets and their state machine.
//!
//! `UploadQueue` performs no I/O. Callers submit batches, run the [`UploadJob`]s
//! it hands back, and report outcomes with [`UploadQueue::finish`]. Admitted
//! files are already `loading` when a job is returned. Events accumulate in an
//! outbox drained with [`UploadQueue::take_events`].
//!
//! Admission order is the order of pending files in the valid set, and at most
//! [`MAX_CONCURRENT_UPLOADS`] files are `loading` at any time.

use std::sync::Arc;

use percent_encoding::{utf8_percent_encode, AsciiSet, NON_ALPHANUMERIC};

use crate::classify::classify;
use crate::config::UploadConfig;
use crate::error::UploadError;
use crate::models::{FileCandidate, FileId, FileState, TrackedFile, UploadEvent};
use crate::translate::{transport_error_key, Translator};
use crate::transport::{MultipartPayload, TransportError};

/// Maximum number of uploads in flight per queue.
pub const MAX_CONCURRENT_UPLOADS: usize = 5;

/// Characters left unescaped by `encodeURI`.
const URI_ENCODE_SET: &AsciiSet = &NON_ALPHANUMERIC
    .remove(b';')
    .remove(b',')
    .remove(b'/')
    .remove(b'?')
    .remove(b':')
    .remove(b'@')
    .remove(b'&')
    .remove(b'=')
    .remove(b'+')
    .remove(b'$')
    .remove(b'-')
    .remove(b'_')
    .remove(b'.')
    .remove(b'!')
    .remove(b'~')
    .remove(b'*')
    .remove(b'\'')
    .remove(b'(')
    .remove(b')')
    .remove(b'#');

/// Encode a file name the way browsers' `encodeURI` does.
pub fn encode_file_name(name: &str) -> String {
    utf8_percent_encode(name, URI_ENCODE_SET).to_string()
}

/// One admitted upload, ready to hand to a transport.
#[derive(Debug, Clone)]
pub struct UploadJob {
    pub file_id: FileId,
    pub endpoint: String,
    pub payload: MultipartPayload,
}

pub struct UploadQueue {
    config: UploadConfig,
    translator: Arc<dyn Translator>,
    valid: Vec<TrackedFile>,
    invalid: Vec<TrackedFile>,
    events: Vec<UploadEvent>,
    admitting: bool,
}

impl UploadQueue {
    pub fn new(config: UploadConfig, translator: Arc<dyn Translator>) -> Self {
        Self {
            config,
            translator,
            valid: Vec::new(),
            invalid: Vec::new(),
            events: Vec::new(),
            admitting: true,
        }
    }

    pub fn config(&self) -> &UploadConfig {
        &self.config
    }

    /// Replace the constraint set. Tracked files are left as they are.
    pub fn set_config(&mut self, config: UploadConfig) {
        self.config = config;
    }

    /// Open or close admission. While closed, files stay `pause` and no jobs
    /// are handed out.
    pub fn set_admitting(&mut self, admitting: bool) {
        self.admitting = admitting;
    }

    pub fn valid_files(&self) -> &[TrackedFile] {
        &self.valid
    }

    pub fn invalid_files(&self) -> &[TrackedFile] {
        &self.invalid
    }

    /// Valid files followed by invalid files.
    pub fn all_files(&self) -> Vec<TrackedFile> {
        self.valid.iter().chain(self.invalid.iter()).cloned().collect()
    }

    pub fn get(&self, id: FileId) -> Option<&TrackedFile> {
        self.valid
            .iter()
            .chain(self.invalid.iter())
            .find(|f| f.id == id)
    }

    pub fn loading_count(&self) -> usize {
        self.count_in(FileState::Loading)
    }

    pub fn pending_count(&self) -> usize {
        self.count_in(FileState::Pause)
    }

    /// No valid file is waiting or uploading.
    pub fn is_settled(&self) -> bool {
        !self.valid.iter().any(|f| f.state.is_unsettled())
    }

    /// Drain the event outbox in emission order.
    pub fn take_events(&mut self) -> Vec<UploadEvent> {
        std::mem::take(&mut self.events)
    }

    /// Classify a batch and admit pending files up to the concurrency ceiling.
    ///
    /// Returns the admitted jobs in admission order. The `start` event is
    /// recorded after admission, so it shows those files as `loading`. An empty
    /// batch is a no-op.
    pub fn submit(&mut self, batch: Vec<FileCandidate>) -> Vec<UploadJob> {
        if batch.is_empty() {
            UploadError::NoFiles.log();
            return Vec::new();
        }

        if !self.config.multiple {
            self.clear();
        }

        let classified = classify(batch, &self.config, self.translator.as_ref());
        tracing::debug!(
            valid = classified.valid.len(),
            invalid = classified.invalid.len(),
            "Batch classified"
        );
        self.valid.extend(classified.valid);
        self.invalid.extend(classified.invalid);

        if self.pending_count() == 0 {
            return Vec::new();
        }

        let slots = MAX_CONCURRENT_UPLOADS.saturating_sub(self.loading_count());
        let jobs = self.admit(slots);
        self.events.push(UploadEvent::Start(self.valid.clone()));
        jobs
    }

    /// Move a pending file to `loading` and build its request.
    ///
    /// Returns `None` if the file is not a pending valid file.
    fn begin(&mut self, id: FileId) -> Option<UploadJob> {
        if self.loading_count() >= MAX_CONCURRENT_UPLOADS {
            tracing::warn!(file_id = %id, "Concurrency ceiling reached, not starting upload");
            return None;
        }

        let endpoint = self.config.target_url.clone();
        let content_field = self.config.content_field.clone();
        let filename_field = self.config.filename_field().map(str::to_string);

        let file = self
            .valid
            .iter_mut()
            .find(|f| f.id == id && f.state == FileState::Pause)?;
        file.state = FileState::Loading;

        let payload = MultipartPayload {
            content_field,
            file_name: file.name.clone(),
            content: file.file.content.clone(),
            filename_part: filename_field.map(|field| (field, encode_file_name(&file.name))),
        };

        Some(UploadJob {
            file_id: id,
            endpoint,
            payload,
        })
    }

    /// Record the outcome of an upload and refill the freed slot.
    ///
    /// Returns the job admitted into the freed slot, if any. Outcomes for files
    /// that are no longer tracked are discarded, but the slot is still refilled.
    pub fn finish(
        &mut self,
        id: FileId,
        outcome: Result<String, TransportError>,
    ) -> Vec<UploadJob> {
        let translator = Arc::clone(&self.translator);
        match self
            .valid
            .iter_mut()
            .find(|f| f.id == id && f.state == FileState::Loading)
        {
            Some(file) => {
                match outcome {
                    Ok(url) => {
                        file.state = FileState::Success;
                        file.url = url;
                        file.reason.clear();
                    }
                    Err(e) => {
                        file.state = FileState::Error;
                        file.reason = translator.resolve(&transport_error_key(&e.status_text));
                    }
                }
                self.events.push(UploadEvent::Progress(file.clone()));
            }
            None => {
                tracing::debug!(file_id = %id, "Upload finished for untracked file, discarding result");
            }
        }

        let next = self.admit(1);
        if next.is_empty() && self.is_settled() {
            self.events.push(UploadEvent::Complete(self.valid.clone()));
            self.events.push(UploadEvent::Update(self.valid.clone()));
        }
        next
    }

    /// Stop tracking a file. Unknown ids are ignored.
    pub fn remove(&mut self, id: FileId) -> Option<TrackedFile> {
        if let Some(index) = self.valid.iter().position(|f| f.id == id) {
            let file = self.valid.remove(index);
            self.events.push(UploadEvent::Remove(file.clone()));
            if self.is_settled() {
                self.events.push(UploadEvent::Update(self.valid.clone()));
            }
            return Some(file);
        }

        if let Some(index) = self.invalid.iter().position(|f| f.id == id) {
            let file = self.invalid.remove(index);
            self.events.push(UploadEvent::Remove(file.clone()));
            return Some(file);
        }

        tracing::debug!(file_id = %id, "Remove requested for untracked file");
        None
    }

    /// Forget every tracked file. Emits nothing.
    pub fn clear(&mut self) {
        self.valid.clear();
        self.invalid.clear();
    }

    fn count_in(&self, state: FileState) -> usize {
        self.valid.iter().filter(|f| f.state == state).count()
    }

    fn admit(&mut self, limit: usize) -> Vec<UploadJob> {
        if !self.admitting {
            return Vec::new();
        }
        self.next_pending(limit)
            .into_iter()
            .filter_map(|id| self.begin(id))
            .collect()
    }

    fn next_pending(&self, limit: usize) -> Vec<FileId> {
        self.valid
            .iter()
            .filter(|f| f.state == FileState::Pause)
            .take(limit)
            .map(|f| f.id)
            .collect()
    }
}
