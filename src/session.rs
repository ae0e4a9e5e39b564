//! The command surface the transport shell drives.
//!
//! One [`Session`] holds the paired-file working set for a user plus the
//! injected collaborators: the [`OutputStore`] and a [`ProcessRunner`].
//! Each command runs to completion inside one call — single-request,
//! blocking model with no background queue, no cross-submission
//! coordination, and no retries. Two submissions racing on the same output
//! name is last-writer-wins; the fail-fast existence check during
//! validation is deliberately not a race-free guarantee.

use std::sync::Arc;

use rand::distributions::Alphanumeric;
use rand::Rng;
use tracing::{debug, info};

use crate::config::SubmissionConfig;
use crate::error::{BinderError, FieldError};
use crate::ordering::{self, PairedFile, UploadedFile};
use crate::output::OutputArtifact;
use crate::pipeline::process::{ProcessRunner, SystemRunner};
use crate::pipeline::{preview, produce};
use crate::store::OutputStore;

/// MIME types accepted for submission inputs.
fn allowed_mime(content_type: &str) -> bool {
    content_type == "application/pdf" || content_type.starts_with("image/")
}

/// Length of generated opaque output names.
const RANDOM_NAME_LEN: usize = 16;

/// A user's working state plus the commands bound to the UI.
pub struct Session {
    store: OutputStore,
    runner: Arc<dyn ProcessRunner>,
    paired: Vec<PairedFile>,
}

impl Session {
    /// Create a session over an injected store and runner.
    pub fn new(store: OutputStore, runner: Arc<dyn ProcessRunner>) -> Self {
        Self {
            store,
            runner,
            paired: Vec::new(),
        }
    }

    /// Create a session that invokes the real external tools.
    pub fn with_system_runner(store: OutputStore) -> Self {
        Self::new(store, Arc::new(SystemRunner))
    }

    /// Current paired working set, in pairing order, for the UI.
    pub fn paired(&self) -> &[PairedFile] {
        &self.paired
    }

    /// The injected output store.
    pub fn store(&self) -> &OutputStore {
        &self.store
    }

    // ── Working-set commands ──────────────────────────────────────────────

    /// The raw upload set changed: re-derive the paired list from scratch.
    ///
    /// Files are sorted by filename (natural order) and given sequential
    /// order keys 1..N with removed flags reset — prior manual reordering
    /// and removal choices are discarded, by design.
    pub fn on_upload_set_changed(&mut self, files: Vec<UploadedFile>) {
        debug!(count = files.len(), "rebuilding paired working set");
        self.paired = ordering::pair_files(files);
    }

    /// Flip the removed flag on one paired entry.
    pub fn toggle_removed(&mut self, index: usize) -> Result<(), BinderError> {
        let len = self.paired.len();
        let entry = self
            .paired
            .get_mut(index)
            .ok_or(BinderError::NoSuchFile { index, len })?;
        entry.removed = !entry.removed;
        Ok(())
    }

    /// Set the merge-order key on one paired entry.
    ///
    /// Keys need not be unique or contiguous; ties break on filename at
    /// submit time.
    pub fn set_order(&mut self, index: usize, order: i64) -> Result<(), BinderError> {
        let len = self.paired.len();
        let entry = self
            .paired
            .get_mut(index)
            .ok_or(BinderError::NoSuchFile { index, len })?;
        entry.order = order;
        Ok(())
    }

    // ── Submission ────────────────────────────────────────────────────────

    /// Validate, order, run the pipeline, and persist one output artifact.
    ///
    /// Validation failures carry per-field errors and happen before any
    /// external process is spawned. Pipeline failures abort the whole
    /// submission with nothing persisted.
    pub async fn submit(&self, config: &SubmissionConfig) -> Result<OutputArtifact, BinderError> {
        self.validate_submission(config).await?;

        let base = match &config.output_name {
            Some(name) => name.clone(),
            None => random_name(),
        };

        let paths = ordering::merge_order(&self.paired);
        info!(
            inputs = paths.len(),
            output = %OutputStore::stored_name(&base),
            strategy = ?config.strategy,
            compress = config.compress,
            "starting submission"
        );

        let bytes = produce::produce(self.runner.as_ref(), &paths, config).await?;
        self.store.create(&base, &bytes).await
    }

    /// Synchronous wrapper around [`Session::submit`].
    ///
    /// Creates a temporary tokio runtime internally.
    pub fn submit_sync(&self, config: &SubmissionConfig) -> Result<OutputArtifact, BinderError> {
        tokio::runtime::Runtime::new()
            .map_err(|e| BinderError::Internal(format!("failed to create tokio runtime: {e}")))?
            .block_on(self.submit(config))
    }

    /// Collect every field violation for a submission.
    async fn validate_submission(&self, config: &SubmissionConfig) -> Result<(), BinderError> {
        let mut errors = Vec::new();

        if self.paired.is_empty() {
            errors.push(FieldError::new("files", "at least one file is required"));
        } else if self.paired.iter().all(|p| p.removed) {
            errors.push(FieldError::new(
                "files",
                "at least one file must remain in the merge",
            ));
        }

        for (i, entry) in self.paired.iter().enumerate() {
            if !allowed_mime(&entry.file.content_type) {
                errors.push(FieldError::new(
                    format!("files.{i}.file"),
                    format!(
                        "unsupported type '{}': must be application/pdf or image/*",
                        entry.file.content_type
                    ),
                ));
            }
        }

        validate_processing_fields(config, &mut errors);

        if let Some(name) = &config.output_name {
            match self.store.exists(&OutputStore::stored_name(name)).await {
                Ok(true) => {
                    errors.push(FieldError::new("output_filename", "name already exists"))
                }
                Ok(false) => {}
                Err(BinderError::InvalidName { .. }) => errors.push(FieldError::new(
                    "output_filename",
                    "must be a plain file name",
                )),
                Err(other) => return Err(other),
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(BinderError::Validation(errors))
        }
    }

    // ── Preview ───────────────────────────────────────────────────────────

    /// Displayable bytes for one paired entry, or `None` when the type has
    /// no preview. Never affects stored artifacts.
    pub async fn preview(
        &self,
        index: usize,
        config: &SubmissionConfig,
    ) -> Result<Option<Vec<u8>>, BinderError> {
        let mut errors = Vec::new();
        validate_processing_fields(config, &mut errors);
        if !errors.is_empty() {
            return Err(BinderError::Validation(errors));
        }

        let len = self.paired.len();
        let entry = self
            .paired
            .get(index)
            .ok_or(BinderError::NoSuchFile { index, len })?;

        preview::preview(self.runner.as_ref(), &entry.file, config).await
    }

    // ── Store passthroughs ────────────────────────────────────────────────

    /// Every stored artifact, newest first.
    pub async fn list_outputs(&self) -> Result<Vec<OutputArtifact>, BinderError> {
        self.store.list().await
    }

    /// Open a stored artifact for a download response.
    pub async fn download(&self, filename: &str) -> Result<tokio::fs::File, BinderError> {
        self.store.read_for_download(filename).await
    }

    /// Delete one stored artifact (no-op when absent).
    pub async fn delete(&self, filename: &str) -> Result<(), BinderError> {
        self.store.delete(filename).await
    }

    /// Delete every stored artifact; returns the count removed.
    pub async fn delete_all(&self) -> Result<usize, BinderError> {
        self.store.delete_all().await
    }
}

/// Density/quality checks shared by submit and preview: always enforced,
/// even when `compress` is false, so the form contract stays constant.
fn validate_processing_fields(config: &SubmissionConfig, errors: &mut Vec<FieldError>) {
    if config.image_density < 1 {
        errors.push(FieldError::new("image_density", "must be ≥ 1"));
    }
    if config.quality < 1 || config.quality > 100 {
        errors.push(FieldError::new("quality", "must be between 1 and 100"));
    }
}

/// Opaque 16-character alphanumeric base name for unnamed outputs.
fn random_name() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(RANDOM_NAME_LEN)
        .map(char::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_name_shape() {
        let name = random_name();
        assert_eq!(name.len(), RANDOM_NAME_LEN);
        assert!(name.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn mime_allow_list() {
        assert!(allowed_mime("application/pdf"));
        assert!(allowed_mime("image/png"));
        assert!(allowed_mime("image/jpeg"));
        assert!(!allowed_mime("text/plain"));
        assert!(!allowed_mime("application/zip"));
    }

    #[test]
    fn processing_field_validation_ignores_compress_flag() {
        let config = SubmissionConfig {
            compress: false,
            image_density: 0,
            quality: 200,
            ..Default::default()
        };
        let mut errors = Vec::new();
        validate_processing_fields(&config, &mut errors);
        let fields: Vec<&str> = errors.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["image_density", "quality"]);
    }
}
