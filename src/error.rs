//! Error types for the bindery library.
//!
//! Three failure families map onto three places a submission can die:
//!
//! * **Validation** — the submission was rejected before any external tool
//!   ran. Carries one [`FieldError`] per offending field so a form layer can
//!   attach messages next to the right inputs. No side effects have occurred.
//!
//! * **Pipeline** — an external tool was spawned and something went wrong
//!   ([`BinderError::StageFailed`], [`BinderError::CommandTimeout`],
//!   [`BinderError::SpawnFailed`]). The whole submission or preview is
//!   aborted and nothing is persisted.
//!
//! * **Store** — filesystem-level problems. A missing artifact on
//!   download/delete is [`BinderError::NotFound`], reported to the caller
//!   as-is and never escalated to a pipeline failure.
//!
//! No error is retried; every failure is terminal for its request.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// A single rejected submission field.
///
/// `field` uses the dotted form the transport layer understands, e.g.
/// `files.2.file` for the third paired file's content type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Which external stage of the document pipeline failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineStage {
    /// PDF merge (`pdfunite`).
    Merge,
    /// Raster/document conversion (`convert`).
    Convert,
    /// First-page extraction (`pdfseparate`).
    Extract,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PipelineStage::Merge => write!(f, "merge"),
            PipelineStage::Convert => write!(f, "convert"),
            PipelineStage::Extract => write!(f, "extract"),
        }
    }
}

/// All errors returned by the bindery library.
#[derive(Debug, Error)]
pub enum BinderError {
    // ── Validation errors ─────────────────────────────────────────────────
    /// One or more submission fields were rejected. Raised before any
    /// external process is spawned; the store is untouched.
    #[error("validation failed: {}", format_field_errors(.0))]
    Validation(Vec<FieldError>),

    /// Builder-level configuration error.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A paired-file index from the UI does not exist in the working set.
    #[error("no paired file at index {index} (working set has {len})")]
    NoSuchFile { index: usize, len: usize },

    // ── Pipeline errors ───────────────────────────────────────────────────
    /// An external tool exited non-zero. The submission or preview that
    /// triggered it is aborted wholesale.
    #[error("{stage} stage failed: `{tool}` exited with {status}: {stderr}")]
    StageFailed {
        stage: PipelineStage,
        tool: String,
        /// Exit status display, or "signal" when the process was killed.
        status: String,
        /// Trimmed stderr tail for operator visibility.
        stderr: String,
    },

    /// An external tool could not be started at all (typically not
    /// installed or not on PATH).
    #[error("failed to start `{tool}`: {source}\nIs it installed and on PATH?")]
    SpawnFailed {
        tool: String,
        #[source]
        source: std::io::Error,
    },

    /// An external tool ran past the configured deadline and was killed.
    #[error("`{tool}` timed out after {secs}s")]
    CommandTimeout { tool: String, secs: u64 },

    // ── Store errors ──────────────────────────────────────────────────────
    /// Requested artifact is not in the store.
    #[error("no stored output named '{name}'")]
    NotFound { name: String },

    /// A stored name escaped the flat namespace (path separators, `..`).
    #[error("invalid artifact name '{name}': must be a plain file name")]
    InvalidName { name: String },

    /// Filesystem failure with path context.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    // ── Catch-all ─────────────────────────────────────────────────────────
    /// Unexpected internal error.
    #[error("internal error: {0}")]
    Internal(String),
}

impl BinderError {
    /// Convenience constructor for a single-field validation failure.
    pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
        BinderError::Validation(vec![FieldError::new(field, message)])
    }

    /// True when the error is the fail-fast validation kind (no side
    /// effects have occurred).
    pub fn is_validation(&self) -> bool {
        matches!(self, BinderError::Validation(_))
    }
}

fn format_field_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| e.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}
