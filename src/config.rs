//! Configuration types for a submission.
//!
//! Every knob for one submission lives in [`SubmissionConfig`], built via
//! [`SubmissionConfigBuilder`] or filled in field-by-field (all fields are
//! public, matching how the transport shell binds form inputs). A single
//! struct keeps a submission's parameters serialisable for logging and easy
//! to diff between two runs.

use crate::error::BinderError;
use serde::{Deserialize, Serialize};

/// Which pipeline composition turns the ordered inputs into the output PDF.
///
/// Both shipped as alternate designs of the same product; neither is a fix
/// for the other, so the choice is configuration rather than a constant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PipelineStrategy {
    /// Strategy A: one `convert` invocation over all inputs, with compression
    /// flags applied inline when requested. (default)
    #[default]
    ConvertOnly,
    /// Strategy B: `pdfunite` merges the inputs first; when compression is
    /// requested the merged bytes are piped through a second `convert` pass.
    MergeThenCompress,
}

/// Configuration for one submission (or one preview request).
///
/// # Example
/// ```rust
/// use bindery::SubmissionConfig;
///
/// let config = SubmissionConfig::builder()
///     .compress(true)
///     .image_density(150)
///     .quality(40)
///     .output_name("contract-bundle")
///     .build()
///     .unwrap();
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmissionConfig {
    /// Down-sample embedded raster content in the output. Default: true.
    pub compress: bool,

    /// Sampling density in DPI, applied as `-density {d}x{d}`. Must be ≥ 1.
    /// Default: 120.
    ///
    /// Validated even when `compress` is false so the form contract stays
    /// identical regardless of the checkbox state.
    pub image_density: u32,

    /// JPEG quality 1–100 for `-quality`. Default: 20.
    ///
    /// Also validated regardless of `compress`.
    pub quality: u32,

    /// Base name for the stored artifact (`.pdf` is appended). When `None`,
    /// a random 16-character opaque name is generated at submit time.
    ///
    /// Must not collide with an existing stored name; the collision check
    /// runs during validation, before any external tool is spawned.
    pub output_name: Option<String>,

    /// Pipeline composition. Default: [`PipelineStrategy::ConvertOnly`].
    pub strategy: PipelineStrategy,

    /// Deadline for each external tool invocation, in seconds. Default: 120.
    ///
    /// The original product had no timeout at all; this bounds worst-case
    /// request latency when a tool hangs on malformed input.
    pub command_timeout_secs: u64,
}

impl Default for SubmissionConfig {
    fn default() -> Self {
        Self {
            compress: true,
            image_density: 120,
            quality: 20,
            output_name: None,
            strategy: PipelineStrategy::default(),
            command_timeout_secs: 120,
        }
    }
}

impl SubmissionConfig {
    /// Create a new builder for `SubmissionConfig`.
    pub fn builder() -> SubmissionConfigBuilder {
        SubmissionConfigBuilder {
            config: Self::default(),
        }
    }
}

/// Builder for [`SubmissionConfig`].
#[derive(Debug)]
pub struct SubmissionConfigBuilder {
    config: SubmissionConfig,
}

impl SubmissionConfigBuilder {
    pub fn compress(mut self, v: bool) -> Self {
        self.config.compress = v;
        self
    }

    pub fn image_density(mut self, dpi: u32) -> Self {
        self.config.image_density = dpi;
        self
    }

    pub fn quality(mut self, q: u32) -> Self {
        self.config.quality = q;
        self
    }

    pub fn output_name(mut self, name: impl Into<String>) -> Self {
        self.config.output_name = Some(name.into());
        self
    }

    pub fn strategy(mut self, strategy: PipelineStrategy) -> Self {
        self.config.strategy = strategy;
        self
    }

    pub fn command_timeout_secs(mut self, secs: u64) -> Self {
        self.config.command_timeout_secs = secs;
        self
    }

    /// Build the configuration, validating range constraints.
    ///
    /// Submission-time validation in [`crate::session::Session::submit`]
    /// re-checks the same ranges (configs can also be constructed directly)
    /// and reports them as per-field errors; here a violation is a plain
    /// [`BinderError::InvalidConfig`].
    pub fn build(self) -> Result<SubmissionConfig, BinderError> {
        let c = &self.config;
        if c.image_density < 1 {
            return Err(BinderError::InvalidConfig(format!(
                "image density must be ≥ 1, got {}",
                c.image_density
            )));
        }
        if c.quality < 1 || c.quality > 100 {
            return Err(BinderError::InvalidConfig(format!(
                "quality must be 1–100, got {}",
                c.quality
            )));
        }
        if c.command_timeout_secs == 0 {
            return Err(BinderError::InvalidConfig(
                "command timeout must be ≥ 1s".into(),
            ));
        }
        Ok(self.config)
    }
}
