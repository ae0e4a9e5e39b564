//! # bindery
//!
//! Collate a set of uploaded PDF/image files into one output PDF.
//!
//! Users reorder and exclude inputs, optionally down-sample embedded raster
//! content, and manage the produced artifacts in a flat on-disk store. The
//! heavy lifting — merging, conversion, compression, page extraction — is
//! delegated to the standard external tools (ImageMagick `convert`, poppler
//! `pdfunite`/`pdfseparate`) over process pipes; this crate owns the
//! ordering, composition, and persistence around them.
//!
//! ## Pipeline overview
//!
//! ```text
//! uploads
//!  │
//!  ├─ 1. Pair     sort by filename, assign order keys 1..N
//!  ├─ 2. Edit     user reorders / toggles removal (session state)
//!  ├─ 3. Order    filter removed, sort by (order-as-string, filename)
//!  ├─ 4. Produce  Strategy A: convert … pdf:-
//!  │              Strategy B: pdfunite … │ convert … - pdf:-
//!  └─ 5. Store    name + ".pdf" in the flat output store
//! ```
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use bindery::{Session, OutputStore, SubmissionConfig, UploadedFile};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = OutputStore::open("/var/lib/bindery/outputs").await?;
//!     let mut session = Session::with_system_runner(store);
//!
//!     session.on_upload_set_changed(vec![UploadedFile {
//!         original_name: "scan-1.pdf".into(),
//!         content_type: "application/pdf".into(),
//!         size: 48_213,
//!         path: "/tmp/upload-aa81".into(),
//!     }]);
//!
//!     let config = SubmissionConfig::builder()
//!         .output_name("bundle")
//!         .build()?;
//!     let artifact = session.submit(&config).await?;
//!     println!("{} ({})", artifact.filename, artifact.display_size());
//!     Ok(())
//! }
//! ```
//!
//! ## Feature flags
//!
//! | Feature | Default | Description |
//! |---------|---------|-------------|
//! | `cli`   | on      | Enables the `bindery` binary (clap + anyhow + tracing-subscriber) |
//!
//! Disable `cli` when using only the library:
//! ```toml
//! bindery = { version = "0.1", default-features = false }
//! ```

// ── Modules ──────────────────────────────────────────────────────────────

pub mod config;
pub mod error;
pub mod ordering;
pub mod output;
pub mod pipeline;
pub mod session;
pub mod store;

// ── Re-exports ───────────────────────────────────────────────────────────

pub use config::{PipelineStrategy, SubmissionConfig, SubmissionConfigBuilder};
pub use error::{BinderError, FieldError, PipelineStage};
pub use ordering::{merge_order, natural_cmp, pair_files, PairedFile, UploadedFile};
pub use output::{human_size, relative_age, OutputArtifact};
pub use pipeline::process::{ProcessRunner, SystemRunner};
pub use session::Session;
pub use store::OutputStore;
