//! Flat on-disk artifact store.
//!
//! One logical directory, no subdirectories, no metadata beyond filesystem
//! attributes. The store is constructed once with an explicit root and
//! injected into [`crate::session::Session`]; nothing in the crate touches
//! ambient/static disk state.
//!
//! The name-collision check happens during submission validation
//! ([`OutputStore::exists`]); check-then-create is not atomic against a
//! concurrent submission choosing the same name, and that race is accepted
//! (last writer wins) rather than locked away.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info};

use crate::error::BinderError;
use crate::output::OutputArtifact;

/// Suffix every stored artifact carries.
pub const PDF_SUFFIX: &str = ".pdf";

/// A flat, named collection of output PDFs under one root directory.
#[derive(Debug, Clone)]
pub struct OutputStore {
    root: PathBuf,
}

impl OutputStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl Into<PathBuf>) -> Result<Self, BinderError> {
        let root = root.into();
        fs::create_dir_all(&root)
            .await
            .map_err(|source| BinderError::Io {
                path: root.clone(),
                source,
            })?;
        Ok(Self { root })
    }

    /// The store's root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stored filename for a base name: `base + ".pdf"`.
    pub fn stored_name(base: &str) -> String {
        format!("{base}{PDF_SUFFIX}")
    }

    /// Resolve a stored filename inside the flat namespace.
    ///
    /// Separators and `..` are rejected so a name can never address anything
    /// outside the root (mindia-style key validation, collapsed to the flat
    /// single-directory case).
    fn resolve(&self, filename: &str) -> Result<PathBuf, BinderError> {
        if filename.is_empty()
            || filename.contains('/')
            || filename.contains('\\')
            || filename.contains("..")
        {
            return Err(BinderError::InvalidName {
                name: filename.to_string(),
            });
        }
        Ok(self.root.join(filename))
    }

    /// Does a stored file with this exact filename exist?
    ///
    /// A probe failure (unreadable root, symlink cycle) is an error, not
    /// "free": validation must not clear a name it could not actually check.
    pub async fn exists(&self, filename: &str) -> Result<bool, BinderError> {
        let path = self.resolve(filename)?;
        fs::try_exists(&path)
            .await
            .map_err(|source| BinderError::Io { path, source })
    }

    /// Persist output bytes under `base + ".pdf"` and return the artifact.
    ///
    /// Callers must have run the existence check during validation; an
    /// existing file with the same name is overwritten here (accepted race).
    pub async fn create(&self, base: &str, bytes: &[u8]) -> Result<OutputArtifact, BinderError> {
        let filename = Self::stored_name(base);
        let path = self.resolve(&filename)?;

        let mut file = fs::File::create(&path)
            .await
            .map_err(|source| BinderError::Io {
                path: path.clone(),
                source,
            })?;
        file.write_all(bytes)
            .await
            .map_err(|source| BinderError::Io {
                path: path.clone(),
                source,
            })?;
        file.sync_all()
            .await
            .map_err(|source| BinderError::Io {
                path: path.clone(),
                source,
            })?;

        info!(
            filename,
            size_bytes = bytes.len(),
            "stored output artifact"
        );

        Ok(OutputArtifact {
            filename,
            size: bytes.len() as u64,
            created_at: file_created_at(&path).await,
        })
    }

    /// Every stored `.pdf`, newest first. Files with other extensions in the
    /// same directory are silently ignored.
    pub async fn list(&self) -> Result<Vec<OutputArtifact>, BinderError> {
        let mut entries = fs::read_dir(&self.root)
            .await
            .map_err(|source| BinderError::Io {
                path: self.root.clone(),
                source,
            })?;

        let mut artifacts = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|source| BinderError::Io {
                path: self.root.clone(),
                source,
            })?
        {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some("pdf") {
                continue;
            }
            let Ok(meta) = entry.metadata().await else {
                continue;
            };
            if !meta.is_file() {
                continue;
            }
            let filename = match path.file_name().and_then(|n| n.to_str()) {
                Some(n) => n.to_string(),
                None => continue,
            };
            artifacts.push(OutputArtifact {
                filename,
                size: meta.len(),
                created_at: metadata_created_at(&meta),
            });
        }

        artifacts.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(artifacts)
    }

    /// Remove one stored artifact. Missing files are a no-op.
    pub async fn delete(&self, filename: &str) -> Result<(), BinderError> {
        let path = self.resolve(filename)?;
        match fs::remove_file(&path).await {
            Ok(()) => {
                debug!(filename, "deleted output artifact");
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(BinderError::Io { path, source }),
        }
    }

    /// Delete everything [`Self::list`] matches, sequentially.
    ///
    /// No rollback on interruption; a partial deletion is an acceptable
    /// terminal state. Returns the number of artifacts removed.
    pub async fn delete_all(&self) -> Result<usize, BinderError> {
        let artifacts = self.list().await?;
        let mut removed = 0;
        for artifact in &artifacts {
            self.delete(&artifact.filename).await?;
            removed += 1;
        }
        info!(removed, "cleared output store");
        Ok(removed)
    }

    /// Open a stored artifact for the transport layer's download response.
    ///
    /// Missing files are [`BinderError::NotFound`] — a caller-facing
    /// condition, never a pipeline failure.
    pub async fn read_for_download(&self, filename: &str) -> Result<fs::File, BinderError> {
        let path = self.resolve(filename)?;
        match fs::File::open(&path).await {
            Ok(file) => Ok(file),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(BinderError::NotFound {
                name: filename.to_string(),
            }),
            Err(source) => Err(BinderError::Io { path, source }),
        }
    }
}

/// Filesystem creation time, falling back to mtime where the platform does
/// not expose btime, then to "now" as a last resort.
async fn file_created_at(path: &Path) -> DateTime<Utc> {
    match fs::metadata(path).await {
        Ok(meta) => metadata_created_at(&meta),
        Err(_) => Utc::now(),
    }
}

fn metadata_created_at(meta: &std::fs::Metadata) -> DateTime<Utc> {
    meta.created()
        .or_else(|_| meta.modified())
        .map(DateTime::<Utc>::from)
        .unwrap_or_else(|_| Utc::now())
}
