//! Temporary artifact store: uniquely named on-disk blobs with scoped cleanup.
//!
//! An [`Artifact`] owns its path through a [`tempfile::TempPath`], so the file
//! is deleted when the handle is dropped, whichever way the owning job exits.
//! [`Artifact::release`] does the same deletion eagerly and reports failures;
//! deleting a file that is already gone counts as success.

use crate::error::ConvertError;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tempfile::TempPath;
use tracing::{debug, warn};

/// File name prefix of every artifact the store creates.
pub const ARTIFACT_PREFIX: &str = "docbot-";

/// Creates artifacts under one root directory.
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
}

impl ArtifactStore {
    /// Open (and create if needed) the store rooted at `root`.
    pub fn open(root: impl Into<PathBuf>) -> Result<Self, ConvertError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| ConvertError::storage(&root, e))?;
        debug!("Artifact store at {}", root.display());
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create a new, empty, uniquely named file ending in `.{extension}`.
    ///
    /// Names carry 12 random characters, and the file is created with
    /// `O_EXCL`, so concurrent acquisitions never share a path.
    pub fn acquire(&self, extension: &str) -> Result<Artifact, ConvertError> {
        let suffix = format!(".{}", extension.trim_start_matches('.'));
        let file = tempfile::Builder::new()
            .prefix(ARTIFACT_PREFIX)
            .suffix(&suffix)
            .rand_bytes(12)
            .tempfile_in(&self.root)
            .map_err(|e| ConvertError::storage(&self.root, e))?;

        let artifact = Artifact {
            path: file.into_temp_path(),
        };
        debug!("Acquired artifact {}", artifact.path().display());
        Ok(artifact)
    }

    /// Guard the sibling path `<stem of artifact>.{extension}`.
    ///
    /// Nothing is created; the returned handle only owns the deletion of
    /// whatever a tool later writes there.
    pub fn companion(&self, artifact: &Artifact, extension: &str) -> Result<Artifact, ConvertError> {
        let extension = extension.trim_start_matches('.');
        let current = artifact.path().extension().and_then(|e| e.to_str());
        if current == Some(extension) {
            return Err(ConvertError::Internal(format!(
                "companion of '{}' would alias it",
                artifact.path().display()
            )));
        }

        Ok(Artifact {
            path: TempPath::from_path(artifact.path().with_extension(extension)),
        })
    }
}

/// One temporary file, deleted on release or drop.
#[derive(Debug)]
pub struct Artifact {
    path: TempPath,
}

impl Artifact {
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    pub async fn write(&self, bytes: &[u8]) -> Result<(), ConvertError> {
        tokio::fs::write(self.path(), bytes)
            .await
            .map_err(|e| ConvertError::storage(self.path(), e))
    }

    pub async fn read(&self) -> Result<Vec<u8>, ConvertError> {
        tokio::fs::read(self.path())
            .await
            .map_err(|e| ConvertError::storage(self.path(), e))
    }

    /// Delete the file now. Idempotent: a missing file is not an error.
    pub fn release(self) -> Result<(), ConvertError> {
        let path = self.path.to_path_buf();
        match self.path.close() {
            Ok(()) => {
                debug!("Released artifact {}", path.display());
                Ok(())
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => {
                warn!("Failed to release artifact {}: {}", path.display(), e);
                Err(ConvertError::storage(path, e))
            }
        }
    }
}
