//! Source staging — scoped ownership of the build-tree source file.
//!
//! The external build tool reads the target's source from one fixed path.
//! [`SourceSlot::stage`] writes a candidate there and returns a
//! [`StagedSource`] guard; [`StagedSource::restore`] writes the original
//! back. If the guard is dropped without an explicit restore (a panic or an
//! early return) the `Drop` impl restores and logs any failure.

use crate::error::{EvalError, EvalResult};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// The build-tree location of a target's source and its original content.
#[derive(Debug, Clone)]
pub struct SourceSlot {
    path: PathBuf,
    original: Arc<str>,
}

impl SourceSlot {
    /// Read the current file content as the original.
    pub fn open(path: impl AsRef<Path>) -> EvalResult<Self> {
        let path = path.as_ref().to_path_buf();
        let original =
            std::fs::read_to_string(&path).map_err(|e| EvalError::io(path.clone(), e))?;
        Ok(Self {
            path,
            original: Arc::from(original),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Write `candidate` into the build tree.
    ///
    /// If the write itself fails the original is put back before the error
    /// is returned.
    pub fn stage(&self, candidate: &str) -> EvalResult<StagedSource> {
        let mut staged = StagedSource {
            path: self.path.clone(),
            original: Arc::clone(&self.original),
            candidate: Arc::from(candidate),
            restored: false,
        };
        if let Err(e) = std::fs::write(&self.path, candidate) {
            staged.restore()?;
            return Err(EvalError::io(self.path.clone(), e));
        }
        tracing::debug!(path = %self.path.display(), lines = candidate.lines().count(), "Staged candidate");
        Ok(staged)
    }
}

/// A candidate currently written into the build tree.
#[derive(Debug)]
pub struct StagedSource {
    path: PathBuf,
    original: Arc<str>,
    candidate: Arc<str>,
    restored: bool,
}

impl StagedSource {
    /// The candidate source that is in place.
    pub fn candidate(&self) -> &str {
        &self.candidate
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Write the original content back.
    pub fn restore(&mut self) -> EvalResult<()> {
        std::fs::write(&self.path, self.original.as_bytes()).map_err(|source| {
            EvalError::Restore {
                path: self.path.clone(),
                source,
            }
        })?;
        self.restored = true;
        Ok(())
    }
}

impl Drop for StagedSource {
    fn drop(&mut self) {
        if self.restored {
            return;
        }
        if let Err(e) = self.restore() {
            tracing::error!(error = %e, "Build tree left with candidate source");
        }
    }
}
