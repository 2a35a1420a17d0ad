//! Kernel binary blobs
//!
//! Precompiled kernels are read-only byte sequences loaded by name from a
//! filesystem directory. Absence is a reportable resource-not-found
//! condition, never a crash.

use std::path::PathBuf;

use crate::runner::CaseError;

/// Loads kernel binaries by name from a root directory
#[derive(Debug, Clone)]
pub struct BlobStore {
    root: PathBuf,
}

impl BlobStore {
    /// Create a store rooted at `root`
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    /// The store's root directory
    #[must_use]
    pub fn root(&self) -> &PathBuf {
        &self.root
    }

    /// Load the blob named `name`
    ///
    /// # Errors
    ///
    /// Returns `CaseError::ResourceNotFound` when the file is missing or
    /// unreadable.
    pub fn load(&self, name: &str) -> Result<Vec<u8>, CaseError> {
        let path = self.root.join(name);
        std::fs::read(&path)
            .map_err(|err| CaseError::ResourceNotFound(format!("{}: {err}", path.display())))
    }
}
