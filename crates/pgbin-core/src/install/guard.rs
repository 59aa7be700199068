//! RAII guard that removes the temporary archive when dropped.

use std::io;
use std::path::{Path, PathBuf};

pub(super) struct TempArchive {
    path: PathBuf,
}

impl TempArchive {
    pub(super) fn new(path: PathBuf) -> Self {
        Self { path }
    }

    pub(super) fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now; a file that is already gone is not an error.
    pub(super) fn remove(&self) -> io::Result<()> {
        match std::fs::remove_file(&self.path) {
            Err(e) if e.kind() != io::ErrorKind::NotFound => Err(e),
            _ => Ok(()),
        }
    }
}

impl Drop for TempArchive {
    fn drop(&mut self) {
        if let Err(e) = self.remove() {
            tracing::warn!(path = %self.path.display(), "cannot remove temporary archive: {}", e);
        }
    }
}
