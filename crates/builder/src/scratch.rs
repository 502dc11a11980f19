//! Per-run scratch directory

use formula_errors::Error;
use formula_types::KeepScratch;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Fresh working directory for one run
///
/// Dropping it removes the directory; [`ScratchDir::finish`] applies the
/// retention policy instead.
#[derive(Debug)]
pub struct ScratchDir {
    dir: TempDir,
}

impl ScratchDir {
    /// Create `<root>/formula-<name>-XXXXXX`
    ///
    /// # Errors
    ///
    /// Returns an error if the directory cannot be created.
    pub fn create(root: &Path, name: &str) -> Result<Self, Error> {
        std::fs::create_dir_all(root).map_err(|e| Error::io_with_path(&e, root))?;
        let dir = tempfile::Builder::new()
            .prefix(&format!("formula-{name}-"))
            .tempdir_in(root)
            .map_err(|e| Error::io_with_path(&e, root))?;
        Ok(Self { dir })
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Close the scratch directory according to `policy`
    ///
    /// Returns the path when the directory was kept. Removal failures are
    /// logged rather than returned so they never mask the run's outcome.
    pub fn finish(self, policy: KeepScratch, succeeded: bool) -> Option<PathBuf> {
        if policy.should_keep(succeeded) {
            let path = self.dir.keep();
            tracing::info!(path = %path.display(), "keeping scratch directory");
            return Some(path);
        }

        let path = self.dir.path().to_path_buf();
        if let Err(e) = self.dir.close() {
            tracing::warn!(path = %path.display(), error = %e, "failed to remove scratch directory");
        }
        None
    }
}
