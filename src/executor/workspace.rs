//! Per-invocation scratch directory.

use crate::utils::config::{SOURCE_EXTENSION, WORKSPACE_PREFIX};
use crate::utils::error::ExecutorError;
use log::{debug, warn};
use std::cmp::Reverse;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Uniquely named directory, owned by one invocation and deleted on drop
///
/// **Public** - never shared between invocations
#[derive(Debug)]
pub struct Workspace {
    dir: TempDir,
}

impl Workspace {
    /// Create under the system temp root
    pub fn create() -> Result<Self, ExecutorError> {
        Self::create_in(&std::env::temp_dir())
    }

    pub fn create_in(root: &Path) -> Result<Self, ExecutorError> {
        let dir = tempfile::Builder::new()
            .prefix(WORKSPACE_PREFIX)
            .tempdir_in(root)
            .map_err(ExecutorError::Workspace)?;
        debug!("Created workspace {}", dir.path().display());
        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    /// Write `<stem>.java` and return its path
    pub fn write_source(&self, stem: &str, source: &str) -> Result<PathBuf, ExecutorError> {
        let file = self.path().join(format!("{}.{}", stem, SOURCE_EXTENSION));
        fs::write(&file, source).map_err(ExecutorError::Workspace)?;
        Ok(file)
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        remove_tree(self.dir.path());
        // TempDir's own drop finds nothing left and ignores the error
    }
}

/// Delete entries deepest first, then the root; failures are logged only
fn remove_tree(root: &Path) {
    let mut entries = Vec::new();
    collect_entries(root, &mut entries);
    entries.sort_by_key(|path| Reverse(path.components().count()));

    for entry in &entries {
        let is_dir = fs::symlink_metadata(entry)
            .map(|meta| meta.is_dir())
            .unwrap_or(false);
        let result = if is_dir {
            fs::remove_dir(entry)
        } else {
            fs::remove_file(entry)
        };
        if let Err(err) = result {
            warn!("Failed to delete {}: {}", entry.display(), err);
        }
    }

    if let Err(err) = fs::remove_dir(root) {
        warn!("Failed to delete workspace {}: {}", root.display(), err);
    } else {
        debug!("Deleted workspace {} ({} entries)", root.display(), entries.len());
    }
}

fn collect_entries(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(read_dir) = fs::read_dir(dir) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        let is_dir = entry.file_type().map(|ty| ty.is_dir()).unwrap_or(false);
        if is_dir {
            collect_entries(&path, out);
        }
        out.push(path);
    }
}
