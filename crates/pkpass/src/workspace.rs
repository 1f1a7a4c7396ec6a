//! Per-build temporary directory.
//!
//! Every build gets its own directory under a shared root, named
//! `PKPass<timestamp>.<random>` and created atomically, so builds running at
//! the same time (in this process or another) never see each other's files.
//! The directory is removed when the [`Workspace`] is released or dropped,
//! whichever comes first.

use crate::{Error, Result};
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};
use tempfile::TempDir;

/// Prefix of every workspace directory name.
pub const WORKSPACE_PREFIX: &str = "PKPass";

const RANDOM_SUFFIX_LEN: usize = 12;

/// Transient files a build writes into its workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WorkspaceFile {
    /// The serialized manifest that gets signed.
    Manifest,
    /// Detached signature over the manifest.
    Signature,
    /// The packed `.pkpass` before it is read back.
    Archive,
}

impl WorkspaceFile {
    /// Name of the file inside the workspace directory.
    pub fn file_name(&self) -> &'static str {
        match self {
            WorkspaceFile::Manifest => "manifest.json",
            WorkspaceFile::Signature => "signature",
            WorkspaceFile::Archive => "pass.pkpass",
        }
    }
}

/// Uniquely named scratch directory owned by one build.
///
/// # Examples
///
/// ```
/// use pkpass::workspace::{Workspace, WorkspaceFile};
///
/// let root = std::env::temp_dir();
/// let mut workspace = Workspace::acquire(&root)?;
/// let manifest = workspace.path(WorkspaceFile::Manifest);
/// std::fs::write(&manifest, b"{}")?;
///
/// let dir = workspace.dir().to_path_buf();
/// workspace.release();
/// assert!(!dir.exists());
/// # Ok::<(), pkpass::Error>(())
/// ```
#[derive(Debug)]
pub struct Workspace {
    dir: Option<TempDir>,
    path: PathBuf,
    id: String,
    files: Vec<PathBuf>,
}

impl Workspace {
    /// Create a fresh directory under `root`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `root` is not an existing directory, or
    /// [`Error::Io`] if the directory cannot be created.
    pub fn acquire(root: impl AsRef<Path>) -> Result<Self> {
        let root = root.as_ref();

        if !root.is_dir() {
            return Err(Error::Config(format!(
                "Temporary directory does not exist: {}",
                root.display()
            )));
        }

        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_micros())
            .unwrap_or_default();
        let prefix = format!("{}{:x}.", WORKSPACE_PREFIX, timestamp);

        let dir = tempfile::Builder::new()
            .prefix(&prefix)
            .rand_bytes(RANDOM_SUFFIX_LEN)
            .tempdir_in(root)?;

        let path = dir.path().to_path_buf();
        let id = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_default();

        tracing::debug!(workspace = %path.display(), "workspace acquired");

        Ok(Self {
            dir: Some(dir),
            path,
            id,
            files: Vec::new(),
        })
    }

    /// Directory name, unique across concurrent builds.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Absolute path of the workspace directory.
    pub fn dir(&self) -> &Path {
        &self.path
    }

    /// Path of `file` inside the workspace.
    ///
    /// The path is recorded so release removes it explicitly.
    pub fn path(&mut self, file: WorkspaceFile) -> PathBuf {
        let path = self.path.join(file.file_name());
        if !self.files.contains(&path) {
            self.files.push(path.clone());
        }
        path
    }

    /// Remove every recorded file, then the directory.
    ///
    /// Failures are logged and otherwise ignored.
    pub fn release(mut self) {
        self.cleanup();
    }

    fn cleanup(&mut self) {
        let Some(dir) = self.dir.take() else {
            return;
        };

        for file in self.files.drain(..) {
            match fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    tracing::warn!(path = %file.display(), error = %e, "failed to remove workspace file");
                }
            }
        }

        if let Err(e) = dir.close() {
            tracing::warn!(
                workspace = %self.path.display(),
                error = %e,
                "failed to remove workspace directory"
            );
        } else {
            tracing::debug!(workspace = %self.path.display(), "workspace released");
        }
    }
}

impl Drop for Workspace {
    fn drop(&mut self) {
        self.cleanup();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_acquire_creates_prefixed_directory() {
        let root = TempDir::new().unwrap();
        let workspace = Workspace::acquire(root.path()).unwrap();

        assert!(workspace.dir().is_dir());
        assert!(workspace.id().starts_with(WORKSPACE_PREFIX));
        assert_eq!(workspace.dir().parent(), Some(root.path()));
    }

    #[test]
    fn test_path_is_stable() {
        let root = TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(root.path()).unwrap();

        let first = workspace.path(WorkspaceFile::Signature);
        let second = workspace.path(WorkspaceFile::Signature);
        assert_eq!(first, second);
        assert_eq!(first, workspace.dir().join("signature"));
        assert_eq!(workspace.files.len(), 1);
    }

    #[test]
    fn test_release_removes_files_and_directory() {
        let root = TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(root.path()).unwrap();

        for file in [
            WorkspaceFile::Manifest,
            WorkspaceFile::Signature,
            WorkspaceFile::Archive,
        ] {
            fs::write(workspace.path(file), b"data").unwrap();
        }
        let dir = workspace.dir().to_path_buf();

        workspace.release();

        assert!(!dir.exists());
        assert_eq!(fs::read_dir(root.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_drop_removes_directory() {
        let root = TempDir::new().unwrap();
        let dir = {
            let mut workspace = Workspace::acquire(root.path()).unwrap();
            fs::write(workspace.path(WorkspaceFile::Manifest), b"{}").unwrap();
            workspace.dir().to_path_buf()
        };
        assert!(!dir.exists());
    }

    #[test]
    fn test_release_tolerates_missing_files() {
        let root = TempDir::new().unwrap();
        let mut workspace = Workspace::acquire(root.path()).unwrap();
        let _ = workspace.path(WorkspaceFile::Archive);
        let dir = workspace.dir().to_path_buf();

        workspace.release();
        assert!(!dir.exists());
    }

    #[test]
    fn test_acquire_missing_root() {
        let result = Workspace::acquire("/nonexistent/pkpass-root");
        assert!(matches!(result, Err(Error::Config(_))));
    }

    #[test]
    fn test_ids_are_unique() {
        let root = TempDir::new().unwrap();
        let workspaces: Vec<Workspace> = (0..64)
            .map(|_| Workspace::acquire(root.path()).unwrap())
            .collect();

        let ids: HashSet<&str> = workspaces.iter().map(Workspace::id).collect();
        assert_eq!(ids.len(), workspaces.len());
    }

    #[test]
    fn test_ids_are_unique_across_threads() {
        let root = TempDir::new().unwrap();
        let workspaces: Vec<Workspace> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|_| s.spawn(|| Workspace::acquire(root.path()).unwrap()))
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let ids: HashSet<&str> = workspaces.iter().map(Workspace::id).collect();
        assert_eq!(ids.len(), workspaces.len());
    }
}
