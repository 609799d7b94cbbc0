//! Atomic publication of the metrics file.
//!
//! The new content is written to a fresh temporary file beside the target
//! and renamed over it, so a reader opening the target sees either the old
//! or the new document in full.

use std::fs::{self, File, Permissions};
use std::io::{self, Write};
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, warn};

/// Errors from one publication attempt.
#[derive(Error, Debug)]
pub enum PublishError {
    /// The temporary file could not be created.
    #[error("Failed to create temporary file in {dir}: {source}")]
    Create {
        dir: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Writing or syncing the temporary file failed.
    #[error("Failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Setting permissions on the temporary file failed.
    #[error("Failed to set permissions on {path}: {source}")]
    Permissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// Renaming onto the target failed. The temporary file is left behind.
    #[error("Failed to rename {from} to {to}: {source}")]
    Rename {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// File operations used by [`Publisher`] that may fail after the temporary
/// file exists.
pub trait FileOps {
    /// Writes `contents` and flushes them to disk.
    fn write(&self, file: &mut File, contents: &[u8]) -> io::Result<()> {
        file.write_all(contents)?;
        file.sync_all()
    }

    /// Sets the permission bits of `path`.
    fn set_mode(&self, path: &Path, mode: u32) -> io::Result<()> {
        fs::set_permissions(path, Permissions::from_mode(mode))
    }

    /// Atomically replaces `to` with `from`.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }
}

/// Plain `write(2)`, `fsync(2)`, `chmod(2)` and `rename(2)`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemFileOps;

impl FileOps for SystemFileOps {}

/// Maintains one metrics file.
#[derive(Debug)]
pub struct Publisher<F: FileOps = SystemFileOps> {
    target: PathBuf,
    mode: u32,
    ops: F,
}

impl Publisher<SystemFileOps> {
    /// Creates a publisher for `target` with the given permission bits.
    pub fn new(target: impl Into<PathBuf>, mode: u32) -> Self {
        Self::with_ops(target, mode, SystemFileOps)
    }
}

impl<F: FileOps> Publisher<F> {
    /// Creates a publisher using custom file operations.
    pub fn with_ops(target: impl Into<PathBuf>, mode: u32, ops: F) -> Self {
        Self {
            target: target.into(),
            mode,
            ops,
        }
    }

    /// Returns the target path.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Replaces the target's content with `text`.
    ///
    /// If anything fails before the rename the temporary file is removed.
    /// If the rename itself fails the temporary file is kept.
    pub fn publish(&self, text: &str) -> Result<(), PublishError> {
        let dir = self.directory();
        let prefix = format!(
            ".{}.",
            self.target
                .file_name()
                .map(|name| name.to_string_lossy())
                .unwrap_or_default()
        );

        let mut temp = tempfile::Builder::new()
            .prefix(&prefix)
            .suffix(".tmp")
            .tempfile_in(dir)
            .map_err(|source| PublishError::Create {
                dir: dir.to_path_buf(),
                source,
            })?;

        self.ops
            .write(temp.as_file_mut(), text.as_bytes())
            .map_err(|source| PublishError::Write {
                path: temp.path().to_path_buf(),
                source,
            })?;

        self.ops
            .set_mode(temp.path(), self.mode)
            .map_err(|source| PublishError::Permissions {
                path: temp.path().to_path_buf(),
                source,
            })?;

        // Closes the file and disarms deletion on drop.
        let temp_path = temp
            .into_temp_path()
            .keep()
            .map_err(|err| PublishError::Write {
                path: err.path.to_path_buf(),
                source: err.error,
            })?;

        if let Err(source) = self.ops.rename(&temp_path, &self.target) {
            warn!("Leaving {} in place", temp_path.display());
            return Err(PublishError::Rename {
                from: temp_path,
                to: self.target.clone(),
                source,
            });
        }

        debug!("Published {} bytes to {}", text.len(), self.target.display());
        Ok(())
    }

    fn directory(&self) -> &Path {
        match self.target.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }
}
