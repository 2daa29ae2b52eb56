use fs2::FileExt;
use std::fs::{self, File, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};

use crate::errors::{DevcellError, Result};

/// Project-scoped reconcile lock; unlocks on drop.
///
/// The lock file itself stays in place. Unlinking it would let a process that
/// opened the old inode and one that created a new file both hold "the" lock.
#[derive(Debug)]
pub struct ProjectLock {
    file: File,
    path: PathBuf,
}

impl Drop for ProjectLock {
    fn drop(&mut self) {
        // Best-effort unlock; ignore errors
        let _ = self.file.unlock();
    }
}

impl ProjectLock {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Acquire a non-blocking exclusive lock at `p`.
///
/// Contention yields [`DevcellError::Busy`]; nothing waits.
pub fn acquire_lock_at(p: &Path) -> Result<ProjectLock> {
    if let Some(parent) = p.parent() {
        fs::create_dir_all(parent)?;
    }
    let file = OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(p)?;
    match file.try_lock_exclusive() {
        Ok(()) => Ok(ProjectLock {
            file,
            path: p.to_path_buf(),
        }),
        Err(e) if e.kind() == io::ErrorKind::WouldBlock || is_contended(&e) => {
            tracing::warn!(path = %p.display(), "reconcile lock held by another process");
            Err(DevcellError::Busy(
                "another activation is rebuilding this project's image (lock held). Please try again later."
                    .to_string(),
            ))
        }
        Err(e) => Err(e.into()),
    }
}

// fs2 reports contention with the platform's own error on some targets.
fn is_contended(e: &io::Error) -> bool {
    e.raw_os_error() == fs2::lock_contended_error().raw_os_error()
}
