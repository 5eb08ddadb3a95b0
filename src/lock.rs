//! Per-snapshot advisory session locks.
//!
//! Cross-platform (fs2) exclusive lock on `<lock_dir>/<snapshot>.lock`, so two
//! backup runs cannot drive the same snapshot name at once. The storage layer
//! itself is not locked: anything else touching the volume is still a race.
//!
//! Lock is released on Drop.

use anyhow::{Context, Result};
use fs2::FileExt;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};

pub struct LockGuard {
    file: std::fs::File,
    path: PathBuf,
}

impl LockGuard {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        // fs2 unlock errors on drop are ignored deliberately.
        let _ = self.file.unlock();
    }
}

pub fn lock_file_path(lock_dir: &Path, snapshot: &str) -> PathBuf {
    // имя снапшота не содержит '/', но подстрахуемся
    lock_dir.join(format!("{}.lock", snapshot.replace('/', "_")))
}

fn open_lock_file(path: &Path) -> Result<std::fs::File> {
    OpenOptions::new()
        .create(true)
        .truncate(false)
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("open lock file {}", path.display()))
}

/// Take the session lock without blocking. Errs if another process holds it.
pub fn try_lock_session(lock_dir: &Path, snapshot: &str) -> Result<LockGuard> {
    fs::create_dir_all(lock_dir)
        .with_context(|| format!("create lock dir {}", lock_dir.display()))?;
    let path = lock_file_path(lock_dir, snapshot);
    let file = open_lock_file(&path)?;
    file.try_lock_exclusive().with_context(|| {
        format!(
            "snapshot \"{}\" is in use by another session (lock {})",
            snapshot,
            path.display()
        )
    })?;
    Ok(LockGuard { file, path })
}
