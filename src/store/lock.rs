use std::fs::{
    self,
    OpenOptions,
};
use std::io::{
    ErrorKind,
    Write,
};
use std::path::{
    Path,
    PathBuf,
};

use log::{
    debug,
    info,
    warn,
};

use super::collab::Prompt;
use crate::error::{
    Result,
    StoreError,
};

/// Single-instance guard over a store home. The lock file is removed when the
/// guard is dropped.
#[derive(Debug)]
pub struct StoreLock {
    path: PathBuf,
}

fn create_lock(path: &Path) -> std::io::Result<()> {
    let mut file = OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)?;
    writeln!(file, "{}", std::process::id())
}

impl StoreLock {
    /// Takes the lock at `path`.
    ///
    /// An existing lock file means another instance is running or a previous
    /// one crashed. The prompt decides: confirming takes the lock over,
    /// declining fails with [`StoreError::Conflict`].
    pub fn acquire(
        path: &Path,
        prompt: &mut dyn Prompt,
    ) -> Result<Self> {
        match create_lock(path) {
            Ok(()) => {},
            Err(e) if e.kind() == ErrorKind::AlreadyExists => {
                let owner = fs::read_to_string(path).unwrap_or_default();
                let question = format!(
                    "The store at {} is locked by process {}. If that session crashed, \
                     take the lock over?",
                    path.parent().unwrap_or(path).display(),
                    owner.trim()
                );
                if !prompt.confirm(&question) {
                    return Err(StoreError::conflict(format!(
                        "store locked by {}",
                        path.display()
                    )));
                }
                warn!("Taking over stale lock {}", path.display());
                fs::remove_file(path)?;
                create_lock(path)?;
            },
            Err(e) => return Err(e.into()),
        }
        info!("Acquired lock {}", path.display());
        Ok(Self {
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for StoreLock {
    fn drop(&mut self) {
        match fs::remove_file(&self.path) {
            Ok(()) => debug!("Released lock {}", self.path.display()),
            Err(e) => warn!("Could not remove lock {}: {e}", self.path.display()),
        }
    }
}
