//! Single-instance guard for the import phase.
//!
//! The digest record and the bundle file are read and rewritten without any
//! coordination, so two supervisors sharing them must not import at the same
//! time. [`InstanceLock`] holds an exclusive advisory lock on a sidecar file
//! for as long as it lives.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::path::{Path, PathBuf};
use tracing::debug;
use vardr_common::{Error, Result};

/// Exclusive advisory lock, released on drop.
#[derive(Debug)]
pub struct InstanceLock {
    file: File,
    path: PathBuf,
}

impl InstanceLock {
    /// Lock file guarding a digest record: the record path plus `.lock`.
    pub fn path_for(record: &Path) -> PathBuf {
        let mut name = record.as_os_str().to_os_string();
        name.push(".lock");
        PathBuf::from(name)
    }

    /// Block until the lock is held.
    pub fn acquire(path: &Path) -> Result<Self> {
        let file = open_lock_file(path)?;
        file.lock_exclusive().map_err(|e| Error::Lock {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;
        debug!("Acquired instance lock {:?}", path);
        Ok(Self {
            file,
            path: path.to_path_buf(),
        })
    }

    /// Take the lock if it is free, `Ok(None)` if another holder has it.
    pub fn try_acquire(path: &Path) -> Result<Option<Self>> {
        let file = open_lock_file(path)?;
        match file.try_lock_exclusive() {
            Ok(()) => Ok(Some(Self {
                file,
                path: path.to_path_buf(),
            })),
            Err(e) if e.kind() == fs2::lock_contended_error().kind() => Ok(None),
            Err(e) => Err(Error::Lock {
                path: path.to_path_buf(),
                reason: e.to_string(),
            }),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for InstanceLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
        debug!("Released instance lock {:?}", self.path);
    }
}

fn open_lock_file(path: &Path) -> Result<File> {
    OpenOptions::new()
        .create(true)
        .read(true)
        .write(true)
        .truncate(false)
        .open(path)
        .map_err(|e| Error::Lock {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_path_for_appends_suffix() {
        assert_eq!(
            InstanceLock::path_for(Path::new("/app/certs.hash")),
            PathBuf::from("/app/certs.hash.lock")
        );
    }

    #[test]
    fn test_second_holder_is_refused_until_release() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("certs.hash.lock");

        let first = InstanceLock::acquire(&path).unwrap();
        assert!(InstanceLock::try_acquire(&path).unwrap().is_none());

        drop(first);
        let second = InstanceLock::try_acquire(&path).unwrap();
        assert!(second.is_some());
    }

    #[test]
    fn test_unwritable_location_errors() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("missing/dir/certs.hash.lock");
        assert!(matches!(
            InstanceLock::acquire(&path),
            Err(Error::Lock { .. })
        ));
    }
}
