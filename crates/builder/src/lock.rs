//! Run lock: one install per formula and prefix at a time

use formula_errors::{Error, LockError};
use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::{SystemTime, UNIX_EPOCH};

const LOCK_DIR: &str = ".locks";

/// Written into the lock file by the holder
#[derive(Debug, Serialize, Deserialize)]
pub struct LockMetadata {
    pub version: u32,
    pub pid: u32,
    pub started_at_unix: u64,
    pub command: String,
    pub formula: String,
}

/// Exclusive lock on `<prefix>/.locks/<name>.lock`, released on drop
#[derive(Debug)]
pub struct InstallLock {
    _file: File,
    lock_path: PathBuf,
}

impl InstallLock {
    /// Location of the lock file for `name` under `prefix`
    #[must_use]
    pub fn path_for(prefix: &Path, name: &str) -> PathBuf {
        prefix.join(LOCK_DIR).join(format!("{name}.lock"))
    }

    /// Take the lock without waiting
    ///
    /// # Errors
    ///
    /// Returns `LockError::Contention` when another run holds the lock, or
    /// `LockError::Failed` if the lock file cannot be created.
    pub fn acquire(prefix: &Path, name: &str, command: &str) -> Result<Self, Error> {
        let lock_path = Self::path_for(prefix, name);
        let failed = |e: io::Error| LockError::Failed {
            lock_path: lock_path.clone(),
            message: e.to_string(),
        };

        if let Some(dir) = lock_path.parent() {
            std::fs::create_dir_all(dir).map_err(failed)?;
        }

        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&lock_path)
            .map_err(failed)?;

        if let Err(err) = try_lock(&file) {
            if err.kind() == io::ErrorKind::WouldBlock {
                return Err(read_contention_error(&lock_path).into());
            }
            return Err(failed(err).into());
        }

        write_metadata(&file, command, name).map_err(failed)?;
        tracing::debug!(path = %lock_path.display(), "acquired install lock");

        Ok(Self {
            _file: file,
            lock_path,
        })
    }

    #[must_use]
    pub fn lock_path(&self) -> &Path {
        &self.lock_path
    }
}

fn write_metadata(file: &File, command: &str, formula: &str) -> io::Result<()> {
    let metadata = LockMetadata {
        version: 1,
        pid: std::process::id(),
        started_at_unix: SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs(),
        command: command.to_string(),
        formula: formula.to_string(),
    };

    file.set_len(0)?;
    let mut writer = io::BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, &metadata).map_err(io::Error::other)?;
    writer.flush()
}

fn read_contention_error(lock_path: &Path) -> LockError {
    if let Ok(mut file) = File::open(lock_path) {
        let mut contents = String::new();
        if file.read_to_string(&mut contents).is_ok() {
            if let Ok(metadata) = serde_json::from_str::<LockMetadata>(&contents) {
                return LockError::Contention {
                    command: metadata.command,
                    pid: metadata.pid,
                    started_at_unix: metadata.started_at_unix,
                    lock_path: lock_path.to_path_buf(),
                };
            }
        }
    }

    LockError::ContentionUnknown {
        lock_path: lock_path.to_path_buf(),
    }
}

#[cfg(unix)]
fn try_lock(file: &File) -> io::Result<()> {
    use rustix::fs::{flock, FlockOperation};
    use std::os::unix::io::AsFd;

    flock(file.as_fd(), FlockOperation::NonBlockingLockExclusive)
        .map_err(|e| io::Error::from_raw_os_error(e.raw_os_error()))
}

#[cfg(not(unix))]
fn try_lock(_file: &File) -> io::Result<()> {
    tracing::warn!("install locking is only supported on Unix");
    Ok(())
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    #[test]
    fn test_lock_file_location() {
        let prefix = tempfile::tempdir().unwrap();
        let lock = InstallLock::acquire(prefix.path(), "wsi2dcm", "formula install").unwrap();
        assert_eq!(
            lock.lock_path(),
            prefix.path().join(".locks").join("wsi2dcm.lock")
        );
        assert!(lock.lock_path().exists());
    }

    #[test]
    fn test_contention_names_holder() {
        let prefix = tempfile::tempdir().unwrap();
        let _held = InstallLock::acquire(prefix.path(), "wsi2dcm", "formula install a.yml").unwrap();

        let err = InstallLock::acquire(prefix.path(), "wsi2dcm", "formula install b.yml").unwrap_err();
        match err {
            Error::Lock(LockError::Contention { pid, command, .. }) => {
                assert_eq!(pid, std::process::id());
                assert_eq!(command, "formula install a.yml");
            }
            other => panic!("expected contention, got {other:?}"),
        }
    }

    #[test]
    fn test_released_on_drop() {
        let prefix = tempfile::tempdir().unwrap();
        drop(InstallLock::acquire(prefix.path(), "wsi2dcm", "first").unwrap());
        assert!(InstallLock::acquire(prefix.path(), "wsi2dcm", "second").is_ok());
    }

    #[test]
    fn test_different_formulas_do_not_contend() {
        let prefix = tempfile::tempdir().unwrap();
        let _a = InstallLock::acquire(prefix.path(), "a", "x").unwrap();
        assert!(InstallLock::acquire(prefix.path(), "b", "y").is_ok());
    }
}
