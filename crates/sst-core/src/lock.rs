use crate::error::ErrorCode;
use fs2::FileExt;
use std::{
    fs::{self, File, OpenOptions},
    io,
    path::{Path, PathBuf},
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
};

/// Errors raised when entering the sync gate.
#[derive(Debug)]
pub enum GateError {
    /// Another sync holds the gate, in this process or another one.
    Busy,
    IoError { path: PathBuf, source: io::Error },
}

impl GateError {
    /// Machine-readable code associated with this gate error.
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::Busy => ErrorCode::SyncBusy,
            Self::IoError { .. } => ErrorCode::StoreUnavailable,
        }
    }

    /// Optional remediation hint for operators.
    #[must_use]
    pub const fn hint(&self) -> Option<&'static str> {
        self.code().hint()
    }
}

impl std::fmt::Display for GateError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Busy => write!(f, "{}: sync already in progress", self.code().code()),
            Self::IoError { path, source } => {
                write!(f, "{}: {}: {}", self.code().code(), path.display(), source)
            }
        }
    }
}

impl std::error::Error for GateError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Busy => None,
            Self::IoError { source, .. } => Some(source),
        }
    }
}

#[derive(Debug)]
struct FileGuard {
    file: File,
}

impl FileGuard {
    /// Try once; a lock held elsewhere is [`GateError::Busy`].
    fn try_acquire(path: &Path) -> Result<Self, GateError> {
        let io_error = |source| GateError::IoError {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(io_error)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(io_error)?;

        match file.try_lock_exclusive() {
            Ok(()) => Ok(Self { file }),
            Err(err) if err.kind() == fs2::lock_contended_error().kind() => Err(GateError::Busy),
            Err(err) => Err(io_error(err)),
        }
    }
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        let _ = self.file.unlock();
    }
}

/// Admits at most one sync cycle at a time.
///
/// Clones share the in-process flag. With a lock file, separate processes
/// sharing a data directory also exclude each other.
#[derive(Debug, Clone, Default)]
pub struct SyncGate {
    busy: Arc<AtomicBool>,
    lock_path: Option<PathBuf>,
}

impl SyncGate {
    /// In-process gate only.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Gate that also takes an advisory lock on `path`.
    #[must_use]
    pub fn with_lock_file(path: impl Into<PathBuf>) -> Self {
        Self {
            busy: Arc::default(),
            lock_path: Some(path.into()),
        }
    }

    /// Enter without waiting.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::Busy`] when a sync already holds the gate, or
    /// [`GateError::IoError`] when the lock file cannot be opened.
    pub fn try_enter(&self) -> Result<SyncPermit, GateError> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(GateError::Busy);
        }

        let file = match self.lock_path.as_deref().map(FileGuard::try_acquire).transpose() {
            Ok(file) => file,
            Err(err) => {
                self.busy.store(false, Ordering::Release);
                return Err(err);
            }
        };

        Ok(SyncPermit {
            busy: Arc::clone(&self.busy),
            _file: file,
        })
    }

    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }
}

/// RAII permit; the gate reopens when it is dropped.
#[derive(Debug)]
pub struct SyncPermit {
    busy: Arc<AtomicBool>,
    _file: Option<FileGuard>,
}

impl Drop for SyncPermit {
    fn drop(&mut self) {
        self.busy.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_entry_is_busy_until_release() {
        let gate = SyncGate::new();
        let permit = gate.try_enter().expect("first entry");
        assert!(gate.is_busy());
        assert!(matches!(gate.clone().try_enter(), Err(GateError::Busy)));
        drop(permit);
        assert!(!gate.is_busy());
        assert!(gate.try_enter().is_ok());
    }

    #[test]
    fn lock_file_excludes_independent_gates() {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("sync.lock");
        let first = SyncGate::with_lock_file(&path);
        let second = SyncGate::with_lock_file(&path);

        let permit = first.try_enter().expect("first entry");
        let err = second.try_enter().expect_err("second gate must be busy");
        assert_eq!(err.code(), ErrorCode::SyncBusy);
        assert!(!second.is_busy());

        drop(permit);
        assert!(second.try_enter().is_ok());
    }

    #[test]
    fn unopenable_lock_file_reopens_gate() {
        let dir = tempfile::tempdir().expect("temp dir");
        let gate = SyncGate::with_lock_file(dir.path());
        assert!(matches!(gate.try_enter(), Err(GateError::IoError { .. })));
        assert!(!gate.is_busy());
    }
}
