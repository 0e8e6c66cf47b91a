//! Scoped removal of the files a stage owns.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Removes every registered file when dropped, on success, early return or panic.
///
/// Removal is best effort: a file that is already gone is fine (the message may
/// be a redelivery), any other failure is logged and otherwise ignored so that
/// it never changes the outcome of the stage.
#[derive(Debug)]
pub struct CleanupGuard {
    stage: &'static str,
    paths: Vec<PathBuf>,
}

impl CleanupGuard {
    pub fn new(stage: &'static str) -> Self {
        Self {
            stage,
            paths: Vec::new(),
        }
    }

    pub fn register(&mut self, path: impl Into<PathBuf>) {
        self.paths.push(path.into());
    }

    /// Stop tracking `path`; it outlives the guard.
    pub fn keep(&mut self, path: &Path) {
        self.paths.retain(|p| p != path);
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        for path in self.paths.drain(..) {
            match std::fs::remove_file(&path) {
                Ok(()) => debug!(stage = self.stage, path = %path.display(), "removed"),
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => warn!(
                    stage = self.stage,
                    path = %path.display(),
                    error = %e,
                    "cleanup failed, continuing"
                ),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_removes_registered_files_on_drop() {
        let dir = tempdir().unwrap();
        let a = dir.path().join("a.webm");
        let b = dir.path().join("b.webm");
        std::fs::write(&a, b"a").unwrap();
        std::fs::write(&b, b"b").unwrap();

        {
            let mut guard = CleanupGuard::new("test");
            guard.register(&a);
            guard.register(&b);
            guard.keep(&b);
        }

        assert!(!a.exists());
        assert!(b.exists());
    }

    #[test]
    fn test_missing_files_are_ignored() {
        let dir = tempdir().unwrap();
        let mut guard = CleanupGuard::new("test");
        guard.register(dir.path().join("never-created.mp4"));
        drop(guard);
    }

    #[test]
    fn test_runs_when_unwinding() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("partial.mp4");
        std::fs::write(&file, b"x").unwrap();

        let path = file.clone();
        let result = std::panic::catch_unwind(move || {
            let mut guard = CleanupGuard::new("test");
            guard.register(path);
            panic!("stage blew up");
        });

        assert!(result.is_err());
        assert!(!file.exists());
    }
}
