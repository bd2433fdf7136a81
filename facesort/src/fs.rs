use std::fs::{self, File, FileTimes};
use std::io;
use std::path::Path;

/// Filesystem operations used by the distributor.
///
/// Every call may fail with a platform error; callers treat each failure
/// as local to that operation and never retry.
pub trait FileSystem {
    /// Creates `dir` and all missing parents. Succeeds if it already exists.
    fn create_dir_all(&self, dir: &Path) -> io::Result<()>;

    /// Renames `from` to `to`, replacing `to` if present.
    fn rename(&self, from: &Path, to: &Path) -> io::Result<()>;

    /// Copies file contents and, where the platform allows, timestamps
    /// from `from` to `to`. Succeeds once the contents are in place.
    fn copy(&self, from: &Path, to: &Path) -> io::Result<()>;

    fn remove_file(&self, path: &Path) -> io::Result<()>;

    /// Removes an empty directory.
    fn remove_dir(&self, path: &Path) -> io::Result<()>;

    fn exists(&self, path: &Path) -> bool;

    /// Reports whether `dir` has no entries.
    fn is_empty_dir(&self, dir: &Path) -> io::Result<bool>;
}

/// [`FileSystem`] on top of `std::fs`.
#[derive(Debug, Default, Clone, Copy)]
pub struct OsFs;

impl FileSystem for OsFs {
    fn create_dir_all(&self, dir: &Path) -> io::Result<()> {
        fs::create_dir_all(dir)
    }

    fn rename(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::rename(from, to)
    }

    fn copy(&self, from: &Path, to: &Path) -> io::Result<()> {
        fs::copy(from, to)?;
        if let Err(e) = copy_times(from, to) {
            tracing::debug!("cannot keep timestamps of {}: {}", to.display(), e);
        }
        Ok(())
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }

    fn remove_dir(&self, path: &Path) -> io::Result<()> {
        fs::remove_dir(path)
    }

    fn exists(&self, path: &Path) -> bool {
        path.exists()
    }

    fn is_empty_dir(&self, dir: &Path) -> io::Result<bool> {
        Ok(fs::read_dir(dir)?.next().is_none())
    }
}

fn copy_times(from: &Path, to: &Path) -> io::Result<()> {
    let meta = fs::metadata(from)?;
    let mut times = FileTimes::new();
    if let Ok(t) = meta.modified() {
        times = times.set_modified(t);
    }
    if let Ok(t) = meta.accessed() {
        times = times.set_accessed(t);
    }
    File::options().write(true).open(to)?.set_times(times)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn copy_preserves_modified_time() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        fs::write(&src, b"pixels").unwrap();
        let old = std::time::SystemTime::UNIX_EPOCH + std::time::Duration::from_secs(1_000_000);
        File::options()
            .write(true)
            .open(&src)
            .unwrap()
            .set_modified(old)
            .unwrap();

        OsFs.copy(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"pixels");
        assert_eq!(fs::metadata(&dst).unwrap().modified().unwrap(), old);
        assert!(OsFs.exists(&src));
    }

    #[test]
    fn copy_of_read_only_file_succeeds() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("a.jpg");
        let dst = dir.path().join("b.jpg");
        fs::write(&src, b"pixels").unwrap();
        let mut perms = fs::metadata(&src).unwrap().permissions();
        perms.set_readonly(true);
        fs::set_permissions(&src, perms).unwrap();

        // The copy inherits read-only permissions, so timestamps may not be
        // writable; the copy itself still counts.
        OsFs.copy(&src, &dst).unwrap();
        assert_eq!(fs::read(&dst).unwrap(), b"pixels");
    }

    #[test]
    fn empty_dir_detection() {
        let dir = tempfile::tempdir().unwrap();
        assert!(OsFs.is_empty_dir(dir.path()).unwrap());
        fs::write(dir.path().join("x"), b"").unwrap();
        assert!(!OsFs.is_empty_dir(dir.path()).unwrap());
        assert!(OsFs.is_empty_dir(&dir.path().join("missing")).is_err());
    }
}
