use anyhow::{bail, Context, Result};
use std::{
    fs::{File, OpenOptions},
    io::{Read as _, Seek as _, SeekFrom, Write as _},
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    time::{Duration, Instant},
};

/// Monitor a lock acquisition which may take a long time, and log as needed.
/// After SILENT_INTERVAL: log activity
/// After LOG_INTERVAL: log activity and duration
pub struct WaitMonitor {
    done: Arc<AtomicBool>,
}
impl WaitMonitor {
    const SILENT_INTERVAL: Duration = Duration::from_millis(500);
    const LOG_INTERVAL: Duration = Duration::from_secs(5);

    pub fn new(activity: String) -> WaitMonitor {
        let done = Arc::new(AtomicBool::new(false));
        let r = WaitMonitor { done: done.clone() };
        std::thread::spawn(move || WaitMonitor::run(done, activity));
        r
    }
    fn run(done: Arc<AtomicBool>, activity: String) {
        let start = Instant::now();
        let mut next_log = start + Self::SILENT_INTERVAL;
        loop {
            std::thread::sleep(next_log.saturating_duration_since(Instant::now()));
            if done.load(Ordering::Relaxed) {
                break;
            }
            let waited = next_log.duration_since(start);
            if waited <= Self::SILENT_INTERVAL {
                tracing::info!("{}", activity);
                next_log = start;
            } else {
                tracing::warn!(seconds = waited.as_secs(), "{}", activity);
            }
            next_log += Self::LOG_INTERVAL;
        }
    }
    pub fn done(&self) {
        self.done.store(true, Ordering::Relaxed);
    }
}
impl Drop for WaitMonitor {
    fn drop(&mut self) {
        self.done()
    }
}

/// A configuration file on disk, guarded by an advisory lock while it is
/// read or written: exclusive for handles opened with [`ConfigFile::open`],
/// shared for [`ConfigFile::open_read_only`].
pub struct ConfigFile {
    path: PathBuf,
    locking: fd_lock::RwLock<File>,
    writable: bool,
    /// Contents as of the last read or write through this handle.
    loaded: String,
}

impl ConfigFile {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<ConfigFile> {
        Self::open_with(path.as_ref(), true)
    }

    /// Opens a file that is only read, such as one in a read-only
    /// installation. [`ConfigFile::write`] fails on the returned handle.
    pub fn open_read_only<P: AsRef<Path>>(path: P) -> Result<ConfigFile> {
        Self::open_with(path.as_ref(), false)
    }

    fn open_with(path: &Path, writable: bool) -> Result<ConfigFile> {
        let path = path.to_path_buf();
        let file = Self::open_file(&path, writable)?;
        let mut handle = ConfigFile {
            path,
            locking: fd_lock::RwLock::new(file),
            writable,
            loaded: String::new(),
        };
        let contents = if writable {
            read_all(&*Self::lock_write(&mut handle.locking)?)
        } else {
            read_all(&*Self::lock_read(&handle.locking)?)
        };
        handle.loaded =
            contents.with_context(|| format!("Could not read {}", handle.path.display()))?;
        tracing::debug!(path = %handle.path.display(), bytes = handle.loaded.len(), writable, "loaded configuration file");
        Ok(handle)
    }

    fn open_file(path: &Path, writable: bool) -> Result<File> {
        OpenOptions::new()
            .read(true)
            .write(writable)
            .open(path)
            .with_context(|| format!("Could not open configuration file {}", path.display()))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn contents(&self) -> &str {
        &self.loaded
    }

    fn lock_write(
        locking: &mut fd_lock::RwLock<File>,
    ) -> Result<fd_lock::RwLockWriteGuard<'_, File>> {
        let lock_wait_mon = WaitMonitor::new("Waiting for configuration file lock".to_owned());
        let lock = locking.write()?;
        lock_wait_mon.done();
        Ok(lock)
    }

    fn lock_read(locking: &fd_lock::RwLock<File>) -> Result<fd_lock::RwLockReadGuard<'_, File>> {
        let lock_wait_mon = WaitMonitor::new("Waiting for configuration file lock".to_owned());
        let lock = locking.read()?;
        lock_wait_mon.done();
        Ok(lock)
    }

    /// Replaces the file contents.
    ///
    /// Fails without writing if the file no longer holds what this handle
    /// last read or wrote, i.e. someone else modified it in the meantime.
    /// The new contents go to a temporary file next to the original, which
    /// is then renamed over it, so a failed write leaves the original intact.
    pub fn write(&mut self, contents: &str) -> Result<()> {
        if !self.writable {
            bail!(
                "Configuration file {} was opened read-only",
                self.path.display()
            );
        }
        let guard = Self::lock_write(&mut self.locking)?;
        let current = read_all(&guard)?;
        if current != self.loaded {
            bail!(
                "Configuration file {} was modified by someone else since it was loaded; not overwriting it",
                self.path.display()
            );
        }

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        let mut replacement = tempfile::NamedTempFile::new_in(dir)
            .with_context(|| format!("Could not create a temporary file in {}", dir.display()))?;
        replacement
            .as_file()
            .set_permissions(guard.metadata()?.permissions())?;
        replacement
            .write_all(contents.as_bytes())
            .with_context(|| format!("Could not write {}", replacement.path().display()))?;
        replacement.as_file().sync_all()?;
        replacement
            .persist(&self.path)
            .with_context(|| format!("Could not replace {}", self.path.display()))?;
        drop(guard);

        // The path now names a new file; lock that one from here on.
        self.locking = fd_lock::RwLock::new(Self::open_file(&self.path, true)?);
        self.loaded = contents.to_string();
        tracing::debug!(path = %self.path.display(), bytes = contents.len(), "wrote configuration file");
        Ok(())
    }
}

fn read_all(mut file: &File) -> Result<String> {
    file.seek(SeekFrom::Start(0))?;
    let mut contents = String::new();
    file.read_to_string(&mut contents)?;
    Ok(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wait_monitor() {
        let monitor = WaitMonitor::new("Testing...".to_owned());
        std::thread::sleep(Duration::from_millis(10));
        monitor.done();
    }

    #[test]
    fn write_replaces_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standalone.xml");
        std::fs::write(&path, "<server>\n    <old/>\n</server>\n").unwrap();

        let mut file = ConfigFile::open(&path).unwrap();
        assert_eq!(file.contents(), "<server>\n    <old/>\n</server>\n");
        file.write("<server/>\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<server/>\n");

        // A second write through the same handle is not a concurrent change.
        file.write("<server></server>\n").unwrap();
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<server></server>\n");
    }

    #[test]
    fn write_refuses_after_foreign_modification() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standalone.xml");
        std::fs::write(&path, "<server/>").unwrap();

        let mut file = ConfigFile::open(&path).unwrap();
        std::fs::write(&path, "<server><changed/></server>").unwrap();
        let error = file.write("<server><mine/></server>").unwrap_err();
        assert!(error.to_string().contains("modified by someone else"));
        assert_eq!(
            std::fs::read_to_string(&path).unwrap(),
            "<server><changed/></server>"
        );
    }

    #[test]
    fn write_replaces_the_file_instead_of_truncating_it() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standalone.xml");
        std::fs::write(&path, "<server>\n    <old/>\n</server>\n").unwrap();
        let mut previous = File::open(&path).unwrap();

        let mut file = ConfigFile::open(&path).unwrap();
        file.write("<server/>\n").unwrap();

        // Whoever still reads the previous file sees it whole.
        let mut seen = String::new();
        previous.read_to_string(&mut seen).unwrap();
        assert_eq!(seen, "<server>\n    <old/>\n</server>\n");
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<server/>\n");
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);

        // The handle follows the new file.
        std::fs::write(&path, "<server><changed/></server>").unwrap();
        assert!(file.write("<server><mine/></server>").is_err());
    }

    #[cfg(unix)]
    #[test]
    fn write_keeps_permissions() {
        use std::os::unix::fs::PermissionsExt as _;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standalone.xml");
        std::fs::write(&path, "<server/>").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o640)).unwrap();

        ConfigFile::open(&path).unwrap().write("<server></server>").unwrap();
        let mode = std::fs::metadata(&path).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o640);
    }

    #[cfg(unix)]
    #[test]
    fn read_only_file() {
        use std::os::unix::fs::PermissionsExt as _;
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("standalone.xml");
        std::fs::write(&path, "<server/>").unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o444)).unwrap();

        let mut file = ConfigFile::open_read_only(&path).unwrap();
        assert_eq!(file.contents(), "<server/>");
        let error = file.write("<server></server>").unwrap_err();
        assert!(error.to_string().contains("read-only"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<server/>");
    }

    #[test]
    fn open_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ConfigFile::open(dir.path().join("nope.xml")).is_err());
    }
}
