//! File-based storage backend for persistent storage.

use crate::backend::StorageBackend;
use crate::error::StorageResult;
use fs2::FileExt;
use layerkv_codec::{decode_snapshot, encode_snapshot, Snapshot};
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};

/// Suffix of the temporary file a snapshot is written to before rename.
const TEMP_SUFFIX: &str = "tmp";
/// Suffix of the advisory lock file guarding the snapshot.
const LOCK_SUFFIX: &str = "lock";

/// Options for [`FileBackend`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FileOptions {
    /// Fsync the snapshot file and its directory on every persist.
    pub sync: bool,
    /// Create missing parent directories on open.
    pub create_dirs: bool,
}

impl Default for FileOptions {
    fn default() -> Self {
        Self {
            sync: true,
            create_dirs: true,
        }
    }
}

impl FileOptions {
    /// Creates options with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets whether persists fsync the file and directory.
    #[must_use]
    pub const fn sync(mut self, value: bool) -> Self {
        self.sync = value;
        self
    }

    /// Sets whether missing parent directories are created.
    #[must_use]
    pub const fn create_dirs(mut self, value: bool) -> Self {
        self.create_dirs = value;
        self
    }
}

/// A file-based storage backend.
///
/// The whole snapshot lives in one file. Data survives process restarts.
///
/// # Durability
///
/// `persist` never modifies the snapshot file in place:
/// 1. Encode the snapshot into a checksummed frame
/// 2. Write it to `<path>.tmp` and fsync
/// 3. Atomically rename the temp file over `<path>`
/// 4. Fsync the parent directory so the rename is durable
///
/// A crash at any step leaves either the old or the new snapshot. Once the
/// rename succeeds the persist counts as done; a failed directory fsync
/// after that point is logged rather than returned.
///
/// # Thread Safety
///
/// Persists and loads are serialized in-process by a mutex and across
/// processes by an advisory lock on `<path>.lock`.
///
/// # Example
///
/// ```no_run
/// use layerkv_codec::{Snapshot, Value};
/// use layerkv_storage::{FileBackend, StorageBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("store.lkv")).unwrap();
/// let mut snapshot = backend.load().unwrap();
/// snapshot.insert("k".to_string(), Value::from("v"));
/// backend.persist(&snapshot).unwrap();
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    temp_path: PathBuf,
    lock_path: PathBuf,
    options: FileOptions,
    io_lock: Mutex<()>,
    #[cfg(test)]
    fail_dir_sync: std::sync::atomic::AtomicBool,
}

impl FileBackend {
    /// Opens a file backend at the given path with default options.
    ///
    /// The snapshot file itself is created lazily by the first persist.
    ///
    /// # Errors
    ///
    /// Returns an error if parent directories cannot be created or a stale
    /// temporary file cannot be removed.
    pub fn open(path: &Path) -> StorageResult<Self> {
        Self::open_with_options(path, FileOptions::default())
    }

    /// Opens a file backend with explicit options.
    ///
    /// # Errors
    ///
    /// Returns an error if parent directories cannot be created or a stale
    /// temporary file cannot be removed.
    pub fn open_with_options(path: &Path, options: FileOptions) -> StorageResult<Self> {
        if options.create_dirs {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)?;
            }
        }

        let backend = Self {
            path: path.to_path_buf(),
            temp_path: sibling(path, TEMP_SUFFIX),
            lock_path: sibling(path, LOCK_SUFFIX),
            options,
            io_lock: Mutex::new(()),
            #[cfg(test)]
            fail_dir_sync: std::sync::atomic::AtomicBool::new(false),
        };

        // A leftover temp file is an interrupted persist; the snapshot file
        // still holds the last complete state.
        match fs::remove_file(&backend.temp_path) {
            Ok(()) => tracing::warn!(path = %backend.temp_path.display(), "removed stale temp snapshot"),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        Ok(backend)
    }

    /// Returns the path to the snapshot file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Returns the options this backend was opened with.
    #[must_use]
    pub fn options(&self) -> FileOptions {
        self.options
    }

    /// Copies the current snapshot to `dest`.
    ///
    /// The copy is validated before it is written, so a backup never holds a
    /// corrupted frame. Returns the number of keys in the backup.
    ///
    /// # Errors
    ///
    /// Returns an error if the snapshot cannot be read, does not decode, or
    /// the destination cannot be written.
    pub fn backup_to(&self, dest: &Path) -> StorageResult<usize> {
        let _guard = self.io_lock.lock();
        let lock = self.lock_file()?;
        lock.lock_shared()?;

        let bytes = self.read_bytes()?;
        let snapshot = decode_snapshot(&bytes)?;
        let bytes = if bytes.is_empty() {
            encode_snapshot(&snapshot)?
        } else {
            bytes
        };

        let mut file = File::create(dest)?;
        file.write_all(&bytes)?;
        file.sync_all()?;

        tracing::info!(
            from = %self.path.display(),
            to = %dest.display(),
            keys = snapshot.len(),
            "snapshot backed up"
        );
        Ok(snapshot.len())
    }

    /// Replaces the current snapshot with the one stored at `src`.
    ///
    /// The source is decoded first; an invalid backup leaves the current
    /// snapshot untouched. Returns the number of keys restored.
    ///
    /// # Errors
    ///
    /// Returns an error if the source cannot be read or decoded, or the
    /// replacement cannot be written.
    pub fn restore_from(&self, src: &Path) -> StorageResult<usize> {
        let bytes = fs::read(src)?;
        let snapshot = decode_snapshot(&bytes)?;
        self.persist(&snapshot)?;

        tracing::info!(
            from = %src.display(),
            to = %self.path.display(),
            keys = snapshot.len(),
            "snapshot restored"
        );
        Ok(snapshot.len())
    }

    fn lock_file(&self) -> StorageResult<File> {
        Ok(OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(false)
            .open(&self.lock_path)?)
    }

    fn read_bytes(&self) -> StorageResult<Vec<u8>> {
        match File::open(&self.path) {
            Ok(mut file) => {
                let mut bytes = Vec::new();
                file.read_to_end(&mut bytes)?;
                Ok(bytes)
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn sync_after_rename(&self) -> StorageResult<()> {
        #[cfg(test)]
        if self.fail_dir_sync.load(std::sync::atomic::Ordering::SeqCst) {
            return Err(std::io::Error::other("injected directory sync failure").into());
        }
        self.sync_directory()
    }

    /// Syncs the parent directory so a rename is durable.
    ///
    /// On Windows, directory fsync is not supported in the same way as Unix;
    /// NTFS journaling covers metadata durability, so it is skipped there.
    #[cfg(unix)]
    fn sync_directory(&self) -> StorageResult<()> {
        let dir = match self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(parent) => parent.to_path_buf(),
            None => PathBuf::from("."),
        };
        File::open(dir)?.sync_all()?;
        Ok(())
    }

    #[cfg(not(unix))]
    fn sync_directory(&self) -> StorageResult<()> {
        Ok(())
    }
}

impl StorageBackend for FileBackend {
    fn load(&self) -> StorageResult<Snapshot> {
        let _guard = self.io_lock.lock();
        let lock = self.lock_file()?;
        lock.lock_shared()?;

        let bytes = self.read_bytes()?;
        let snapshot = decode_snapshot(&bytes)?;
        tracing::debug!(path = %self.path.display(), keys = snapshot.len(), "snapshot loaded");
        Ok(snapshot)
    }

    fn persist(&self, snapshot: &Snapshot) -> StorageResult<()> {
        let frame = encode_snapshot(snapshot)?;

        let _guard = self.io_lock.lock();
        let lock = self.lock_file()?;
        lock.lock_exclusive()?;

        let mut file = File::create(&self.temp_path)?;
        file.write_all(&frame)?;
        if self.options.sync {
            file.sync_all()?;
        }
        drop(file);

        if let Err(e) = fs::rename(&self.temp_path, &self.path) {
            tracing::warn!(path = %self.temp_path.display(), error = %e, "snapshot rename failed");
            // The old snapshot is intact; the temp file is garbage either way.
            let _ = fs::remove_file(&self.temp_path);
            return Err(e.into());
        }

        // The rename has replaced the snapshot, so `load` now returns the new
        // frame. Failing here would make callers revert state that is on disk.
        if self.options.sync {
            if let Err(e) = self.sync_after_rename() {
                tracing::warn!(
                    path = %self.path.display(),
                    error = %e,
                    "directory sync failed after snapshot rename"
                );
            }
        }

        tracing::debug!(
            path = %self.path.display(),
            keys = snapshot.len(),
            bytes = frame.len(),
            "snapshot persisted"
        );
        Ok(())
    }

    fn describe(&self) -> String {
        format!("file:{}", self.path.display())
    }
}

fn sibling(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path.file_name().map(|n| n.to_os_string()).unwrap_or_default();
    name.push(".");
    name.push(suffix);
    path.with_file_name(name)
}
