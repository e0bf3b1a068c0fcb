//! Directory-backed storage with WAL-protected commits.
//!
//! Layout:
//!
//! ```text
//! <path>/MANIFEST        magic + version
//! <path>/LOCK            exclusive process lock
//! <path>/journal.wal     pending multi-key commits
//! <path>/data/<key>.col  one file per key
//! ```

use super::{StorageBackend, WriteBatch};
use crate::error::{JournalError, Result};
use crate::store::JournalConfig;
use crate::wal::{KeyWrite, WalOperation, WriteAheadLog};
use fs2::FileExt;
use parking_lot::Mutex;
use std::fs::{self, File, OpenOptions};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Magic bytes for the journal manifest.
const MANIFEST_MAGIC: &[u8; 4] = b"PJM\0";

/// Current manifest version.
const MANIFEST_VERSION: u8 = 1;

/// Magic bytes for a key file.
const KEY_MAGIC: &[u8; 4] = b"PJC\0";

/// Current key file version.
const KEY_VERSION: u8 = 1;

/// Key file header: magic + version + payload length + crc32.
const KEY_HEADER_LEN: usize = 4 + 1 + 8 + 4;

const KEY_EXTENSION: &str = "col";

/// Storage backend writing one checksummed file per key.
pub struct FileBackend {
    root: PathBuf,

    /// Held for the lifetime of the backend.
    _lock_file: File,

    wal: WriteAheadLog,

    /// fsync key files before renaming them into place.
    sync: bool,

    /// Set when a failed commit could not be rolled back. The WAL then
    /// holds a pending entry that must be replayed before the next access.
    needs_recovery: Mutex<bool>,
}

impl FileBackend {
    /// Open an existing journal directory or create a new one.
    pub fn open(config: &JournalConfig) -> Result<Self> {
        let root = config.path.clone();
        if root.join("MANIFEST").exists() {
            Self::verify_manifest(&root)?;
        } else if config.create_if_missing {
            fs::create_dir_all(&root)?;
            Self::write_manifest(&root)?;
        } else {
            return Err(JournalError::NotInitialized);
        }

        let lock_file = Self::acquire_lock(&root)?;
        fs::create_dir_all(root.join("data"))?;
        let wal = WriteAheadLog::open(root.join("journal.wal"), config.sync_writes)?;

        let backend = Self {
            root,
            _lock_file: lock_file,
            wal,
            sync: config.sync_writes,
            needs_recovery: Mutex::new(false),
        };

        let replayed = backend.recover()?;
        if replayed > 0 {
            info!(path = %backend.root.display(), replayed, "replayed pending journal commits");
        }

        Ok(backend)
    }

    /// Journal directory.
    pub fn path(&self) -> &Path {
        &self.root
    }

    /// Apply every commit the WAL holds without a commit marker.
    fn recover(&self) -> Result<usize> {
        let pending = self.wal.get_pending_entries()?;
        let count = pending.len();

        for entry in pending {
            if let WalOperation::Commit { writes } = entry.operation {
                debug!(seq = entry.seq, keys = writes.len(), "replaying commit");
                self.apply(&writes)?;
                self.wal.commit(entry.seq)?;
            }
        }

        if count > 0 {
            self.wal.clear()?;
        }
        Ok(count)
    }

    /// Replay a commit left unresolved in the WAL by an earlier failure.
    fn recover_if_needed(&self) -> Result<()> {
        let mut needs_recovery = self.needs_recovery.lock();
        if *needs_recovery {
            let replayed = self.recover()?;
            *needs_recovery = false;
            info!(replayed, "rolled interrupted commit forward");
        }
        Ok(())
    }

    fn apply(&self, writes: &[KeyWrite]) -> Result<()> {
        for write in writes {
            self.apply_one(write)?;
        }
        Ok(())
    }

    fn apply_one(&self, write: &KeyWrite) -> Result<()> {
        match &write.value {
            Some(value) => self.write_key(&write.key, value),
            None => self.remove_key(&write.key),
        }
    }

    /// Put back the key files a failed commit already replaced.
    ///
    /// On success the WAL entry is marked aborted. Otherwise it stays
    /// pending and the whole commit is rolled forward on next access.
    fn roll_back(&self, seq: u64, applied: &[KeyWrite], before: Vec<Option<Vec<u8>>>) {
        let restored = applied
            .iter()
            .zip(before)
            .try_for_each(|(write, raw)| self.restore_raw(&write.key, raw))
            .and_then(|()| self.wal.abort(seq))
            .and_then(|()| self.wal.clear());

        match restored {
            Ok(()) => debug!(seq, keys = applied.len(), "rolled back failed commit"),
            Err(e) => {
                warn!(seq, error = %e, "rollback failed, commit will be replayed");
                *self.needs_recovery.lock() = true;
            }
        }
    }

    /// Raw key file contents, header included.
    fn read_raw(&self, key: &str) -> Result<Option<Vec<u8>>> {
        match fs::read(self.key_path(key)?) {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn restore_raw(&self, key: &str, raw: Option<Vec<u8>>) -> Result<()> {
        let Some(bytes) = raw else {
            return self.remove_key(key);
        };

        let path = self.key_path(key)?;
        let tmp_path = path.with_extension("tmp");
        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(&bytes)?;
            if self.sync {
                file.sync_all()?;
            }
        }
        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn key_path(&self, key: &str) -> Result<PathBuf> {
        let valid = !key.is_empty()
            && key
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_');
        if !valid {
            return Err(JournalError::InvalidOperation(format!(
                "Invalid storage key: {:?}",
                key
            )));
        }
        Ok(self
            .root
            .join("data")
            .join(format!("{}.{}", key, KEY_EXTENSION)))
    }

    fn write_key(&self, key: &str, value: &[u8]) -> Result<()> {
        let path = self.key_path(key)?;
        let tmp_path = path.with_extension("tmp");

        {
            let mut file = File::create(&tmp_path)?;
            file.write_all(KEY_MAGIC)?;
            file.write_all(&[KEY_VERSION])?;
            file.write_all(&(value.len() as u64).to_le_bytes())?;
            file.write_all(&crc32fast::hash(value).to_le_bytes())?;
            file.write_all(value)?;
            if self.sync {
                file.sync_all()?;
            }
        }

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn remove_key(&self, key: &str) -> Result<()> {
        let path = self.key_path(key)?;
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    fn read_key(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.key_path(key)?;
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(e.into()),
        };

        if bytes.len() < KEY_HEADER_LEN {
            return Err(JournalError::Corruption(format!(
                "Key file {} is truncated",
                key
            )));
        }
        if &bytes[0..4] != KEY_MAGIC {
            return Err(JournalError::InvalidFormat(format!(
                "Invalid magic in key file {}",
                key
            )));
        }
        if bytes[4] != KEY_VERSION {
            return Err(JournalError::InvalidFormat(format!(
                "Unsupported key file version: {}",
                bytes[4]
            )));
        }

        let mut len_bytes = [0u8; 8];
        len_bytes.copy_from_slice(&bytes[5..13]);
        let len = u64::from_le_bytes(len_bytes) as usize;

        let mut crc_bytes = [0u8; 4];
        crc_bytes.copy_from_slice(&bytes[13..17]);
        let stored = u32::from_le_bytes(crc_bytes);

        let payload = &bytes[KEY_HEADER_LEN..];
        if payload.len() != len {
            return Err(JournalError::Corruption(format!(
                "Key file {} holds {} bytes, header says {}",
                key,
                payload.len(),
                len
            )));
        }

        let computed = crc32fast::hash(payload);
        if stored != computed {
            return Err(JournalError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        Ok(Some(payload.to_vec()))
    }

    fn write_manifest(path: &Path) -> Result<()> {
        let mut file = File::create(path.join("MANIFEST"))?;
        file.write_all(MANIFEST_MAGIC)?;
        file.write_all(&[MANIFEST_VERSION])?;
        file.sync_all()?;
        Ok(())
    }

    fn verify_manifest(path: &Path) -> Result<()> {
        let mut file = File::open(path.join("MANIFEST"))?;

        let mut magic = [0u8; 4];
        file.read_exact(&mut magic)?;
        if &magic != MANIFEST_MAGIC {
            return Err(JournalError::InvalidFormat("Invalid journal magic".into()));
        }

        let mut version = [0u8; 1];
        file.read_exact(&mut version)?;
        if version[0] != MANIFEST_VERSION {
            return Err(JournalError::InvalidFormat(format!(
                "Unsupported journal version: {}",
                version[0]
            )));
        }

        Ok(())
    }

    fn acquire_lock(path: &Path) -> Result<File> {
        let lock_file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path.join("LOCK"))?;

        lock_file
            .try_lock_exclusive()
            .map_err(|_| JournalError::Locked)?;

        Ok(lock_file)
    }
}

impl StorageBackend for FileBackend {
    fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        self.recover_if_needed()?;
        self.read_key(key)
    }

    fn commit(&self, batch: WriteBatch) -> Result<()> {
        self.recover_if_needed()?;
        if batch.is_empty() {
            return Ok(());
        }

        let writes = batch.into_writes();
        let before = writes
            .iter()
            .map(|write| self.read_raw(&write.key))
            .collect::<Result<Vec<_>>>()?;

        let seq = self.wal.log(writes.clone())?;
        for (applied, write) in writes.iter().enumerate() {
            if let Err(e) = self.apply_one(write) {
                self.roll_back(seq, &writes[..applied], before[..applied].to_vec());
                return Err(e);
            }
        }

        // Every key file is in place; a lost marker only costs an idempotent replay.
        if let Err(e) = self.wal.commit(seq).and_then(|()| self.wal.clear()) {
            warn!(seq, error = %e, "failed to mark commit, will replay");
            *self.needs_recovery.lock() = true;
        }
        Ok(())
    }

    fn keys(&self) -> Result<Vec<String>> {
        self.recover_if_needed()?;
        let mut keys = Vec::new();
        for entry in fs::read_dir(self.root.join("data"))? {
            let path = entry?.path();
            if path.extension().and_then(|e| e.to_str()) != Some(KEY_EXTENSION) {
                continue;
            }
            if let Some(stem) = path.file_stem().and_then(|s| s.to_str()) {
                keys.push(stem.to_string());
            }
        }
        keys.sort();
        Ok(keys)
    }
}
