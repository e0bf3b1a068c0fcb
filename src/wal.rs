//! Write-ahead log for atomic multi-key commits.
//!
//! A commit touching several keys is written here first. Only once the
//! entry is durable are the key files replaced; the entry is then marked
//! committed. On open, entries without a commit marker are replayed, so a
//! crash in the middle of a cascade never leaves half of it on disk.

use crate::error::{JournalError, Result};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet};
use std::fs::{File, OpenOptions};
use std::io::{BufReader, BufWriter, Read, Seek, SeekFrom, Write};
use std::path::{Path, PathBuf};
use tracing::warn;

/// Magic bytes for WAL file.
const WAL_MAGIC: &[u8; 4] = b"PJW\0";

/// Current WAL format version.
const WAL_VERSION: u8 = 1;

/// Header length (magic + version).
const WAL_HEADER_LEN: u64 = 5;

/// WAL entry status.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum WalEntryStatus {
    /// Entry has been written but its writes may not be applied yet.
    Pending,
    /// All writes of the entry reached their key files.
    Committed,
    /// The entry's writes were undone and must not be replayed.
    Aborted,
}

/// A single key replacement. `None` removes the key.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct KeyWrite {
    pub key: String,
    pub value: Option<Vec<u8>>,
}

/// Operations that can be recorded in the WAL.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum WalOperation {
    /// Replace a set of keys together.
    Commit { writes: Vec<KeyWrite> },
    /// Commit marker for an earlier entry.
    Marker,
}

/// A single WAL entry.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WalEntry {
    /// Unique sequence number for this entry.
    pub seq: u64,
    pub status: WalEntryStatus,
    pub operation: WalOperation,
    /// Unix seconds when the entry was written.
    pub timestamp: i64,
}

/// Write-ahead log manager.
pub struct WriteAheadLog {
    path: PathBuf,
    next_seq: Mutex<u64>,
    writer: Mutex<Option<BufWriter<File>>>,
    /// fsync after every entry.
    sync: bool,
}

impl WriteAheadLog {
    /// Create or open a WAL file.
    pub fn open(path: impl AsRef<Path>, sync: bool) -> Result<Self> {
        let path = path.as_ref().to_path_buf();

        let (next_seq, writer) = if path.exists() {
            let file = OpenOptions::new().read(true).open(&path)?;
            let mut reader = BufReader::new(file);
            Self::read_header(&mut reader)?;

            let mut max_seq = 0u64;
            let mut valid_len = WAL_HEADER_LEN;
            while let Ok(entry) = Self::read_entry(&mut reader) {
                max_seq = max_seq.max(entry.seq);
                valid_len = reader.stream_position()?;
            }

            // Drop a torn tail so new entries stay readable
            let file_len = std::fs::metadata(&path)?.len();
            if valid_len < file_len {
                warn!(
                    path = %path.display(),
                    dropped = file_len - valid_len,
                    "truncating torn WAL tail"
                );
                OpenOptions::new().write(true).open(&path)?.set_len(valid_len)?;
            }

            let file = OpenOptions::new().append(true).open(&path)?;
            (max_seq + 1, Some(BufWriter::new(file)))
        } else {
            let mut file = OpenOptions::new()
                .write(true)
                .create(true)
                .truncate(true)
                .open(&path)?;

            file.write_all(WAL_MAGIC)?;
            file.write_all(&[WAL_VERSION])?;
            file.sync_all()?;

            (1, Some(BufWriter::new(file)))
        };

        Ok(Self {
            path,
            next_seq: Mutex::new(next_seq),
            writer: Mutex::new(writer),
            sync,
        })
    }

    /// Log a set of key writes as pending. Returns the sequence number.
    pub fn log(&self, writes: Vec<KeyWrite>) -> Result<u64> {
        let mut next_seq = self.next_seq.lock();
        let seq = *next_seq;
        *next_seq += 1;

        let entry = WalEntry {
            seq,
            status: WalEntryStatus::Pending,
            operation: WalOperation::Commit { writes },
            timestamp: crate::types::now().timestamp(),
        };
        self.append(&entry)?;

        Ok(seq)
    }

    /// Mark an entry as committed.
    pub fn commit(&self, seq: u64) -> Result<()> {
        let marker = WalEntry {
            seq,
            status: WalEntryStatus::Committed,
            operation: WalOperation::Marker,
            timestamp: crate::types::now().timestamp(),
        };
        self.append(&marker)
    }

    /// Mark an entry as rolled back.
    pub fn abort(&self, seq: u64) -> Result<()> {
        let marker = WalEntry {
            seq,
            status: WalEntryStatus::Aborted,
            operation: WalOperation::Marker,
            timestamp: crate::types::now().timestamp(),
        };
        self.append(&marker)
    }

    /// All entries without a commit or abort marker, oldest first.
    pub fn get_pending_entries(&self) -> Result<Vec<WalEntry>> {
        let mut file = File::open(&self.path)?;
        file.seek(SeekFrom::Start(WAL_HEADER_LEN))?;

        let mut reader = BufReader::new(file);
        let mut entries = BTreeMap::new();
        let mut resolved = HashSet::new();

        // A torn trailing entry ends the scan; it was never acknowledged.
        while let Ok(entry) = Self::read_entry(&mut reader) {
            match entry.status {
                WalEntryStatus::Committed | WalEntryStatus::Aborted => {
                    resolved.insert(entry.seq);
                }
                WalEntryStatus::Pending => {
                    entries.insert(entry.seq, entry);
                }
            }
        }

        Ok(entries
            .into_iter()
            .filter(|(seq, _)| !resolved.contains(seq))
            .map(|(_, entry)| entry)
            .collect())
    }

    /// Truncate the WAL (called once every entry is applied).
    pub fn clear(&self) -> Result<()> {
        // Same lock order as `log`: sequence first, then writer.
        let mut next_seq = self.next_seq.lock();
        let mut writer = self.writer.lock();
        *writer = None;

        let mut file = OpenOptions::new()
            .write(true)
            .truncate(true)
            .open(&self.path)?;

        file.write_all(WAL_MAGIC)?;
        file.write_all(&[WAL_VERSION])?;
        file.sync_all()?;

        *writer = Some(BufWriter::new(
            OpenOptions::new().append(true).open(&self.path)?,
        ));

        *next_seq = 1;

        Ok(())
    }

    pub fn has_pending(&self) -> Result<bool> {
        Ok(!self.get_pending_entries()?.is_empty())
    }

    fn append(&self, entry: &WalEntry) -> Result<()> {
        let mut writer = self.writer.lock();
        if let Some(ref mut w) = *writer {
            Self::write_entry(w, entry)?;
            w.flush()?;
            if self.sync {
                w.get_ref().sync_all()?;
            }
        }
        Ok(())
    }

    fn read_header(reader: &mut BufReader<File>) -> Result<()> {
        let mut magic = [0u8; 4];
        reader.read_exact(&mut magic)?;
        if &magic != WAL_MAGIC {
            return Err(JournalError::InvalidFormat("Invalid WAL magic".into()));
        }

        let mut version = [0u8; 1];
        reader.read_exact(&mut version)?;
        if version[0] != WAL_VERSION {
            return Err(JournalError::InvalidFormat(format!(
                "Unsupported WAL version: {}",
                version[0]
            )));
        }
        Ok(())
    }

    fn write_entry(writer: &mut BufWriter<File>, entry: &WalEntry) -> Result<()> {
        let encoded = rmp_serde::to_vec(entry)?;

        let len = encoded.len() as u32;
        writer.write_all(&len.to_le_bytes())?;
        writer.write_all(&encoded)?;

        let checksum = crc32fast::hash(&encoded);
        writer.write_all(&checksum.to_le_bytes())?;

        Ok(())
    }

    fn read_entry(reader: &mut BufReader<File>) -> Result<WalEntry> {
        let mut len_bytes = [0u8; 4];
        reader.read_exact(&mut len_bytes)?;
        let len = u32::from_le_bytes(len_bytes) as usize;

        if len > 256 * 1024 * 1024 {
            return Err(JournalError::Corruption("WAL entry too large".into()));
        }

        let mut encoded = vec![0u8; len];
        reader.read_exact(&mut encoded)?;

        let mut checksum_bytes = [0u8; 4];
        reader.read_exact(&mut checksum_bytes)?;
        let stored = u32::from_le_bytes(checksum_bytes);

        let computed = crc32fast::hash(&encoded);
        if stored != computed {
            return Err(JournalError::ChecksumMismatch {
                expected: stored,
                got: computed,
            });
        }

        Ok(rmp_serde::from_slice(&encoded)?)
    }
}
