//! Collection-keyed document store.
//!
//! Each collection is persisted as one JSON array under its key. All writes
//! go through a [`Transaction`]: the collections it touches are staged in
//! memory and handed to the backend as a single [`WriteBatch`] when the
//! closure returns `Ok`. Nothing is written if it returns `Err`.

use crate::error::{JournalError, Result};
use crate::events::{ChangeSet, EventBus, SubscriptionConfig, SubscriptionHandle, SubscriptionId};
use crate::model::{ActionData, CompanionData, VisitData};
use crate::storage::{FileBackend, MemoryBackend, StorageBackend, WriteBatch};
use crate::types::{
    now, AppMetadata, Collection, Document, JournalStats, Record, RecordId, DATA_VERSION,
    METADATA_KEY,
};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::path::PathBuf;
use tracing::{debug, info, warn};

/// Fields a patch can never overwrite.
const PROTECTED_FIELDS: [&str; 3] = ["id", "createdAt", "updatedAt"];

/// Journal configuration.
#[derive(Clone, Debug)]
pub struct JournalConfig {
    /// Directory holding the journal.
    pub path: PathBuf,

    /// Whether to create the journal if it doesn't exist.
    pub create_if_missing: bool,

    /// fsync the WAL and key files on every commit.
    pub sync_writes: bool,

    /// Events buffered per subscriber before it is dropped.
    /// Default: 256
    pub event_buffer_size: usize,
}

impl Default for JournalConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("./journal"),
            create_if_missing: true,
            sync_writes: true,
            event_buffer_size: 256,
        }
    }
}

/// Generic CRUD over named collections.
pub struct DocumentStore {
    backend: Box<dyn StorageBackend>,

    /// Readers share, transactions are exclusive.
    lock: RwLock<()>,

    events: EventBus,
    event_buffer_size: usize,
}

impl DocumentStore {
    /// Open (or create) a directory-backed store.
    pub fn open(config: JournalConfig) -> Result<Self> {
        let backend = FileBackend::open(&config)?;
        let mut store = Self::with_backend(backend);
        store.event_buffer_size = config.event_buffer_size;
        store.check_data_version()?;
        info!(path = %config.path.display(), "opened journal");
        Ok(store)
    }

    /// A store that lives only as long as the value.
    pub fn in_memory() -> Self {
        Self::with_backend(MemoryBackend::new())
    }

    pub fn with_backend(backend: impl StorageBackend + 'static) -> Self {
        Self {
            backend: Box::new(backend),
            lock: RwLock::new(()),
            events: EventBus::new(),
            event_buffer_size: JournalConfig::default().event_buffer_size,
        }
    }

    /// Run `f` against a staging area and commit its writes atomically.
    pub fn transaction<R>(&self, f: impl FnOnce(&mut Transaction<'_>) -> Result<R>) -> Result<R> {
        let _lock = self.lock.write();

        let mut tx = Transaction::new(self.backend.as_ref());
        let out = f(&mut tx)?;
        let changes = tx.commit()?;

        self.events
            .publish(changes.iter().map(|(collection, set)| (*collection, set)));
        Ok(out)
    }

    // --- Reads ---

    /// Every record in the collection.
    ///
    /// A missing collection is empty. So is one that cannot be decoded; that
    /// case is logged, and writes to it will fail instead of overwriting it.
    pub fn get_all<T: Document>(&self) -> Result<Vec<Record<T>>> {
        let _lock = self.lock.read();
        self.read_lenient::<T>()
    }

    pub fn get<T: Document>(&self, id: RecordId) -> Result<Option<Record<T>>> {
        Ok(self.get_all::<T>()?.into_iter().find(|r| r.id == id))
    }

    pub fn find<T: Document>(&self, predicate: impl Fn(&Record<T>) -> bool) -> Result<Vec<Record<T>>> {
        Ok(self
            .get_all::<T>()?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    // --- Single-collection writes ---

    pub fn create<T: Document>(&self, data: T) -> Result<Record<T>> {
        self.transaction(move |tx| tx.create(data))
    }

    /// Merge `patch` onto the record. Fails with `NotFound` for a missing id.
    pub fn update<T: Document, P: Serialize>(&self, id: RecordId, patch: &P) -> Result<Record<T>> {
        self.transaction(|tx| tx.update(id, patch))
    }

    /// Merge several patches in one commit, skipping ids that don't exist.
    pub fn update_many<T: Document, P: Serialize>(
        &self,
        updates: &[(RecordId, P)],
    ) -> Result<Vec<Record<T>>> {
        self.transaction(|tx| tx.update_many(updates))
    }

    /// Returns whether a record was removed.
    pub fn delete<T: Document>(&self, id: RecordId) -> Result<bool> {
        self.transaction(|tx| tx.delete::<T>(id))
    }

    /// Returns the number of records removed.
    pub fn delete_many<T: Document>(&self, ids: &[RecordId]) -> Result<usize> {
        self.transaction(|tx| tx.delete_many::<T>(ids))
    }

    /// Rewrite the whole collection in the given order.
    pub fn replace_all<T: Document>(&self, records: &[Record<T>]) -> Result<()> {
        self.transaction(|tx| tx.replace_all(records))
    }

    // --- Store Operations ---

    /// Stored metadata, or a fresh value if nothing has been written yet.
    pub fn metadata(&self) -> Result<AppMetadata> {
        let _lock = self.lock.read();
        match self.backend.read(METADATA_KEY)? {
            Some(bytes) => serde_json::from_slice(&bytes)
                .map_err(|e| JournalError::Corruption(format!("Unreadable metadata: {}", e))),
            None => Ok(AppMetadata::new()),
        }
    }

    pub fn stats(&self) -> Result<JournalStats> {
        Ok(JournalStats {
            visit_count: self.get_all::<VisitData>()?.len() as u64,
            companion_count: self.get_all::<CompanionData>()?.len() as u64,
            action_count: self.get_all::<ActionData>()?.len() as u64,
        })
    }

    /// Subscription settings using the configured buffer size.
    pub fn subscription_config(&self, collections: Option<Vec<Collection>>) -> SubscriptionConfig {
        SubscriptionConfig {
            buffer_size: self.event_buffer_size,
            collections,
        }
    }

    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        self.events.subscribe(config)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.events.unsubscribe(id)
    }

    // --- Private Helpers ---

    fn read_lenient<T: Document>(&self) -> Result<Vec<Record<T>>> {
        let collection = T::COLLECTION;
        let bytes = match self.backend.read(collection.key()) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => return Ok(Vec::new()),
            Err(e) if is_decode_failure(&e) => {
                warn!(%collection, error = %e, "collection unreadable, treating as empty");
                return Ok(Vec::new());
            }
            Err(e) => return Err(e),
        };

        match serde_json::from_slice(&bytes) {
            Ok(records) => Ok(records),
            Err(e) => {
                warn!(%collection, error = %e, "collection unreadable, treating as empty");
                Ok(Vec::new())
            }
        }
    }

    fn check_data_version(&self) -> Result<()> {
        let meta = self.metadata()?;
        if meta.data_version > DATA_VERSION {
            return Err(JournalError::InvalidFormat(format!(
                "Journal data version {} is newer than supported version {}",
                meta.data_version, DATA_VERSION
            )));
        }
        Ok(())
    }
}

fn is_decode_failure(e: &JournalError) -> bool {
    matches!(
        e,
        JournalError::Deserialization(_)
            | JournalError::Corruption(_)
            | JournalError::ChecksumMismatch { .. }
            | JournalError::InvalidFormat(_)
    )
}

/// A collection loaded for writing.
struct Staged {
    records: Vec<Value>,
    dirty: bool,
}

/// Staging area for one atomic commit.
///
/// Collections are loaded on first use and must decode cleanly; a write
/// never replaces a collection it could not read.
pub struct Transaction<'a> {
    backend: &'a dyn StorageBackend,
    staged: BTreeMap<Collection, Staged>,
    metadata: Option<AppMetadata>,
    metadata_dirty: bool,
    changes: BTreeMap<Collection, ChangeSet>,
}

impl<'a> Transaction<'a> {
    fn new(backend: &'a dyn StorageBackend) -> Self {
        Self {
            backend,
            staged: BTreeMap::new(),
            metadata: None,
            metadata_dirty: false,
            changes: BTreeMap::new(),
        }
    }

    pub fn get_all<T: Document>(&mut self) -> Result<Vec<Record<T>>> {
        let staged = self.stage::<T>()?;
        staged.records.iter().map(decode::<T>).collect()
    }

    pub fn get<T: Document>(&mut self, id: RecordId) -> Result<Option<Record<T>>> {
        let staged = self.stage::<T>()?;
        match position(&staged.records, id) {
            Some(pos) => decode::<T>(&staged.records[pos]).map(Some),
            None => Ok(None),
        }
    }

    pub fn find<T: Document>(
        &mut self,
        predicate: impl Fn(&Record<T>) -> bool,
    ) -> Result<Vec<Record<T>>> {
        Ok(self
            .get_all::<T>()?
            .into_iter()
            .filter(|r| predicate(r))
            .collect())
    }

    /// Assign an id and timestamps, then append.
    pub fn create<T: Document>(&mut self, data: T) -> Result<Record<T>> {
        // Stage first so an unreadable collection fails before an id is spent
        self.stage::<T>()?;
        let id = self.metadata_mut()?.allocate_id();
        let created = now();

        let record = Record {
            id,
            created_at: created,
            updated_at: created,
            data,
        };
        let value = serde_json::to_value(&record)?;

        let staged = self.stage::<T>()?;
        staged.records.push(value);
        staged.dirty = true;

        self.change_set(T::COLLECTION).created.push(id);
        Ok(record)
    }

    pub fn update<T: Document, P: Serialize>(&mut self, id: RecordId, patch: &P) -> Result<Record<T>> {
        self.try_update(id, patch)?.ok_or(JournalError::NotFound {
            collection: T::COLLECTION,
            id,
        })
    }

    /// Like [`update`](Self::update) but `None` for a missing id.
    pub fn try_update<T: Document, P: Serialize>(
        &mut self,
        id: RecordId,
        patch: &P,
    ) -> Result<Option<Record<T>>> {
        let patch = patch_fields(patch)?;
        let staged = self.stage::<T>()?;
        let pos = match position(&staged.records, id) {
            Some(pos) => pos,
            None => return Ok(None),
        };

        let mut merged = staged.records[pos].clone();
        let fields = merged.as_object_mut().ok_or_else(|| {
            JournalError::Corruption(format!("{} record {} is not an object", T::COLLECTION, id))
        })?;
        for (key, value) in patch {
            if PROTECTED_FIELDS.contains(&key.as_str()) {
                continue;
            }
            fields.insert(key, value);
        }
        fields.insert("updatedAt".to_string(), serde_json::to_value(now())?);

        let record: Record<T> = serde_json::from_value(merged).map_err(|e| {
            JournalError::InvalidOperation(format!(
                "Patch leaves {} record {} invalid: {}",
                T::COLLECTION,
                id,
                e
            ))
        })?;
        staged.records[pos] = serde_json::to_value(&record)?;
        staged.dirty = true;

        let set = self.change_set(T::COLLECTION);
        if !set.updated.contains(&id) && !set.created.contains(&id) {
            set.updated.push(id);
        }
        Ok(Some(record))
    }

    /// Apply each patch; missing ids are skipped.
    pub fn update_many<T: Document, P: Serialize>(
        &mut self,
        updates: &[(RecordId, P)],
    ) -> Result<Vec<Record<T>>> {
        let mut updated = Vec::with_capacity(updates.len());
        for (id, patch) in updates {
            match self.try_update::<T, P>(*id, patch)? {
                Some(record) => updated.push(record),
                None => debug!(collection = %T::COLLECTION, %id, "skipping update of missing record"),
            }
        }
        Ok(updated)
    }

    pub fn delete<T: Document>(&mut self, id: RecordId) -> Result<bool> {
        Ok(self.delete_many::<T>(&[id])? > 0)
    }

    pub fn delete_many<T: Document>(&mut self, ids: &[RecordId]) -> Result<usize> {
        if ids.is_empty() {
            return Ok(0);
        }

        let staged = self.stage::<T>()?;
        let mut removed = Vec::new();
        staged.records.retain(|value| match record_id(value) {
            Some(id) if ids.contains(&id) => {
                removed.push(id);
                false
            }
            _ => true,
        });

        if removed.is_empty() {
            return Ok(0);
        }
        staged.dirty = true;

        let count = removed.len();
        self.change_set(T::COLLECTION).deleted.extend(removed);
        Ok(count)
    }

    /// Rewrite the collection with exactly these records, in this order.
    pub fn replace_all<T: Document>(&mut self, records: &[Record<T>]) -> Result<()> {
        let values = records
            .iter()
            .map(serde_json::to_value)
            .collect::<std::result::Result<Vec<_>, _>>()?;

        let staged = self.stage::<T>()?;
        staged.records = values;
        staged.dirty = true;

        self.change_set(T::COLLECTION).replaced = true;
        Ok(())
    }

    fn stage<T: Document>(&mut self) -> Result<&mut Staged> {
        let collection = T::COLLECTION;
        match self.staged.entry(collection) {
            Entry::Occupied(entry) => Ok(entry.into_mut()),
            Entry::Vacant(entry) => {
                let records = match self.backend.read(collection.key())? {
                    Some(bytes) => {
                        let records: Vec<Value> = serde_json::from_slice(&bytes).map_err(|e| {
                            JournalError::Corruption(format!(
                                "{} collection is unreadable: {}",
                                collection, e
                            ))
                        })?;
                        for value in &records {
                            Record::<T>::deserialize(value).map_err(|e| {
                                JournalError::Corruption(format!(
                                    "{} collection holds an unreadable record: {}",
                                    collection, e
                                ))
                            })?;
                        }
                        records
                    }
                    None => Vec::new(),
                };
                Ok(entry.insert(Staged {
                    records,
                    dirty: false,
                }))
            }
        }
    }

    fn metadata_mut(&mut self) -> Result<&mut AppMetadata> {
        if self.metadata.is_none() {
            let meta = match self.backend.read(METADATA_KEY)? {
                Some(bytes) => serde_json::from_slice(&bytes)
                    .map_err(|e| JournalError::Corruption(format!("Unreadable metadata: {}", e)))?,
                None => {
                    // First write, or data seeded without metadata: never reuse an id
                    let highest = [
                        max_id(self.stage::<VisitData>()?),
                        max_id(self.stage::<CompanionData>()?),
                        max_id(self.stage::<ActionData>()?),
                    ];
                    let mut meta = AppMetadata::new();
                    meta.next_id = highest.iter().max().copied().unwrap_or(0) + 1;
                    meta
                }
            };
            self.metadata = Some(meta);
        }

        self.metadata_dirty = true;
        Ok(self.metadata.get_or_insert_with(AppMetadata::new))
    }

    fn change_set(&mut self, collection: Collection) -> &mut ChangeSet {
        self.changes.entry(collection).or_default()
    }

    fn commit(self) -> Result<BTreeMap<Collection, ChangeSet>> {
        let mut batch = WriteBatch::new();

        for (collection, staged) in &self.staged {
            if staged.dirty {
                batch.put(collection.key(), serde_json::to_vec(&staged.records)?);
            }
        }
        if self.metadata_dirty {
            if let Some(meta) = &self.metadata {
                batch.put(METADATA_KEY, serde_json::to_vec(meta)?);
            }
        }

        if !batch.is_empty() {
            debug!(keys = batch.len(), "committing");
            self.backend.commit(batch)?;
        }
        Ok(self.changes)
    }
}

fn max_id(staged: &Staged) -> u64 {
    staged
        .records
        .iter()
        .filter_map(record_id)
        .map(|id| id.0)
        .max()
        .unwrap_or(0)
}

fn record_id(value: &Value) -> Option<RecordId> {
    value.get("id").and_then(Value::as_u64).map(RecordId)
}

fn position(records: &[Value], id: RecordId) -> Option<usize> {
    records.iter().position(|v| record_id(v) == Some(id))
}

fn decode<T: Document>(value: &Value) -> Result<Record<T>> {
    Record::<T>::deserialize(value).map_err(|e| {
        JournalError::Deserialization(format!("{} record: {}", T::COLLECTION, e))
    })
}

fn patch_fields<P: Serialize>(patch: &P) -> Result<Map<String, Value>> {
    match serde_json::to_value(patch)? {
        Value::Object(fields) => Ok(fields),
        other => Err(JournalError::InvalidOperation(format!(
            "Patch must serialize to an object, got {}",
            other
        ))),
    }
}
