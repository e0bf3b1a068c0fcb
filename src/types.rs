//! Core types shared by the store and the repositories.

use chrono::{DateTime, SubsecRound, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Deref, DerefMut};

/// Unique identifier for a record. Assigned by the store, never reused.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RecordId(pub u64);

impl fmt::Debug for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RecordId({})", self.0)
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Named collections held by the store.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Collection {
    Visits,
    Companions,
    Actions,
}

impl Collection {
    pub const ALL: [Collection; 3] = [Collection::Visits, Collection::Companions, Collection::Actions];

    /// Storage key the collection is persisted under.
    pub fn key(self) -> &'static str {
        match self {
            Collection::Visits => "visits",
            Collection::Companions => "companions",
            Collection::Actions => "actions",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Collection::Visits => "VISITS",
            Collection::Companions => "COMPANIONS",
            Collection::Actions => "ACTIONS",
        };
        f.write_str(name)
    }
}

/// Storage key for [`AppMetadata`].
pub const METADATA_KEY: &str = "app_metadata";

/// Current on-disk data version.
pub const DATA_VERSION: u32 = 1;

/// Current time, truncated to the microsecond so it survives a JSON round trip.
pub fn now() -> DateTime<Utc> {
    Utc::now().trunc_subsecs(6)
}

/// An entity body that lives in one collection.
pub trait Document: Serialize + DeserializeOwned + Clone + Send + 'static {
    const COLLECTION: Collection;
}

/// A stored record: store-managed fields plus the entity body.
///
/// The body is flattened, so the JSON shape is a single object
/// (`{"id": 1, "createdAt": ..., "updatedAt": ..., "date": ...}`).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Record<T> {
    /// Unique identifier (assigned by store).
    pub id: RecordId,

    /// When the record was created.
    pub created_at: DateTime<Utc>,

    /// Last write through the store.
    pub updated_at: DateTime<Utc>,

    #[serde(flatten)]
    pub data: T,
}

impl<T> Deref for Record<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.data
    }
}

impl<T> DerefMut for Record<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.data
    }
}

/// Store-wide bookkeeping, persisted under [`METADATA_KEY`].
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppMetadata {
    pub data_version: u32,

    /// Next id to hand out.
    pub next_id: u64,

    pub created_at: DateTime<Utc>,
}

impl AppMetadata {
    pub fn new() -> Self {
        Self {
            data_version: DATA_VERSION,
            next_id: 1,
            created_at: now(),
        }
    }

    /// Take the next id.
    pub fn allocate_id(&mut self) -> RecordId {
        let id = RecordId(self.next_id);
        self.next_id += 1;
        id
    }
}

impl Default for AppMetadata {
    fn default() -> Self {
        Self::new()
    }
}

/// Record counts per collection.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct JournalStats {
    pub visit_count: u64,
    pub companion_count: u64,
    pub action_count: u64,
}
