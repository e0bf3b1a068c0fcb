//! Change notification types.

use crate::types::{Collection, RecordId};
use serde::{Deserialize, Serialize};

/// Configuration for a subscription.
#[derive(Clone, Debug)]
pub struct SubscriptionConfig {
    /// Max buffered events before the subscriber is dropped.
    /// Default: 256
    pub buffer_size: usize,

    /// Collections of interest (None = all).
    pub collections: Option<Vec<Collection>>,
}

impl Default for SubscriptionConfig {
    fn default() -> Self {
        Self {
            buffer_size: 256,
            collections: None,
        }
    }
}

impl SubscriptionConfig {
    pub fn collections(collections: Vec<Collection>) -> Self {
        Self {
            collections: Some(collections),
            ..Default::default()
        }
    }

    pub(crate) fn wants(&self, collection: Collection) -> bool {
        match &self.collections {
            Some(wanted) => wanted.contains(&collection),
            None => true,
        }
    }
}

/// Ids touched in one collection by one commit.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeSet {
    pub created: Vec<RecordId>,
    pub updated: Vec<RecordId>,
    pub deleted: Vec<RecordId>,
    /// The whole collection was rewritten.
    pub replaced: bool,
}

impl ChangeSet {
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.updated.is_empty() && self.deleted.is_empty() && !self.replaced
    }
}

/// Events delivered to subscribers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum JournalEvent {
    /// A commit changed records in a collection.
    Changed {
        collection: Collection,
        changes: ChangeSet,
    },

    /// Subscription was dropped.
    Dropped { reason: DropReason },
}

/// Why a subscription was dropped.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Send buffer overflowed (slow consumer).
    BufferOverflow,
    /// Explicitly unsubscribed.
    Unsubscribed,
}

/// Unique identifier for a subscription.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub u64);

/// Handle to a subscription.
pub struct SubscriptionHandle {
    pub id: SubscriptionId,
    pub receiver: crossbeam_channel::Receiver<JournalEvent>,
}

impl SubscriptionHandle {
    /// Receive the next event (blocking).
    pub fn recv(&self) -> Result<JournalEvent, crossbeam_channel::RecvError> {
        self.receiver.recv()
    }

    /// Try to receive an event (non-blocking).
    pub fn try_recv(&self) -> Result<JournalEvent, crossbeam_channel::TryRecvError> {
        self.receiver.try_recv()
    }

    /// Every event currently buffered.
    pub fn drain(&self) -> Vec<JournalEvent> {
        self.receiver.try_iter().collect()
    }
}
