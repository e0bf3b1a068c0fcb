//! Fan-out of committed changes to subscribers.

use super::types::{
    ChangeSet, DropReason, JournalEvent, SubscriptionConfig, SubscriptionHandle, SubscriptionId,
};
use crate::types::Collection;
use crossbeam_channel::{bounded, Sender, TrySendError};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::debug;

struct Subscription {
    config: SubscriptionConfig,
    sender: Sender<JournalEvent>,
}

/// Broadcasts commit notifications. Slow subscribers are dropped rather
/// than allowed to block writers.
pub struct EventBus {
    subscriptions: RwLock<HashMap<SubscriptionId, Subscription>>,
    next_id: AtomicU64,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            subscriptions: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn subscribe(&self, config: SubscriptionConfig) -> SubscriptionHandle {
        let id = SubscriptionId(self.next_id.fetch_add(1, Ordering::SeqCst));
        let (sender, receiver) = bounded(config.buffer_size.max(1));

        self.subscriptions
            .write()
            .insert(id, Subscription { config, sender });

        SubscriptionHandle { id, receiver }
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        if let Some(sub) = self.subscriptions.write().remove(&id) {
            let _ = sub.sender.try_send(JournalEvent::Dropped {
                reason: DropReason::Unsubscribed,
            });
        }
    }

    pub fn subscription_count(&self) -> usize {
        self.subscriptions.read().len()
    }

    /// Publish the changes of one commit.
    pub fn publish<'a>(&self, changes: impl IntoIterator<Item = (Collection, &'a ChangeSet)>) {
        let events: Vec<(Collection, JournalEvent)> = changes
            .into_iter()
            .filter(|(_, set)| !set.is_empty())
            .map(|(collection, set)| {
                (
                    collection,
                    JournalEvent::Changed {
                        collection,
                        changes: set.clone(),
                    },
                )
            })
            .collect();

        if events.is_empty() || self.subscriptions.read().is_empty() {
            return;
        }

        let mut dropped = Vec::new();
        {
            let subs = self.subscriptions.read();
            'subs: for (id, sub) in subs.iter() {
                for (collection, event) in &events {
                    if !sub.config.wants(*collection) {
                        continue;
                    }
                    match sub.sender.try_send(event.clone()) {
                        Ok(()) => {}
                        Err(TrySendError::Full(_)) | Err(TrySendError::Disconnected(_)) => {
                            dropped.push(*id);
                            continue 'subs;
                        }
                    }
                }
            }
        }

        if !dropped.is_empty() {
            let mut subs = self.subscriptions.write();
            for id in dropped {
                debug!(subscription = id.0, reason = ?DropReason::BufferOverflow, "dropping subscriber");
                subs.remove(&id);
            }
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
