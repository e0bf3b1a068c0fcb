//! Entity repositories.
//!
//! [`Journal`] is the entry point for callers. Every operation that touches
//! more than one record (the companion/visit links, cascade deletes,
//! reordering) runs in a single store transaction.

mod actions;
mod companions;
mod visits;

use crate::error::Result;
use crate::events::{SubscriptionHandle, SubscriptionId};
use crate::model::{Visit, VisitData};
use crate::query::VisitFilter;
use crate::stats::{self, ActionStatistics, VisitStatistics};
use crate::storage::StorageBackend;
use crate::store::{DocumentStore, JournalConfig};
use crate::types::{Collection, JournalStats, RecordId};

/// A park journal: visits, companions and timeline actions.
pub struct Journal {
    store: DocumentStore,
}

impl Journal {
    /// Open (or create) a journal directory.
    pub fn open(config: JournalConfig) -> Result<Self> {
        Ok(Self::with_store(DocumentStore::open(config)?))
    }

    pub fn in_memory() -> Self {
        Self::with_store(DocumentStore::in_memory())
    }

    pub fn with_backend(backend: impl StorageBackend + 'static) -> Self {
        Self::with_store(DocumentStore::with_backend(backend))
    }

    pub fn with_store(store: DocumentStore) -> Self {
        Self { store }
    }

    /// The underlying document store.
    pub fn store(&self) -> &DocumentStore {
        &self.store
    }

    /// Subscribe to committed changes. `None` means every collection.
    pub fn subscribe(&self, collections: Option<Vec<Collection>>) -> SubscriptionHandle {
        self.store
            .subscribe(self.store.subscription_config(collections))
    }

    pub fn unsubscribe(&self, id: SubscriptionId) {
        self.store.unsubscribe(id)
    }

    pub fn stats(&self) -> Result<JournalStats> {
        self.store.stats()
    }

    // --- Queries ---

    /// Visits matching every clause of `filter`, in stored order.
    pub fn get_filtered_visits(&self, filter: &VisitFilter) -> Result<Vec<Visit>> {
        self.store.find::<VisitData>(|visit| filter.matches(visit))
    }

    /// Statistics over all visits, or over those matching `filter`.
    pub fn get_visit_statistics(&self, filter: Option<&VisitFilter>) -> Result<VisitStatistics> {
        let visits = match filter {
            Some(filter) => self.get_filtered_visits(filter)?,
            None => self.list_visits()?,
        };
        let companions = self.list_companions()?;
        Ok(stats::visit_statistics(&visits, &companions))
    }

    /// Statistics over all actions, or over one visit's timeline.
    pub fn get_action_statistics(
        &self,
        visit_id: Option<RecordId>,
    ) -> Result<ActionStatistics> {
        let actions = match visit_id {
            Some(id) => self.get_actions_by_visit(id)?,
            None => self.list_actions()?,
        };
        Ok(stats::action_statistics(&actions))
    }
}
