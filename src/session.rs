//! Cached snapshots for UI screens.
//!
//! A view holds the collections a screen renders, plus loading and error
//! state. Mutations go through the journal; a failed one is recorded in
//! [`error`](VisitsView::error) and returned, a successful one reloads the
//! snapshot. A committed mutation always returns its value, even when the
//! reload after it fails; that failure only shows up in `error()`.

use crate::error::Result;
use crate::events::{JournalEvent, SubscriptionHandle};
use crate::model::{
    ActionData, ActionPatch, Companion, CompanionData, CompanionPatch, TimelineAction, Visit,
    VisitData, VisitPatch,
};
use crate::query::VisitFilter;
use crate::repository::Journal;
use crate::stats::{self, ActionStatistics, VisitStatistics};
use crate::types::RecordId;
use tracing::{debug, warn};

/// Visits and companions.
pub struct VisitsView<'a> {
    journal: &'a Journal,
    visits: Vec<Visit>,
    companions: Vec<Companion>,
    loading: bool,
    error: Option<String>,
}

impl<'a> VisitsView<'a> {
    /// An empty view; loading until the first [`refresh`](Self::refresh).
    pub fn new(journal: &'a Journal) -> Self {
        Self {
            journal,
            visits: Vec::new(),
            companions: Vec::new(),
            loading: true,
            error: None,
        }
    }

    /// A view with its first snapshot loaded. A load failure is kept in
    /// `error()`.
    pub fn load(journal: &'a Journal) -> Self {
        let mut view = Self::new(journal);
        let _ = view.refresh();
        view
    }

    pub fn visits(&self) -> &[Visit] {
        &self.visits
    }

    pub fn companions(&self) -> &[Companion] {
        &self.companions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn refresh(&mut self) -> Result<()> {
        let loaded = self
            .journal
            .list_visits()
            .and_then(|visits| Ok((visits, self.journal.list_companions()?)));
        self.loading = false;

        match loaded {
            Ok((visits, companions)) => {
                self.visits = visits;
                self.companions = companions;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Reload if `handle` has buffered events. Returns whether it did.
    pub fn refresh_if_changed(&mut self, handle: &SubscriptionHandle) -> Result<bool> {
        let changed = handle
            .drain()
            .iter()
            .any(|event| matches!(event, JournalEvent::Changed { .. }));
        if changed {
            self.refresh()?;
        }
        Ok(changed)
    }

    pub fn create_visit(&mut self, data: VisitData) -> Result<Visit> {
        let result = self.journal.create_visit(data);
        self.settle(result)
    }

    pub fn update_visit(&mut self, id: RecordId, patch: VisitPatch) -> Result<Option<Visit>> {
        let result = self.journal.update_visit(id, patch);
        self.settle(result)
    }

    pub fn delete_visit(&mut self, id: RecordId) -> Result<bool> {
        let result = self.journal.delete_visit(id);
        self.settle(result)
    }

    pub fn create_companion(&mut self, data: CompanionData) -> Result<Companion> {
        let result = self.journal.create_companion(data);
        self.settle(result)
    }

    pub fn update_companion(
        &mut self,
        id: RecordId,
        patch: CompanionPatch,
    ) -> Result<Option<Companion>> {
        let result = self.journal.update_companion(id, patch);
        self.settle(result)
    }

    pub fn delete_companion(&mut self, id: RecordId) -> Result<bool> {
        let result = self.journal.delete_companion(id);
        self.settle(result)
    }

    /// Filter the held snapshot.
    pub fn filtered_visits(&self, filter: &VisitFilter) -> Vec<Visit> {
        self.visits
            .iter()
            .filter(|visit| filter.matches(visit))
            .cloned()
            .collect()
    }

    /// Statistics over the held snapshot.
    pub fn statistics(&self, filter: Option<&VisitFilter>) -> VisitStatistics {
        match filter {
            Some(filter) => stats::visit_statistics(&self.filtered_visits(filter), &self.companions),
            None => stats::visit_statistics(&self.visits, &self.companions),
        }
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Err(e) = self.refresh() {
                    warn!(error = %e, "reload after visit view mutation failed");
                }
                Ok(value)
            }
            Err(e) => {
                debug!(error = %e, "visit view mutation failed");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}

/// One visit's timeline.
pub struct ActionsView<'a> {
    journal: &'a Journal,
    visit_id: RecordId,
    actions: Vec<TimelineAction>,
    loading: bool,
    error: Option<String>,
}

impl<'a> ActionsView<'a> {
    pub fn new(journal: &'a Journal, visit_id: RecordId) -> Self {
        Self {
            journal,
            visit_id,
            actions: Vec::new(),
            loading: true,
            error: None,
        }
    }

    /// A view with the visit's actions loaded. A load failure is kept in
    /// `error()`.
    pub fn load(journal: &'a Journal, visit_id: RecordId) -> Self {
        let mut view = Self::new(journal, visit_id);
        let _ = view.refresh();
        view
    }

    pub fn visit_id(&self) -> RecordId {
        self.visit_id
    }

    pub fn actions(&self) -> &[TimelineAction] {
        &self.actions
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn refresh(&mut self) -> Result<()> {
        let loaded = self.journal.get_actions_by_visit(self.visit_id);
        self.loading = false;

        match loaded {
            Ok(actions) => {
                self.actions = actions;
                self.error = None;
                Ok(())
            }
            Err(e) => {
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }

    pub fn refresh_if_changed(&mut self, handle: &SubscriptionHandle) -> Result<bool> {
        let changed = handle
            .drain()
            .iter()
            .any(|event| matches!(event, JournalEvent::Changed { .. }));
        if changed {
            self.refresh()?;
        }
        Ok(changed)
    }

    /// Add an action to this view's visit, whatever `visit_id` `data` carries.
    pub fn create_action(&mut self, mut data: ActionData) -> Result<TimelineAction> {
        data.visit_id = self.visit_id;
        let result = self.journal.create_action(data);
        self.settle(result)
    }

    pub fn update_action(
        &mut self,
        id: RecordId,
        patch: ActionPatch,
    ) -> Result<Option<TimelineAction>> {
        let result = self.journal.update_action(id, patch);
        self.settle(result)
    }

    pub fn delete_action(&mut self, id: RecordId) -> Result<bool> {
        let result = self.journal.delete_action(id);
        self.settle(result)
    }

    pub fn reorder_actions(&mut self, from: usize, to: usize) -> Result<Vec<TimelineAction>> {
        let result = self.journal.reorder_actions(self.visit_id, from, to);
        self.settle(result)
    }

    pub fn statistics(&self) -> ActionStatistics {
        stats::action_statistics(&self.actions)
    }

    fn settle<T>(&mut self, result: Result<T>) -> Result<T> {
        match result {
            Ok(value) => {
                if let Err(e) = self.refresh() {
                    warn!(visit = %self.visit_id, error = %e, "reload after action view mutation failed");
                }
                Ok(value)
            }
            Err(e) => {
                debug!(visit = %self.visit_id, error = %e, "action view mutation failed");
                self.error = Some(e.to_string());
                Err(e)
            }
        }
    }
}
