use super::Journal;
use crate::error::{JournalError, Result};
use crate::model::{ActionData, ActionPatch, ParkArea, ParkType, TimelineAction, VisitData};
use crate::types::{now, Collection, RecordId};
use tracing::debug;

impl Journal {
    /// A visit's timeline, in stored order.
    pub fn get_actions_by_visit(&self, visit_id: RecordId) -> Result<Vec<TimelineAction>> {
        self.store.find::<ActionData>(|a| a.visit_id == visit_id)
    }

    pub fn list_actions(&self) -> Result<Vec<TimelineAction>> {
        self.store.get_all()
    }

    /// Add an action to an existing visit. The area must be in the visit's park.
    pub fn create_action(&self, data: ActionData) -> Result<TimelineAction> {
        self.store.transaction(move |tx| {
            let visit = tx
                .get::<VisitData>(data.visit_id)?
                .ok_or(JournalError::DanglingReference {
                    collection: Collection::Visits,
                    id: data.visit_id,
                })?;
            check_area(data.area, visit.park_type)?;

            let action = tx.create(data)?;
            debug!(id = %action.id, visit = %action.visit_id, category = ?action.category, "created action");
            Ok(action)
        })
    }

    /// Apply `patch`; a new area is checked against the visit's park.
    pub fn update_action(&self, id: RecordId, patch: ActionPatch) -> Result<Option<TimelineAction>> {
        self.store.transaction(|tx| {
            let current = match tx.get::<ActionData>(id)? {
                Some(action) => action,
                None => return Ok(None),
            };

            if let Some(area) = patch.area {
                if let Some(visit) = tx.get::<VisitData>(current.visit_id)? {
                    check_area(area, visit.park_type)?;
                }
            }

            tx.update(id, &patch).map(Some)
        })
    }

    pub fn delete_action(&self, id: RecordId) -> Result<bool> {
        self.store.delete::<ActionData>(id)
    }

    pub fn get_action(&self, id: RecordId) -> Result<Option<TimelineAction>> {
        self.store.get(id)
    }

    /// Move the action at `from` to `to` within a visit's timeline.
    ///
    /// Every action of the visit gets `sort_order` equal to its new index.
    /// Actions of other visits keep their positions in the collection.
    pub fn reorder_actions(
        &self,
        visit_id: RecordId,
        from: usize,
        to: usize,
    ) -> Result<Vec<TimelineAction>> {
        self.store.transaction(|tx| {
            let mut all = tx.get_all::<ActionData>()?;
            let slots: Vec<usize> = all
                .iter()
                .enumerate()
                .filter(|(_, a)| a.visit_id == visit_id)
                .map(|(i, _)| i)
                .collect();

            if from >= slots.len() || to >= slots.len() {
                return Err(JournalError::InvalidOperation(format!(
                    "Cannot move action {} to {} in a timeline of {}",
                    from,
                    to,
                    slots.len()
                )));
            }

            let mut ordered: Vec<TimelineAction> = slots.iter().map(|&i| all[i].clone()).collect();
            let moved = ordered.remove(from);
            ordered.insert(to, moved);

            let stamp = now();
            for (index, action) in ordered.iter_mut().enumerate() {
                action.sort_order = Some(index as u32);
                action.updated_at = stamp;
            }
            for (&slot, action) in slots.iter().zip(&ordered) {
                all[slot] = action.clone();
            }

            tx.replace_all(&all)?;
            debug!(visit = %visit_id, from, to, "reordered actions");
            Ok(ordered)
        })
    }
}

fn check_area(area: ParkArea, park_type: ParkType) -> Result<()> {
    if area.belongs_to(park_type) {
        Ok(())
    } else {
        Err(JournalError::AreaMismatch { area, park_type })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{ActionCategory, LandArea, SeaArea};
    use chrono::{DateTime, NaiveDate, TimeZone, Utc};

    fn at(hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, hour, 0, 0).unwrap()
    }

    fn land_visit(journal: &Journal) -> RecordId {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        journal
            .create_visit(VisitData::new(date, ParkType::Land))
            .unwrap()
            .id
    }

    fn ride(journal: &Journal, visit: RecordId, name: &str, hour: u32) -> TimelineAction {
        journal
            .create_action(
                ActionData::new(visit, ActionCategory::Attraction, LandArea::Tomorrowland, at(hour))
                    .at(name),
            )
            .unwrap()
    }

    fn names(actions: &[TimelineAction]) -> Vec<&str> {
        actions
            .iter()
            .map(|a| a.location_name.as_deref().unwrap_or(""))
            .collect()
    }

    #[test]
    fn test_create_action_requires_visit() {
        let journal = Journal::in_memory();
        let result = journal.create_action(ActionData::new(
            RecordId(5),
            ActionCategory::Show,
            LandArea::Fantasyland,
            at(9),
        ));
        assert!(matches!(
            result,
            Err(JournalError::DanglingReference {
                collection: Collection::Visits,
                ..
            })
        ));
    }

    #[test]
    fn test_create_action_checks_area() {
        let journal = Journal::in_memory();
        let visit = land_visit(&journal);

        let result = journal.create_action(ActionData::new(
            visit,
            ActionCategory::Restaurant,
            SeaArea::ArabianCoast,
            at(12),
        ));
        assert!(matches!(
            result,
            Err(JournalError::AreaMismatch {
                park_type: ParkType::Land,
                ..
            })
        ));
        assert!(journal.get_actions_by_visit(visit).unwrap().is_empty());
    }

    #[test]
    fn test_update_action_rechecks_area() {
        let journal = Journal::in_memory();
        let visit = land_visit(&journal);
        let action = ride(&journal, visit, "Space Mountain", 10);

        let bad = ActionPatch {
            area: Some(SeaArea::PortDiscovery.into()),
            ..Default::default()
        };
        assert!(journal.update_action(action.id, bad).is_err());

        let good = ActionPatch {
            area: Some(LandArea::Westernland.into()),
            wait_time: Some(Some(45)),
            ..Default::default()
        };
        let updated = journal.update_action(action.id, good).unwrap().unwrap();
        assert_eq!(updated.area, ParkArea::Land(LandArea::Westernland));
        assert_eq!(updated.wait_time, Some(45));
        assert_eq!(updated.visit_id, visit);
    }

    #[test]
    fn test_get_actions_by_visit_filters() {
        let journal = Journal::in_memory();
        let v1 = land_visit(&journal);
        let v2 = land_visit(&journal);
        let a = ride(&journal, v1, "A", 9);
        ride(&journal, v2, "B", 10);

        assert_eq!(journal.get_actions_by_visit(v1).unwrap(), vec![a]);
    }

    #[test]
    fn test_reorder_actions() {
        let journal = Journal::in_memory();
        let v1 = land_visit(&journal);
        let v2 = land_visit(&journal);
        ride(&journal, v1, "A", 9);
        ride(&journal, v2, "other", 9);
        ride(&journal, v1, "B", 10);
        ride(&journal, v1, "C", 11);

        let reordered = journal.reorder_actions(v1, 2, 0).unwrap();
        assert_eq!(names(&reordered), vec!["C", "A", "B"]);

        let timeline = journal.get_actions_by_visit(v1).unwrap();
        assert_eq!(names(&timeline), vec!["C", "A", "B"]);
        let orders: Vec<Option<u32>> = timeline.iter().map(|a| a.sort_order).collect();
        assert_eq!(orders, vec![Some(0), Some(1), Some(2)]);

        // Other visits keep their slot
        let all = journal.list_actions().unwrap();
        assert_eq!(all[1].location_name.as_deref(), Some("other"));
        assert_eq!(all[1].sort_order, None);
    }

    #[test]
    fn test_reorder_out_of_range() {
        let journal = Journal::in_memory();
        let visit = land_visit(&journal);
        ride(&journal, visit, "A", 9);

        let result = journal.reorder_actions(visit, 0, 1);
        assert!(matches!(result, Err(JournalError::InvalidOperation(_))));
    }

    #[test]
    fn test_delete_action_is_idempotent() {
        let journal = Journal::in_memory();
        let visit = land_visit(&journal);
        let action = ride(&journal, visit, "A", 9);

        assert!(journal.delete_action(action.id).unwrap());
        assert!(!journal.delete_action(action.id).unwrap());
        assert!(journal.get_action(action.id).unwrap().is_none());
    }
}
