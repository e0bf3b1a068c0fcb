use super::Journal;
use crate::error::{JournalError, Result};
use crate::model::{
    dedup_ids, insert_id, Companion, CompanionData, CompanionPatch, VisitCompanionsPatch, VisitData,
};
use crate::store::Transaction;
use crate::types::{Collection, RecordId};
use tracing::debug;

impl Journal {
    /// Create a companion. Any `visit_ids` given must exist and are
    /// mirrored into those visits.
    pub fn create_companion(&self, mut data: CompanionData) -> Result<Companion> {
        data.visit_ids = dedup_ids(&data.visit_ids);

        self.store.transaction(move |tx| {
            let visit_ids = data.visit_ids.clone();
            require_visits(tx, &visit_ids)?;

            let companion = tx.create(data)?;

            let mut patches = Vec::new();
            for visit_id in &visit_ids {
                if let Some(visit) = tx.get::<VisitData>(*visit_id)? {
                    let mut companion_ids = visit.data.companion_ids;
                    if insert_id(&mut companion_ids, companion.id) {
                        patches.push((*visit_id, VisitCompanionsPatch { companion_ids }));
                    }
                }
            }
            tx.update_many::<VisitData, _>(&patches)?;

            debug!(id = %companion.id, name = %companion.name, "created companion");
            Ok(companion)
        })
    }

    /// Plain merge; visit links are not touched.
    pub fn update_companion(&self, id: RecordId, patch: CompanionPatch) -> Result<Option<Companion>> {
        self.store.transaction(|tx| tx.try_update(id, &patch))
    }

    /// Delete a companion and drop it from every visit that lists it.
    pub fn delete_companion(&self, id: RecordId) -> Result<bool> {
        self.store.transaction(|tx| {
            if tx.get::<CompanionData>(id)?.is_none() {
                return Ok(false);
            }

            let patches: Vec<(RecordId, VisitCompanionsPatch)> = tx
                .find::<VisitData>(|v| v.companion_ids.contains(&id))?
                .into_iter()
                .map(|visit| {
                    let companion_ids = visit
                        .data
                        .companion_ids
                        .into_iter()
                        .filter(|c| *c != id)
                        .collect();
                    (visit.id, VisitCompanionsPatch { companion_ids })
                })
                .collect();
            tx.update_many::<VisitData, _>(&patches)?;

            tx.delete::<CompanionData>(id)?;

            debug!(%id, visits = patches.len(), "deleted companion");
            Ok(true)
        })
    }

    pub fn get_companion(&self, id: RecordId) -> Result<Option<Companion>> {
        self.store.get(id)
    }

    pub fn list_companions(&self) -> Result<Vec<Companion>> {
        self.store.get_all()
    }
}

fn require_visits(tx: &mut Transaction<'_>, ids: &[RecordId]) -> Result<()> {
    for id in ids {
        if tx.get::<VisitData>(*id)?.is_none() {
            return Err(JournalError::DanglingReference {
                collection: Collection::Visits,
                id: *id,
            });
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParkType;
    use chrono::NaiveDate;

    fn visit(journal: &Journal) -> RecordId {
        let date = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        journal
            .create_visit(VisitData::new(date, ParkType::Sea))
            .unwrap()
            .id
    }

    #[test]
    fn test_create_companion_defaults() {
        let journal = Journal::in_memory();
        let companion = journal.create_companion(CompanionData::new("Ren")).unwrap();

        assert!(companion.visit_ids.is_empty());
        assert_eq!(journal.list_companions().unwrap(), vec![companion]);
    }

    #[test]
    fn test_create_companion_mirrors_visits() {
        let journal = Journal::in_memory();
        let v = visit(&journal);

        let mut data = CompanionData::new("Ren");
        data.visit_ids = vec![v];
        let companion = journal.create_companion(data).unwrap();

        assert_eq!(journal.get_visit(v).unwrap().unwrap().companion_ids, vec![companion.id]);
    }

    #[test]
    fn test_create_companion_rejects_unknown_visit() {
        let journal = Journal::in_memory();
        let mut data = CompanionData::new("Ren");
        data.visit_ids = vec![RecordId(12)];

        let result = journal.create_companion(data);
        assert!(matches!(result, Err(JournalError::DanglingReference { .. })));
        assert!(journal.list_companions().unwrap().is_empty());
    }

    #[test]
    fn test_update_companion_does_not_touch_links() {
        let journal = Journal::in_memory();
        let v = visit(&journal);
        let mut data = CompanionData::new("Ren");
        data.visit_ids = vec![v];
        let companion = journal.create_companion(data).unwrap();

        let patch = CompanionPatch {
            name: Some("Renji".into()),
            ..Default::default()
        };
        let updated = journal.update_companion(companion.id, patch).unwrap().unwrap();

        assert_eq!(updated.name, "Renji");
        assert_eq!(updated.visit_ids, vec![v]);
        assert!(journal
            .update_companion(RecordId(99), CompanionPatch::default())
            .unwrap()
            .is_none());
    }

    #[test]
    fn test_delete_companion_strips_visits() {
        let journal = Journal::in_memory();
        let companion = journal.create_companion(CompanionData::new("Ren")).unwrap();
        let date = NaiveDate::from_ymd_opt(2024, 5, 4).unwrap();
        let v = journal
            .create_visit(VisitData::new(date, ParkType::Land).with_companions(vec![companion.id]))
            .unwrap();

        assert!(journal.delete_companion(companion.id).unwrap());
        assert!(journal.get_visit(v.id).unwrap().unwrap().companion_ids.is_empty());
        assert!(!journal.delete_companion(companion.id).unwrap());
    }
}
